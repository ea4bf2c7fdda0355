use crate::airport::AirportId;
use crate::network::{TimeExpandedNetwork, Window};
use crate::shipment::ShipmentId;
use crate::simulation::event::{Event, EventKind};
use crate::time::{MINUTES_PER_HOUR, Time};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct Lanes {
    capacity: u32,
    infinite_source: bool,
    backlog: Vec<u32>,
    outbound: Vec<u32>,
    inbound: Vec<u32>,
}

/// Hour-bucketed backlog / outbound seats / inbound seats per airport over a
/// planning window. Outbound and inbound are fixed at construction; backlog
/// only ever grows, through committed routes.
#[derive(Debug, Clone)]
pub struct OccupancyForecast {
    window: Window,
    lanes: HashMap<AirportId, Lanes>,
}

impl OccupancyForecast {
    pub fn new(network: &TimeExpandedNetwork) -> OccupancyForecast {
        let window = network.window();
        let buckets = window.hours();
        let mut lanes = network
            .airports()
            .values()
            .map(|a| {
                (
                    a.id.clone(),
                    Lanes {
                        capacity: a.capacity,
                        infinite_source: a.infinite_source,
                        backlog: vec![0; buckets],
                        outbound: vec![0; buckets],
                        inbound: vec![0; buckets],
                    },
                )
            })
            .collect::<HashMap<_, _>>();

        let bucket = |t: Time| Self::bucket_in(window, buckets, t);
        for f in network.instances().iter().filter(|f| !f.is_cancelled()) {
            if let (Some(b), Some(l)) = (bucket(f.departure_time), lanes.get_mut(&f.origin_id)) {
                l.outbound[b] += f.capacity;
            }
            if let (Some(b), Some(l)) = (bucket(f.arrival_time), lanes.get_mut(&f.destination_id)) {
                l.inbound[b] += f.capacity;
            }
        }

        OccupancyForecast { window, lanes }
    }

    fn bucket_in(window: Window, buckets: usize, t: Time) -> Option<usize> {
        if t < window.start {
            return None;
        }
        let b = ((t - window.start) / MINUTES_PER_HOUR) as usize;
        (b < buckets).then_some(b)
    }

    pub fn bucket_of(&self, t: Time) -> Option<usize> {
        Self::bucket_in(self.window, self.window.hours(), t)
    }

    /// Buckets overlapping `[from, to)`, clipped to the window.
    fn buckets_overlapping(&self, from: Time, to: Time) -> std::ops::Range<usize> {
        let buckets = self.window.hours();
        if to <= from || !Time::is_overlapping(&(from, to), &(self.window.start, self.window.end)) {
            return 0..0;
        }
        let first = self.bucket_of(from.max(self.window.start)).unwrap_or(0);
        let last = self.bucket_of(to - 1).map(|b| b + 1).unwrap_or(buckets);
        first..last
    }

    /// Adds `qty` to every hour bucket overlapping `[from, to)`.
    pub fn increase_backlog(&mut self, airport: &AirportId, from: Time, to: Time, qty: u32) {
        let range = self.buckets_overlapping(from, to);
        if let Some(l) = self.lanes.get_mut(airport) {
            l.backlog[range].iter_mut().for_each(|b| *b = b.saturating_add(qty));
        }
    }

    pub fn backlog_at(&self, airport: &AirportId, at: Time) -> u32 {
        match (self.lanes.get(airport), self.bucket_of(at)) {
            (Some(l), Some(b)) => l.backlog[b],
            _ => 0,
        }
    }

    /// Highest backlog over `[from, to)`.
    pub fn peak_backlog(&self, airport: &AirportId, from: Time, to: Time) -> u32 {
        let range = self.buckets_overlapping(from, to);
        self.lanes
            .get(airport)
            .and_then(|l| l.backlog[range].iter().max().copied())
            .unwrap_or(0)
    }

    /// Seats departing the airport over `[from, to)`.
    pub fn outbound_capacity(&self, airport: &AirportId, from: Time, to: Time) -> u64 {
        let range = self.buckets_overlapping(from, to);
        self.lanes
            .get(airport)
            .map(|l| l.outbound[range].iter().map(|c| *c as u64).sum())
            .unwrap_or(0)
    }

    pub fn inbound_capacity(&self, airport: &AirportId, from: Time, to: Time) -> u64 {
        let range = self.buckets_overlapping(from, to);
        self.lanes
            .get(airport)
            .map(|l| l.inbound[range].iter().map(|c| *c as u64).sum())
            .unwrap_or(0)
    }

    /// Projected warehouse fill ratio if `qty` more units sat there at `at`.
    /// Zero for infinite sources, unbounded for zero-capacity warehouses.
    pub fn utilization(&self, airport: &AirportId, at: Time, qty: u32) -> f64 {
        match self.lanes.get(airport) {
            Some(l) if l.infinite_source => 0.0,
            Some(l) if l.capacity == 0 => f64::INFINITY,
            Some(l) => (self.backlog_at(airport, at) + qty) as f64 / l.capacity as f64,
            None => f64::INFINITY,
        }
    }

    /// Units the warehouse can still take over `[from, to)`.
    pub fn room(&self, airport: &AirportId, from: Time, to: Time) -> u32 {
        match self.lanes.get(airport) {
            Some(l) if l.infinite_source => u32::MAX,
            Some(l) => l.capacity.saturating_sub(self.peak_backlog(airport, from, to)),
            None => 0,
        }
    }

    /// Headroom gate for a transit warehouse: the units must fit right now,
    /// and the seats departing over the next `horizon_hours` must cover the
    /// peak backlog projected over the same span. Hubs always pass.
    pub fn admission_check(&self, airport: &AirportId, at: Time, qty: u32, horizon_hours: u32) -> bool {
        let Some(l) = self.lanes.get(airport) else {
            return false;
        };
        if l.infinite_source {
            return true;
        }
        if self.backlog_at(airport, at).saturating_add(qty) > l.capacity {
            return false;
        }
        let until = at + Time::hours(horizon_hours as i64);
        if self.buckets_overlapping(at, until).is_empty() {
            return true;
        }
        let projected_peak = self.peak_backlog(airport, at, until) as u64 + qty as u64;
        self.outbound_capacity(airport, at, until) >= projected_peak
    }

    /// Largest quantity, at most `upto`, that a transit warehouse can hold
    /// over `[from, to)` while still passing the headroom gate at `from`.
    pub fn transit_room(&self, airport: &AirportId, from: Time, to: Time, upto: u32, horizon_hours: u32) -> u32 {
        let (mut lo, mut hi) = (0, upto.min(self.room(airport, from, to)));
        // the gate only gets stricter as the quantity grows
        while lo < hi {
            let mid = lo + (hi - lo).div_ceil(2);
            if self.admission_check(airport, from, mid, horizon_hours) {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        lo
    }

    /// Re-derives backlog from the dwell intervals recorded in a timeline:
    /// goods entering a warehouse (origin wait-start or arrival) until they
    /// are loaded again or become ready for pickup there.
    pub fn seed_from_events(&mut self, events: &[Event]) {
        let cancelled = events
            .iter()
            .filter(|e| e.kind == EventKind::Cancellation)
            .filter_map(|e| e.flight_id.clone())
            .collect::<HashSet<_>>();

        let mut entered = HashMap::<(AirportId, ShipmentId), Vec<(Time, u32)>>::new();
        for e in events {
            if e.flight_id.as_ref().is_some_and(|f| cancelled.contains(f)) {
                continue;
            }
            let (Some(airport), Some(shipment)) = (e.airport_id.clone(), e.shipment_id.clone()) else {
                continue;
            };
            match e.kind {
                EventKind::Arrival => entered.entry((airport, shipment)).or_default().push((e.at, e.quantity)),
                EventKind::WaitStart if e.flight_id.is_none() => {
                    entered.entry((airport, shipment)).or_default().push((e.at, e.quantity))
                }
                EventKind::Load | EventKind::PickupReady => {
                    if let Some(stays) = entered.get_mut(&(airport.clone(), shipment)) {
                        if !stays.is_empty() {
                            let (from, qty) = stays.remove(0);
                            self.increase_backlog(&airport, from, e.at, qty);
                        }
                    }
                }
                _ => {}
            }
        }

        // goods that never leave (stranded) occupy the warehouse to the end of the window
        for ((airport, _), stays) in entered {
            for (from, qty) in stays {
                self.increase_backlog(&airport, from, Time::MAX, qty);
            }
        }
    }
}
