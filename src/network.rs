use crate::airport::{Airport, AirportId};
use crate::flight::{FlightIdx, FlightInstance, FlightTemplate, InstanceId, instance_id};
use crate::time::Time;
use chrono::{NaiveTime, TimeZone, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Half-open planning window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Time,
    pub end: Time,
}

impl Window {
    pub fn new(start: Time, end: Time) -> Window {
        Window { start, end }
    }

    pub fn contains(&self, t: Time) -> bool {
        self.start <= t && t < self.end
    }

    pub fn hours(&self) -> usize {
        ((self.end - self.start).max(0) as usize).div_ceil(60)
    }
}

/// Expands every template into dated instances departing inside the window.
/// Days are iterated in the origin's local calendar; templates referring to an
/// unknown airport are skipped.
pub fn expand(
    templates: &[FlightTemplate],
    airports: &HashMap<AirportId, Airport>,
    window: Window,
) -> Vec<FlightInstance> {
    let mut out = Vec::new();
    for tpl in templates {
        let (Some(origin), Some(_)) = (airports.get(&tpl.origin_id), airports.get(&tpl.destination_id)) else {
            warn!(
                origin = %tpl.origin_id,
                destination = %tpl.destination_id,
                "skipping flight template with unknown airport"
            );
            continue;
        };
        let Some(local_departure) = NaiveTime::from_hms_opt(tpl.departure / 60, tpl.departure % 60, 0) else {
            warn!(origin = %tpl.origin_id, departure = tpl.departure, "skipping flight template with invalid departure");
            continue;
        };

        let zone = origin.zone();
        let first_day = window.start.to_utc().with_timezone(&zone).date_naive();
        let last_day = window.end.to_utc().with_timezone(&zone).date_naive();

        for day in first_day.iter_days().take_while(|d| *d <= last_day) {
            let Some(departure) = zone
                .from_local_datetime(&day.and_time(local_departure))
                .single()
                .map(|dt| Time::from_utc(dt.with_timezone(&Utc)))
            else {
                continue;
            };
            if !window.contains(departure) {
                continue;
            }
            out.push(FlightInstance::new(
                instance_id(&tpl.origin_id, &tpl.destination_id, tpl.departure, day),
                tpl.origin_id.clone(),
                tpl.destination_id.clone(),
                departure,
                departure + tpl.duration as i64,
                tpl.capacity,
            ));
        }
    }
    out.sort_by(|a, b| a.departure_time.cmp(&b.departure_time).then_with(|| a.id.cmp(&b.id)));
    out
}

/// Arena of dated flight instances for one planning window, with
/// origin-indexed (by departure) and destination-indexed (by arrival) lookups.
/// Components hold `FlightIdx` into this arena; only the router's commit step
/// mutates capacity.
pub struct TimeExpandedNetwork {
    airports: HashMap<AirportId, Airport>,
    window: Window,
    instances: Vec<FlightInstance>,
    index: HashMap<InstanceId, FlightIdx>,
    outbound: HashMap<AirportId, Vec<FlightIdx>>,
    inbound: HashMap<AirportId, Vec<FlightIdx>>,
}

impl TimeExpandedNetwork {
    pub fn new(
        airports: HashMap<AirportId, Airport>,
        templates: &[FlightTemplate],
        window: Window,
    ) -> TimeExpandedNetwork {
        let instances = expand(templates, &airports, window);
        let index = instances
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.clone(), i))
            .collect::<HashMap<InstanceId, FlightIdx>>();

        let mut outbound = HashMap::<AirportId, Vec<FlightIdx>>::new();
        let mut inbound = HashMap::<AirportId, Vec<FlightIdx>>::new();
        instances.iter().enumerate().for_each(|(i, f)| {
            outbound.entry(f.origin_id.clone()).or_default().push(i);
            inbound.entry(f.destination_id.clone()).or_default().push(i);
        });
        // instances are already ordered by departure
        inbound.values_mut().for_each(|idxs| {
            idxs.sort_by(|a, b| {
                instances[*a]
                    .arrival_time
                    .cmp(&instances[*b].arrival_time)
                    .then_with(|| instances[*a].id.cmp(&instances[*b].id))
            })
        });

        debug!(
            instances = instances.len(),
            templates = templates.len(),
            start = %window.start,
            end = %window.end,
            "expanded flight network"
        );

        TimeExpandedNetwork {
            airports,
            window,
            instances,
            index,
            outbound,
            inbound,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn airports(&self) -> &HashMap<AirportId, Airport> {
        &self.airports
    }

    pub fn airport(&self, id: &AirportId) -> Option<&Airport> {
        self.airports.get(id)
    }

    /// Infinite-source airports, sorted by id.
    pub fn hubs(&self) -> Vec<AirportId> {
        let mut hubs = self
            .airports
            .values()
            .filter(|a| a.infinite_source)
            .map(|a| a.id.clone())
            .collect::<Vec<_>>();
        hubs.sort();
        hubs
    }

    pub fn instances(&self) -> &[FlightInstance] {
        &self.instances
    }

    pub fn instance(&self, idx: FlightIdx) -> &FlightInstance {
        &self.instances[idx]
    }

    pub(crate) fn instance_mut(&mut self, idx: FlightIdx) -> &mut FlightInstance {
        &mut self.instances[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<FlightIdx> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&FlightInstance> {
        self.index_of(id).map(|i| &self.instances[i])
    }

    /// Outbound instances of an airport ordered by departure.
    pub fn outbound_from(&self, airport: &AirportId) -> &[FlightIdx] {
        self.outbound.get(airport).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Inbound instances of an airport ordered by arrival.
    pub fn inbound_to(&self, airport: &AirportId) -> &[FlightIdx] {
        self.inbound.get(airport).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outbound instances of an airport departing at or after `t`.
    pub fn departing_after(&self, airport: &AirportId, t: Time) -> &[FlightIdx] {
        let outbound = self.outbound_from(airport);
        let first = outbound.partition_point(|i| self.instances[*i].departure_time < t);
        &outbound[first..]
    }

    /// Flags an instance as cancelled; returns false if unknown or already cancelled.
    pub fn cancel(&mut self, id: &str) -> bool {
        match self.index_of(id) {
            Some(idx) => self.instances[idx].cancel(),
            None => false,
        }
    }

    /// Consumes already-committed seats on an instance (used when rebuilding a
    /// network from a timeline).
    pub(crate) fn reserve(&mut self, id: &str, qty: u32) -> u32 {
        match self.index_of(id) {
            Some(idx) => self.instances[idx].consume(qty),
            None => 0,
        }
    }
}
