use crate::airport::AirportId;
use crate::flight::InstanceId;
use crate::shipment::ShipmentId;
use crate::simulation::event::{Event, EventKind};
use crate::time::Time;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShipmentStatus {
    InWarehouse,
    InFlight,
    ReadyForPickup,
}

impl Display for ShipmentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ShipmentStatus::InWarehouse => "in-warehouse",
            ShipmentStatus::InFlight => "in-flight",
            ShipmentStatus::ReadyForPickup => "ready-for-pickup",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentState {
    /// Status set by the latest event of the shipment.
    pub status: ShipmentStatus,
    pub location: Option<AirportId>,
    /// Units sitting in each warehouse.
    pub held: BTreeMap<AirportId, u32>,
    /// Units on board each flight.
    pub airborne: BTreeMap<InstanceId, u32>,
    pub ready: u32,
}

impl ShipmentState {
    fn new(status: ShipmentStatus) -> ShipmentState {
        ShipmentState {
            status,
            location: None,
            held: BTreeMap::new(),
            airborne: BTreeMap::new(),
            ready: 0,
        }
    }

    pub fn held_total(&self) -> u32 {
        self.held.values().sum()
    }
}

/// Point-in-time view folded from the events with `at <= snapshot.at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub at: Time,
    pub warehouses: BTreeMap<AirportId, u32>,
    pub flights: BTreeMap<InstanceId, u32>,
    pub shipments: BTreeMap<ShipmentId, ShipmentState>,
    pub cancelled: BTreeSet<InstanceId>,
}

impl Snapshot {
    pub fn empty(at: Time) -> Snapshot {
        Snapshot {
            at,
            warehouses: BTreeMap::new(),
            flights: BTreeMap::new(),
            shipments: BTreeMap::new(),
            cancelled: BTreeSet::new(),
        }
    }

    pub fn shipments_with(&self, status: ShipmentStatus) -> impl Iterator<Item = (&ShipmentId, &ShipmentState)> {
        self.shipments.iter().filter(move |(_, s)| s.status == status)
    }

    pub fn warehouse_load(&self, airport: &str) -> u32 {
        self.warehouses.get(airport).copied().unwrap_or(0)
    }

    pub fn flight_load(&self, flight: &str) -> u32 {
        self.flights.get(flight).copied().unwrap_or(0)
    }

    /// Folds one event into the view.
    ///
    /// Events on an instance cancelled earlier in replay order are void;
    /// what was folded before the cancellation stays.
    fn apply(&mut self, e: &Event) {
        if e.kind == EventKind::Cancellation {
            if let Some(f) = &e.flight_id {
                self.cancelled.insert(f.clone());
            }
            return;
        }
        if e.flight_id.as_ref().is_some_and(|f| self.cancelled.contains(f)) {
            return;
        }
        let (Some(airport), Some(shipment)) = (&e.airport_id, &e.shipment_id) else {
            return;
        };

        match e.kind {
            EventKind::WaitStart if e.flight_id.is_none() => {
                add(&mut self.warehouses, airport, e.quantity);
                let state = self.state(shipment, ShipmentStatus::InWarehouse);
                add(&mut state.held, airport, e.quantity);
                state.status = ShipmentStatus::InWarehouse;
                state.location = Some(airport.clone());
            }
            EventKind::Arrival => {
                let Some(flight) = &e.flight_id else {
                    return;
                };
                take(&mut self.flights, flight, e.quantity);
                add(&mut self.warehouses, airport, e.quantity);
                let state = self.state(shipment, ShipmentStatus::InWarehouse);
                take(&mut state.airborne, flight, e.quantity);
                add(&mut state.held, airport, e.quantity);
                state.status = ShipmentStatus::InWarehouse;
                state.location = Some(airport.clone());
            }
            EventKind::Load => {
                let Some(flight) = &e.flight_id else {
                    return;
                };
                take(&mut self.warehouses, airport, e.quantity);
                add(&mut self.flights, flight, e.quantity);
                let state = self.state(shipment, ShipmentStatus::InFlight);
                take(&mut state.held, airport, e.quantity);
                add(&mut state.airborne, flight, e.quantity);
                state.status = ShipmentStatus::InFlight;
                state.location = None;
            }
            EventKind::PickupReady => {
                take(&mut self.warehouses, airport, e.quantity);
                let state = self.state(shipment, ShipmentStatus::ReadyForPickup);
                take(&mut state.held, airport, e.quantity);
                state.ready += e.quantity;
                state.status = ShipmentStatus::ReadyForPickup;
                state.location = Some(airport.clone());
            }
            // connection markers
            _ => {}
        }
    }

    fn state(&mut self, shipment: &ShipmentId, initial: ShipmentStatus) -> &mut ShipmentState {
        self.shipments
            .entry(shipment.clone())
            .or_insert_with(|| ShipmentState::new(initial))
    }
}

fn add<K: Ord + Clone>(map: &mut BTreeMap<K, u32>, key: &K, qty: u32) {
    *map.entry(key.clone()).or_insert(0) += qty;
}

fn take<K: Ord>(map: &mut BTreeMap<K, u32>, key: &K, qty: u32) {
    if let Some(v) = map.get_mut(key) {
        *v = v.saturating_sub(qty);
        if *v == 0 {
            map.remove(key);
        }
    }
}

/// Rebuilds state at any instant by replaying a frozen copy of the timeline.
#[derive(Debug, Clone)]
pub struct SnapshotReplayer {
    events: Arc<Vec<Event>>,
}

impl SnapshotReplayer {
    pub fn new(events: Arc<Vec<Event>>) -> SnapshotReplayer {
        SnapshotReplayer { events }
    }

    pub fn state_at(&self, at: Time) -> Snapshot {
        Self::advance(Snapshot::empty(Time(i64::MIN)), &self.events, at)
    }

    /// State after every event.
    pub fn final_state(&self) -> Snapshot {
        self.state_at(Time::MAX)
    }

    /// Folds the events in `(snapshot.at, at]` into `snapshot`.
    pub fn advance(mut snapshot: Snapshot, events: &[Event], at: Time) -> Snapshot {
        let from = snapshot.at;
        events
            .iter()
            .skip_while(|e| e.at <= from)
            .take_while(|e| e.at <= at)
            .for_each(|e| snapshot.apply(e));
        snapshot.at = at.max(from);
        snapshot
    }
}
