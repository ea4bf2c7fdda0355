use crate::airport::{Airport, AirportId};
use crate::config::{AcoParams, Profile, SlaPolicy};
use crate::flight::{FlightTemplate, InstanceId};
use crate::session::PlanningSession;
use crate::shipment::{Shipment, ShipmentId};
use crate::simulation::{CancellationRecord, Event};
use crate::time::{Period, Time};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

pub fn id(s: &str) -> Arc<str> {
    Arc::from(s)
}

pub fn at(s: &str) -> Time {
    s.parse().unwrap()
}

pub fn record(s: &str) -> CancellationRecord {
    s.parse().unwrap()
}

pub fn add_airport(airports: &mut HashMap<AirportId, Airport>, airport_id: &str, capacity: u32, infinite_source: bool) {
    airports.insert(
        id(airport_id),
        Airport {
            id: id(airport_id),
            continent: id("AM"),
            latitude: 0.0,
            longitude: 0.0,
            utc_offset: 0,
            capacity,
            infinite_source,
        },
    );
}

pub fn add_flight(
    templates: &mut Vec<FlightTemplate>,
    airports: &HashMap<AirportId, Airport>,
    origin_id: &str,
    destination_id: &str,
    departure: &str,
    arrival: &str,
    capacity: u32,
) {
    let hhmm = |s: &str| crate::time::parse_hhmm(s).unwrap();
    templates.push(FlightTemplate::between(
        &airports[&id(origin_id)],
        &airports[&id(destination_id)],
        hhmm(departure),
        hhmm(arrival),
        capacity,
    ));
}

pub fn shipment(shipment_id: &str, destination_id: &str, quantity: u32, requested_at: &str) -> Shipment {
    Shipment {
        id: id(shipment_id),
        destination_id: id(destination_id),
        quantity,
        requested_at: at(requested_at),
    }
}

pub fn params() -> AcoParams {
    AcoParams::profile(Profile::Quick).with_seed(7)
}

/// Daily HUB -> DST 08:00-10:00 leg, January 2025, UTC everywhere.
pub fn direct(shipments: Vec<Shipment>) -> PlanningSession {
    let mut airports = HashMap::new();
    let mut templates = Vec::new();
    add_airport(&mut airports, "HUB", 0, true);
    add_airport(&mut airports, "DST", 1000, false);
    add_flight(&mut templates, &airports, "HUB", "DST", "08:00", "10:00", 100);
    session(airports, templates, shipments)
}

/// Daily HUB -> TRN 06:00-08:00 and TRN -> DST 12:00-14:00 legs.
pub fn via_transit(shipments: Vec<Shipment>) -> PlanningSession {
    let mut airports = HashMap::new();
    let mut templates = Vec::new();
    add_airport(&mut airports, "HUB", 0, true);
    add_airport(&mut airports, "TRN", 1000, false);
    add_airport(&mut airports, "DST", 1000, false);
    add_flight(&mut templates, &airports, "HUB", "TRN", "06:00", "08:00", 200);
    add_flight(&mut templates, &airports, "TRN", "DST", "12:00", "14:00", 200);
    session(airports, templates, shipments)
}

pub fn session(airports: HashMap<AirportId, Airport>, templates: Vec<FlightTemplate>, shipments: Vec<Shipment>) -> PlanningSession {
    crate::logging::init_test();
    PlanningSession::new(Period::new(2025, 1), airports, templates, shipments, params(), SlaPolicy::default()).unwrap()
}

pub fn kinds_of(events: &[Event], shipment_id: &str) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.shipment_id.as_deref() == Some(shipment_id))
        .map(|e| format!("{}@{}", e.kind, e.airport_id.as_deref().unwrap_or("-")))
        .collect()
}

fn arb_flight() -> impl Strategy<Value = InstanceId> {
    prop_oneof![Just(id("F1")), Just(id("F2")), Just(id("F3"))]
}

fn arb_shipment_id() -> impl Strategy<Value = ShipmentId> {
    prop_oneof![Just(id("000000001")), Just(id("000000002"))]
}

fn arb_airport() -> impl Strategy<Value = AirportId> {
    prop_oneof![Just(id("HUB")), Just(id("TRN")), Just(id("DST"))]
}

/// Any event the fold has to cope with, consistent or not.
pub fn arb_event() -> impl Strategy<Value = Event> {
    (0..6u8, 0..(48 * 60i64), arb_airport(), arb_flight(), arb_shipment_id(), 1..200u32, any::<bool>()).prop_map(
        |(kind, offset, airport, flight, shipment, qty, connection)| {
            let t = at("2025-01-01T00:00") + offset;
            let inbound = connection.then_some(&flight);
            match kind {
                0 => Event::cancellation(t, &flight, &airport),
                1 => Event::arrival(t, &airport, &flight, &shipment, qty),
                2 => Event::wait_start(t, &airport, inbound, &shipment, qty),
                3 => Event::wait_end(t, &airport, inbound, &shipment, qty),
                4 => Event::load(t, &airport, &flight, &shipment, qty),
                _ => Event::pickup_ready(t, &airport, &flight, &shipment, qty),
            }
        },
    )
}

pub fn arb_instant() -> impl Strategy<Value = Time> {
    (0..(50 * 60i64)).prop_map(|offset| at("2025-01-01T00:00") + offset - 60)
}
