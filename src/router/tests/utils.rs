use crate::airport::{Airport, AirportId};
use crate::config::{AcoParams, Profile, RouterConfig, SlaPolicy};
use crate::flight::FlightTemplate;
use crate::forecast::OccupancyForecast;
use crate::network::{TimeExpandedNetwork, Window};
use crate::router::AcoRouter;
use crate::shipment::Shipment;
use crate::time::Time;
use proptest::prelude::Strategy;
use proptest::prop_oneof;
use proptest::strategy::Just;
use std::collections::HashMap;
use std::sync::Arc;

pub fn id(s: &str) -> Arc<str> {
    Arc::from(s)
}

pub fn at(s: &str) -> Time {
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

/// Daily leg between two airports of the map, times as `HH:MM` UTC.
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

pub fn network(airports: HashMap<AirportId, Airport>, templates: &[FlightTemplate], days: i64) -> TimeExpandedNetwork {
    let start = at("2025-01-01T00:00");
    TimeExpandedNetwork::new(airports, templates, Window::new(start, start + days * crate::time::MINUTES_PER_DAY))
}

pub fn setup(network: TimeExpandedNetwork, params: AcoParams) -> (TimeExpandedNetwork, OccupancyForecast, AcoRouter) {
    crate::logging::init_test();
    let forecast = OccupancyForecast::new(&network);
    let router = AcoRouter::new(RouterConfig::for_network(&network, params, SlaPolicy::default()));
    (network, forecast, router)
}

pub fn arb_airport() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("AP_1"), Just("AP_2"), Just("AP_3")]
}

pub fn arb_shipment() -> impl Strategy<Value = Shipment> {
    (0..1000u32, arb_airport(), 1..400u32, 0..(36 * 60i64)).prop_map(|(n, dest, qty, offset)| Shipment {
        id: id(&format!("{:09}", n)),
        destination_id: id(dest),
        quantity: qty,
        requested_at: at("2025-01-01T00:00") + offset,
    })
}
