use crate::airport::{Airport, AirportId};
use crate::config::{AcoParams, SlaPolicy};
use crate::error::ScenarioError;
use crate::flight::FlightTemplate;
use crate::shipment::Shipment;
use crate::simulation::CancellationRecord;
use crate::time::{Period, parse_hhmm};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Deserialize)]
struct RawFlight {
    origin: AirportId,
    destination: AirportId,
    departure: String,
    arrival: String,
    capacity: u32,
}

#[derive(Deserialize)]
struct RawShipment {
    id: Arc<str>,
    destination: AirportId,
    quantity: u32,
    day: u32,
    hour: u32,
    minute: u32,
}

#[derive(Deserialize)]
struct RawScenario {
    period: Period,
    airports: Vec<Airport>,
    flights: Vec<RawFlight>,
    #[serde(default)]
    shipments: Vec<RawShipment>,
    #[serde(default)]
    params: AcoParams,
    #[serde(default)]
    sla: SlaPolicy,
    #[serde(default)]
    cancellations: Vec<String>,
}

/// Everything a planning session starts from.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub period: Period,
    pub airports: HashMap<AirportId, Airport>,
    pub templates: Vec<FlightTemplate>,
    pub shipments: Vec<Shipment>,
    pub params: AcoParams,
    pub sla: SlaPolicy,
    /// Cancellations to apply right after the initial plan.
    pub cancellations: Vec<CancellationRecord>,
}

impl Scenario {
    pub fn load_from_file(path: &Path) -> Result<Scenario, ScenarioError> {
        let data = std::fs::read_to_string(path)?;
        Scenario::from_json(&data)
    }

    /// Flights and shipments that reference unknown airports are dropped
    /// with a warning; malformed times and records fail the whole load.
    pub fn from_json(data: &str) -> Result<Scenario, ScenarioError> {
        let raw: RawScenario = serde_json::from_str(data)?;
        let period = raw.period;
        if period.start().is_none() {
            return Err(ScenarioError::InvalidPeriod {
                year: period.year,
                month: period.month,
            });
        }
        if raw.airports.is_empty() {
            return Err(ScenarioError::NoAirports);
        }

        let airports = raw
            .airports
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect::<HashMap<AirportId, Airport>>();

        let mut templates = Vec::with_capacity(raw.flights.len());
        for f in raw.flights {
            let (Some(origin), Some(destination)) = (airports.get(&f.origin), airports.get(&f.destination)) else {
                warn!(origin = %f.origin, destination = %f.destination, "flight references unknown airport, skipped");
                continue;
            };
            templates.push(FlightTemplate::between(
                origin,
                destination,
                parse_hhmm(&f.departure)?,
                parse_hhmm(&f.arrival)?,
                f.capacity,
            ));
        }

        let mut shipments = Vec::with_capacity(raw.shipments.len());
        for s in raw.shipments {
            if !airports.contains_key(&s.destination) {
                warn!(shipment = %s.id, destination = %s.destination, "shipment to unknown airport, skipped");
                continue;
            }
            let Some(requested_at) = period.instant(s.day, s.hour, s.minute) else {
                warn!(shipment = %s.id, day = s.day, hour = s.hour, minute = s.minute, "shipment outside the period, skipped");
                continue;
            };
            shipments.push(Shipment {
                id: s.id,
                destination_id: s.destination,
                quantity: s.quantity,
                requested_at,
            });
        }

        let cancellations = raw
            .cancellations
            .iter()
            .map(|r| r.parse::<CancellationRecord>())
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            %period,
            airports = airports.len(),
            flights = templates.len(),
            shipments = shipments.len(),
            cancellations = cancellations.len(),
            "scenario loaded"
        );
        Ok(Scenario {
            period,
            airports,
            templates,
            shipments,
            params: raw.params,
            sla: raw.sla,
            cancellations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    const SCENARIO: &str = r#"{
        "period": {"year": 2025, "month": 1},
        "airports": [
            {"id": "SKBO", "continent": "AM", "latitude": 4.7, "longitude": -74.1, "utc_offset": -5, "capacity": 430, "infinite_source": true},
            {"id": "SEQM", "continent": "AM", "latitude": -0.1, "longitude": -78.4, "utc_offset": -5, "capacity": 410}
        ],
        "flights": [
            {"origin": "SKBO", "destination": "SEQM", "departure": "03:34", "arrival": "05:21", "capacity": 300},
            {"origin": "SKBO", "destination": "LOWW", "departure": "13:00", "arrival": "23:00", "capacity": 300}
        ],
        "shipments": [
            {"id": "000000001", "destination": "SEQM", "quantity": 5, "day": 2, "hour": 1, "minute": 38},
            {"id": "000000002", "destination": "LOWW", "quantity": 5, "day": 2, "hour": 1, "minute": 38}
        ],
        "params": {"ants": 4, "iterations": 2},
        "cancellations": ["03.SKBO-SEQM-03:34"]
    }"#;

    #[test]
    fn test_load_skips_unknown_airports() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(Period::new(2025, 1), scenario.period);
        assert_eq!(2, scenario.airports.len());
        assert_eq!(1, scenario.templates.len());
        assert_eq!(1, scenario.shipments.len());
        assert_eq!("2025-01-02T01:38".parse::<crate::time::Time>().unwrap(), scenario.shipments[0].requested_at);
        assert_eq!(1, scenario.cancellations.len());
        assert_eq!(3, scenario.cancellations[0].day);
    }

    #[test]
    fn test_partial_params_keep_defaults() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(4, scenario.params.ants);
        assert_eq!(2, scenario.params.iterations);
        assert_eq!(AcoParams::default().alpha, scenario.params.alpha);
        assert_eq!(SlaPolicy::default(), scenario.sla);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(Scenario::from_json("{"), Err(ScenarioError::Json(_))));
        assert!(matches!(
            Scenario::from_json(r#"{"period": {"year": 2025, "month": 13}, "airports": [], "flights": []}"#),
            Err(ScenarioError::InvalidPeriod { year: 2025, month: 13 })
        ));
        assert!(matches!(
            Scenario::from_json(r#"{"period": {"year": 2025, "month": 1}, "airports": [], "flights": []}"#),
            Err(ScenarioError::NoAirports)
        ));
        let bad_time = SCENARIO.replace("\"03:34\", \"arrival\"", "\"3h34\", \"arrival\"");
        assert!(matches!(
            Scenario::from_json(&bad_time),
            Err(ScenarioError::Parse(ParseError::TimeOfDay(_)))
        ));
    }
}
