use crate::airport::{Airport, AirportId};
use crate::time::{MINUTES_PER_DAY, Time};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabled::Tabled;

pub type InstanceId = Arc<str>;

/// Index of a flight instance inside the network arena.
pub type FlightIdx = usize;

/// Daily scheduled leg, independent of date. Times are local to the origin
/// (departure) and destination (arrival) airports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightTemplate {
    pub origin_id: AirportId,
    pub destination_id: AirportId,
    /// Minutes after local midnight at the origin.
    pub departure: u32,
    /// Minutes after local midnight at the destination.
    pub arrival: u32,
    pub capacity: u32,
    pub duration: u32,
}

impl FlightTemplate {
    /// Builds a template whose duration is derived from the local clock times
    /// of both ends, wrapping past midnight.
    pub fn between(origin: &Airport, destination: &Airport, departure: u32, arrival: u32, capacity: u32) -> FlightTemplate {
        let shift = (destination.utc_offset - origin.utc_offset) as i64 * 60;
        let arrival_at_origin = arrival as i64 - shift;
        let duration = (arrival_at_origin - departure as i64).rem_euclid(MINUTES_PER_DAY);
        FlightTemplate {
            origin_id: origin.id.clone(),
            destination_id: destination.id.clone(),
            departure,
            arrival,
            capacity,
            duration: duration as u32,
        }
    }

    pub fn matches(&self, origin_id: &str, destination_id: &str, departure: u32) -> bool {
        *self.origin_id == *origin_id && *self.destination_id == *destination_id && self.departure == departure
    }
}

/// Stable id of the dated realisation of a template, e.g. `SPIM-EBCI-1405-20250103`.
pub fn instance_id(origin_id: &str, destination_id: &str, departure: u32, date: NaiveDate) -> InstanceId {
    Arc::from(format!(
        "{}-{}-{:02}{:02}-{}",
        origin_id,
        destination_id,
        departure / 60,
        departure % 60,
        date.format("%Y%m%d")
    ))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Tabled)]
pub struct FlightInstance {
    pub id: InstanceId,
    #[tabled(rename = "origin")]
    pub origin_id: AirportId,
    #[tabled(rename = "destination")]
    pub destination_id: AirportId,
    #[tabled(rename = "departure")]
    pub departure_time: Time,
    #[tabled(rename = "arrival")]
    pub arrival_time: Time,
    pub capacity: u32,
    remaining: u32,
    cancelled: bool,
}

impl FlightInstance {
    pub fn new(
        id: InstanceId,
        origin_id: AirportId,
        destination_id: AirportId,
        departure_time: Time,
        arrival_time: Time,
        capacity: u32,
    ) -> FlightInstance {
        FlightInstance {
            id,
            origin_id,
            destination_id,
            departure_time,
            arrival_time,
            capacity,
            remaining: capacity,
            cancelled: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Seats the search may use: remaining minus the transit reserve held back
    /// from the nominal capacity. Zero once cancelled.
    pub fn usable(&self, reserve_ratio: f64) -> u32 {
        if self.cancelled {
            return 0;
        }
        let reserve = (self.capacity as f64 * reserve_ratio.clamp(0.0, 1.0)).ceil() as u32;
        self.remaining.saturating_sub(reserve)
    }

    pub fn duration(&self) -> i64 {
        self.arrival_time - self.departure_time
    }

    /// Takes up to `qty` seats and returns how many were taken.
    pub(crate) fn consume(&mut self, qty: u32) -> u32 {
        let taken = qty.min(self.remaining);
        self.remaining -= taken;
        taken
    }

    /// Once cancelled an instance stays cancelled.
    pub(crate) fn cancel(&mut self) -> bool {
        let changed = !self.cancelled;
        self.cancelled = true;
        changed
    }
}
