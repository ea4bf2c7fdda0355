use crate::airport::AirportId;
use crate::time::Time;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type ShipmentId = Arc<str>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub destination_id: AirportId,
    pub quantity: u32,
    pub requested_at: Time,
}
