use crate::airport::AirportId;
use crate::flight::InstanceId;
use crate::shipment::ShipmentId;
use crate::time::Time;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Declaration order is the replay order of events sharing an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Cancellation,
    Arrival,
    WaitStart,
    WaitEnd,
    Load,
    PickupReady,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Cancellation => "CANCELLATION",
            EventKind::Arrival => "ARRIVAL",
            EventKind::WaitStart => "WAIT_START",
            EventKind::WaitEnd => "WAIT_END",
            EventKind::Load => "LOAD",
            EventKind::PickupReady => "PICKUP_READY",
        };
        write!(f, "{}", s)
    }
}

/// Immutable record of one thing that happens to goods or flights.
///
/// `flight_id` is set on load, arrival, pickup-ready (the final leg) and
/// cancellation. Connection wait-start / wait-end carry the inbound flight;
/// an origin wait-start carries none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub at: Time,
    pub kind: EventKind,
    pub airport_id: Option<AirportId>,
    pub flight_id: Option<InstanceId>,
    pub shipment_id: Option<ShipmentId>,
    pub quantity: u32,
}

impl Event {
    fn new(at: Time, kind: EventKind, airport_id: &AirportId, flight_id: Option<&InstanceId>, shipment_id: &ShipmentId, quantity: u32) -> Event {
        Event {
            at,
            kind,
            airport_id: Some(airport_id.clone()),
            flight_id: flight_id.cloned(),
            shipment_id: Some(shipment_id.clone()),
            quantity,
        }
    }

    pub fn wait_start(at: Time, airport_id: &AirportId, inbound: Option<&InstanceId>, shipment_id: &ShipmentId, quantity: u32) -> Event {
        Event::new(at, EventKind::WaitStart, airport_id, inbound, shipment_id, quantity)
    }

    pub fn wait_end(at: Time, airport_id: &AirportId, inbound: Option<&InstanceId>, shipment_id: &ShipmentId, quantity: u32) -> Event {
        Event::new(at, EventKind::WaitEnd, airport_id, inbound, shipment_id, quantity)
    }

    pub fn load(at: Time, airport_id: &AirportId, flight_id: &InstanceId, shipment_id: &ShipmentId, quantity: u32) -> Event {
        Event::new(at, EventKind::Load, airport_id, Some(flight_id), shipment_id, quantity)
    }

    pub fn arrival(at: Time, airport_id: &AirportId, flight_id: &InstanceId, shipment_id: &ShipmentId, quantity: u32) -> Event {
        Event::new(at, EventKind::Arrival, airport_id, Some(flight_id), shipment_id, quantity)
    }

    pub fn pickup_ready(at: Time, airport_id: &AirportId, flight_id: &InstanceId, shipment_id: &ShipmentId, quantity: u32) -> Event {
        Event::new(at, EventKind::PickupReady, airport_id, Some(flight_id), shipment_id, quantity)
    }

    pub fn cancellation(at: Time, flight_id: &InstanceId, origin_id: &AirportId) -> Event {
        Event {
            at,
            kind: EventKind::Cancellation,
            airport_id: Some(origin_id.clone()),
            flight_id: Some(flight_id.clone()),
            shipment_id: None,
            quantity: 0,
        }
    }

    /// Replay order; ties keep insertion order under a stable sort.
    pub fn order_key(&self) -> (Time, EventKind) {
        (self.at, self.kind)
    }

    pub fn references(&self, flight_id: &str) -> bool {
        self.flight_id.as_deref() == Some(flight_id)
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ap={} fi={} sh={} qty={}",
            self.at,
            self.kind,
            self.airport_id.as_deref().unwrap_or("-"),
            self.flight_id.as_deref().unwrap_or("-"),
            self.shipment_id.as_deref().unwrap_or("-"),
            self.quantity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_same_instant_order() {
        let ap: AirportId = Arc::from("SKBO");
        let fl: InstanceId = Arc::from("SKBO-SPIM-0800-20250101");
        let sh: ShipmentId = Arc::from("000000001");
        let t = Time(1000);
        let mut events = vec![
            Event::load(t, &ap, &fl, &sh, 3),
            Event::pickup_ready(t, &ap, &fl, &sh, 3),
            Event::wait_end(t, &ap, None, &sh, 3),
            Event::arrival(t, &ap, &fl, &sh, 3),
            Event::cancellation(t, &fl, &ap),
            Event::wait_start(t, &ap, None, &sh, 3),
        ];
        events.sort_by_key(Event::order_key);
        let kinds = events.iter().map(|e| e.kind).collect::<Vec<_>>();
        assert_eq!(
            vec![
                EventKind::Cancellation,
                EventKind::Arrival,
                EventKind::WaitStart,
                EventKind::WaitEnd,
                EventKind::Load,
                EventKind::PickupReady
            ],
            kinds
        );
        assert!(events[0].references("SKBO-SPIM-0800-20250101"));
        assert!(!events[3].references("SKBO-SPIM-0800-20250101"));
    }
}
