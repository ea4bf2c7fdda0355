use crate::router::Route;
use crate::simulation::event::Event;

/// Translates committed routes into timeline events, ordered for replay.
///
/// A fresh route starts with the goods appearing at the hub one dwell before
/// the first departure; a resumed route only closes the wait it is already in.
pub fn build_events(routes: &[Route], dwell_minutes: i64, pickup_minutes: i64) -> Vec<Event> {
    let mut events = Vec::new();
    for route in routes.iter().filter(|r| r.quantity > 0) {
        let (sh, qty) = (&route.shipment_id, route.quantity);
        for (i, leg) in route.legs.iter().enumerate() {
            if i == 0 {
                if route.resumed {
                    events.push(Event::wait_end(leg.departure, &leg.origin_id, None, sh, qty));
                } else {
                    events.push(Event::wait_start(leg.departure - dwell_minutes, &leg.origin_id, None, sh, qty));
                }
            } else {
                let prev = &route.legs[i - 1];
                let wait_from = (leg.departure - dwell_minutes).max(prev.arrival);
                events.push(Event::arrival(prev.arrival, &prev.destination_id, &prev.flight_id, sh, qty));
                events.push(Event::wait_start(wait_from, &leg.origin_id, Some(&prev.flight_id), sh, qty));
                events.push(Event::wait_end(leg.departure, &leg.origin_id, Some(&prev.flight_id), sh, qty));
            }
            events.push(Event::load(leg.departure, &leg.origin_id, &leg.flight_id, sh, qty));

            if i == route.legs.len() - 1 {
                events.push(Event::arrival(leg.arrival, &leg.destination_id, &leg.flight_id, sh, qty));
                events.push(Event::pickup_ready(leg.arrival + pickup_minutes, &leg.destination_id, &leg.flight_id, sh, qty));
            }
        }
    }
    events.sort_by_key(Event::order_key);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Leg;
    use crate::simulation::event::EventKind::*;
    use crate::time::Time;
    use std::sync::Arc;

    fn leg(flight: usize, origin: &str, destination: &str, departure: i64, arrival: i64) -> Leg {
        Leg {
            flight,
            flight_id: Arc::from(format!("{}-{}-{}", origin, destination, departure)),
            origin_id: Arc::from(origin),
            destination_id: Arc::from(destination),
            departure: Time(departure),
            arrival: Time(arrival),
        }
    }

    fn route(resumed: bool, legs: Vec<Leg>) -> Route {
        Route {
            shipment_id: Arc::from("000000007"),
            origin_id: legs[0].origin_id.clone(),
            destination_id: legs[legs.len() - 1].destination_id.clone(),
            resumed,
            legs,
            quantity: 12,
            cost: 1.0,
        }
    }

    #[test]
    fn test_two_leg_route_events() {
        let r = route(false, vec![leg(0, "HUB", "TRN", 600, 700), leg(1, "TRN", "DST", 900, 1000)]);
        let events = build_events(&[r], 60, 120);
        let summary = events
            .iter()
            .map(|e| (e.at.0, e.kind, e.airport_id.as_deref().unwrap_or(""), e.flight_id.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                (540, WaitStart, "HUB", None),
                (600, Load, "HUB", Some("HUB-TRN-600")),
                (700, Arrival, "TRN", Some("HUB-TRN-600")),
                (840, WaitStart, "TRN", Some("HUB-TRN-600")),
                (900, WaitEnd, "TRN", Some("HUB-TRN-600")),
                (900, Load, "TRN", Some("TRN-DST-900")),
                (1000, Arrival, "DST", Some("TRN-DST-900")),
                (1120, PickupReady, "DST", Some("TRN-DST-900")),
            ],
            summary
        );
        assert!(events.iter().all(|e| e.quantity == 12));
    }

    #[test]
    fn test_resumed_route_has_no_origin_wait_start() {
        let r = route(true, vec![leg(3, "TRN", "DST", 900, 1000)]);
        let kinds = build_events(&[r], 60, 120).iter().map(|e| e.kind).collect::<Vec<_>>();
        assert_eq!(vec![WaitEnd, Load, Arrival, PickupReady], kinds);
    }
}
