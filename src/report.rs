use crate::router::Assignment;
use crate::simulation::{Event, Snapshot};
use tabled::Tabled;

/// One committed route, or one line for a shipment nothing could be routed for.
#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct AssignmentRow {
    pub shipment: String,
    pub requested: String,
    pub origin: String,
    pub destination: String,
    pub itinerary: String,
    pub hops: usize,
    pub assigned: u32,
    /// Units still pending once this route is counted.
    pub pending: u32,
    #[tabled(rename = "transit h")]
    pub transit_hours: String,
}

pub fn rows(assignments: &[Assignment]) -> Vec<AssignmentRow> {
    assignments.iter().flat_map(assignment_rows).collect()
}

fn assignment_rows(a: &Assignment) -> Vec<AssignmentRow> {
    if a.routes.is_empty() {
        return vec![AssignmentRow {
            shipment: a.shipment_id.to_string(),
            requested: a.requested_at.to_string(),
            origin: "-".to_string(),
            destination: a.destination_id.to_string(),
            itinerary: "-".to_string(),
            hops: 0,
            assigned: 0,
            pending: a.pending,
            transit_hours: "-".to_string(),
        }];
    }

    let mut outstanding = a.requested;
    a.routes
        .iter()
        .map(|r| {
            outstanding = outstanding.saturating_sub(r.quantity);
            AssignmentRow {
                shipment: a.shipment_id.to_string(),
                requested: a.requested_at.to_string(),
                origin: r.origin_id.to_string(),
                destination: r.destination_id.to_string(),
                itinerary: r.itinerary(),
                hops: r.legs.len(),
                assigned: r.quantity,
                pending: outstanding,
                transit_hours: r
                    .arrival()
                    .map_or("-".to_string(), |t| format!("{:.2}", a.requested_at.hours_until(t))),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct EventRow {
    pub at: String,
    pub kind: String,
    pub airport: String,
    pub flight: String,
    pub shipment: String,
    pub quantity: u32,
}

impl From<&Event> for EventRow {
    fn from(e: &Event) -> Self {
        let or_dash = |v: Option<&str>| v.unwrap_or("-").to_string();
        EventRow {
            at: e.at.to_string(),
            kind: e.kind.to_string(),
            airport: or_dash(e.airport_id.as_deref()),
            flight: or_dash(e.flight_id.as_deref()),
            shipment: or_dash(e.shipment_id.as_deref()),
            quantity: e.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct ShipmentRow {
    pub shipment: String,
    pub status: String,
    pub location: String,
    pub held: u32,
    pub airborne: u32,
    pub ready: u32,
}

pub fn shipment_rows(snapshot: &Snapshot) -> Vec<ShipmentRow> {
    snapshot
        .shipments
        .iter()
        .map(|(id, s)| ShipmentRow {
            shipment: id.to_string(),
            status: s.status.to_string(),
            location: s.location.as_deref().unwrap_or("-").to_string(),
            held: s.held_total(),
            airborne: s.airborne.values().sum(),
            ready: s.ready,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct LoadRow {
    pub id: String,
    pub load: u32,
}

/// Non-empty warehouses and flights of a snapshot.
pub fn load_rows(snapshot: &Snapshot) -> (Vec<LoadRow>, Vec<LoadRow>) {
    let to_rows = |m: &std::collections::BTreeMap<std::sync::Arc<str>, u32>| {
        m.iter()
            .map(|(id, load)| LoadRow {
                id: id.to_string(),
                load: *load,
            })
            .collect::<Vec<_>>()
    };
    (to_rows(&snapshot.warehouses), to_rows(&snapshot.flights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Leg, Route};
    use crate::time::Time;
    use std::sync::Arc;

    fn route(quantity: u32, hops: &[(&str, &str, &str, &str)]) -> Route {
        let legs = hops
            .iter()
            .enumerate()
            .map(|(i, (o, d, dep, arr))| Leg {
                flight: i,
                flight_id: Arc::from(format!("{}-{}", o, d)),
                origin_id: Arc::from(*o),
                destination_id: Arc::from(*d),
                departure: dep.parse().unwrap(),
                arrival: arr.parse().unwrap(),
            })
            .collect::<Vec<_>>();
        Route {
            shipment_id: Arc::from("000000001"),
            origin_id: legs[0].origin_id.clone(),
            destination_id: legs[legs.len() - 1].destination_id.clone(),
            resumed: false,
            legs,
            quantity,
            cost: 1.0,
        }
    }

    fn assignment(routes: Vec<Route>, requested: u32) -> Assignment {
        let assigned = routes.iter().map(|r| r.quantity).sum::<u32>();
        Assignment {
            shipment_id: Arc::from("000000001"),
            destination_id: Arc::from("SEQM"),
            requested_at: "2025-01-02T01:00".parse::<Time>().unwrap(),
            requested,
            routes,
            assigned,
            pending: requested - assigned,
            signals: Vec::new(),
        }
    }

    #[test]
    fn test_rows_per_route() {
        let a = assignment(
            vec![
                route(100, &[("SKBO", "SPIM", "2025-01-02T03:00", "2025-01-02T06:00"), ("SPIM", "SEQM", "2025-01-02T08:00", "2025-01-02T10:30")]),
                route(30, &[("SKBO", "SEQM", "2025-01-03T03:00", "2025-01-03T05:00")]),
            ],
            150,
        );
        let rows = rows(&[a]);
        assert_eq!(2, rows.len());
        assert_eq!("SKBO>SPIM>SEQM", rows[0].itinerary);
        assert_eq!((2, 100, 50), (rows[0].hops, rows[0].assigned, rows[0].pending));
        assert_eq!("9.50", rows[0].transit_hours);
        assert_eq!((30, 20), (rows[1].assigned, rows[1].pending));
        assert_eq!("28.00", rows[1].transit_hours);
    }

    #[test]
    fn test_unassigned_row() {
        let rows = rows(&[assignment(Vec::new(), 40)]);
        assert_eq!(1, rows.len());
        assert_eq!(("-", 0, 40), (rows[0].itinerary.as_str(), rows[0].assigned, rows[0].pending));
    }
}
