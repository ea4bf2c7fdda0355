use crate::airport::{Airport, AirportId};
use crate::config::{AcoParams, RouterConfig, SlaPolicy};
use crate::flight::FlightTemplate;
use crate::forecast::OccupancyForecast;
use crate::network::{TimeExpandedNetwork, Window};
use crate::router::{AcoRouter, Assignment, ShipmentRequest};
use crate::shipment::ShipmentId;
use crate::simulation::builder::build_events;
use crate::simulation::event::{Event, EventKind};
use crate::simulation::snapshot::{ShipmentStatus, SnapshotReplayer};
use crate::simulation::store::TimelineStore;
use crate::time::{Period, Time};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ReplanSummary {
    /// Stranded requests found at `now`.
    pub stranded: usize,
    /// Requests that got at least one new route.
    pub replanned: usize,
    /// Units still without a route.
    pub pending: u32,
    pub version: u64,
    pub assignments: Vec<Assignment>,
}

/// Recovers goods left sitting in a warehouse by cancelled legs.
///
/// Everything it needs is derived from the timeline: a fresh network over the
/// replan window with booked seats and cancellations re-applied, and a
/// forecast seeded from the recorded warehouse stays.
pub struct Replanner<'a> {
    store: &'a TimelineStore,
    airports: &'a HashMap<AirportId, Airport>,
    templates: &'a [FlightTemplate],
    params: AcoParams,
    sla: SlaPolicy,
}

impl<'a> Replanner<'a> {
    pub fn new(
        store: &'a TimelineStore,
        airports: &'a HashMap<AirportId, Airport>,
        templates: &'a [FlightTemplate],
        params: AcoParams,
        sla: SlaPolicy,
    ) -> Replanner<'a> {
        Replanner {
            store,
            airports,
            templates,
            params,
            sla,
        }
    }

    /// Goods in a warehouse at `now` that no later event moves on.
    pub fn stranded(&self, events: &Arc<Vec<Event>>, now: Time) -> Vec<ShipmentRequest> {
        let replayer = SnapshotReplayer::new(events.clone());
        let current = replayer.state_at(now);
        let last = replayer.final_state();

        let destinations = events
            .iter()
            .filter(|e| e.kind == EventKind::PickupReady)
            .filter_map(|e| Some((e.shipment_id.clone()?, e.airport_id.clone()?)))
            .collect::<HashMap<ShipmentId, AirportId>>();

        current
            .shipments_with(ShipmentStatus::InWarehouse)
            .flat_map(|(id, state)| state.held.keys().map(move |airport| (id, airport)))
            .filter_map(|(id, airport)| {
                let still_held = last.shipments.get(id)?.held.get(airport).copied()?;
                let destination = destinations.get(id)?;
                (still_held > 0 && destination != airport)
                    .then(|| ShipmentRequest::resume(id.clone(), airport.clone(), destination.clone(), still_held, now))
            })
            .collect()
    }

    pub fn replan_pending(&self, now: Time, period: Period) -> ReplanSummary {
        let events = self.store.events();
        let requests = self.stranded(&events, now);
        let horizon_end = now + self.params.replan_horizon_hours * 60;
        let end = period.end().map_or(horizon_end, |e| e.min(horizon_end));

        if requests.is_empty() || end <= now {
            let version = self.store.version();
            info!(stranded = requests.len(), version, "nothing to replan");
            return ReplanSummary {
                stranded: requests.len(),
                replanned: 0,
                pending: requests.iter().map(|r| r.quantity).sum(),
                version,
                assignments: Vec::new(),
            };
        }

        let mut network = TimeExpandedNetwork::new(self.airports.clone(), self.templates, Window::new(now, end));
        for e in events.iter() {
            match (e.kind, &e.flight_id) {
                (EventKind::Load, Some(f)) => {
                    network.reserve(f, e.quantity);
                }
                (EventKind::Cancellation, Some(f)) => {
                    network.cancel(f);
                }
                _ => {}
            }
        }
        let mut forecast = OccupancyForecast::new(&network);
        forecast.seed_from_events(&events);

        let config = RouterConfig::for_network(&network, self.params.clone(), self.sla.clone());
        let mut router = AcoRouter::new(config);
        let mut assignments = Vec::with_capacity(requests.len());
        for request in &requests {
            debug!(shipment = %request.shipment_id, quantity = request.quantity, "replanning stranded goods");
            assignments.push(router.plan_request(&mut network, &mut forecast, request));
        }
        router.assert_invariants(&network, &assignments);

        let routes = assignments.iter().flat_map(|a| a.routes.iter().cloned()).collect::<Vec<_>>();
        let new_events = build_events(&routes, self.params.dwell_minutes, self.params.pickup_window_minutes);
        let version = if new_events.is_empty() {
            self.store.version()
        } else {
            self.store.append(new_events)
        };

        let summary = ReplanSummary {
            stranded: requests.len(),
            replanned: assignments.iter().filter(|a| !a.routes.is_empty()).count(),
            pending: assignments.iter().map(|a| a.pending).sum(),
            version,
            assignments,
        };
        info!(
            stranded = summary.stranded,
            replanned = summary.replanned,
            pending = summary.pending,
            version,
            "replan done"
        );
        summary
    }
}
