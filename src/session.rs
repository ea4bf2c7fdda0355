use crate::airport::{Airport, AirportId};
use crate::config::{AcoParams, RouterConfig, SlaPolicy};
use crate::error::ScenarioError;
use crate::flight::FlightTemplate;
use crate::forecast::OccupancyForecast;
use crate::network::{TimeExpandedNetwork, Window};
use crate::router::{AcoRouter, Assignment};
use crate::scenario::Scenario;
use crate::shipment::{Shipment, ShipmentId};
use crate::simulation::{
    CancellationProcessor, CancellationRecord, CancellationSummary, Event, ReplanSummary, Replanner, Snapshot,
    SnapshotReplayer, TimelineStore, build_events,
};
use crate::time::{Period, Time};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// Outcome of the last operation that changed the timeline.
pub enum SessionReport {
    Planned { shipments: usize, assigned: u32, pending: u32, version: u64 },
    Cancelled(CancellationSummary),
    Replanned(ReplanSummary),
}

/// One planning period: the live network and forecast the router commits
/// into, plus the shared timeline every later query replays.
pub struct PlanningSession {
    pub period: Period,
    pub airports: HashMap<AirportId, Airport>,
    pub templates: Vec<FlightTemplate>,
    pub shipments: Vec<Shipment>,
    pub sla: SlaPolicy,
    network: TimeExpandedNetwork,
    forecast: OccupancyForecast,
    router: AcoRouter,
    timeline: Arc<TimelineStore>,
    assignments: Vec<Assignment>,
    planned: HashSet<ShipmentId>,
    pub last_report: Option<SessionReport>,
}

impl PlanningSession {
    pub fn new(
        period: Period,
        airports: HashMap<AirportId, Airport>,
        templates: Vec<FlightTemplate>,
        shipments: Vec<Shipment>,
        params: AcoParams,
        sla: SlaPolicy,
    ) -> Result<PlanningSession, ScenarioError> {
        let (Some(start), Some(end)) = (period.start(), period.end()) else {
            return Err(ScenarioError::InvalidPeriod {
                year: period.year,
                month: period.month,
            });
        };
        if airports.is_empty() {
            return Err(ScenarioError::NoAirports);
        }
        let network = TimeExpandedNetwork::new(airports.clone(), &templates, Window::new(start, end));
        let forecast = OccupancyForecast::new(&network);
        let router = AcoRouter::new(RouterConfig::for_network(&network, params, sla.clone()));
        Ok(PlanningSession {
            period,
            airports,
            templates,
            shipments,
            sla,
            network,
            forecast,
            router,
            timeline: Arc::new(TimelineStore::new()),
            assignments: Vec::new(),
            planned: HashSet::new(),
            last_report: None,
        })
    }

    pub fn from_scenario(scenario: Scenario) -> Result<PlanningSession, ScenarioError> {
        PlanningSession::new(
            scenario.period,
            scenario.airports,
            scenario.templates,
            scenario.shipments,
            scenario.params,
            scenario.sla,
        )
    }

    pub fn params(&self) -> &AcoParams {
        &self.router.config().params
    }

    pub fn network(&self) -> &TimeExpandedNetwork {
        &self.network
    }

    pub fn forecast(&self) -> &OccupancyForecast {
        &self.forecast
    }

    pub fn router(&self) -> &AcoRouter {
        &self.router
    }

    pub fn timeline(&self) -> Arc<TimelineStore> {
        self.timeline.clone()
    }

    /// Initial plans followed by every replan, in the order they were made.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    /// Routes every shipment not planned yet and records the resulting
    /// events in the timeline.
    pub fn plan(&mut self) -> &[Assignment] {
        let pending = self
            .shipments
            .iter()
            .filter(|s| !self.planned.contains(&s.id))
            .cloned()
            .collect::<Vec<_>>();
        let first = self.assignments.len();
        let assignments = self.router.plan(&mut self.network, &mut self.forecast, &pending);
        self.planned.extend(pending.iter().map(|s| s.id.clone()));

        let routes = assignments.iter().flat_map(|a| a.routes.iter().cloned()).collect::<Vec<_>>();
        let params = self.params();
        let events = build_events(&routes, params.dwell_minutes, params.pickup_window_minutes);
        let version = if self.timeline.is_empty() {
            self.timeline.load(events)
        } else {
            self.timeline.append(events)
        };

        let assigned = assignments.iter().map(|a| a.assigned).sum();
        let pending_units = assignments.iter().map(|a| a.pending).sum();
        info!(
            shipments = assignments.len(),
            assigned,
            pending = pending_units,
            version,
            "plan recorded"
        );
        self.last_report = Some(SessionReport::Planned {
            shipments: assignments.len(),
            assigned,
            pending: pending_units,
            version,
        });
        self.assignments.extend(assignments);
        &self.assignments[first..]
    }

    /// Records the cancellations and closes the matching live instances so
    /// later plans avoid them.
    pub fn apply_cancellations(&mut self, records: &[CancellationRecord]) -> CancellationSummary {
        let summary = CancellationProcessor::new(&self.timeline, &self.airports, &self.templates, self.period).apply(records);
        for id in &summary.cancelled {
            self.network.cancel(id);
        }
        if !summary.cancelled.is_empty() {
            self.router.invalidate_estimates();
        }
        self.last_report = Some(SessionReport::Cancelled(summary.clone()));
        summary
    }

    /// Reroutes goods stranded at `now`, then books the new legs into the
    /// live network and their warehouse stays into the live forecast.
    pub fn replan_pending(&mut self, now: Time) -> ReplanSummary {
        let summary = Replanner::new(
            &self.timeline,
            &self.airports,
            &self.templates,
            self.params().clone(),
            self.sla.clone(),
        )
        .replan_pending(now, self.period);

        let pickup = self.params().pickup_window_minutes;
        for route in summary.assignments.iter().flat_map(|a| &a.routes) {
            for leg in &route.legs {
                self.network.reserve(&leg.flight_id, route.quantity);
            }
            route.book_backlog(&mut self.forecast, route.quantity, pickup);
            // resumed goods keep waiting at their origin until the new departure
            if let (true, Some(departure)) = (route.resumed, route.departure()) {
                self.forecast.increase_backlog(&route.origin_id, now, departure, route.quantity);
            }
        }
        if !summary.assignments.is_empty() {
            self.router.invalidate_estimates();
            self.assignments.extend(summary.assignments.iter().cloned());
        }
        self.last_report = Some(SessionReport::Replanned(summary.clone()));
        summary
    }

    pub fn state_at(&self, at: Time) -> Snapshot {
        SnapshotReplayer::new(self.timeline.events()).state_at(at)
    }

    /// Events with `from <= at < to`.
    pub fn events_between(&self, from: Time, to: Time) -> Vec<Event> {
        self.timeline.events_between(from, to)
    }
}
