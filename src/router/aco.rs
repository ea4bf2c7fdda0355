use crate::airport::AirportId;
use crate::config::RouterConfig;
use crate::flight::{FlightIdx, FlightInstance, InstanceId};
use crate::forecast::OccupancyForecast;
use crate::network::TimeExpandedNetwork;
use crate::router::heuristic::{EstimateCache, LegCost, sla_risk};
use crate::router::pheromone::PheromoneTable;
use crate::shipment::{Shipment, ShipmentId};
use crate::time::Time;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub flight: FlightIdx,
    pub flight_id: InstanceId,
    pub origin_id: AirportId,
    pub destination_id: AirportId,
    pub departure: Time,
    pub arrival: Time,
}

impl Leg {
    fn of(flight: FlightIdx, f: &FlightInstance) -> Leg {
        Leg {
            flight,
            flight_id: f.id.clone(),
            origin_id: f.origin_id.clone(),
            destination_id: f.destination_id.clone(),
            departure: f.departure_time,
            arrival: f.arrival_time,
        }
    }
}

/// One quantity of one shipment riding a sequence of legs.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub shipment_id: ShipmentId,
    pub origin_id: AirportId,
    pub destination_id: AirportId,
    /// The goods already sit at the origin instead of being supplied by a hub.
    pub resumed: bool,
    pub legs: Vec<Leg>,
    pub quantity: u32,
    pub cost: f64,
}

impl Route {
    pub fn departure(&self) -> Option<Time> {
        self.legs.first().map(|l| l.departure)
    }

    pub fn arrival(&self) -> Option<Time> {
        self.legs.last().map(|l| l.arrival)
    }

    /// `SKBO>SPIM>EBCI`
    pub fn itinerary(&self) -> String {
        let mut stops = vec![&*self.origin_id];
        stops.extend(self.legs.iter().map(|l| &*l.destination_id));
        stops.join(">")
    }

    /// Books every warehouse stay of `quantity` units: each connection from
    /// arrival to onward departure, then the pickup window at the destination.
    pub fn book_backlog(&self, forecast: &mut OccupancyForecast, quantity: u32, pickup_minutes: i64) {
        for pair in self.legs.windows(2) {
            forecast.increase_backlog(&pair[1].origin_id, pair[0].arrival, pair[1].departure, quantity);
        }
        if let Some(last) = self.legs.last() {
            forecast.increase_backlog(&self.destination_id, last.arrival, last.arrival + pickup_minutes, quantity);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Any infinite-source hub may supply the goods.
    Hubs,
    /// Goods wait at this airport already.
    At(AirportId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentRequest {
    pub shipment_id: ShipmentId,
    pub destination_id: AirportId,
    pub quantity: u32,
    pub requested_at: Time,
    pub origin: Origin,
}

impl ShipmentRequest {
    pub fn fresh(shipment: &Shipment) -> ShipmentRequest {
        ShipmentRequest {
            shipment_id: shipment.id.clone(),
            destination_id: shipment.destination_id.clone(),
            quantity: shipment.quantity,
            requested_at: shipment.requested_at,
            origin: Origin::Hubs,
        }
    }

    pub fn resume(shipment_id: ShipmentId, at: AirportId, destination_id: AirportId, quantity: u32, now: Time) -> ShipmentRequest {
        ShipmentRequest {
            shipment_id,
            destination_id,
            quantity,
            requested_at: now,
            origin: Origin::At(at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollapseSignal {
    AircraftFull { flight: InstanceId, at: Time },
    WarehouseFull { airport: AirportId, at: Time },
    Unserviced { shipment: ShipmentId, pending: u32 },
}

impl Display for CollapseSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CollapseSignal::AircraftFull { flight, at } => write!(f, "aircraft full: {} at {}", flight, at),
            CollapseSignal::WarehouseFull { airport, at } => write!(f, "warehouse full: {} at {}", airport, at),
            CollapseSignal::Unserviced { shipment, pending } => write!(f, "unserviced: {} ({} pending)", shipment, pending),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// The committed route with its quantity cut to the bottleneck, if anything fit.
    pub route: Option<Route>,
    pub signals: Vec<CollapseSignal>,
}

/// Result of planning one shipment request.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub shipment_id: ShipmentId,
    pub destination_id: AirportId,
    pub requested_at: Time,
    pub requested: u32,
    pub routes: Vec<Route>,
    pub assigned: u32,
    pub pending: u32,
    pub signals: Vec<CollapseSignal>,
}

impl Assignment {
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    pub fn is_unassigned(&self) -> bool {
        self.assigned == 0
    }
}

/// Where an ant stands when it scores its next leg.
#[derive(Debug, Clone, PartialEq)]
pub struct LegContext {
    pub destination: AirportId,
    pub current: Time,
    pub deadline: Time,
    pub quantity: u32,
    pub hops_left: usize,
}

struct Search<'a> {
    shipment_id: &'a ShipmentId,
    origin: AirportId,
    destination: &'a AirportId,
    ready: Time,
    deadline: Time,
    resumed: bool,
    need: u32,
}

pub struct AcoRouter {
    config: RouterConfig,
    pheromone: PheromoneTable,
    estimates: EstimateCache,
    rng: ChaCha8Rng,
}

impl AcoRouter {
    pub fn new(config: RouterConfig) -> AcoRouter {
        let pheromone = PheromoneTable::new(config.params.pheromone_init, config.params.pheromone_floor);
        let rng = ChaCha8Rng::seed_from_u64(config.params.seed);
        AcoRouter {
            config,
            pheromone,
            estimates: EstimateCache::new(),
            rng,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn pheromone(&self) -> &PheromoneTable {
        &self.pheromone
    }

    /// Must be called whenever instances of the network get cancelled.
    pub fn invalidate_estimates(&mut self) {
        self.estimates.clear();
    }

    /// Plans a batch in request order; each commit is visible to the next shipment.
    pub fn plan(
        &mut self,
        network: &mut TimeExpandedNetwork,
        forecast: &mut OccupancyForecast,
        shipments: &[Shipment],
    ) -> Vec<Assignment> {
        let mut ordered = shipments.iter().collect::<Vec<_>>();
        ordered.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then_with(|| a.id.cmp(&b.id)));

        let mut assignments = Vec::with_capacity(ordered.len());
        for shipment in ordered {
            assignments.push(self.plan_request(network, forecast, &ShipmentRequest::fresh(shipment)));
        }

        info!(
            shipments = assignments.len(),
            complete = assignments.iter().filter(|a| a.is_complete()).count(),
            unassigned = assignments.iter().filter(|a| a.is_unassigned()).count(),
            "planning pass done"
        );
        self.assert_invariants(network, &assignments);
        assignments
    }

    /// Searches and commits routes for one request until it is fully assigned,
    /// the attempt budget runs out, or no further route exists.
    pub fn plan_request(
        &mut self,
        network: &mut TimeExpandedNetwork,
        forecast: &mut OccupancyForecast,
        request: &ShipmentRequest,
    ) -> Assignment {
        let params = &self.config.params;
        let (ants, iterations) = (params.ants, params.iterations);
        let (alternate_ants, alternate_iterations) = (params.alternate_ants, params.alternate_iterations);
        let attempts = params.max_route_attempts;

        let mut outstanding = request.quantity;
        let mut routes = Vec::new();
        let mut signals = Vec::new();

        for attempt in 0..attempts {
            if outstanding == 0 {
                break;
            }
            let effort = if attempt == 0 {
                (ants, iterations)
            } else {
                (alternate_ants, alternate_iterations)
            };
            let Some(mut candidate) = self.search(network, forecast, request, outstanding, effort) else {
                break;
            };
            candidate.quantity = outstanding;
            let outcome = self.commit(network, forecast, candidate);
            signals.extend(outcome.signals);
            let Some(route) = outcome.route else {
                break;
            };
            outstanding -= route.quantity;
            routes.push(route);
        }

        if outstanding > 0 {
            signals.push(CollapseSignal::Unserviced {
                shipment: request.shipment_id.clone(),
                pending: outstanding,
            });
        }

        let assignment = Assignment {
            shipment_id: request.shipment_id.clone(),
            destination_id: request.destination_id.clone(),
            requested_at: request.requested_at,
            requested: request.quantity,
            assigned: request.quantity - outstanding,
            pending: outstanding,
            routes,
            signals,
        };
        debug!(
            shipment = %assignment.shipment_id,
            destination = %assignment.destination_id,
            assigned = assignment.assigned,
            pending = assignment.pending,
            routes = assignment.routes.len(),
            "shipment planned"
        );
        assignment
    }

    /// Best route for the whole request quantity, without committing it.
    /// The pheromone the colony lays while searching is rolled back, so only
    /// `commit` leaves a trace on later searches.
    pub fn route(
        &mut self,
        network: &TimeExpandedNetwork,
        forecast: &OccupancyForecast,
        request: &ShipmentRequest,
    ) -> Option<Route> {
        let effort = (self.config.params.ants, self.config.params.iterations);
        let pheromone = self.pheromone.clone();
        let route = self.search(network, forecast, request, request.quantity, effort);
        self.pheromone = pheromone;
        route
    }

    fn search(
        &mut self,
        network: &TimeExpandedNetwork,
        forecast: &OccupancyForecast,
        request: &ShipmentRequest,
        outstanding: u32,
        (ants, iterations): (usize, usize),
    ) -> Option<Route> {
        if outstanding == 0 {
            return None;
        }
        let Some(destination) = network.airport(&request.destination_id) else {
            warn!(shipment = %request.shipment_id, destination = %request.destination_id, "unknown destination");
            return None;
        };
        let (origins, resumed) = match &request.origin {
            Origin::Hubs => (
                self.config
                    .hubs
                    .iter()
                    .filter(|h| **h != request.destination_id)
                    .cloned()
                    .collect::<Vec<_>>(),
                false,
            ),
            Origin::At(airport) => (vec![airport.clone()], true),
        };
        let ready = if resumed {
            request.requested_at
        } else {
            request.requested_at + self.config.params.dwell_minutes
        };

        // the whole quantity first, then whatever fits
        let needs = if outstanding > 1 { vec![outstanding, 1] } else { vec![outstanding] };
        for need in needs {
            let mut best: Option<Route> = None;
            for origin in &origins {
                let Some(origin_airport) = network.airport(origin) else {
                    continue;
                };
                let search = Search {
                    shipment_id: &request.shipment_id,
                    origin: origin.clone(),
                    destination: &request.destination_id,
                    ready,
                    deadline: self.config.sla.deadline(request.requested_at, origin_airport, destination),
                    resumed,
                    need,
                };
                if let Some(route) = self.colony(network, forecast, &search, ants, iterations) {
                    if best.as_ref().is_none_or(|b| route.cost < b.cost) {
                        best = Some(route);
                    }
                }
            }
            if best.is_some() {
                return best;
            }
        }
        None
    }

    fn colony(
        &mut self,
        network: &TimeExpandedNetwork,
        forecast: &OccupancyForecast,
        search: &Search,
        ants: usize,
        iterations: usize,
    ) -> Option<Route> {
        let rho = self.config.params.rho;
        let mut best: Option<Route> = None;
        for _ in 0..iterations {
            let mut iteration_best: Option<Route> = None;
            for _ in 0..ants {
                if let Some(route) = self.construct(network, forecast, search) {
                    if iteration_best.as_ref().is_none_or(|b| route.cost < b.cost) {
                        iteration_best = Some(route);
                    }
                }
            }
            self.pheromone.evaporate(rho);
            if let Some(route) = iteration_best {
                self.reinforce(&route, search.need);
                if best.as_ref().is_none_or(|b| route.cost < b.cost) {
                    best = Some(route);
                }
            }
        }
        best
    }

    /// A single ant. Returns `None` when it gets stuck or runs out of hops.
    fn construct(&mut self, network: &TimeExpandedNetwork, forecast: &OccupancyForecast, search: &Search) -> Option<Route> {
        let params = &self.config.params;
        let (max_hops, alpha, beta, dwell) = (params.max_hops, params.alpha, params.beta, params.dwell_minutes);

        let mut airport = search.origin.clone();
        let mut t = search.ready;
        let mut visited = HashSet::from([airport.clone()]);
        let mut legs = Vec::new();
        let mut cost = 0.0;

        for hop in 0..max_hops {
            let ctx = LegContext {
                destination: search.destination.clone(),
                current: t,
                deadline: search.deadline,
                quantity: search.need,
                hops_left: max_hops - hop,
            };
            let candidates = self.candidates(network, forecast, &airport, &visited, &ctx);
            if candidates.is_empty() {
                return None;
            }

            let weights = candidates
                .iter()
                .map(|(idx, c)| {
                    self.pheromone.get(&network.instance(*idx).id).powf(alpha) * c.desirability().powf(beta)
                })
                .collect::<Vec<_>>();
            let first = self.roulette(&weights);
            // the drawn leg, then the rest by increasing cost
            let (idx, leg_cost) = std::iter::once(first)
                .chain((0..candidates.len()).filter(|i| *i != first))
                .map(|i| candidates[i])
                .find(|(idx, _)| self.admits(network, forecast, *idx, search))?;

            let f = network.instance(idx);
            legs.push(Leg::of(idx, f));
            cost += leg_cost.total();

            if f.destination_id == *search.destination {
                return Some(Route {
                    shipment_id: search.shipment_id.clone(),
                    origin_id: search.origin.clone(),
                    destination_id: search.destination.clone(),
                    resumed: search.resumed,
                    legs,
                    quantity: search.need,
                    cost,
                });
            }
            airport = f.destination_id.clone();
            visited.insert(airport.clone());
            t = f.arrival_time + dwell;
        }
        None
    }

    /// Top-K feasible legs out of `airport`, cheapest first. Only the earliest
    /// feasible departure towards each neighbour is considered.
    fn candidates(
        &mut self,
        network: &TimeExpandedNetwork,
        forecast: &OccupancyForecast,
        airport: &AirportId,
        visited: &HashSet<AirportId>,
        ctx: &LegContext,
    ) -> Vec<(FlightIdx, LegCost)> {
        let params = &self.config.params;
        let (reserve, pickup, dwell, k) = (
            params.reserve_transit_ratio,
            params.pickup_window_minutes,
            params.dwell_minutes,
            params.candidate_k,
        );

        let mut neighbours = HashSet::new();
        let feasible = network
            .departing_after(airport, ctx.current)
            .iter()
            .copied()
            .take_while(|idx| network.instance(*idx).departure_time <= ctx.deadline)
            .filter(|idx| {
                let f = network.instance(*idx);
                let slack = if f.destination_id == ctx.destination { pickup } else { dwell };
                !f.is_cancelled()
                    && f.usable(reserve) >= ctx.quantity
                    && !visited.contains(&f.destination_id)
                    && f.arrival_time + slack <= ctx.deadline
            })
            .filter(|idx| neighbours.insert(network.instance(*idx).destination_id.clone()))
            .collect::<Vec<_>>();

        let mut scored = feasible
            .into_iter()
            .filter_map(|idx| self.evaluate_leg(network, forecast, idx, ctx).map(|c| (idx, c)))
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| a.1.total().total_cmp(&b.1.total()).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k.max(1));
        scored
    }

    /// Weighted heuristic cost of taking `idx` from the ant's position, or
    /// `None` if the destination cannot be reached from the leg's end within
    /// the remaining hops.
    pub fn evaluate_leg(
        &mut self,
        network: &TimeExpandedNetwork,
        forecast: &OccupancyForecast,
        idx: FlightIdx,
        ctx: &LegContext,
    ) -> Option<LegCost> {
        let p = &self.config.params;
        let f = network.instance(idx);
        let eta_ref = (p.eta_ref_hours * 60.0).max(1.0);
        let wait_ref = (p.wait_ref_hours * 60.0).max(1.0);
        let is_final = f.destination_id == ctx.destination;

        let estimate = if is_final {
            f.arrival_time
        } else if ctx.hops_left <= 1 {
            return None;
        } else {
            self.estimates.fastest_arrival(
                network,
                &f.destination_id,
                &ctx.destination,
                f.arrival_time + p.dwell_minutes,
                ctx.hops_left - 1,
                ctx.deadline + p.eta_ref_hours as i64 * 60,
                p.dwell_minutes,
            )?
        };

        let wait = if is_final {
            0.0
        } else {
            network
                .departing_after(&f.destination_id, f.arrival_time + p.dwell_minutes)
                .iter()
                .map(|i| network.instance(*i))
                .find(|n| !n.is_cancelled())
                .map(|n| (n.departure_time - f.arrival_time) as f64)
                .unwrap_or(wait_ref)
        };

        let utilization = forecast.utilization(&f.destination_id, f.arrival_time, ctx.quantity);
        Some(LegCost {
            time: p.w_time * (f.arrival_time - ctx.current) as f64 / eta_ref,
            wait: p.w_wait * wait / wait_ref,
            sla: p.w_sla * sla_risk(estimate, p.pickup_window_minutes, ctx.deadline, p.eta_ref_hours),
            congestion: p.w_cong * p.congestion_penalty(utilization),
            hops: p.w_hops,
        })
    }

    /// Final destinations need room for the pickup window; transit
    /// warehouses must pass the headroom gate.
    fn admits(&self, network: &TimeExpandedNetwork, forecast: &OccupancyForecast, idx: FlightIdx, search: &Search) -> bool {
        let p = &self.config.params;
        let f = network.instance(idx);
        if f.destination_id == *search.destination {
            forecast.room(&f.destination_id, f.arrival_time, f.arrival_time + p.pickup_window_minutes) >= search.need
        } else {
            forecast.admission_check(&f.destination_id, f.arrival_time, search.need, p.headroom_horizon_hours)
        }
    }

    fn roulette(&mut self, weights: &[f64]) -> usize {
        let total = weights.iter().sum::<f64>();
        if !(total > 0.0 && total.is_finite()) {
            return self.rng.random_range(0..weights.len());
        }
        let mut r = self.rng.random::<f64>() * total;
        for (i, w) in weights.iter().enumerate() {
            if r < *w {
                return i;
            }
            r -= w;
        }
        weights.len() - 1
    }

    fn reinforce(&mut self, route: &Route, quantity: u32) {
        let amount = self.config.params.deposit_q * quantity as f64 / (1.0 + route.cost.max(0.0));
        route.legs.iter().for_each(|l| self.pheromone.deposit(&l.flight_id, amount));
    }

    /// Books the route: seats on every leg, backlog at every warehouse it
    /// waits in, pheromone on its legs. The quantity is cut to the smallest
    /// remaining seat count, to the destination's room over the pickup window
    /// and to what each connecting warehouse admits.
    pub fn commit(
        &mut self,
        network: &mut TimeExpandedNetwork,
        forecast: &mut OccupancyForecast,
        mut route: Route,
    ) -> CommitOutcome {
        let pickup = self.config.params.pickup_window_minutes;
        let mut signals = Vec::new();
        let Some(last) = route.legs.last().cloned() else {
            return CommitOutcome { route: None, signals };
        };

        let seats = route
            .legs
            .iter()
            .map(|l| network.instance(l.flight))
            .map(|f| if f.is_cancelled() { 0 } else { f.remaining() })
            .min()
            .unwrap_or(0);
        let room = forecast.room(&route.destination_id, last.arrival, last.arrival + pickup);
        if room < route.quantity {
            signals.push(CollapseSignal::WarehouseFull {
                airport: route.destination_id.clone(),
                at: last.arrival,
            });
        }
        let mut quantity = route.quantity.min(seats).min(room);

        // the search may have gated connections for a single unit only
        let horizon = self.config.params.headroom_horizon_hours;
        for pair in route.legs.windows(2) {
            let (inbound, onward) = (&pair[0], &pair[1]);
            let fits = forecast.transit_room(&onward.origin_id, inbound.arrival, onward.departure, quantity, horizon);
            if fits < quantity {
                signals.push(CollapseSignal::WarehouseFull {
                    airport: onward.origin_id.clone(),
                    at: inbound.arrival,
                });
                quantity = fits;
            }
        }

        if quantity > 0 {
            for leg in &route.legs {
                let taken = network.instance_mut(leg.flight).consume(quantity);
                debug_assert_eq!(quantity, taken, "committed more than the remaining seats");
            }
            route.book_backlog(forecast, quantity, pickup);
            self.reinforce(&route, quantity);
        }

        signals.extend(
            route
                .legs
                .iter()
                .filter(|l| network.instance(l.flight).remaining() == 0)
                .map(|l| CollapseSignal::AircraftFull {
                    flight: l.flight_id.clone(),
                    at: l.departure,
                }),
        );
        signals.iter().for_each(|s| debug!(shipment = %route.shipment_id, "{}", s));

        if quantity == 0 {
            return CommitOutcome { route: None, signals };
        }
        route.quantity = quantity;
        debug!(
            shipment = %route.shipment_id,
            itinerary = %route.itinerary(),
            quantity,
            cost = route.cost,
            "route committed"
        );
        CommitOutcome {
            route: Some(route),
            signals,
        }
    }

    pub fn assert_invariants(&self, network: &TimeExpandedNetwork, assignments: &[Assignment]) {
        debug_assert!(
            assignments.iter().all(|a| a.assigned + a.pending == a.requested),
            "assigned + pending == requested invariant violated"
        );
        debug_assert!(
            assignments
                .iter()
                .all(|a| a.routes.iter().map(|r| r.quantity).sum::<u32>() == a.assigned),
            "route quantities <-> assigned invariant violated"
        );
        debug_assert!(
            network.instances().iter().all(|f| f.remaining() <= f.capacity),
            "remaining <= capacity invariant violated"
        );
        let dwell = self.config.params.dwell_minutes;
        debug_assert!(
            assignments.iter().flat_map(|a| a.routes.iter()).all(|r| {
                r.legs.windows(2).all(|l| {
                    l[0].destination_id == l[1].origin_id && l[1].departure >= l[0].arrival + dwell
                })
            }),
            "leg continuity invariant violated"
        );
    }
}
