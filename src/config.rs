use crate::airport::{Airport, AirportId};
use crate::network::TimeExpandedNetwork;
use crate::time::Time;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Search-effort presets (ants x iterations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Quick,
    Balanced,
    Thorough,
}

/// Tunables of the colony search, the heuristic and the operational policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcoParams {
    pub alpha: f64,
    pub beta: f64,
    /// Evaporation rate in `(0, 1)`.
    pub rho: f64,
    pub pheromone_init: f64,
    /// Pheromone never decays below this, so no edge is locked out for good.
    pub pheromone_floor: f64,
    /// Deposit scale: `deposit_q * quantity / (1 + cost)`.
    pub deposit_q: f64,
    pub ants: usize,
    pub iterations: usize,
    /// Candidate list size per construction step.
    pub candidate_k: usize,
    pub max_hops: usize,

    pub w_time: f64,
    pub w_wait: f64,
    pub w_sla: f64,
    pub w_cong: f64,
    pub w_hops: f64,

    /// Warehouse utilisation above which congestion is penalised.
    pub congestion_threshold: f64,
    pub congestion_gamma: f64,
    pub headroom_horizon_hours: u32,

    /// Minimum stay in a warehouse before loading.
    pub dwell_minutes: i64,
    /// Share of every flight's nominal capacity hidden from the search.
    pub reserve_transit_ratio: f64,
    pub eta_ref_hours: f64,
    pub wait_ref_hours: f64,
    /// Time after the final arrival until the goods are ready for pickup.
    pub pickup_window_minutes: i64,

    /// Routes committed for one shipment at most, the first one included.
    pub max_route_attempts: usize,
    /// Search effort for the leftover quantity after a partial commit.
    pub alternate_ants: usize,
    pub alternate_iterations: usize,

    /// Length of the fresh window a replan plans over.
    pub replan_horizon_hours: i64,
    pub seed: u64,
}

impl Default for AcoParams {
    fn default() -> Self {
        AcoParams {
            alpha: 0.8,
            beta: 3.5,
            rho: 0.35,
            pheromone_init: 1.0,
            pheromone_floor: 1e-6,
            deposit_q: 0.05,
            ants: 20,
            iterations: 30,
            candidate_k: 3,
            max_hops: 3,
            w_time: 1.0,
            w_wait: 1.0,
            w_sla: 2.0,
            w_cong: 3.0,
            w_hops: 0.3,
            congestion_threshold: 0.60,
            congestion_gamma: 8.0,
            headroom_horizon_hours: 6,
            dwell_minutes: 60,
            reserve_transit_ratio: 0.15,
            eta_ref_hours: 24.0,
            wait_ref_hours: 6.0,
            pickup_window_minutes: 120,
            max_route_attempts: 3,
            alternate_ants: 15,
            alternate_iterations: 5,
            replan_horizon_hours: 72,
            seed: 7,
        }
    }
}

impl AcoParams {
    pub fn profile(profile: Profile) -> AcoParams {
        AcoParams::default().with_profile(profile)
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        let (ants, iterations) = match profile {
            Profile::Quick => (3, 1),
            Profile::Balanced => (20, 30),
            Profile::Thorough => (50, 100),
        };
        self.ants = ants;
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_congestion(mut self, threshold: f64, gamma: f64) -> Self {
        self.congestion_threshold = threshold;
        self.congestion_gamma = gamma;
        self
    }

    pub fn with_max_hops(mut self, hops: usize) -> Self {
        self.max_hops = hops;
        self
    }

    /// Zero below the threshold, `gamma * (u - threshold)^2` above it.
    pub fn congestion_penalty(&self, utilization: f64) -> f64 {
        if utilization <= self.congestion_threshold {
            return 0.0;
        }
        let d = utilization - self.congestion_threshold;
        self.congestion_gamma * d * d
    }
}

/// Delivery deadlines by origin/destination relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaPolicy {
    pub same_continent_hours: i64,
    pub cross_continent_hours: i64,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        SlaPolicy {
            same_continent_hours: 48,
            cross_continent_hours: 72,
        }
    }
}

impl SlaPolicy {
    pub fn deadline_hours(&self, origin: &Airport, destination: &Airport) -> i64 {
        if origin.same_continent(destination) {
            self.same_continent_hours
        } else {
            self.cross_continent_hours
        }
    }

    pub fn deadline(&self, requested_at: Time, origin: &Airport, destination: &Airport) -> Time {
        requested_at + Time::hours(self.deadline_hours(origin, destination))
    }
}

/// Everything the router needs besides the network itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    pub params: AcoParams,
    pub sla: SlaPolicy,
    /// Candidate origins for fresh shipments.
    pub hubs: Vec<AirportId>,
}

impl RouterConfig {
    pub fn new(params: AcoParams, sla: SlaPolicy, hubs: Vec<AirportId>) -> RouterConfig {
        RouterConfig { params, sla, hubs }
    }

    /// Uses every infinite-source airport of the network as a hub.
    pub fn for_network(network: &TimeExpandedNetwork, params: AcoParams, sla: SlaPolicy) -> RouterConfig {
        RouterConfig::new(params, sla, network.hubs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_congestion_penalty_is_quadratic_above_threshold() {
        let p = AcoParams::default().with_congestion(0.5, 4.0);
        assert_eq!(0.0, p.congestion_penalty(0.3));
        assert_eq!(0.0, p.congestion_penalty(0.5));
        assert!((p.congestion_penalty(0.75) - 0.25).abs() < 1e-12);
        assert!((p.congestion_penalty(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_profiles() {
        let quick = AcoParams::profile(Profile::Quick);
        assert_eq!((3, 1), (quick.ants, quick.iterations));
        let thorough = AcoParams::profile(Profile::Thorough);
        assert_eq!((50, 100), (thorough.ants, thorough.iterations));
    }

    #[test]
    fn test_partial_params_deserialize_with_defaults() {
        let p: AcoParams = serde_json::from_str(r#"{"ants": 5, "seed": 42}"#).unwrap();
        assert_eq!(5, p.ants);
        assert_eq!(42, p.seed);
        assert_eq!(AcoParams::default().beta, p.beta);
    }

    #[test]
    fn test_sla_by_continent() {
        let airport = |id: &str, continent: &str| Airport {
            id: Arc::from(id),
            continent: Arc::from(continent),
            latitude: 0.0,
            longitude: 0.0,
            utc_offset: 0,
            capacity: 1,
            infinite_source: false,
        };
        let sla = SlaPolicy::default();
        let lima = airport("SPIM", "AM");
        assert_eq!(48, sla.deadline_hours(&lima, &airport("SKBO", "AM")));
        assert_eq!(72, sla.deadline_hours(&lima, &airport("EBCI", "EU")));
        assert_eq!(Time(0) + 48 * 60, sla.deadline(Time(0), &lima, &airport("SKBO", "AM")));
    }
}
