use crate::airport::AirportId;
use crate::network::TimeExpandedNetwork;
use crate::time::Time;
use std::collections::HashMap;

/// Weighted terms of the cost of taking one leg. Lower is better.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LegCost {
    pub time: f64,
    pub wait: f64,
    pub sla: f64,
    pub congestion: f64,
    pub hops: f64,
}

impl LegCost {
    pub fn total(&self) -> f64 {
        self.time + self.wait + self.sla + self.congestion + self.hops
    }

    /// Selection desirability `1 / (1 + cost)`.
    pub fn desirability(&self) -> f64 {
        1.0 / (1.0 + self.total().max(0.0))
    }
}

/// Minutes by which the estimated ready time misses the deadline, normalised by `eta_ref` hours.
pub fn sla_risk(estimated_arrival: Time, pickup_minutes: i64, deadline: Time, eta_ref_hours: f64) -> f64 {
    let late = (estimated_arrival + pickup_minutes) - deadline;
    if late <= 0 {
        return 0.0;
    }
    late as f64 / (eta_ref_hours * 60.0).max(1.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EstimateKey {
    from: AirportId,
    to: AirportId,
    ready: Time,
    hops: usize,
    limit: Time,
}

/// Memoised fastest-path estimates. Capacity is ignored, so entries stay
/// valid across commits; they must be dropped when instances get cancelled.
#[derive(Debug, Default)]
pub struct EstimateCache {
    entries: HashMap<EstimateKey, Option<Time>>,
}

impl EstimateCache {
    pub fn new() -> EstimateCache {
        EstimateCache::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest arrival at `to` leaving `from` no earlier than `ready`, using
    /// at most `hops` non-cancelled legs that depart before `limit`.
    pub fn fastest_arrival(
        &mut self,
        network: &TimeExpandedNetwork,
        from: &AirportId,
        to: &AirportId,
        ready: Time,
        hops: usize,
        limit: Time,
        dwell: i64,
    ) -> Option<Time> {
        let key = EstimateKey {
            from: from.clone(),
            to: to.clone(),
            ready,
            hops,
            limit,
        };
        if let Some(hit) = self.entries.get(&key) {
            return *hit;
        }
        let estimate = fastest_arrival(network, from, to, ready, hops, limit, dwell);
        self.entries.insert(key, estimate);
        estimate
    }
}

/// Hop-limited earliest-arrival relaxation over the time-expanded network.
pub fn fastest_arrival(
    network: &TimeExpandedNetwork,
    from: &AirportId,
    to: &AirportId,
    ready: Time,
    hops: usize,
    limit: Time,
    dwell: i64,
) -> Option<Time> {
    if from == to {
        return Some(ready);
    }
    let mut best: Option<Time> = None;
    let mut frontier = HashMap::<AirportId, Time>::from([(from.clone(), ready)]);

    for _ in 0..hops {
        let mut next = HashMap::<AirportId, Time>::new();
        for (airport, at) in &frontier {
            for idx in network.departing_after(airport, *at) {
                let f = network.instance(*idx);
                if f.departure_time >= limit || best.is_some_and(|b| f.departure_time >= b) {
                    break;
                }
                if f.is_cancelled() || f.destination_id == *from {
                    continue;
                }
                if f.destination_id == *to {
                    best = Some(best.map_or(f.arrival_time, |b| b.min(f.arrival_time)));
                    continue;
                }
                let ready_there = f.arrival_time + dwell;
                next.entry(f.destination_id.clone())
                    .and_modify(|t| *t = (*t).min(ready_there))
                    .or_insert(ready_there);
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    best
}
