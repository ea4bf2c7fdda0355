pub mod aco;
pub mod heuristic;
pub mod pheromone;

pub use aco::{AcoRouter, Assignment, CollapseSignal, CommitOutcome, Leg, LegContext, Origin, Route, ShipmentRequest};

#[cfg(test)]
mod tests {
    mod proptests;
    mod routing;
    mod utils;
}
