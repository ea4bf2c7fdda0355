pub mod airport;
pub mod config;
pub mod error;
pub mod flight;
pub mod forecast;
pub mod logging;
pub mod network;
pub mod report;
pub mod router;
pub mod scenario;
pub mod session;
pub mod shipment;
pub mod simulation;
pub mod time;
