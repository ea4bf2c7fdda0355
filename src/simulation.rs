pub mod builder;
pub mod cancellation;
pub mod event;
pub mod replanner;
pub mod snapshot;
pub mod store;

pub use builder::build_events;
pub use cancellation::{CancellationProcessor, CancellationRecord, CancellationSummary, parse_cancellations};
pub use event::{Event, EventKind};
pub use replanner::{ReplanSummary, Replanner};
pub use snapshot::{ShipmentState, ShipmentStatus, Snapshot, SnapshotReplayer};
pub use store::TimelineStore;
