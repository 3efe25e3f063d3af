//! Producer telemetry
//!
//! Read-side access to the regions a running iSCSI target exports:
//! - `region`: attach/detach of read-only mappings
//! - `layout`: slot and record formats
//! - `connections`: live connection listing
//! - `throughput`: per-worker task rates from counter deltas

pub mod connections;
pub mod layout;
pub mod region;
pub mod throughput;

pub use connections::snapshot_connections;
pub use layout::{ConnectionRecord, RegionKind, RegionLayout};
pub use region::{RegionAttacher, RegionSource, RegionView};
pub use throughput::{ThroughputAggregator, ThroughputReport, WorkerRate};
