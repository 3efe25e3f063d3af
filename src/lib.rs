//! iscsi-top
//!
//! Live terminal view of a running iSCSI target: its open connections and
//! per-worker task throughput, read from shared memory the target exports.

pub mod config;
pub mod dashboard;
pub mod telemetry;
pub mod tui;

pub use config::{DashboardConfig, RefreshDelay, TopConfig};
pub use dashboard::Dashboard;
