//! corostc - COROS Training Center API client
//!
//! Library behind the `corosdown` and `corosup` tools:
//! - Password login or session-token reuse (the `CPL-coros-token`
//!   browser cookie value), so a CLI session can coexist with an open
//!   browser session despite COROS's single-session login
//! - Activity listing, export download (fit/tcx/gpx/kml/csv), FIT
//!   import, delete and update
//! - Minimal FIT decoding to recover the label ID of an upload

pub mod client;
pub mod models;
pub mod telemetry;
pub mod utils;

pub use client::CorosClient;
pub use models::config::{CorosConfig, Credentials};
pub use models::errors::{AppError, CorosResult, ErrorCode};
pub use models::types::{Activity, ActivityDetail, ActivitySummary, FileType, SportType};
pub use telemetry::TransferStats;
pub use utils::sanitize_title;
