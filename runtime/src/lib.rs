//! # Venue Ladder Runtime
//!
//! Imperative shell around [`venue_ladder_core`]: drives venue allocation for a running
//! tournament as results are reported to the bracket provider.
//!
//! ## Core Components
//!
//! - **`ProgressionTracker`**: report result, find newly opened matches, allocate, notify
//! - **`TrackerConfig`**: deadlines and retry policy for collaborator calls
//! - **Retry**: exponential backoff for idempotent provider reads
//! - **Metrics**: allocation counters and per-tier availability gauges
//!
//! ## Example
//!
//! ```ignore
//! use venue_ladder_runtime::{ProgressionTracker, TrackerConfig, TrackerEnvironment};
//!
//! let tracker = ProgressionTracker::bootstrap(
//!     tournament_id,
//!     ladder,
//!     &directory,
//!     TrackerEnvironment { bracket, sink, clock },
//!     TrackerConfig::from_env(),
//! )
//! .await?;
//!
//! // A chat command reports a result
//! let report = tracker.report_result(match_id, &winner).await?;
//!
//! // A scheduled task keeps allocation in line with the bracket
//! tracker.sync().await?;
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::EngineError;
pub use metrics::describe_metrics;
pub use retry::RetryPolicy;
pub use tracker::{ProgressReport, ProgressionTracker, TrackerEnvironment};
