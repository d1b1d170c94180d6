//! Progress Relay connection admission
//!
//! Decides whether a new websocket connection may open, and releases its
//! quota when it closes.
//!
//! ## What we do here
//!
//! - **Quotas** - open connections per user, per user and project, and per
//!   user and job
//! - **Rate limit** - new connections per user inside a sliding window
//! - **Housekeeping** - a cancellable background sweeper drops expired window
//!   entries for users who never come back
//!
//! State is process-local and in memory. It does not survive a restart and is
//! not shared between processes.
//!
//! ## Example
//!
//! ```
//! use admission::{AdmissionConfig, ConnectionTracker, LimitKind};
//!
//! let config = AdmissionConfig { max_connections_per_user: 1, ..AdmissionConfig::default() };
//! let tracker = ConnectionTracker::new(config);
//!
//! tracker.check_and_track_connection("u1", Some("proj_1"), None).unwrap();
//! let err = tracker.check_and_track_connection("u1", None, None).unwrap_err();
//! assert_eq!(err.limit, LimitKind::MaxConnectionsPerUser);
//!
//! tracker.untrack_connection("u1", Some("proj_1"), None);
//! assert_eq!(tracker.user_connection_count("u1"), 0);
//! ```

mod clock;
mod config;
mod error;
mod sweeper;
mod tracker;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::AdmissionConfig;
pub use crate::error::{is_rate_limit_error, ConfigError, LimitKind, RateLimitError};
pub use crate::sweeper::{spawn_sweeper, SweeperHandle, MIN_SWEEP_INTERVAL};
pub use crate::tracker::{AdmissionStats, ConnectionTracker};
