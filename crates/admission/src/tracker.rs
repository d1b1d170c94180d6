//! Connection admission: per-user and per-resource quotas plus a
//! sliding-window rate limit on new connections.
//!
//! All quota state lives in one flat map keyed by [`QuotaKey`] behind a single
//! lock. An admission is check-then-act, so the whole decision runs inside one
//! write-locked critical section; two concurrent attempts can never jointly
//! overshoot a limit.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::AdmissionConfig;
use crate::error::{LimitKind, RateLimitError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum QuotaKey {
    User(String),
    Project { user_id: String, project_id: String },
    Job { user_id: String, job_id: String },
}

#[derive(Debug, Default)]
struct TrackerState {
    /// Open connection counts. Entries are removed when they reach zero.
    counts: HashMap<QuotaKey, u32>,
    /// Admission instants per user, oldest first.
    timestamps: HashMap<String, VecDeque<Instant>>,
}

impl TrackerState {
    fn count(&self, key: &QuotaKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    fn decrement(&mut self, key: QuotaKey) -> bool {
        match self.counts.get_mut(&key) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.counts.remove(&key);
                true
            }
            None => false,
        }
    }
}

/// Drop timestamps older than `window`. Returns how many were removed.
fn prune(window_entries: &mut VecDeque<Instant>, now: Instant, window: Duration) -> usize {
    let before = window_entries.len();
    while let Some(oldest) = window_entries.front() {
        if now.saturating_duration_since(*oldest) > window {
            window_entries.pop_front();
        } else {
            break;
        }
    }
    before - window_entries.len()
}

/// Point-in-time view of tracker occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionStats {
    pub tracked_users: usize,
    pub total_connections: u64,
    pub project_entries: usize,
    pub job_entries: usize,
    pub rate_window_users: usize,
    pub rate_window_entries: usize,
}

/// Admits or rejects websocket connections for `(user, project?, job?)`.
pub struct ConnectionTracker {
    config: AdmissionConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<TrackerState>,
}

impl ConnectionTracker {
    pub fn new(config: AdmissionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AdmissionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: RwLock::new(TrackerState::default()),
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, TrackerState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackerState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Admit a connection and reserve its quota, or report the first limit
    /// it would break.
    ///
    /// Checks run in a fixed order: rate window, per-user total, per-project,
    /// per-job. Empty resource ids are treated as absent. The rate-window
    /// timestamp is recorded as soon as the rate check passes, so an attempt
    /// rejected by a later quota still counts against the window.
    pub fn check_and_track_connection(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        job_id: Option<&str>,
    ) -> Result<(), RateLimitError> {
        let project_id = project_id.filter(|id| !id.is_empty());
        let job_id = job_id.filter(|id| !id.is_empty());
        let now = self.clock.now();
        let window = self.config.rate_limit_window();

        let mut state = self.write();

        let attempts = state.timestamps.entry(user_id.to_string()).or_default();
        prune(attempts, now, window);
        let recent = attempts.len() as u32;
        if recent >= self.config.connection_rate_limit {
            return Err(self.reject(
                user_id,
                LimitKind::ConnectionRateLimit,
                recent,
                self.config.connection_rate_limit,
            ));
        }
        attempts.push_back(now);

        let user_key = QuotaKey::User(user_id.to_string());
        let open = state.count(&user_key);
        if open >= self.config.max_connections_per_user {
            return Err(self.reject(
                user_id,
                LimitKind::MaxConnectionsPerUser,
                open,
                self.config.max_connections_per_user,
            ));
        }

        let project_key = project_id.map(|project_id| QuotaKey::Project {
            user_id: user_id.to_string(),
            project_id: project_id.to_string(),
        });
        if let Some(key) = &project_key {
            let open = state.count(key);
            if open >= self.config.max_connections_per_user_per_project {
                return Err(self.reject(
                    user_id,
                    LimitKind::MaxConnectionsPerUserPerProject,
                    open,
                    self.config.max_connections_per_user_per_project,
                ));
            }
        }

        let job_key = job_id.map(|job_id| QuotaKey::Job {
            user_id: user_id.to_string(),
            job_id: job_id.to_string(),
        });
        if let Some(key) = &job_key {
            let open = state.count(key);
            if open >= self.config.max_connections_per_user_per_job {
                return Err(self.reject(
                    user_id,
                    LimitKind::MaxConnectionsPerUserPerJob,
                    open,
                    self.config.max_connections_per_user_per_job,
                ));
            }
        }

        for key in std::iter::once(user_key).chain(project_key).chain(job_key) {
            *state.counts.entry(key).or_insert(0) += 1;
        }
        debug!(user_id, project_id, job_id, "connection_admitted");
        Ok(())
    }

    fn reject(&self, user_id: &str, limit: LimitKind, current: u32, max: u32) -> RateLimitError {
        warn!(
            user_id,
            limit = limit.as_str(),
            current,
            max,
            "connection_rejected"
        );
        metrics::counter!("relay_connections_rejected_total", "limit" => limit.as_str())
            .increment(1);
        RateLimitError {
            user_id: user_id.to_string(),
            limit,
            current,
            max,
        }
    }

    /// Release the quota held by one connection. Counts never go below zero
    /// and entries that reach zero are removed.
    pub fn untrack_connection(&self, user_id: &str, project_id: Option<&str>, job_id: Option<&str>) {
        let project_id = project_id.filter(|id| !id.is_empty());
        let job_id = job_id.filter(|id| !id.is_empty());

        let mut state = self.write();
        let released = state.decrement(QuotaKey::User(user_id.to_string()));
        if let Some(project_id) = project_id {
            state.decrement(QuotaKey::Project {
                user_id: user_id.to_string(),
                project_id: project_id.to_string(),
            });
        }
        if let Some(job_id) = job_id {
            state.decrement(QuotaKey::Job {
                user_id: user_id.to_string(),
                job_id: job_id.to_string(),
            });
        }
        if released {
            debug!(user_id, project_id, job_id, "connection_released");
        } else {
            warn!(user_id, "untrack_without_tracked_connection");
        }
    }

    /// Drop every expired rate-window timestamp. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.rate_limit_window();
        let mut state = self.write();
        let mut removed = 0;
        state.timestamps.retain(|_, attempts| {
            removed += prune(attempts, now, window);
            !attempts.is_empty()
        });
        removed
    }

    pub fn user_connection_count(&self, user_id: &str) -> u32 {
        self.read().count(&QuotaKey::User(user_id.to_string()))
    }

    pub fn user_project_connection_count(&self, user_id: &str, project_id: &str) -> u32 {
        self.read().count(&QuotaKey::Project {
            user_id: user_id.to_string(),
            project_id: project_id.to_string(),
        })
    }

    pub fn user_job_connection_count(&self, user_id: &str, job_id: &str) -> u32 {
        self.read().count(&QuotaKey::Job {
            user_id: user_id.to_string(),
            job_id: job_id.to_string(),
        })
    }

    pub fn stats(&self) -> AdmissionStats {
        let state = self.read();
        let mut stats = AdmissionStats {
            rate_window_users: state.timestamps.len(),
            rate_window_entries: state.timestamps.values().map(VecDeque::len).sum(),
            ..AdmissionStats::default()
        };
        for (key, count) in &state.counts {
            match key {
                QuotaKey::User(_) => {
                    stats.tracked_users += 1;
                    stats.total_connections += u64::from(*count);
                }
                QuotaKey::Project { .. } => stats.project_entries += 1,
                QuotaKey::Job { .. } => stats.job_entries += 1,
            }
        }
        stats
    }
}
