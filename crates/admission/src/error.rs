use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which admission check rejected a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    ConnectionRateLimit,
    MaxConnectionsPerUser,
    MaxConnectionsPerUserPerProject,
    MaxConnectionsPerUserPerJob,
}

impl LimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitKind::ConnectionRateLimit => "connection_rate_limit",
            LimitKind::MaxConnectionsPerUser => "max_connections_per_user",
            LimitKind::MaxConnectionsPerUserPerProject => "max_connections_per_user_per_project",
            LimitKind::MaxConnectionsPerUserPerJob => "max_connections_per_user_per_job",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection was refused because a quota or the rate window is full.
///
/// Never retried by the tracker; the caller decides (normally it refuses the
/// socket).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("rate limit exceeded for user {user_id}: {limit} ({current}/{max})")]
pub struct RateLimitError {
    pub user_id: String,
    pub limit: LimitKind,
    pub current: u32,
    pub max: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid admission configuration: {0}")]
    Invalid(String),
}

/// True when `err`, or anything in its source chain, is a [`RateLimitError`].
pub fn is_rate_limit_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<RateLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("upgrade refused")]
    struct Wrapper(#[source] RateLimitError);

    fn sample() -> RateLimitError {
        RateLimitError {
            user_id: "u1".into(),
            limit: LimitKind::MaxConnectionsPerUser,
            current: 10,
            max: 10,
        }
    }

    #[test]
    fn renders_limit_and_counts() {
        assert_eq!(
            sample().to_string(),
            "rate limit exceeded for user u1: max_connections_per_user (10/10)"
        );
    }

    #[test]
    fn predicate_walks_source_chain() {
        assert!(is_rate_limit_error(&sample()));
        assert!(is_rate_limit_error(&Wrapper(sample())));
        let other = ConfigError::Invalid("x".into());
        assert!(!is_rate_limit_error(&other));
    }
}
