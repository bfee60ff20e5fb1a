use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{DbError, Result};

/// Savepoint name CockroachDB reserves for client-side transaction restarts.
pub const RESTART_SAVEPOINT: &str = "cockroach_restart";

/// What the retry loop does once the body succeeds or fails terminally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Finalize {
    /// The loop only guards one statement; the caller commits or rolls back
    /// the surrounding transaction.
    ///
    /// On CockroachDB, `RELEASE SAVEPOINT cockroach_restart` commits the
    /// underlying KV transaction, so only one decorated `exec` per transaction
    /// can use the reserved name. Configure another savepoint name (or none)
    /// when several retried statements share a transaction.
    #[default]
    Statement,
    /// The loop owns the transaction: commit on success, rollback on a
    /// terminal error.
    Commit,
}

/// Configuration for retrying statements aborted by a serialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of restarts after the first attempt.
    pub max_retries: u32,
    /// Initial backoff duration in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds.
    pub max_backoff_ms: u64,
    /// Savepoint wrapped around each attempt; `None` re-runs the body without
    /// issuing any restart statements.
    pub savepoint: Option<String>,
    pub finalize: Finalize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 50,
            initial_backoff_ms: 5,
            max_backoff_ms: 250,
            savepoint: Some(RESTART_SAVEPOINT.to_string()),
            finalize: Finalize::Statement,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Retry immediately, without sleeping between attempts.
    pub fn no_backoff(mut self) -> Self {
        self.initial_backoff_ms = 0;
        self.max_backoff_ms = 0;
        self
    }

    pub fn savepoint(mut self, name: &str) -> Self {
        self.savepoint = Some(name.to_string());
        self
    }

    pub fn without_savepoint(mut self) -> Self {
        self.savepoint = None;
        self
    }

    pub fn finalize(mut self, finalize: Finalize) -> Self {
        self.finalize = finalize;
        self
    }

    /// Parse a policy from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Self =
            serde_json::from_str(json).map_err(|e| DbError::InvalidConfig(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(DbError::InvalidConfig("max_retries must be > 0".into()));
        }

        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(DbError::InvalidConfig(
                "initial_backoff_ms cannot exceed max_backoff_ms".into(),
            ));
        }

        if let Some(name) = &self.savepoint {
            let valid = name
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(DbError::InvalidConfig(format!(
                    "savepoint name '{}' is not a plain identifier",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Backoff before the given restart (1-based), doubling up to the cap.
    pub fn backoff(&self, restart: u32) -> Duration {
        let factor = 1u64
            .checked_shl(restart.saturating_sub(1))
            .unwrap_or(u64::MAX);
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}
