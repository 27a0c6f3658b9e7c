use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::store::KeyValueStore;
use crate::utils::clock::Clock;

pub const MAX_ATTEMPTS: u32 = 5;
pub const LOCKOUT_WINDOW_MINUTES: i64 = 15;

const KEY_PREFIX: &str = "login_attempts_";

/// Failed login counter for one identifier, as persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub count: u32,
    /// Unix epoch milliseconds of the most recent failure.
    pub last_attempt: i64,
}

impl AttemptRecord {
    fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_attempt)
    }
}

/// Client-side throttle on login attempts, keyed by login id or phone.
///
/// The window is fixed, not sliding: it is measured from the single most
/// recent failure, and once it has elapsed the whole count is forgotten.
#[derive(Clone)]
pub struct AttemptLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    window: Duration,
}

impl std::fmt::Debug for AttemptLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptLimiter")
            .field("max_attempts", &self.max_attempts)
            .field("window", &self.window)
            .finish()
    }
}

impl AttemptLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_limits(
            store,
            clock,
            MAX_ATTEMPTS,
            Duration::minutes(LOCKOUT_WINDOW_MINUTES),
        )
    }

    pub fn with_limits(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        max_attempts: u32,
        window: Duration,
    ) -> Self {
        assert!(max_attempts > 0);

        Self {
            store,
            clock,
            max_attempts,
            window,
        }
    }

    fn key(identifier: &str) -> String {
        format!("{KEY_PREFIX}{identifier}")
    }

    fn read(&self, identifier: &str) -> AttemptRecord {
        match self.store.get(&Self::key(identifier)) {
            Ok(Some(raw)) => parse_record(&raw),
            Ok(None) => AttemptRecord::default(),
            Err(e) => {
                tracing::warn!("Failed to read login attempts: {}", e);
                AttemptRecord::default()
            }
        }
    }

    /// Count that still applies at `now`: zero once the window since the last
    /// failure has passed.
    fn effective_count(&self, record: &AttemptRecord, now: DateTime<Utc>) -> u32 {
        match record.last_attempt_at() {
            Some(last) if now.signed_duration_since(last) < self.window => record.count,
            _ => 0,
        }
    }

    pub fn is_allowed(&self, identifier: &str) -> bool {
        let record = self.read(identifier);

        self.effective_count(&record, self.clock.now()) < self.max_attempts
    }

    /// Time left until `identifier` may try again, or `None` if it may already.
    pub fn remaining_lockout(&self, identifier: &str) -> Option<Duration> {
        let record = self.read(identifier);
        let now = self.clock.now();

        if self.effective_count(&record, now) < self.max_attempts {
            return None;
        }

        let last = record.last_attempt_at()?;
        Some(self.window - now.signed_duration_since(last))
    }

    pub fn record_result(&self, identifier: &str, success: bool) {
        let key = Self::key(identifier);

        if success {
            if let Err(e) = self.store.remove(&key) {
                tracing::error!("Failed to reset login attempts: {}", e);
            }
            return;
        }

        let now = self.clock.now();

        let result = self.store.update(&key, &mut |current| {
            let record = current.map(parse_record).unwrap_or_default();

            let next = AttemptRecord {
                count: self.effective_count(&record, now) + 1,
                last_attempt: now.timestamp_millis(),
            };

            serde_json::to_string(&next).ok()
        });

        match result {
            Ok(Some(_)) => tracing::debug!("Recorded failed login attempt"),
            Ok(None) => tracing::error!("Failed to encode login attempt record"),
            Err(e) => tracing::error!("Failed to record login attempt: {}", e),
        }
    }
}

fn parse_record(raw: &str) -> AttemptRecord {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Discarding unreadable login attempt record: {}", e);
        AttemptRecord::default()
    })
}
