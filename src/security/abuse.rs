//! Failed-login bookkeeping.
//!
//! Records are keyed by lower-cased account name. Once a name collects
//! `threshold` failures inside the block window, further attempts are
//! refused without checking credentials until the record ages out.
//! Operators hear about each blocking episode once.

use crate::config::SecurityConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct FailedLogin {
    count: u32,
    last_attempt: Instant,
    notified: bool,
}

/// Whether a login attempt may proceed to credential checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginGate {
    Allowed,
    /// `notify` is set for the first refusal of an episode.
    Blocked { notify: bool },
}

#[derive(Debug)]
pub struct AbuseGuard {
    records: HashMap<String, FailedLogin>,
    threshold: u32,
    window: Duration,
    purge_interval: Duration,
    max_records: usize,
    last_purge: Instant,
}

impl AbuseGuard {
    pub fn new(config: &SecurityConfig, now: Instant) -> Self {
        Self {
            records: HashMap::new(),
            threshold: config.login_attempt_threshold,
            window: config.login_block(),
            purge_interval: config.login_purge_interval(),
            max_records: config.max_failed_records,
            last_purge: now,
        }
    }

    fn live<'a>(&'a mut self, user: &str, now: Instant) -> Option<&'a mut FailedLogin> {
        let window = self.window;
        self.records
            .get_mut(&user.to_ascii_lowercase())
            .filter(|r| now.duration_since(r.last_attempt) < window)
    }

    /// Gate a login attempt for `user`.
    pub fn check(&mut self, user: &str, now: Instant) -> LoginGate {
        let threshold = self.threshold;
        match self.live(user, now) {
            Some(record) if record.count >= threshold => {
                let notify = !record.notified;
                record.notified = true;
                LoginGate::Blocked { notify }
            }
            _ => LoginGate::Allowed,
        }
    }

    /// Count a failed attempt. Returns the failures in the current window.
    ///
    /// A new name arriving at a full table evicts the least recently
    /// attempted record first.
    pub fn record_failure(&mut self, user: &str, now: Instant) -> u32 {
        let key = user.to_ascii_lowercase();
        if !self.records.contains_key(&key) && self.records.len() >= self.max_records {
            self.evict_oldest(self.records.len() + 1 - self.max_records);
        }
        let window = self.window;
        let record = self
            .records
            .entry(key)
            .or_insert(FailedLogin {
                count: 0,
                last_attempt: now,
                notified: false,
            });
        if now.duration_since(record.last_attempt) >= window {
            record.count = 0;
            record.notified = false;
        }
        record.count += 1;
        record.last_attempt = now;
        debug!(user = %user, count = record.count, "Failed login recorded");
        record.count
    }

    /// Forget a name, after a successful login.
    pub fn clear(&mut self, user: &str) {
        self.records.remove(&user.to_ascii_lowercase());
    }

    /// Drop aged-out records and cap the table size.
    ///
    /// Does nothing until the purge interval has elapsed. When still over
    /// capacity, the least recently attempted records go first.
    pub fn purge(&mut self, now: Instant) -> usize {
        if now.duration_since(self.last_purge) < self.purge_interval {
            return 0;
        }
        self.last_purge = now;
        let before = self.records.len();
        let window = self.window;
        self.records
            .retain(|_, r| now.duration_since(r.last_attempt) < window);

        if self.records.len() > self.max_records {
            self.evict_oldest(self.records.len() - self.max_records);
        }

        let removed = before - self.records.len();
        if removed > 0 {
            info!(removed, remaining = self.records.len(), "Purged failed-login records");
        }
        removed
    }

    fn evict_oldest(&mut self, count: usize) {
        let mut by_age: Vec<(String, Instant)> = self
            .records
            .iter()
            .map(|(k, r)| (k.clone(), r.last_attempt))
            .collect();
        by_age.sort_by_key(|(_, t)| *t);
        for (key, _) in by_age.into_iter().take(count) {
            self.records.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
