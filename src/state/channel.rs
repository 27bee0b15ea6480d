//! Chat channels and their mute lists.

use super::SessionId;
use std::collections::BTreeSet;
use std::net::IpAddr;

/// A channel topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub text: String,
    pub author: String,
    /// Unix milliseconds, as clients expect.
    pub set_at_ms: i64,
}

/// A chat channel. Exists only while its roster is non-empty.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub members: BTreeSet<SessionId>,
    pub topic: Option<Topic>,
    pub key: Option<String>,
    pub mutes: MuteList,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
            topic: None,
            key: None,
            mutes: MuteList::default(),
        }
    }

    pub fn is_member(&self, id: SessionId) -> bool {
        self.members.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// One mute. `expires == 0` means permanent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteEntry {
    pub username: String,
    pub ip: Option<IpAddr>,
    /// Unix seconds.
    pub expires: i64,
}

impl MuteEntry {
    pub fn is_permanent(&self) -> bool {
        self.expires == 0
    }

    fn expired(&self, now: i64) -> bool {
        !self.is_permanent() && self.expires <= now
    }

    fn matches(&self, username: &str, ip: Option<IpAddr>) -> bool {
        self.username.eq_ignore_ascii_case(username) || (self.ip.is_some() && self.ip == ip)
    }
}

/// Remaining time for one listed mute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuteRemaining {
    Indefinite,
    Seconds(i64),
}

/// Time-bounded mutes, unique per username.
///
/// Query paths sweep expired entries first and stash their names for the
/// owner to announce ([`MuteList::take_expired`]). [`MuteList::listing`] is
/// the one enumeration that never sweeps.
#[derive(Debug, Default)]
pub struct MuteList {
    entries: Vec<MuteEntry>,
    expired: Vec<String>,
}

impl MuteList {
    /// Add or replace a mute. `seconds <= 0` mutes permanently.
    pub fn mute(&mut self, username: &str, seconds: i64, ip: Option<IpAddr>, now: i64) {
        self.sweep(now);
        let expires = if seconds <= 0 { 0 } else { now.saturating_add(seconds) };
        self.entries
            .retain(|e| !e.username.eq_ignore_ascii_case(username));
        self.entries.push(MuteEntry {
            username: username.to_string(),
            ip,
            expires,
        });
    }

    /// Remove a mute. Returns whether one existed.
    pub fn unmute(&mut self, username: &str, now: i64) -> bool {
        self.sweep(now);
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.username.eq_ignore_ascii_case(username));
        self.entries.len() != before
    }

    /// Whether `username` or `ip` is muted at `now`.
    pub fn is_muted(&mut self, username: &str, ip: Option<IpAddr>, now: i64) -> bool {
        self.sweep(now);
        self.entries.iter().any(|e| e.matches(username, ip))
    }

    /// Drop expired entries, remembering their names.
    pub fn sweep(&mut self, now: i64) {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.expired(now));
        self.entries = kept;
        self.expired
            .extend(expired.into_iter().map(|e| e.username));
    }

    /// Names swept since the last call.
    pub fn take_expired(&mut self) -> Vec<String> {
        std::mem::take(&mut self.expired)
    }

    /// Current entries with remaining time, without sweeping.
    pub fn listing(&self, now: i64) -> Vec<(String, MuteRemaining)> {
        self.entries
            .iter()
            .map(|e| {
                let remaining = if e.is_permanent() {
                    MuteRemaining::Indefinite
                } else {
                    MuteRemaining::Seconds((e.expires - now).max(0))
                };
                (e.username.clone(), remaining)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
