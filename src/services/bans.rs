//! Ban lookup.

use crate::config::BanEntry;
use std::net::IpAddr;

/// An active ban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ban {
    pub reason: String,
    /// Unix seconds; `None` is permanent.
    pub expires: Option<i64>,
}

pub trait BanStore: Send {
    /// The first active ban matching the account name, address or client id.
    fn find(&self, name: &str, ip: IpAddr, user_id: Option<u32>, now: i64) -> Option<Ban>;
}

/// [`BanStore`] over the `[[bans]]` table.
#[derive(Debug, Default)]
pub struct MemoryBanStore {
    entries: Vec<BanEntry>,
}

impl MemoryBanStore {
    pub fn new(entries: Vec<BanEntry>) -> Self {
        Self { entries }
    }
}

fn matches(entry: &BanEntry, name: &str, ip: IpAddr, user_id: Option<u32>) -> bool {
    entry
        .username
        .as_deref()
        .is_some_and(|u| u.eq_ignore_ascii_case(name))
        || entry.ip == Some(ip)
        || entry.cidr.is_some_and(|net| net.contains(&ip))
        || (entry.user_id.is_some() && entry.user_id == user_id)
}

impl BanStore for MemoryBanStore {
    fn find(&self, name: &str, ip: IpAddr, user_id: Option<u32>, now: i64) -> Option<Ban> {
        self.entries
            .iter()
            .filter(|e| e.expires.is_none_or(|t| t > now))
            .find(|e| matches(e, name, ip, user_id))
            .map(|e| Ban {
                reason: e.reason.clone(),
                expires: e.expires,
            })
    }
}
