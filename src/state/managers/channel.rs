//! Channel registry.
//!
//! Channels are created on first join and dropped the moment their roster
//! empties; the membership protocol itself is on [`crate::state::Matrix`].

use crate::state::channel::{Channel, Topic};
use crate::state::{Matrix, SessionId};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, info};

static CHANNEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_\[\]|]{1,64}$").expect("channel name pattern")
});

#[derive(Debug, Default)]
pub struct ChannelManager {
    channels: BTreeMap<String, Channel>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_name(name: &str) -> bool {
        CHANNEL_NAME.is_match(name)
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(name)
    }

    /// Fetch a channel, creating it if needed. The flag is `true` on creation.
    pub fn get_or_create(&mut self, name: &str) -> (&mut Channel, bool) {
        let created = !self.channels.contains_key(name);
        let channel = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::new(name));
        (channel, created)
    }

    pub fn remove(&mut self, name: &str) -> Option<Channel> {
        self.channels.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.values_mut()
    }

    pub fn names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Why a `JOIN` was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinRefusal {
    BadName,
    AlreadyMember,
    BadKey,
}

impl JoinRefusal {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadName => "Invalid channel name",
            Self::AlreadyMember => "Already in the channel",
            Self::BadKey => "Invalid key",
        }
    }
}

impl Matrix {
    /// Add a session to a channel, creating it on first join.
    ///
    /// The joiner gets `JOIN`, the topic and the roster in one fast write;
    /// existing members get `JOINED`.
    pub fn join_channel(
        &mut self,
        id: SessionId,
        name: &str,
        key: Option<&str>,
    ) -> Result<(), JoinRefusal> {
        if !ChannelManager::is_valid_name(name) {
            return Err(JoinRefusal::BadName);
        }
        let Some(user) = self.sessions.name_of(id) else {
            return Ok(());
        };
        if let Some(channel) = self.channels.get(name) {
            if channel.is_member(id) {
                return Err(JoinRefusal::AlreadyMember);
            }
            if let Some(ref expected) = channel.key
                && key != Some(expected.as_str())
            {
                return Err(JoinRefusal::BadKey);
            }
        }

        let (channel, created) = self.channels.get_or_create(name);
        if created {
            info!(channel = %name, "Channel created");
        }
        let others: Vec<SessionId> = channel.members.iter().copied().collect();
        channel.members.insert(id);
        let topic = channel.topic.clone();
        let roster: Vec<SessionId> = channel.members.iter().copied().collect();

        if let Some(session) = self.sessions.get_mut(id) {
            session.channels.insert(name.to_string());
        }

        let names: Vec<String> = roster
            .iter()
            .filter_map(|m| self.sessions.name_of(*m))
            .collect();
        self.sessions.begin_batch(id);
        self.sessions.send(id, &format!("JOIN {name}"));
        if let Some(topic) = topic {
            self.sessions.send(
                id,
                &format!(
                    "CHANNELTOPIC {name} {} {}\t{}",
                    topic.author, topic.set_at_ms, topic.text
                ),
            );
        }
        self.sessions
            .send(id, &format!("CLIENTS {name} {}", names.join(" ")));
        self.sessions.end_batch(id);

        self.sessions
            .send_all(others, &format!("JOINED {name} {user}"));
        debug!(uid = %id, user = %user, channel = %name, "Joined channel");
        Ok(())
    }

    /// Remove a session from a channel; the channel goes away once empty.
    ///
    /// Returns whether the session was a member.
    pub fn leave_channel(&mut self, id: SessionId, name: &str, reason: Option<&str>) -> bool {
        if let Some(session) = self.sessions.get_mut(id) {
            session.channels.remove(name);
        }
        let Some(channel) = self.channels.get_mut(name) else {
            return false;
        };
        if !channel.members.remove(&id) {
            return false;
        }
        let remaining: Vec<SessionId> = channel.members.iter().copied().collect();
        if channel.is_empty() {
            self.channels.remove(name);
            info!(channel = %name, "Channel destroyed");
        }

        let user = self.sessions.name_of(id).unwrap_or_default();
        let line = match reason {
            Some(reason) => format!("LEFT {name} {user} {reason}"),
            None => format!("LEFT {name} {user}"),
        };
        self.sessions.send_all(remaining, &line);
        true
    }

    /// Send a line to every member of a channel.
    pub fn channel_broadcast(&mut self, name: &str, line: &str) {
        let members: Vec<SessionId> = match self.channels.get(name) {
            Some(channel) => channel.members.iter().copied().collect(),
            None => return,
        };
        self.sessions.send_all(members, line);
    }

    /// Set a channel topic and announce it to members.
    pub fn set_topic(&mut self, name: &str, author: &str, text: &str, now_ms: i64) -> bool {
        let Some(channel) = self.channels.get_mut(name) else {
            return false;
        };
        channel.topic = Some(Topic {
            text: text.to_string(),
            author: author.to_string(),
            set_at_ms: now_ms,
        });
        self.channel_broadcast(name, &format!("CHANNELTOPIC {name} {author} {now_ms}\t{text}"));
        true
    }

    /// Announce mutes swept out of a channel's list.
    pub fn announce_expired_mutes(&mut self, name: &str) {
        let expired = match self.channels.get_mut(name) {
            Some(channel) => channel.mutes.take_expired(),
            None => return,
        };
        for user in expired {
            info!(channel = %name, user = %user, "Mute expired");
            self.channel_broadcast(
                name,
                &format!("CHANNELMESSAGE {name} <{user}> has been unmuted (mute expired)"),
            );
        }
    }

    /// Sweep every channel's mute list and announce expiries.
    pub fn sweep_mutes(&mut self, now: i64) {
        for channel in self.channels.iter_mut() {
            channel.mutes.sweep(now);
        }
        for name in self.channels.names() {
            self.announce_expired_mutes(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::matrix::testing::{matrix, user};

    #[test]
    fn join_sends_roster_and_notifies_members() {
        let mut m = matrix();
        let (a, mock_a) = user(&mut m, "alice");
        let (b, mock_b) = user(&mut m, "bob");
        m.join_channel(a, "main", None).unwrap();
        assert_eq!(mock_a.take_lines(), ["JOIN main", "CLIENTS main alice"]);

        m.join_channel(b, "main", None).unwrap();
        assert_eq!(mock_b.take_lines(), ["JOIN main", "CLIENTS main alice bob"]);
        assert_eq!(mock_a.take_lines(), ["JOINED main bob"]);
        assert_eq!(m.join_channel(b, "main", None), Err(JoinRefusal::AlreadyMember));
    }

    #[test]
    fn key_is_enforced() {
        let mut m = matrix();
        let (a, _) = user(&mut m, "alice");
        let (b, _) = user(&mut m, "bob");
        m.join_channel(a, "secret", None).unwrap();
        m.channels.get_mut("secret").unwrap().key = Some("k".into());
        assert_eq!(m.join_channel(b, "secret", Some("x")), Err(JoinRefusal::BadKey));
        assert_eq!(m.join_channel(b, "secret", None), Err(JoinRefusal::BadKey));
        assert!(m.join_channel(b, "secret", Some("k")).is_ok());
    }

    #[test]
    fn last_leave_destroys_channel() {
        let mut m = matrix();
        let (a, _) = user(&mut m, "alice");
        let (b, mock_b) = user(&mut m, "bob");
        m.join_channel(a, "main", None).unwrap();
        m.join_channel(b, "main", None).unwrap();
        mock_b.take_lines();

        assert!(m.leave_channel(a, "main", None));
        assert_eq!(mock_b.take_lines(), ["LEFT main alice"]);
        assert!(!m.sessions.get(a).unwrap().channels.contains("main"));

        assert!(m.leave_channel(b, "main", None));
        assert!(m.channels.get("main").is_none());
        assert!(!m.leave_channel(b, "main", None));
    }

    #[test]
    fn topic_is_replayed_to_joiners() {
        let mut m = matrix();
        let (a, _) = user(&mut m, "alice");
        let (b, mock_b) = user(&mut m, "bob");
        m.join_channel(a, "main", None).unwrap();
        assert!(m.set_topic("main", "alice", "be nice", 1000));
        m.join_channel(b, "main", None).unwrap();
        assert_eq!(
            mock_b.take_lines(),
            ["JOIN main", "CHANNELTOPIC main alice 1000\tbe nice", "CLIENTS main alice bob"]
        );
    }

    #[test]
    fn expired_mute_is_announced_once() {
        let mut m = matrix();
        let (a, mock_a) = user(&mut m, "alice");
        m.join_channel(a, "main", None).unwrap();
        mock_a.take_lines();
        m.channels
            .get_mut("main")
            .unwrap()
            .mutes
            .mute("bob", 60, None, 100);

        m.sweep_mutes(130);
        assert!(mock_a.take_lines().is_empty());
        m.sweep_mutes(160);
        assert_eq!(
            mock_a.take_lines(),
            ["CHANNELMESSAGE main <bob> has been unmuted (mute expired)"]
        );
        m.sweep_mutes(200);
        assert!(mock_a.take_lines().is_empty());
    }

    #[test]
    fn channel_names() {
        assert!(ChannelManager::is_valid_name("main"));
        assert!(ChannelManager::is_valid_name("ba_newbies"));
        assert!(!ChannelManager::is_valid_name(""));
        assert!(!ChannelManager::is_valid_name("has space"));
        assert!(!ChannelManager::is_valid_name("#irc"));
    }

    #[test]
    fn get_or_create_reports_creation() {
        let mut channels = ChannelManager::new();
        assert!(channels.get_or_create("main").1);
        assert!(!channels.get_or_create("main").1);
        assert_eq!(channels.len(), 1);
    }
}
