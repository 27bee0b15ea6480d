//! Battle rooms.
//!
//! A battle has exactly one founder for its whole life. The roster holds
//! everyone else; bots belong to whichever participant added them.

use super::SessionId;
use lobby_proto::{BattleStatus, Mode, TeamColor};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Battle identifier, allocated sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BattleId(pub u32);

impl fmt::Display for BattleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleKind {
    Normal,
    Replay,
}

impl BattleKind {
    pub fn wire(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Replay => 1,
        }
    }
}

/// Settings chosen at `OPENBATTLE` time, some later changed by `UPDATEBATTLEINFO`.
#[derive(Debug, Clone)]
pub struct BattleSettings {
    pub kind: BattleKind,
    /// 0 none, 1 hole punching, 2 fixed source ports.
    pub nat: u8,
    pub password: Option<String>,
    pub port: u16,
    pub max_players: u32,
    pub game_hash: i32,
    pub rank: u32,
    pub map_hash: i32,
    pub engine_name: String,
    pub engine_version: String,
    pub map: String,
    pub title: String,
    pub game_name: String,
}

/// A start area, in 0..=200 map fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bot {
    pub name: String,
    pub owner: SessionId,
    pub status: BattleStatus,
    pub color: TeamColor,
    pub ai: String,
}

/// Who controls a team slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerRef {
    Session(SessionId),
    Bot(String),
}

/// A controller with its current status, as seen by the alignment rules.
#[derive(Debug, Clone)]
pub struct Controller {
    pub who: ControllerRef,
    pub status: BattleStatus,
    pub color: TeamColor,
}

#[derive(Debug)]
pub struct Battle {
    pub id: BattleId,
    pub founder: SessionId,
    pub members: Vec<SessionId>,
    pub bots: Vec<Bot>,
    pub settings: BattleSettings,
    pub locked: bool,
    pub spectators: u32,
    pub script_tags: BTreeMap<String, String>,
    pub start_rects: BTreeMap<u32, StartRect>,
    pub disabled_units: BTreeSet<String>,
    /// Buffered replay script, sent to joiners of replay battles.
    pub replay_script: Vec<String>,
    /// Script lines between `SCRIPTSTART` and `SCRIPTEND`.
    pub script_draft: Option<Vec<String>>,
}

impl Battle {
    pub fn new(id: BattleId, founder: SessionId, settings: BattleSettings) -> Self {
        Self {
            id,
            founder,
            members: Vec::new(),
            bots: Vec::new(),
            settings,
            locked: false,
            spectators: 0,
            script_tags: BTreeMap::new(),
            start_rects: BTreeMap::new(),
            disabled_units: BTreeSet::new(),
            replay_script: Vec::new(),
            script_draft: None,
        }
    }

    pub fn is_replay(&self) -> bool {
        self.settings.kind == BattleKind::Replay
    }

    pub fn is_founder(&self, id: SessionId) -> bool {
        self.founder == id
    }

    /// Founder or roster member.
    pub fn is_participant(&self, id: SessionId) -> bool {
        self.founder == id || self.members.contains(&id)
    }

    /// Founder first, then the roster in join order.
    pub fn participants(&self) -> impl Iterator<Item = SessionId> + '_ {
        std::iter::once(self.founder).chain(self.members.iter().copied())
    }

    pub fn add_member(&mut self, id: SessionId) {
        if !self.is_participant(id) {
            self.members.push(id);
        }
    }

    pub fn remove_member(&mut self, id: SessionId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != id);
        self.members.len() != before
    }

    pub fn bot(&self, name: &str) -> Option<&Bot> {
        self.bots.iter().find(|b| b.name == name)
    }

    pub fn bot_mut(&mut self, name: &str) -> Option<&mut Bot> {
        self.bots.iter_mut().find(|b| b.name == name)
    }

    /// Add a bot unless the name is taken.
    pub fn add_bot(&mut self, bot: Bot) -> bool {
        if self.bot(&bot.name).is_some() {
            return false;
        }
        self.bots.push(bot);
        true
    }

    pub fn remove_bot(&mut self, name: &str) -> Option<Bot> {
        let pos = self.bots.iter().position(|b| b.name == name)?;
        Some(self.bots.remove(pos))
    }

    /// Remove and return every bot owned by `owner`.
    pub fn remove_bots_owned_by(&mut self, owner: SessionId) -> Vec<Bot> {
        let (owned, kept) = std::mem::take(&mut self.bots)
            .into_iter()
            .partition(|b| b.owner == owner);
        self.bots = kept;
        owned
    }
}

/// Force `requested` to spectator when taking a player slot would overflow
/// the battle or the battle is a replay.
///
/// `others` excludes the controller being updated.
pub fn apply_capacity(
    requested: BattleStatus,
    others: &[Controller],
    max_players: u32,
    replay: bool,
) -> BattleStatus {
    if !requested.is_player() {
        return requested;
    }
    let players = others.iter().filter(|c| c.status.is_player()).count();
    if replay || players as u64 + 1 > u64::from(max_players) {
        requested.with_mode(Mode::Spectator)
    } else {
        requested
    }
}

/// When a player shares a team slot with another active player, it must
/// also share that controller's ally team and colour.
pub fn align(
    status: BattleStatus,
    color: TeamColor,
    others: &[Controller],
) -> (BattleStatus, TeamColor) {
    if !status.is_player() {
        return (status, color);
    }
    match others
        .iter()
        .find(|c| c.status.is_player() && c.status.team() == status.team())
    {
        Some(other) => (status.with_ally(other.status.ally()), other.color),
        None => (status, color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn settings() -> BattleSettings {
        BattleSettings {
            kind: BattleKind::Normal,
            nat: 0,
            password: None,
            port: 8452,
            max_players: 2,
            game_hash: 77,
            rank: 0,
            map_hash: 5,
            engine_name: "spring".into(),
            engine_version: "105.0".into(),
            map: "Delta".into(),
            title: "test".into(),
            game_name: "BA".into(),
        }
    }

    fn player(team: u32, ally: u32, color: u32) -> Controller {
        Controller {
            who: ControllerRef::Bot(format!("b{team}")),
            status: BattleStatus::DEFAULT
                .with_mode(Mode::Player)
                .with_team(team)
                .with_ally(ally),
            color: TeamColor(color),
        }
    }

    #[test]
    fn roster_excludes_founder() {
        let mut battle = Battle::new(BattleId(1), SessionId(1), settings());
        battle.add_member(SessionId(1));
        battle.add_member(SessionId(2));
        battle.add_member(SessionId(2));
        assert_eq!(battle.members, [SessionId(2)]);
        assert!(battle.is_participant(SessionId(1)));
        assert_eq!(battle.participants().collect::<Vec<_>>(), [SessionId(1), SessionId(2)]);
    }

    #[test]
    fn bot_names_are_unique() {
        let mut battle = Battle::new(BattleId(1), SessionId(1), settings());
        let bot = Bot {
            name: "ai1".into(),
            owner: SessionId(2),
            status: BattleStatus::DEFAULT,
            color: TeamColor(0),
            ai: "KAIK".into(),
        };
        assert!(battle.add_bot(bot.clone()));
        assert!(!battle.add_bot(bot));
        let removed = battle.remove_bots_owned_by(SessionId(2));
        assert_eq!(removed.len(), 1);
        assert!(battle.bots.is_empty());
    }

    #[test]
    fn capacity_forces_spectator() {
        let want = BattleStatus::DEFAULT.with_mode(Mode::Player);
        let others = [player(0, 0, 0)];
        assert!(apply_capacity(want, &others, 2, false).is_player());
        let full = [player(0, 0, 0), player(1, 1, 0)];
        assert!(!apply_capacity(want, &full, 2, false).is_player());
        assert!(!apply_capacity(want, &[], 2, true).is_player());
    }

    #[test]
    fn spectators_do_not_count() {
        let want = BattleStatus::DEFAULT.with_mode(Mode::Player);
        let spec = Controller {
            status: BattleStatus::DEFAULT,
            ..player(0, 0, 0)
        };
        assert!(apply_capacity(want, &[spec.clone(), spec], 1, false).is_player());
    }

    #[test]
    fn shared_team_aligns_ally_and_color() {
        let mine = BattleStatus::DEFAULT
            .with_mode(Mode::Player)
            .with_team(3)
            .with_ally(1);
        let (status, color) = align(mine, TeamColor(1), &[player(3, 2, 0xABCDEF)]);
        assert_eq!(status.ally(), 2);
        assert_eq!(color, TeamColor(0xABCDEF));

        let (status, color) = align(mine, TeamColor(1), &[player(4, 2, 0xABCDEF)]);
        assert_eq!(status.ally(), 1);
        assert_eq!(color, TeamColor(1));
    }
}
