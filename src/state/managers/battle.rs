//! Battle registry and the battle membership protocol.
//!
//! [`BattleManager`] only stores battles. Opening, joining, leaving and
//! closing touch sessions as well, so those flows are implemented on
//! [`Matrix`] here.

use crate::error::{HandlerError, HandlerResult};
use crate::state::battle::{
    Battle, BattleId, BattleSettings, Controller, ControllerRef, align, apply_capacity,
};
use crate::state::{Matrix, SessionId};
use lobby_proto::{BattleStatus, TeamColor};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct BattleManager {
    battles: BTreeMap<BattleId, Battle>,
    next_id: u32,
}

impl Default for BattleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BattleManager {
    pub fn new() -> Self {
        Self {
            battles: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a battle and return its id.
    pub fn open(&mut self, founder: SessionId, settings: BattleSettings) -> BattleId {
        let id = BattleId(self.next_id);
        self.next_id += 1;
        self.battles.insert(id, Battle::new(id, founder, settings));
        id
    }

    pub fn get(&self, id: BattleId) -> Option<&Battle> {
        self.battles.get(&id)
    }

    pub fn get_mut(&mut self, id: BattleId) -> Option<&mut Battle> {
        self.battles.get_mut(&id)
    }

    pub fn remove(&mut self, id: BattleId) -> Option<Battle> {
        self.battles.remove(&id)
    }

    pub fn contains(&self, id: BattleId) -> bool {
        self.battles.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Battle> {
        self.battles.values()
    }

    pub fn len(&self) -> usize {
        self.battles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.battles.is_empty()
    }
}

/// Why a `JOINBATTLE` was refused, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleJoinRefusal {
    AlreadyInBattle,
    RequestPending,
    NoSuchBattle,
    Locked,
    BadPassword,
}

impl BattleJoinRefusal {
    pub fn reason(self) -> &'static str {
        match self {
            Self::AlreadyInBattle => "You are already in a battle",
            Self::RequestPending => "You already have a pending join request",
            Self::NoSuchBattle => "Battle does not exist",
            Self::Locked => "Battle is locked",
            Self::BadPassword => "Invalid password",
        }
    }
}

/// Outcome of a join request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AwaitingApproval,
}

impl Matrix {
    /// The battle a session belongs to.
    ///
    /// A session pointing at a battle that does not hold it is logged,
    /// repaired and reported as [`HandlerError::ProtocolState`].
    pub fn battle_of(&mut self, id: SessionId) -> Result<BattleId, HandlerError> {
        let Some(session) = self.sessions.get_mut(id) else {
            return Err(HandlerError::ProtocolState(format!("session {id} is gone")));
        };
        let Some(bid) = session.battle else {
            return Err(HandlerError::NotInBattle);
        };
        match self.battles.get(bid) {
            Some(battle) if battle.is_participant(id) => Ok(bid),
            _ => {
                error!(uid = %id, battle = %bid, "Dangling battle reference, clearing it");
                session.battle = None;
                session.battle_status = BattleStatus::DEFAULT;
                Err(HandlerError::ProtocolState(format!(
                    "battle {bid} does not hold this session"
                )))
            }
        }
    }

    /// `BATTLEOPENED` line describing a battle.
    pub fn battle_opened_line(&self, bid: BattleId) -> Option<String> {
        let battle = self.battles.get(bid)?;
        let founder = self.sessions.get(battle.founder)?;
        let s = &battle.settings;
        Some(format!(
            "BATTLEOPENED {bid} {} {} {} {} {} {} {} {} {} {}\t{}\t{}\t{}\t{}",
            s.kind.wire(),
            s.nat,
            founder.display_name(),
            founder.addr.ip(),
            s.port,
            s.max_players,
            u8::from(s.password.is_some()),
            s.rank,
            s.map_hash,
            s.engine_name,
            s.engine_version,
            s.map,
            s.title,
            s.game_name,
        ))
    }

    /// Open a battle founded by `founder`.
    pub fn open_battle(
        &mut self,
        founder: SessionId,
        settings: BattleSettings,
    ) -> Result<BattleId, BattleJoinRefusal> {
        let Some(session) = self.sessions.get_mut(founder) else {
            return Err(BattleJoinRefusal::NoSuchBattle);
        };
        if session.battle.is_some() {
            return Err(BattleJoinRefusal::AlreadyInBattle);
        }
        let bid = self.battles.open(founder, settings);
        session.battle = Some(bid);
        session.requested_battle = None;
        session.battle_status = BattleStatus::DEFAULT;
        session.color = TeamColor::default();
        info!(battle = %bid, founder = %session.display_name(), "Battle opened");

        if let Some(line) = self.battle_opened_line(bid) {
            self.sessions.broadcast_authenticated(&line, None);
        }
        self.sessions.send(founder, &format!("OPENBATTLE {bid}"));
        self.sessions.send(founder, "REQUESTBATTLESTATUS");
        Ok(bid)
    }

    /// Validate a join request and either complete it or ask the founder.
    pub fn request_join(
        &mut self,
        id: SessionId,
        bid: BattleId,
        password: Option<&str>,
        script_password: Option<String>,
    ) -> Result<JoinOutcome, BattleJoinRefusal> {
        let Some(session) = self.sessions.get(id) else {
            return Err(BattleJoinRefusal::NoSuchBattle);
        };
        if session.battle.is_some() {
            return Err(BattleJoinRefusal::AlreadyInBattle);
        }
        if session.requested_battle.is_some() {
            return Err(BattleJoinRefusal::RequestPending);
        }
        let Some(battle) = self.battles.get(bid) else {
            return Err(BattleJoinRefusal::NoSuchBattle);
        };
        if battle.locked {
            return Err(BattleJoinRefusal::Locked);
        }
        if let Some(ref expected) = battle.settings.password
            && password != Some(expected.as_str())
        {
            return Err(BattleJoinRefusal::BadPassword);
        }
        let founder = battle.founder;
        let needs_approval = self
            .sessions
            .get(founder)
            .is_some_and(|f| f.wants_join_approval());

        let user = session.display_name().to_owned();
        let ip = session.addr.ip();
        if let Some(session) = self.sessions.get_mut(id) {
            session.script_password = script_password;
        }

        if needs_approval {
            if let Some(session) = self.sessions.get_mut(id) {
                session.requested_battle = Some(bid);
            }
            self.sessions
                .send(founder, &format!("JOINBATTLEREQUEST {user} {ip}"));
            debug!(uid = %id, battle = %bid, "Join awaiting founder approval");
            return Ok(JoinOutcome::AwaitingApproval);
        }

        match self.complete_join(id, bid) {
            Ok(()) => Ok(JoinOutcome::Joined),
            Err(_) => Err(BattleJoinRefusal::NoSuchBattle),
        }
    }

    /// Founder's answer to a pending join request.
    pub fn answer_join_request(
        &mut self,
        founder: SessionId,
        user: &str,
        accept: bool,
        reason: Option<&str>,
    ) -> HandlerResult {
        let bid = self.battle_of(founder)?;
        let target = self
            .sessions
            .find_by_name(user)
            .ok_or_else(|| HandlerError::Rejected(format!("no such user: {user}")))?;
        let pending = self
            .sessions
            .get(target)
            .and_then(|s| s.requested_battle);
        if pending != Some(bid) {
            return Err(HandlerError::Rejected(format!(
                "{user} has not asked to join this battle"
            )));
        }

        if accept {
            return self.complete_join(target, bid);
        }
        if let Some(session) = self.sessions.get_mut(target) {
            session.requested_battle = None;
            session.script_password = None;
        }
        let line = match reason {
            Some(reason) => format!("JOINBATTLEFAILED Denied by battle founder: {reason}"),
            None => "JOINBATTLEFAILED Denied by battle founder".to_string(),
        };
        self.sessions.send(target, &line);
        Ok(())
    }

    /// Add a session to a battle and bring it up to date.
    ///
    /// The joiner receives, in one fast write: the confirmation, everyone's
    /// battle status, the bots, a status request, disabled units, start
    /// rectangles, script tags and the replay script when there is one.
    /// Everyone else learns about the join, and the founder additionally
    /// gets the joiner's address when the battle uses NAT hole punching.
    pub fn complete_join(&mut self, id: SessionId, bid: BattleId) -> HandlerResult {
        let Some(battle) = self.battles.get_mut(bid) else {
            if let Some(session) = self.sessions.get_mut(id) {
                session.requested_battle = None;
            }
            return Err(HandlerError::ProtocolState(format!("battle {bid} is gone")));
        };
        battle.add_member(id);
        let battle = &*battle;

        let Some(session) = self.sessions.get_mut(id) else {
            return Err(HandlerError::ProtocolState(format!("session {id} is gone")));
        };
        session.battle = Some(bid);
        session.requested_battle = None;
        session.battle_status = BattleStatus::DEFAULT;
        session.color = TeamColor::default();
        let user = session.display_name().to_owned();
        let addr = session.addr;
        let script_password = session.script_password.clone();

        let founder = battle.founder;
        let statuses: Vec<String> = battle
            .participants()
            .filter(|p| *p != id)
            .filter_map(|p| self.sessions.get(p))
            .map(|p| {
                format!(
                    "CLIENTBATTLESTATUS {} {} {}",
                    p.display_name(),
                    p.battle_status.0,
                    p.color.0
                )
            })
            .collect();
        let bots: Vec<String> = battle
            .bots
            .iter()
            .map(|b| {
                format!(
                    "ADDBOT {bid} {} {} {} {} {}",
                    b.name,
                    self.sessions.get(b.owner).map_or("-", |o| o.display_name()),
                    b.status.0,
                    b.color.0,
                    b.ai
                )
            })
            .collect();
        let game_hash = battle.settings.game_hash;
        let nat = battle.settings.nat;
        let disabled: Vec<String> = battle.disabled_units.iter().cloned().collect();
        let rects: Vec<String> = battle
            .start_rects
            .iter()
            .map(|(ally, r)| format!("ADDSTARTRECT {ally} {} {} {} {}", r.left, r.top, r.right, r.bottom))
            .collect();
        let tags: Vec<String> = battle
            .script_tags
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        let replay: Option<Vec<String>> = (battle.is_replay() && !battle.replay_script.is_empty())
            .then(|| battle.replay_script.clone());

        self.sessions.begin_batch(id);
        self.sessions.send(id, &format!("JOINBATTLE {bid} {game_hash}"));

        let others: Vec<SessionId> = self
            .sessions
            .authenticated()
            .map(|s| s.id)
            .filter(|s| *s != id)
            .collect();
        for other in others {
            let line = match (&script_password, other == founder) {
                (Some(pw), true) => format!("JOINEDBATTLE {bid} {user} {pw}"),
                _ => format!("JOINEDBATTLE {bid} {user}"),
            };
            self.sessions.send(other, &line);
        }

        for line in &statuses {
            self.sessions.send(id, line);
        }
        for line in &bots {
            self.sessions.send(id, line);
        }
        if nat == 1 {
            self.sessions.send(
                founder,
                &format!("CLIENTIPPORT {user} {} {}", addr.ip(), addr.port()),
            );
        }
        self.sessions.send(id, "REQUESTBATTLESTATUS");
        if !disabled.is_empty() {
            self.sessions
                .send(id, &format!("DISABLEUNITS {}", disabled.join(" ")));
        }
        for line in &rects {
            self.sessions.send(id, line);
        }
        if !tags.is_empty() {
            self.sessions
                .send(id, &format!("SETSCRIPTTAGS {}", tags.join("\t")));
        }
        if let Some(script) = replay {
            self.sessions.send(id, "SCRIPTSTART");
            for line in &script {
                self.sessions.send(id, &format!("SCRIPT {line}"));
            }
            self.sessions.send(id, "SCRIPTEND");
        }
        self.sessions.end_batch(id);

        info!(uid = %id, user = %user, battle = %bid, "Joined battle");
        Ok(())
    }

    /// Leave the current battle. A founder leaving closes it.
    pub fn leave_battle(&mut self, id: SessionId) -> HandlerResult {
        let bid = self.battle_of(id)?;
        let Some(battle) = self.battles.get_mut(bid) else {
            return Err(HandlerError::ProtocolState(format!("battle {bid} is gone")));
        };
        if battle.is_founder(id) {
            self.close_battle(bid);
            return Ok(());
        }

        battle.remove_member(id);
        let bots = battle.remove_bots_owned_by(id);
        let participants: Vec<SessionId> = battle.participants().collect();

        let user = match self.sessions.get_mut(id) {
            Some(session) => {
                session.battle = None;
                session.battle_status = BattleStatus::DEFAULT;
                session.script_password = None;
                session.display_name().to_owned()
            }
            None => String::from("-"),
        };
        for bot in bots {
            self.sessions
                .send_all(participants.iter().copied(), &format!("REMOVEBOT {bid} {}", bot.name));
        }
        self.sessions
            .broadcast_authenticated(&format!("LEFTBATTLE {bid} {user}"), None);
        debug!(uid = %id, user = %user, battle = %bid, "Left battle");
        Ok(())
    }

    /// Close a battle: every participant leaves, pending requests are dropped.
    pub fn close_battle(&mut self, bid: BattleId) {
        let Some(battle) = self.battles.remove(bid) else {
            return;
        };
        for id in battle.participants() {
            if let Some(session) = self.sessions.get_mut(id) {
                session.battle = None;
                session.battle_status = BattleStatus::DEFAULT;
                session.script_password = None;
            }
        }
        for id in self.sessions.ids() {
            if let Some(session) = self.sessions.get_mut(id)
                && session.requested_battle == Some(bid)
            {
                session.requested_battle = None;
                session.script_password = None;
            }
        }
        self.sessions
            .broadcast_authenticated(&format!("BATTLECLOSED {bid}"), None);
        info!(battle = %bid, "Battle closed");
    }

    /// Send a line to the founder and every roster member.
    pub fn battle_broadcast(&mut self, bid: BattleId, line: &str) {
        let participants: Vec<SessionId> = match self.battles.get(bid) {
            Some(battle) => battle.participants().collect(),
            None => return,
        };
        self.sessions.send_all(participants, line);
    }

    /// Every controller in a battle except `except`.
    pub fn controllers(&self, bid: BattleId, except: &ControllerRef) -> Vec<Controller> {
        let Some(battle) = self.battles.get(bid) else {
            return Vec::new();
        };
        let sessions = battle.participants().filter_map(|p| self.sessions.get(p)).map(|s| Controller {
            who: ControllerRef::Session(s.id),
            status: s.battle_status,
            color: s.color,
        });
        let bots = battle.bots.iter().map(|b| Controller {
            who: ControllerRef::Bot(b.name.clone()),
            status: b.status,
            color: b.color,
        });
        sessions.chain(bots).filter(|c| &c.who != except).collect()
    }

    /// Apply a battle status change for a participant and announce it.
    ///
    /// The capacity rule runs first, then team alignment.
    pub fn set_participant_status(
        &mut self,
        id: SessionId,
        requested: BattleStatus,
        color: TeamColor,
    ) -> HandlerResult {
        let bid = self.battle_of(id)?;
        let (max_players, replay) = match self.battles.get(bid) {
            Some(b) => (b.settings.max_players, b.is_replay()),
            None => return Err(HandlerError::ProtocolState(format!("battle {bid} is gone"))),
        };
        let others = self.controllers(bid, &ControllerRef::Session(id));
        let status = apply_capacity(requested, &others, max_players, replay);
        let (status, color) = align(status, color, &others);

        let Some(session) = self.sessions.get_mut(id) else {
            return Err(HandlerError::ProtocolState(format!("session {id} is gone")));
        };
        session.battle_status = status;
        session.color = color;
        let line = format!(
            "CLIENTBATTLESTATUS {} {} {}",
            session.display_name(),
            status.0,
            color.0
        );
        self.battle_broadcast(bid, &line);
        Ok(())
    }

    /// Apply a battle status change for a bot and announce it.
    pub fn set_bot_status(
        &mut self,
        bid: BattleId,
        name: &str,
        requested: BattleStatus,
        color: TeamColor,
    ) -> HandlerResult {
        let (max_players, replay) = match self.battles.get(bid) {
            Some(b) => (b.settings.max_players, b.is_replay()),
            None => return Err(HandlerError::ProtocolState(format!("battle {bid} is gone"))),
        };
        let others = self.controllers(bid, &ControllerRef::Bot(name.to_string()));
        let status = apply_capacity(requested, &others, max_players, replay);
        let (status, color) = align(status, color, &others);

        let bot = self
            .battles
            .get_mut(bid)
            .and_then(|b| b.bot_mut(name))
            .ok_or_else(|| HandlerError::Rejected(format!("no such bot: {name}")))?;
        bot.status = status;
        bot.color = color;
        self.battle_broadcast(bid, &format!("UPDATEBOT {bid} {name} {} {}", status.0, color.0));
        Ok(())
    }
}
