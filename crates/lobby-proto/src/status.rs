//! Packed status words exchanged on the wire.
//!
//! Both statuses travel as decimal integers; the bit layout is fixed by the
//! protocol and clients decode it themselves.

/// Lobby-wide client status (`CLIENTSTATUS`).
///
/// ```text
/// bit 0      in game
/// bit 1      away
/// bits 2-4   rank
/// bit 5      moderator
/// bit 6      bot
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ClientStatus(pub u32);

impl ClientStatus {
    const IN_GAME: u32 = 1;
    const AWAY: u32 = 1 << 1;
    const RANK_SHIFT: u32 = 2;
    const RANK_MASK: u32 = 0b111 << Self::RANK_SHIFT;
    const MODERATOR: u32 = 1 << 5;
    const BOT: u32 = 1 << 6;

    pub fn in_game(self) -> bool {
        self.0 & Self::IN_GAME != 0
    }

    pub fn away(self) -> bool {
        self.0 & Self::AWAY != 0
    }

    pub fn rank(self) -> u32 {
        (self.0 & Self::RANK_MASK) >> Self::RANK_SHIFT
    }

    pub fn with_rank(self, rank: u32) -> Self {
        Self((self.0 & !Self::RANK_MASK) | ((rank.min(7) << Self::RANK_SHIFT) & Self::RANK_MASK))
    }

    pub fn moderator(self) -> bool {
        self.0 & Self::MODERATOR != 0
    }

    pub fn with_moderator(self, on: bool) -> Self {
        Self(set_bit(self.0, Self::MODERATOR, on))
    }

    pub fn bot(self) -> bool {
        self.0 & Self::BOT != 0
    }

    pub fn with_bot(self, on: bool) -> Self {
        Self(set_bit(self.0, Self::BOT, on))
    }

    /// Take only the client-controlled bits (in game, away) from `requested`,
    /// keeping the server-controlled ones from `self`.
    pub fn merge_client_bits(self, requested: ClientStatus) -> Self {
        let client = Self::IN_GAME | Self::AWAY;
        Self((self.0 & !client) | (requested.0 & client))
    }
}

/// Whether a battle participant plays or watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Spectator,
    Player,
}

/// Per-battle status (`CLIENTBATTLESTATUS`, `ADDBOT`, `UPDATEBOT`).
///
/// ```text
/// bit 1       ready
/// bits 2-5    team number
/// bits 6-9    ally team number
/// bit 10      mode (0 = spectator, 1 = player)
/// bits 11-17  handicap (0-100)
/// bits 22-23  sync status
/// bits 24-27  side
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BattleStatus(pub u32);

impl BattleStatus {
    const READY: u32 = 1 << 1;
    const TEAM_SHIFT: u32 = 2;
    const TEAM_MASK: u32 = 0xF << Self::TEAM_SHIFT;
    const ALLY_SHIFT: u32 = 6;
    const ALLY_MASK: u32 = 0xF << Self::ALLY_SHIFT;
    const MODE: u32 = 1 << 10;
    const HANDICAP_SHIFT: u32 = 11;
    const HANDICAP_MASK: u32 = 0x7F << Self::HANDICAP_SHIFT;
    const SYNC_SHIFT: u32 = 22;
    const SYNC_MASK: u32 = 0b11 << Self::SYNC_SHIFT;
    const SIDE_SHIFT: u32 = 24;
    const SIDE_MASK: u32 = 0xF << Self::SIDE_SHIFT;

    /// Status a freshly joined participant starts with: spectator, team 0.
    pub const DEFAULT: BattleStatus = BattleStatus(0);

    pub fn ready(self) -> bool {
        self.0 & Self::READY != 0
    }

    pub fn with_ready(self, on: bool) -> Self {
        Self(set_bit(self.0, Self::READY, on))
    }

    pub fn team(self) -> u32 {
        (self.0 & Self::TEAM_MASK) >> Self::TEAM_SHIFT
    }

    pub fn with_team(self, team: u32) -> Self {
        Self(set_field(self.0, Self::TEAM_MASK, Self::TEAM_SHIFT, team))
    }

    pub fn ally(self) -> u32 {
        (self.0 & Self::ALLY_MASK) >> Self::ALLY_SHIFT
    }

    pub fn with_ally(self, ally: u32) -> Self {
        Self(set_field(self.0, Self::ALLY_MASK, Self::ALLY_SHIFT, ally))
    }

    pub fn mode(self) -> Mode {
        if self.0 & Self::MODE != 0 {
            Mode::Player
        } else {
            Mode::Spectator
        }
    }

    pub fn is_player(self) -> bool {
        self.mode() == Mode::Player
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        Self(set_bit(self.0, Self::MODE, mode == Mode::Player))
    }

    pub fn handicap(self) -> u32 {
        (self.0 & Self::HANDICAP_MASK) >> Self::HANDICAP_SHIFT
    }

    /// Handicap is clamped to 0-100.
    pub fn with_handicap(self, handicap: u32) -> Self {
        Self(set_field(
            self.0,
            Self::HANDICAP_MASK,
            Self::HANDICAP_SHIFT,
            handicap.min(100),
        ))
    }

    pub fn sync(self) -> u32 {
        (self.0 & Self::SYNC_MASK) >> Self::SYNC_SHIFT
    }

    pub fn side(self) -> u32 {
        (self.0 & Self::SIDE_MASK) >> Self::SIDE_SHIFT
    }
}

/// Team colour packed as `0x00BBGGRR`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TeamColor(pub u32);

impl TeamColor {
    pub fn rgb(self) -> (u8, u8, u8) {
        let [r, g, b, _] = self.0.to_le_bytes();
        (r, g, b)
    }
}

fn set_bit(word: u32, bit: u32, on: bool) -> u32 {
    if on {
        word | bit
    } else {
        word & !bit
    }
}

fn set_field(word: u32, mask: u32, shift: u32, value: u32) -> u32 {
    (word & !mask) | ((value << shift) & mask)
}
