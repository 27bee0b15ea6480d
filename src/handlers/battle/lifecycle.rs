//! OPENBATTLE, JOINBATTLE, JOINBATTLEACCEPT/DENY, LEAVEBATTLE,
//! KICKFROMBATTLE and FORCEJOINBATTLE.

use super::member_of;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::helpers::u32_arg;
use crate::handlers::{CommandSpec, Context, Handler};
use crate::state::{Access, BattleId, BattleKind, BattleSettings};
use lobby_proto::{ArgumentShape, Field, ParsedArguments};
use tracing::info;

/// Handler for OPENBATTLE command.
///
/// `OPENBATTLE type nat password port maxPlayers gameHash rank mapHash
/// {engineName} {engineVersion} {map} {title} {gameName}`
pub struct OpenBattleHandler;

impl OpenBattleHandler {
    fn settings(args: &ParsedArguments) -> Result<BattleSettings, String> {
        let kind = match args.int("type").map_err(|e| e.to_string())? {
            0 => BattleKind::Normal,
            1 => BattleKind::Replay,
            other => return Err(format!("Invalid battle type {other}")),
        };
        let nat = match args.int("nat").map_err(|e| e.to_string())? {
            n @ 0..=2 => n as u8,
            other => return Err(format!("Invalid NAT type {other}")),
        };
        let port = args.int("port").map_err(|e| e.to_string())?;
        let port = u16::try_from(port).map_err(|_| format!("Invalid port {port}"))?;
        let max = args.int("maxPlayers").map_err(|e| e.to_string())?;
        let max_players = u32::try_from(max)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| format!("Invalid player limit {max}"))?;
        let rank = args.int("rank").map_err(|e| e.to_string())?;
        let rank = u32::try_from(rank).map_err(|_| format!("Invalid rank {rank}"))?;
        let text = |name: &'static str| args.text(name).map(str::to_owned).map_err(|e| e.to_string());

        Ok(BattleSettings {
            kind,
            nat,
            password: Some(text("password")?).filter(|p| p != "*"),
            port,
            max_players,
            game_hash: args.int("gameHash").map_err(|e| e.to_string())?,
            rank,
            map_hash: args.int("mapHash").map_err(|e| e.to_string())?,
            engine_name: text("engineName")?,
            engine_version: text("engineVersion")?,
            map: text("map")?,
            title: text("title")?,
            game_name: text("gameName")?,
        })
    }
}

impl Handler for OpenBattleHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(
            ArgumentShape::words([
                Field::required("type").int(),
                Field::required("nat").int(),
                Field::required("password"),
                Field::required("port").int(),
                Field::required("maxPlayers").int(),
                Field::required("gameHash").int(),
                Field::required("rank").int(),
                Field::required("mapHash").int(),
            ])
            .then_sentences([
                Field::required("engineName"),
                Field::required("engineVersion"),
                Field::required("map"),
                Field::required("title"),
                Field::required("gameName"),
            ]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let settings = match Self::settings(args) {
            Ok(settings) => settings,
            Err(reason) => {
                ctx.reply(format!("OPENBATTLEFAILED {reason}"));
                return Ok(());
            }
        };
        if let Err(refusal) = ctx.matrix.open_battle(ctx.id, settings) {
            ctx.reply(format!("OPENBATTLEFAILED {}", refusal.reason()));
        }
        Ok(())
    }
}

/// Handler for JOINBATTLE command.
///
/// `JOINBATTLE id [password] [scriptPassword]`
pub struct JoinBattleHandler;

impl Handler for JoinBattleHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([
            Field::required("battleID").long(),
            Field::optional("password"),
            Field::optional("scriptPassword"),
        ]))
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let bid = BattleId(u32_arg(args, "battleID")?);
        let password = args.opt_text("password").filter(|p| *p != "*");
        let script_password = args.opt_text("scriptPassword").map(str::to_owned);
        if let Err(refusal) = ctx.matrix.request_join(ctx.id, bid, password, script_password) {
            ctx.reply(format!("JOINBATTLEFAILED {}", refusal.reason()));
        }
        Ok(())
    }
}

/// Handler for JOINBATTLEACCEPT and JOINBATTLEDENY.
///
/// `JOINBATTLEACCEPT user` / `JOINBATTLEDENY user [{reason}]`
pub struct JoinBattleAnswerHandler {
    pub accept: bool,
}

impl Handler for JoinBattleAnswerHandler {
    fn describe(&self) -> CommandSpec {
        let shape = ArgumentShape::words([Field::required("user")]);
        let shape = if self.accept {
            shape
        } else {
            shape.then_sentences([Field::optional("reason")])
        };
        CommandSpec::user(shape).founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let user = args.text("user")?;
        ctx.matrix
            .answer_join_request(ctx.id, user, self.accept, args.opt_text("reason"))
    }
}

/// Handler for LEAVEBATTLE command.
pub struct LeaveBattleHandler;

impl Handler for LeaveBattleHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::none()).in_battle()
    }

    fn handle(&self, ctx: &mut Context<'_>, _args: &ParsedArguments) -> HandlerResult {
        ctx.matrix.leave_battle(ctx.id)
    }
}

/// Handler for KICKFROMBATTLE command.
///
/// `KICKFROMBATTLE user`: the target is told to quit, then leaves exactly as
/// if it had sent `LEAVEBATTLE` itself.
pub struct KickFromBattleHandler;

impl Handler for KickFromBattleHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([Field::required("user")])).founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let name = args.text("user")?;
        let bid = ctx.battle()?;
        let target = member_of(ctx, bid, name)?;
        if target == ctx.id {
            return Err(HandlerError::Rejected("cannot kick yourself".into()));
        }
        info!(battle = %bid, user = %name, by = %ctx.name(), "Kicked from battle");
        ctx.matrix.sessions.send(target, "FORCEQUITBATTLE");
        ctx.dispatch_as(target, "LEAVEBATTLE")
    }
}

/// Handler for FORCEJOINBATTLE command.
///
/// `FORCEJOINBATTLE user battleID [password]`. The target client is asked to
/// move; it performs the leave and join itself.
pub struct ForceJoinBattleHandler;

impl Handler for ForceJoinBattleHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::new(
            Access::Privileged,
            ArgumentShape::words([
                Field::required("user"),
                Field::required("battleID").long(),
                Field::optional("password"),
            ]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let name = args.text("user")?;
        let target = ctx.find_user(name)?;
        let bid = BattleId(u32_arg(args, "battleID")?);
        if !ctx.matrix.battles.contains(bid) {
            return Err(HandlerError::Rejected(format!("battle {bid} does not exist")));
        }
        if ctx.matrix.sessions.get(target).and_then(|s| s.battle) == Some(bid) {
            return Err(HandlerError::Rejected(format!("{name} is already in battle {bid}")));
        }

        let line = match args.opt_text("password") {
            Some(password) => format!("FORCEJOINBATTLE {bid} {password}"),
            None => format!("FORCEJOINBATTLE {bid}"),
        };
        info!(battle = %bid, user = %name, by = %ctx.name(), "Forced into battle");
        ctx.matrix.sessions.send(target, &line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{OPEN, battle};
    use crate::handlers::Registry;
    use crate::state::testing::{connect, matrix, user};
    use crate::state::{Access, BattleId};
    use std::time::Instant;

    #[test]
    fn open_and_join_announce_to_everyone() {
        let mut m = matrix();
        let r = Registry::new(4, false).unwrap();
        let now = Instant::now();
        let (a, mock_a) = user(&mut m, "alice");
        let (b, mock_b) = user(&mut m, "bob");

        r.dispatch(&mut m, a, OPEN, now).unwrap();
        let lines = mock_a.take_lines();
        assert!(lines[0].starts_with("BATTLEOPENED 1 0 0 alice "));
        assert_eq!(lines[1..], ["OPENBATTLE 1", "REQUESTBATTLESTATUS"]);
        assert_eq!(mock_b.take_lines().len(), 1);

        r.dispatch(&mut m, b, "JOINBATTLE 1", now).unwrap();
        let lines = mock_b.take_lines();
        assert_eq!(lines[0], "JOINBATTLE 1 77");
        assert!(lines.contains(&"REQUESTBATTLESTATUS".to_string()));
        assert_eq!(mock_a.take_lines(), ["JOINEDBATTLE 1 bob"]);
    }

    #[test]
    fn second_open_fails() {
        let (mut m, r, (a, mock_a), _) = battle();
        r.dispatch(&mut m, a, OPEN, Instant::now()).unwrap();
        assert_eq!(mock_a.take_lines(), ["OPENBATTLEFAILED You are already in a battle"]);
    }

    #[test]
    fn bad_settings_fail_without_opening() {
        let mut m = matrix();
        let r = Registry::new(4, false).unwrap();
        let (a, mock_a) = user(&mut m, "alice");
        let line = "OPENBATTLE 7 0 * 8452 4 77 0 5 spring\t105.0\tDelta\tfun\tBA";
        r.dispatch(&mut m, a, line, Instant::now()).unwrap();
        assert_eq!(mock_a.take_lines(), ["OPENBATTLEFAILED Invalid battle type 7"]);
        assert!(m.battles.is_empty());
    }

    #[test]
    fn join_failures_follow_check_order() {
        let (mut m, r, _, (b, mock_b)) = battle();
        let now = Instant::now();
        r.dispatch(&mut m, b, "JOINBATTLE 1", now).unwrap();
        assert_eq!(mock_b.take_lines(), ["JOINBATTLEFAILED You are already in a battle"]);

        let (c, mock_c) = user(&mut m, "carol");
        r.dispatch(&mut m, c, "JOINBATTLE 9", now).unwrap();
        assert_eq!(mock_c.take_lines(), ["JOINBATTLEFAILED Battle does not exist"]);

        m.battles.get_mut(BattleId(1)).unwrap().locked = true;
        r.dispatch(&mut m, c, "JOINBATTLE 1", now).unwrap();
        assert_eq!(mock_c.take_lines(), ["JOINBATTLEFAILED Battle is locked"]);
    }

    #[test]
    fn founder_approval_flow() {
        let (mut m, r, (a, mock_a), _) = battle();
        let now = Instant::now();
        m.sessions.get_mut(a).unwrap().compat.insert("b".into());
        let (c, mock_c) = user(&mut m, "carol");
        let (d, mock_d) = user(&mut m, "dave");

        r.dispatch(&mut m, c, "JOINBATTLE 1", now).unwrap();
        let request = mock_a.take_lines();
        assert_eq!(request.len(), 1);
        assert!(request[0].starts_with("JOINBATTLEREQUEST carol "));
        assert!(mock_c.take_lines().is_empty());
        r.dispatch(&mut m, a, "JOINBATTLEACCEPT carol", now).unwrap();
        assert_eq!(mock_c.take_lines()[0], "JOINBATTLE 1 77");

        r.dispatch(&mut m, d, "JOINBATTLE 1", now).unwrap();
        r.dispatch(&mut m, a, "JOINBATTLEDENY dave\tnot today", now).unwrap();
        assert!(
            mock_d
                .take_lines()
                .contains(&"JOINBATTLEFAILED Denied by battle founder: not today".to_string())
        );
        assert_eq!(m.sessions.get(d).unwrap().requested_battle, None);
    }

    #[test]
    fn only_the_founder_answers() {
        let (mut m, r, _, (b, mock_b)) = battle();
        assert!(r.dispatch(&mut m, b, "JOINBATTLEACCEPT carol", Instant::now()).is_err());
        assert_eq!(
            mock_b.take_lines(),
            ["SERVERMSG JOINBATTLEACCEPT failed: not the founder of battle 1"]
        );
    }

    #[test]
    fn kick_runs_leave_for_the_target() {
        let (mut m, r, (a, mock_a), (b, mock_b)) = battle();
        r.dispatch(&mut m, a, "KICKFROMBATTLE bob", Instant::now()).unwrap();
        assert_eq!(mock_b.take_lines(), ["FORCEQUITBATTLE", "LEFTBATTLE 1 bob"]);
        assert_eq!(mock_a.take_lines(), ["LEFTBATTLE 1 bob"]);
        assert_eq!(m.sessions.get(b).unwrap().battle, None);
        assert!(r.dispatch(&mut m, a, "KICKFROMBATTLE alice", Instant::now()).is_err());
    }

    #[test]
    fn founder_leaving_closes_the_battle() {
        let (mut m, r, (a, _), (b, mock_b)) = battle();
        r.dispatch(&mut m, a, "LEAVEBATTLE", Instant::now()).unwrap();
        assert_eq!(mock_b.take_lines(), ["BATTLECLOSED 1"]);
        assert_eq!(m.sessions.get(b).unwrap().battle, None);
        assert!(m.battles.is_empty());
    }

    #[test]
    fn force_join_validation_order() {
        let (mut m, r, _, (_, mock_b)) = battle();
        let now = Instant::now();
        let (op, mock_op) = connect(&mut m, Some("op"), Access::Privileged);

        assert!(r.dispatch(&mut m, op, "FORCEJOINBATTLE nobody 9", now).is_err());
        assert_eq!(
            mock_op.take_lines(),
            ["SERVERMSG FORCEJOINBATTLE failed: user nobody is not online"]
        );
        assert!(r.dispatch(&mut m, op, "FORCEJOINBATTLE bob 9", now).is_err());
        assert_eq!(
            mock_op.take_lines(),
            ["SERVERMSG FORCEJOINBATTLE failed: battle 9 does not exist"]
        );
        assert!(r.dispatch(&mut m, op, "FORCEJOINBATTLE bob 1", now).is_err());
        assert_eq!(
            mock_op.take_lines(),
            ["SERVERMSG FORCEJOINBATTLE failed: bob is already in battle 1"]
        );

        let (_c, mock_c) = user(&mut m, "carol");
        r.dispatch(&mut m, op, "FORCEJOINBATTLE carol 1 pw", now).unwrap();
        assert_eq!(mock_c.take_lines(), ["FORCEJOINBATTLE 1 pw"]);
        assert!(mock_b.take_lines().is_empty());
    }
}
