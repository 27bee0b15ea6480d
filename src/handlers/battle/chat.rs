//! SAYBATTLE, SAYBATTLEEX and RING handlers.

use crate::error::HandlerResult;
use crate::handlers::{CommandSpec, Context, Handler};
use lobby_proto::{ArgumentShape, Field, ParsedArguments};

/// Handler for SAYBATTLE and SAYBATTLEEX.
///
/// `SAYBATTLE {msg}` → `SAIDBATTLE user {msg}` to every participant.
pub struct SayBattleHandler {
    pub ex: bool,
}

impl Handler for SayBattleHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::sentences([Field::required("msg")])).in_battle()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let msg = args.text("msg")?;
        let bid = ctx.battle()?;
        let verb = if self.ex { "SAIDBATTLEEX" } else { "SAIDBATTLE" };
        let user = ctx.name();
        ctx.matrix
            .battle_broadcast(bid, &format!("{verb} {user} {msg}"));
        Ok(())
    }
}

/// Handler for RING command.
///
/// `RING user`
pub struct RingHandler;

impl Handler for RingHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([Field::required("user")]))
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let target = ctx.find_user(args.text("user")?)?;
        let sender = ctx.name();
        ctx.matrix.sessions.send(target, &format!("RING {sender}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::battle;
    use crate::state::testing::user;
    use std::time::Instant;

    #[test]
    fn battle_chat_stays_in_the_battle() {
        let (mut m, r, (a, mock_a), (_, mock_b)) = battle();
        let (_, mock_c) = user(&mut m, "carol");
        r.dispatch(&mut m, a, "SAYBATTLE gl hf", Instant::now()).unwrap();
        r.dispatch(&mut m, a, "SAYBATTLEEX is ready", Instant::now()).unwrap();
        let expected = ["SAIDBATTLE alice gl hf", "SAIDBATTLEEX alice is ready"];
        assert_eq!(mock_a.take_lines(), expected);
        assert_eq!(mock_b.take_lines(), expected);
        assert!(mock_c.take_lines().is_empty());
    }

    #[test]
    fn ring_reaches_the_target() {
        let (mut m, r, (a, _), (_, mock_b)) = battle();
        r.dispatch(&mut m, a, "RING bob", Instant::now()).unwrap();
        assert_eq!(mock_b.take_lines(), ["RING alice"]);
        assert!(r.dispatch(&mut m, a, "RING nobody", Instant::now()).is_err());
    }
}
