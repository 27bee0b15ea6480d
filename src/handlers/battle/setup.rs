//! Founder-only battle setup: disabled units, start rectangles, script tags
//! and the replay script.

use super::relay;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::helpers::u32_arg;
use crate::handlers::{CommandSpec, Context, Handler};
use crate::state::{Battle, StartRect};
use lobby_proto::{ArgumentShape, Field, ParsedArguments, Value};
use std::collections::BTreeMap;

/// Run `f` on the issuer's battle.
fn with_battle<T>(
    ctx: &mut Context<'_>,
    f: impl FnOnce(&mut Battle) -> T,
) -> Result<T, HandlerError> {
    let bid = ctx.battle()?;
    ctx.matrix
        .battles
        .get_mut(bid)
        .map(f)
        .ok_or_else(|| HandlerError::ProtocolState(format!("battle {bid} is gone")))
}

fn unit_names(args: &ParsedArguments) -> Vec<String> {
    args.variadic()
        .iter()
        .filter_map(Value::as_text)
        .map(str::to_owned)
        .collect()
}

/// Handler for DISABLEUNITS command.
///
/// `DISABLEUNITS unit...`
pub struct DisableUnitsHandler;

impl Handler for DisableUnitsHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::none().then_variadic(Field::required("unit")))
            .founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let units = unit_names(args);
        with_battle(ctx, |b| b.disabled_units.extend(units.iter().cloned()))?;
        let bid = ctx.battle()?;
        relay(ctx, bid, &format!("DISABLEUNITS {}", units.join(" ")));
        Ok(())
    }
}

/// Handler for ENABLEUNITS command.
///
/// `ENABLEUNITS unit...`
pub struct EnableUnitsHandler;

impl Handler for EnableUnitsHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::none().then_variadic(Field::required("unit")))
            .founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let units = unit_names(args);
        with_battle(ctx, |b| {
            for unit in &units {
                b.disabled_units.remove(unit);
            }
        })?;
        let bid = ctx.battle()?;
        relay(ctx, bid, &format!("ENABLEUNITS {}", units.join(" ")));
        Ok(())
    }
}

/// Handler for ENABLEALLUNITS command.
pub struct EnableAllUnitsHandler;

impl Handler for EnableAllUnitsHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::none()).founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, _args: &ParsedArguments) -> HandlerResult {
        with_battle(ctx, |b| b.disabled_units.clear())?;
        let bid = ctx.battle()?;
        relay(ctx, bid, "ENABLEALLUNITS");
        Ok(())
    }
}

/// Handler for ADDSTARTRECT and REMOVESTARTRECT.
///
/// `ADDSTARTRECT ally left top right bottom` / `REMOVESTARTRECT ally`.
/// Coordinates are fractions of the map in 0..=200.
pub struct StartRectHandler {
    pub add: bool,
}

impl Handler for StartRectHandler {
    fn describe(&self) -> CommandSpec {
        let mut fields = vec![Field::required("ally").long()];
        if self.add {
            fields.extend(
                ["left", "top", "right", "bottom"].map(|name| Field::required(name).long()),
            );
        }
        CommandSpec::user(ArgumentShape::words(fields)).founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let ally = u32_arg(args, "ally")?;
        let max_ally = ctx.matrix.config.limits.max_ally_teams;
        if ally >= max_ally {
            return Err(HandlerError::Rejected(format!(
                "ally team {ally} exceeds the engine limit of {max_ally}"
            )));
        }

        if !self.add {
            with_battle(ctx, |b| b.start_rects.remove(&ally))?;
            let bid = ctx.battle()?;
            relay(ctx, bid, &format!("REMOVESTARTRECT {ally}"));
            return Ok(());
        }

        let coord = |name: &'static str| -> Result<u32, HandlerError> {
            let value = u32_arg(args, name)?;
            if value > 200 {
                return Err(HandlerError::Rejected(format!("{name} out of range: {value}")));
            }
            Ok(value)
        };
        let rect = StartRect {
            left: coord("left")?,
            top: coord("top")?,
            right: coord("right")?,
            bottom: coord("bottom")?,
        };
        with_battle(ctx, |b| b.start_rects.insert(ally, rect))?;
        let bid = ctx.battle()?;
        relay(
            ctx,
            bid,
            &format!(
                "ADDSTARTRECT {ally} {} {} {} {}",
                rect.left, rect.top, rect.right, rect.bottom
            ),
        );
        Ok(())
    }
}

/// Handler for SETSCRIPTTAGS command.
///
/// `SETSCRIPTTAGS {key=value}...`. Keys are stored lower-cased.
pub struct SetScriptTagsHandler;

impl Handler for SetScriptTagsHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::open_named()).founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let tags: BTreeMap<String, String> = args
            .named()
            .iter()
            .filter_map(|(k, v)| v.as_text().map(|v| (k.to_ascii_lowercase(), v.to_string())))
            .collect();
        if tags.is_empty() {
            return Ok(());
        }
        with_battle(ctx, |b| b.script_tags.extend(tags.clone()))?;
        let pairs: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let bid = ctx.battle()?;
        ctx.matrix
            .battle_broadcast(bid, &format!("SETSCRIPTTAGS {}", pairs.join("\t")));
        Ok(())
    }
}

/// Handler for REMOVESCRIPTTAGS command.
///
/// `REMOVESCRIPTTAGS key...`
pub struct RemoveScriptTagsHandler;

impl Handler for RemoveScriptTagsHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::none().then_variadic(Field::required("key")))
            .founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let keys: Vec<String> = unit_names(args)
            .into_iter()
            .map(|k| k.to_ascii_lowercase())
            .collect();
        with_battle(ctx, |b| {
            for key in &keys {
                b.script_tags.remove(key);
            }
        })?;
        let bid = ctx.battle()?;
        ctx.matrix
            .battle_broadcast(bid, &format!("REMOVESCRIPTTAGS {}", keys.join(" ")));
        Ok(())
    }
}

/// Step of a `SCRIPTSTART`, `SCRIPT`, `SCRIPTEND` upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPhase {
    Start,
    Line,
    End,
}

/// Handler for SCRIPTSTART, SCRIPT and SCRIPTEND.
///
/// The founder uploads the start script line by line; once complete it
/// replaces the stored script that replay battles send to joiners.
pub struct ScriptHandler(pub ScriptPhase);

impl Handler for ScriptHandler {
    fn describe(&self) -> CommandSpec {
        let shape = match self.0 {
            ScriptPhase::Line => ArgumentShape::sentences([Field::required("line")]),
            ScriptPhase::Start | ScriptPhase::End => ArgumentShape::none(),
        };
        CommandSpec::user(shape).founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let phase = self.0;
        let line = match phase {
            ScriptPhase::Line => Some(args.text("line")?.to_string()),
            _ => None,
        };
        let accepted = with_battle(ctx, |b| match phase {
            ScriptPhase::Start => {
                b.script_draft = Some(Vec::new());
                true
            }
            ScriptPhase::Line => match (b.script_draft.as_mut(), line) {
                (Some(draft), Some(line)) => {
                    draft.push(line);
                    true
                }
                _ => false,
            },
            ScriptPhase::End => match b.script_draft.take() {
                Some(draft) => {
                    b.replay_script = draft;
                    true
                }
                None => false,
            },
        })?;
        if !accepted {
            return Err(HandlerError::Rejected("no script upload in progress".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{OPEN, battle};
    use crate::handlers::Registry;
    use crate::state::BattleId;
    use crate::state::testing::{matrix, user};
    use std::time::Instant;

    #[test]
    fn units_and_rects_reach_members_and_later_joiners() {
        let (mut m, r, (a, mock_a), (_, mock_b)) = battle();
        let now = Instant::now();
        r.dispatch(&mut m, a, "DISABLEUNITS armcom corcom", now).unwrap();
        r.dispatch(&mut m, a, "ENABLEUNITS corcom", now).unwrap();
        r.dispatch(&mut m, a, "ADDSTARTRECT 0 0 0 100 200", now).unwrap();
        assert_eq!(
            mock_b.take_lines(),
            [
                "DISABLEUNITS armcom corcom",
                "ENABLEUNITS corcom",
                "ADDSTARTRECT 0 0 0 100 200",
            ]
        );
        assert!(mock_a.take_lines().is_empty());
        assert!(r.dispatch(&mut m, a, "ADDSTARTRECT 0 0 0 100 201", now).is_err());

        let (c, mock_c) = user(&mut m, "carol");
        r.dispatch(&mut m, c, "JOINBATTLE 1", now).unwrap();
        let lines = mock_c.take_lines();
        assert!(lines.contains(&"DISABLEUNITS armcom".to_string()));
        assert!(lines.contains(&"ADDSTARTRECT 0 0 0 100 200".to_string()));
    }

    #[test]
    fn script_tags_are_lower_cased() {
        let (mut m, r, (a, _), (b, mock_b)) = battle();
        let now = Instant::now();
        r.dispatch(&mut m, a, "SETSCRIPTTAGS Game/StartMetal=1000\tgame/mapname=Delta", now)
            .unwrap();
        assert_eq!(
            mock_b.take_lines(),
            ["SETSCRIPTTAGS game/mapname=Delta\tgame/startmetal=1000"]
        );
        r.dispatch(&mut m, a, "REMOVESCRIPTTAGS GAME/MAPNAME", now).unwrap();
        let tags = &m.battles.get(BattleId(1)).unwrap().script_tags;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["game/startmetal"], "1000");

        assert!(r.dispatch(&mut m, b, "SETSCRIPTTAGS a=1", now).is_err());
    }

    #[test]
    fn replay_script_is_sent_to_joiners() {
        let mut m = matrix();
        let r = Registry::new(4, false).unwrap();
        let now = Instant::now();
        let (a, _) = user(&mut m, "alice");
        let (b, mock_b) = user(&mut m, "bob");
        let replay = OPEN.replacen("OPENBATTLE 0", "OPENBATTLE 1", 1);
        r.dispatch(&mut m, a, &replay, now).unwrap();

        assert!(r.dispatch(&mut m, a, "SCRIPT [game]", now).is_err());
        r.dispatch(&mut m, a, "SCRIPTSTART", now).unwrap();
        r.dispatch(&mut m, a, "SCRIPT [game]", now).unwrap();
        r.dispatch(&mut m, a, "SCRIPT {", now).unwrap();
        r.dispatch(&mut m, a, "SCRIPTEND", now).unwrap();
        mock_b.take_lines();

        r.dispatch(&mut m, b, "JOINBATTLE 1", now).unwrap();
        let lines = mock_b.take_lines();
        let tail = &lines[lines.len() - 4..];
        assert_eq!(tail, ["SCRIPTSTART", "SCRIPT [game]", "SCRIPT {", "SCRIPTEND"]);
    }
}
