//! LOGIN handler.
//!
//! `LOGIN user password cpu localIP {lobby} [{userID}] [{compatFlags}]`
//!
//! Checks run in a fixed order: already logged in, abuse guard, bans,
//! credentials, duplicate login. Every refusal is a `DENIED` line; only bad
//! credentials count towards the abuse guard. The password check itself is
//! a credential job, so the login completes in [`finish_login`] once the
//! reactor hears back.

use crate::error::HandlerResult;
use crate::handlers::helpers::{add_user_line, client_status_line};
use crate::handlers::{CommandSpec, Context, Handler, epoch_secs};
use crate::security::{CredentialJob, LoginGate};
use crate::services::OperatorNotice;
use crate::state::{Access, AuthRequest, LoginRequest, PendingAuth, SessionId};
use chrono::{TimeZone, Utc};
use lobby_proto::{ArgumentShape, ClientStatus, Field, ParsedArguments};
use tracing::{debug, info, warn};

/// Handler for LOGIN command.
pub struct LoginHandler;

impl Handler for LoginHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::anyone(
            ArgumentShape::words([
                Field::required("user"),
                Field::required("password"),
                Field::required("cpu").long(),
                Field::required("localIP"),
            ])
            .then_sentences([
                Field::required("lobby"),
                Field::optional("userID"),
                Field::optional("compatFlags"),
            ]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let user = args.text("user")?;
        let password = args.text("password")?;
        let ip = ctx.session()?.addr.ip();
        let user_id = args
            .opt_text("userID")
            .and_then(|raw| raw.trim().parse::<u32>().ok());

        if ctx.session()?.is_authenticated() {
            ctx.reply("DENIED Already logged in");
            return Ok(());
        }
        if ctx.session()?.pending_auth.is_some() {
            ctx.reply("DENIED Login already in progress");
            return Ok(());
        }

        if let LoginGate::Blocked { notify } = ctx.matrix.abuse.check(user, ctx.now) {
            if notify {
                ctx.matrix.notify_operators(
                    OperatorNotice::new("Login blocked")
                        .line(format!("{user} from {ip}"))
                        .line("Too many failed login attempts"),
                );
            }
            ctx.reply("DENIED Too many failed login attempts, try again later");
            return Ok(());
        }

        if let Some(ban) = ctx
            .matrix
            .services
            .bans
            .find(user, ip, user_id, epoch_secs())
        {
            info!(user = %user, ip = %ip, reason = %ban.reason, "Banned login refused");
            let until = ban
                .expires
                .and_then(|t| Utc.timestamp_opt(t, 0).single())
                .map_or_else(
                    || "permanently".to_string(),
                    |t| format!("until {}", t.format("%Y-%m-%d %H:%M UTC")),
                );
            ctx.reply(format!("DENIED You are banned {until}: {}", ban.reason));
            return Ok(());
        }

        let Some((account, phc)) = ctx.matrix.services.accounts.credentials(user) else {
            refuse(ctx, user);
            return Ok(());
        };

        let request = LoginRequest {
            account,
            cpu: u32::try_from(args.long("cpu")?).unwrap_or(0),
            lobby: args.text("lobby")?.to_string(),
            user_id,
            compat: args
                .opt_text("compatFlags")
                .map(|flags| flags.split(' ').filter(|f| !f.is_empty()).map(str::to_owned).collect())
                .unwrap_or_default(),
        };
        let id = ctx.id;
        let session = ctx.session_mut()?;
        session.pending_auth = Some(PendingAuth {
            echo: session.echo(),
            request: AuthRequest::Login(request),
        });
        debug!(uid = %id, user = %user, "Password check queued");
        ctx.matrix.queue_credentials(
            id,
            CredentialJob::Verify {
                password: password.to_string(),
                phc,
            },
        );
        Ok(())
    }
}

/// Count a failed attempt and refuse it.
fn refuse(ctx: &mut Context<'_>, user: &str) {
    let failures = ctx.matrix.abuse.record_failure(user, ctx.now);
    let ip = ctx.session().map(|s| s.addr.ip()).ok();
    warn!(user = %user, ip = ?ip, failures, "Failed login");
    ctx.reply("DENIED Invalid username or password");
}

/// Resume a LOGIN once its password check is back.
pub(super) fn finish_login(
    ctx: &mut Context<'_>,
    request: LoginRequest,
    verified: bool,
) -> HandlerResult {
    if !verified {
        refuse(ctx, &request.account.name);
        return Ok(());
    }
    if ctx.matrix.sessions.find_by_name(&request.account.name).is_some() {
        ctx.reply("DENIED Already logged in");
        return Ok(());
    }
    accept(ctx, request)
}

fn accept(ctx: &mut Context<'_>, request: LoginRequest) -> HandlerResult {
    let LoginRequest {
        account,
        cpu,
        lobby,
        user_id,
        compat,
    } = request;
    let id = ctx.id;
    let ip = ctx.session()?.addr.ip();
    ctx.matrix.abuse.clear(&account.name);
    let country = ctx.matrix.services.geo.country(ip);

    let name = account.name.clone();
    let moderator = account.access >= Access::Privileged;
    let session = ctx.session_mut()?;
    session.account = Some(account);
    session.cpu = cpu;
    session.lobby_name = lobby;
    session.user_id = user_id;
    session.compat = compat;
    session.country = country;
    session.status = ClientStatus::default().with_moderator(moderator);
    info!(uid = %id, user = %name, ip = %ip, "Logged in");

    let burst = login_burst(ctx, id);
    let sessions = &mut ctx.matrix.sessions;
    sessions.begin_batch(id);
    for line in &burst {
        sessions.send(id, line);
    }
    sessions.end_batch(id);

    let newcomer = ctx.session()?;
    let announce = [add_user_line(newcomer), client_status_line(newcomer)];
    let others: Vec<SessionId> = ctx
        .matrix
        .sessions
        .authenticated()
        .map(|s| s.id)
        .filter(|s| *s != id)
        .collect();
    for other in others {
        for line in &announce {
            ctx.matrix.sessions.send(other, line);
        }
    }
    Ok(())
}

/// Everything a freshly logged-in client needs, in order.
fn login_burst(ctx: &Context<'_>, id: SessionId) -> Vec<String> {
    let m = &*ctx.matrix;
    let mut lines = vec![format!("ACCEPTED {}", ctx.name())];
    lines.extend(m.services.motd.iter().map(|l| format!("MOTD {l}")));
    lines.extend(
        m.sessions
            .authenticated()
            .filter(|s| s.id != id)
            .map(add_user_line),
    );
    for battle in m.battles.iter() {
        if let Some(line) = m.battle_opened_line(battle.id) {
            lines.push(line);
        }
        lines.extend(battle.members.iter().filter_map(|member| {
            m.sessions
                .get(*member)
                .map(|s| format!("JOINEDBATTLE {} {}", battle.id, s.display_name()))
        }));
    }
    lines.extend(m.sessions.authenticated().map(client_status_line));
    lines.push("LOGININFOEND".to_string());
    lines
}
