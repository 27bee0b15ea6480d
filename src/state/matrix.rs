//! The Matrix - central server state.
//!
//! Every session, channel and battle lives here and is only ever touched
//! from the reactor task, so nothing is locked. Handlers receive
//! `&mut Matrix` through their context.

use crate::config::{Config, LimitsConfig, SecurityConfig};
use crate::security::{AbuseGuard, CredentialJob};
use crate::services::{OperatorNotice, Services};
use crate::state::managers::{BattleManager, ChannelManager, SessionManager};
use crate::state::{Access, SessionId};
use std::time::Instant;
use tracing::{info, warn};

/// This server's identity.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub protocol_version: String,
    pub nat_port: u16,
}

/// Configuration accessible to handlers via Matrix.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    pub limits: LimitsConfig,
    pub security: SecurityConfig,
}

/// The Matrix - single owner of all lobby state.
pub struct Matrix {
    pub server_info: ServerInfo,
    pub config: MatrixConfig,
    pub sessions: SessionManager,
    pub channels: ChannelManager,
    pub battles: BattleManager,
    pub abuse: AbuseGuard,
    pub services: Services,
    /// Credential work queued by handlers, collected by the reactor.
    credential_jobs: Vec<(SessionId, CredentialJob)>,
}

impl Matrix {
    pub fn new(config: &Config, services: Services, now: Instant) -> Self {
        Self {
            server_info: ServerInfo {
                name: config.server.name.clone(),
                protocol_version: config.server.protocol_version.clone(),
                nat_port: config.server.nat_port,
            },
            config: MatrixConfig {
                limits: config.limits.clone(),
                security: config.security.clone(),
            },
            sessions: SessionManager::new(&config.timeouts, now),
            channels: ChannelManager::new(),
            battles: BattleManager::new(),
            abuse: AbuseGuard::new(&config.security, now),
            services,
            credential_jobs: Vec::new(),
        }
    }

    /// Queue credential work for `id`; the outcome comes back through the
    /// reactor.
    pub fn queue_credentials(&mut self, id: SessionId, job: CredentialJob) {
        self.credential_jobs.push((id, job));
    }

    pub fn take_credential_jobs(&mut self) -> Vec<(SessionId, CredentialJob)> {
        std::mem::take(&mut self.credential_jobs)
    }

    /// The greeting sent on accept.
    pub fn greeting(&self) -> String {
        format!(
            "TASSERVER {} * {} 0",
            self.server_info.protocol_version, self.server_info.nat_port
        )
    }

    /// Tear a session down now.
    ///
    /// Idempotent. Leaves every channel, leaves (or closes) its battle and
    /// announces the departure if the session had logged in.
    pub fn kill_session(&mut self, id: SessionId, reason: &str) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        session.mark_half_dead();
        let channels: Vec<String> = session.channels.iter().cloned().collect();
        let in_battle = session.battle.is_some();
        let name = session.name().map(str::to_owned);

        for channel in &channels {
            self.leave_channel(id, channel, Some(reason));
        }
        if in_battle && let Err(e) = self.leave_battle(id) {
            warn!(uid = %id, error = %e, "Battle cleanup on kill failed");
        }

        if let Some(mut session) = self.sessions.remove(id) {
            session.close();
        }
        info!(uid = %id, user = name.as_deref().unwrap_or("-"), reason = %reason, "Session closed");

        if let Some(name) = name {
            self.sessions
                .broadcast_authenticated(&format!("REMOVEUSER {name}"), None);
        }
    }

    /// Tear down everything scheduled with `schedule_kill`.
    pub fn process_kills(&mut self) -> usize {
        let kills = self.sessions.take_kills();
        let count = kills.len();
        for (id, reason) in kills {
            self.kill_session(id, &reason);
        }
        count
    }

    /// Log a notice and deliver it to every admin session in one fast write.
    pub fn notify_operators(&mut self, notice: OperatorNotice) {
        warn!(title = %notice.title, lines = ?notice.lines, "Operator notice");
        let admins: Vec<SessionId> = self
            .sessions
            .authenticated()
            .filter(|s| s.access() >= Access::Admin && s.is_active())
            .map(|s| s.id)
            .collect();
        let rendered = notice.render();
        for id in admins {
            self.sessions.begin_batch(id);
            for line in &rendered {
                self.sessions.send(id, &format!("SERVERMSG {line}"));
            }
            self.sessions.end_batch(id);
        }
    }

    /// Kill every session; used on shutdown.
    pub fn kill_all(&mut self, reason: &str) {
        for id in self.sessions.ids() {
            self.kill_session(id, reason);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A Matrix populated with mock-transport sessions.

    use super::*;
    use crate::services::{Account, testing::services};
    use crate::state::session::testing::{MockHandle, session};

    pub fn matrix() -> Matrix {
        let config: Config = toml::from_str(
            r#"
[server]
name = "lobby.test"
nat_port = 8201

[listen]
address = "127.0.0.1:0"

[limits]
max_bots_per_battle = 2
"#,
        )
        .unwrap();
        Matrix::new(&config, services(), Instant::now())
    }

    /// Add a session, logged in as `name` when given.
    pub fn connect(matrix: &mut Matrix, name: Option<&str>, access: Access) -> (SessionId, MockHandle) {
        let id = matrix.sessions.next_id();
        let (mut s, mock) = session(id.0, Instant::now());
        if let Some(name) = name {
            s.account = Some(Account {
                id: id.0 as u32,
                name: name.to_string(),
                access,
                email: None,
            });
            s.country = "XX".to_string();
        }
        matrix.sessions.insert(s);
        (id, mock)
    }

    pub fn user(matrix: &mut Matrix, name: &str) -> (SessionId, MockHandle) {
        connect(matrix, Some(name), Access::User)
    }
}
