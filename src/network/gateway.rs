//! Gateway - TCP listener and the reactor loop.
//!
//! One task owns the [`Reactor`]. It accepts connections, receives events
//! from per-connection reader tasks and ticks the reactor on a fixed
//! interval until cancelled. The tick is also checked after every event
//! batch, so a busy event queue cannot starve it.

use crate::config::Config;
use crate::network::reactor::{NetEvent, Reactor};
use crate::network::transport::{TcpTransport, read_loop};
use crate::security::CredentialJob;
use crate::state::SessionId;
use socket2::SockRef;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub struct Gateway {
    listener: TcpListener,
    reactor: Reactor,
    tick: Duration,
    send_buffer_size: usize,
    read_chunk_size: usize,
    event_queue: usize,
}

impl Gateway {
    /// Bind the listen address from `config`.
    pub async fn bind(config: &Config, reactor: Reactor) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.listen.address).await?;
        info!(address = %listener.local_addr()?, "Listener bound");
        Ok(Self {
            listener,
            reactor,
            tick: config.timeouts.tick(),
            send_buffer_size: config.listen.send_buffer_size,
            read_chunk_size: config.listen.read_chunk_size.max(1),
            event_queue: config.listen.event_queue.max(1),
        })
    }

    /// Serve until `cancel` fires, then kill every session.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run(mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let (events_tx, mut events_rx) = mpsc::channel::<NetEvent>(self.event_queue);
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutdown requested");
                    self.reactor.shutdown("Server shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.reactor.end_of_tick(Instant::now());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.accept(stream, addr, &events_tx),
                    Err(e) => warn!(error = %e, "Accept failed"),
                },
                Some(event) = events_rx.recv() => {
                    let now = Instant::now();
                    self.reactor.handle_event(event, now);
                    // One queue's worth per batch, then housekeeping gets a turn.
                    for _ in 1..self.event_queue {
                        let Ok(event) = events_rx.try_recv() else {
                            break;
                        };
                        self.reactor.handle_event(event, now);
                    }
                    for (id, job) in self.reactor.take_credential_jobs() {
                        spawn_credential_job(id, job, &events_tx);
                    }
                    self.reactor.tick_if_due(Instant::now());
                }
            }
        }
        Ok(())
    }

    fn accept(&mut self, stream: TcpStream, addr: SocketAddr, events: &mpsc::Sender<NetEvent>) {
        let sock = SockRef::from(&stream);
        if let Err(e) = sock.set_send_buffer_size(self.send_buffer_size) {
            warn!(%addr, error = %e, "Failed to set send buffer size");
        }
        if let Err(e) = stream.set_nodelay(true) {
            warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let (reader, writer) = stream.into_split();
        let id = self.reactor.allocate_id();
        let reader_task = tokio::spawn(read_loop(
            id,
            reader,
            events.clone(),
            self.read_chunk_size,
        ));
        let transport = TcpTransport::new(writer, reader_task.abort_handle());
        self.reactor
            .on_accept(id, addr, Box::new(transport), Instant::now());
    }
}

/// Run Argon2 work on the blocking pool and report back as an event.
fn spawn_credential_job(id: SessionId, job: CredentialJob, events: &mpsc::Sender<NetEvent>) {
    let events = events.clone();
    tokio::task::spawn_blocking(move || {
        let outcome = job.run();
        if events
            .blocking_send(NetEvent::Credentials { id, outcome })
            .is_err()
        {
            debug!(uid = %id, "Reactor gone, credential outcome dropped");
        }
    });
}
