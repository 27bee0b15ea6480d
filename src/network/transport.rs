//! TCP plumbing between the socket tasks and the reactor.
//!
//! Each accepted stream is split. The read half lives in its own task and
//! forwards raw chunks as [`NetEvent`]s; the write half is wrapped in a
//! [`TcpTransport`] owned by the session and written without awaiting.

use crate::network::reactor::NetEvent;
use crate::state::{SessionId, Transport};
use bytes::BytesMut;
use std::io;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

/// Write side of an accepted TCP connection.
pub struct TcpTransport {
    writer: OwnedWriteHalf,
    reader: AbortHandle,
}

impl TcpTransport {
    pub fn new(writer: OwnedWriteHalf, reader: AbortHandle) -> Self {
        Self { writer, reader }
    }
}

impl Transport for TcpTransport {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.try_write(buf)
    }

    fn close(&mut self) {
        // Dropping the write half afterwards shuts the socket down.
        self.reader.abort();
    }
}

/// Forward everything read from `reader` to the reactor.
///
/// Ends with exactly one `Closed` event unless the reactor has gone away or
/// the task was aborted by [`TcpTransport::close`].
pub async fn read_loop(
    id: SessionId,
    mut reader: OwnedReadHalf,
    events: mpsc::Sender<NetEvent>,
    chunk: usize,
) {
    let mut buf = BytesMut::with_capacity(chunk);
    let reason = loop {
        buf.reserve(chunk);
        match reader.read_buf(&mut buf).await {
            Ok(0) => break "Connection closed".to_string(),
            Ok(n) => {
                trace!(uid = %id, bytes = n, "Read");
                let bytes = buf.split().freeze();
                if events.send(NetEvent::Data { id, bytes }).await.is_err() {
                    return;
                }
            }
            Err(e) => break format!("Read error: {e}"),
        }
    };
    debug!(uid = %id, reason = %reason, "Reader finished");
    let _ = events.send(NetEvent::Closed { id, reason }).await;
}
