//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:8200").
    pub address: SocketAddr,
    /// Kernel send buffer size applied to every accepted socket (default: 16384).
    #[serde(default = "default_send_buffer_size")]
    pub send_buffer_size: usize,
    /// Bytes requested per socket read (default: 4096).
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
    /// Capacity of the reader-to-reactor event queue (default: 1024).
    #[serde(default = "default_event_queue")]
    pub event_queue: usize,
}

fn default_send_buffer_size() -> usize {
    16384
}

fn default_read_chunk_size() -> usize {
    4096
}

fn default_event_queue() -> usize {
    1024
}
