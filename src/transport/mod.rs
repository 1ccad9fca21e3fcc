//! # Transport
//!
//! The connection primitive the bridge drives. The bridge only ever asks it to
//! connect, disconnect, or report whether it is connected; everything it
//! observes arrives as [`TransportEvent`](crate::events::TransportEvent)s on a
//! channel the primitive was given when it was opened.
//!
//! [`websocket::WsConnection`] is the reference primitive. Hosts with their own
//! socket stack implement [`Connection`] instead.

pub mod websocket;

use serde::{Deserialize, Serialize};

use crate::config::ReconnectConfig;

pub use websocket::WsConnection;

/// Fixed suffix identifying the push endpoint under the base path.
pub const HANDSHAKE_SUFFIX: &str = "socket.io";

/// Handshake path for a bridge mounted at `base_path`.
///
/// Plain concatenation: `/api/` gives `/api/socket.io`. The result must match
/// the server mount point exactly, so nothing is normalized.
pub fn handshake_path(base_path: &str) -> String {
    format!("{base_path}{HANDSHAKE_SUFFIX}")
}

/// Transport a primitive may use, listed in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Websocket,
    Polling,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Websocket => write!(f, "websocket"),
            TransportKind::Polling   => write!(f, "polling"),
        }
    }
}

/// Streaming first, long-polling as the fallback.
pub fn default_transports() -> Vec<TransportKind> {
    vec![TransportKind::Websocket, TransportKind::Polling]
}

/// What the bridge hands to a primitive when opening it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOptions {
    /// Handshake path, see [`handshake_path`].
    pub path: String,
    /// Transport preference list.
    pub transports: Vec<TransportKind>,
    /// Retry policy; owned by the primitive, never by the bridge.
    pub reconnect: ReconnectConfig,
}

impl ConnectionOptions {
    /// Options for `base_path` with default transports and retry policy.
    pub fn new(base_path: &str) -> Self {
        Self {
            path: handshake_path(base_path),
            transports: default_transports(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Connection primitive contract.
///
/// Implementations must report every successful (re)connection and every
/// connection loss exactly once, and must not report anything after being
/// dropped. Reports stay ordered across threads: a `Disconnect` is never
/// delivered ahead of the `Connect` it closes, and once `disconnect()` returns
/// the only further report is the `Disconnect` it sent itself.
pub trait Connection: Send {
    /// Start connecting if not connected. Never blocks; a no-op while a
    /// connection is up or already being attempted.
    fn connect(&mut self);

    /// Close the connection and stop retrying. Reports a disconnect if one was up.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn connect(&mut self) {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
