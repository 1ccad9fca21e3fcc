//! # realtime-bridge
//!
//! Long-lived client for a push-notification endpoint. It tracks connection
//! liveness, receives typed server-pushed events, and turns each one into a
//! normalized command for a downstream state store.
//!
//! ## Pieces
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`bridge`] | `UpdateBridge`: lifecycle handlers, data handler, dispatch |
//! | [`routing`] | Closed `type` → command table |
//! | [`commands`] | `StoreCommand` vocabulary |
//! | [`events`] | Connection state and transport events |
//! | [`sink`] | Store / log sinks (tracing, channel, in-memory) |
//! | [`transport`] | `Connection` contract and the WebSocket primitive |
//! | [`config`] | TOML configuration |
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (tx, mut events) = tokio::sync::mpsc::unbounded_channel();
//! let (store, mut commands) = ChannelStore::channel();
//! let mut bridge = UpdateBridgeBuilder::new("/api/")
//!     .store(Arc::new(store))
//!     .build(|opts| WsConnection::open("ws://127.0.0.1:6767", opts, tx))?;
//! tokio::spawn(async move { bridge.run(&mut events).await });
//! ```

pub mod bridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod routing;
pub mod sink;
pub mod transport;

pub use bridge::{UpdateBridge, UpdateBridgeBuilder};
pub use commands::{lifecycle_command, StoreCommand};
pub use config::{BridgeConfig, ReconnectConfig};
pub use error::BridgeError;
pub use events::{ConnectionState, InboundEvent, LifecycleEvent, TransportEvent};
pub use routing::{classify, data_command, Route};
pub use sink::{ChannelStore, LogLevel, LogSink, MemoryLog, MemoryStore, StoreSink, TracingLog};
pub use transport::{handshake_path, Connection, ConnectionOptions, TransportKind, WsConnection};
