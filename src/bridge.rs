//! The update bridge: connection lifecycle and event-to-command dispatch.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::commands::lifecycle_command;
use crate::config::ReconnectConfig;
use crate::error::BridgeError;
use crate::events::{ConnectionState, InboundEvent, LifecycleEvent, TransportEvent};
use crate::routing::{classify, Route};
use crate::sink::{LogLevel, LogSink, StoreSink, TracingLog};
use crate::transport::{default_transports, handshake_path, Connection, ConnectionOptions, TransportKind};

pub const CONNECTED_MESSAGE: &str = "Socket.IO has connected";
pub const DISCONNECTED_MESSAGE: &str = "Socket.IO has disconnected";
pub const RECEIVED_MESSAGE: &str = "Socket.IO receives";
pub const UNHANDLED_MESSAGE: &str = "Socket.IO receives an unhandled event";

/// Owns one push connection and turns what it reports into store commands.
///
/// Every lifecycle notification dispatches exactly one `SiteUpdateOffline`,
/// repeats included. Every data event is logged, then either dispatches the
/// one command its `type` maps to or is logged as unhandled and dropped.
pub struct UpdateBridge<C: Connection> {
    connection: C,
    options: ConnectionOptions,
    store: Arc<dyn StoreSink>,
    logger: Arc<dyn LogSink>,
    state: ConnectionState,
}

impl<C: Connection> UpdateBridge<C> {
    /// Last connection state reported by the transport.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Options the connection was opened with.
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Ask the transport to reconnect if it is not connected.
    ///
    /// Non-blocking. The outcome shows up later as a connect or disconnect
    /// notification; nothing is dispatched or logged here.
    pub fn reconnect(&mut self) {
        if !self.connection.is_connected() {
            self.connection.connect();
        }
    }

    pub fn on_connect(&mut self) {
        self.logger.log(LogLevel::Info, CONNECTED_MESSAGE, None);
        self.transition(LifecycleEvent::Connected);
    }

    pub fn on_disconnect(&mut self) {
        self.logger.log(LogLevel::Warning, DISCONNECTED_MESSAGE, None);
        self.transition(LifecycleEvent::Disconnected);
    }

    pub fn on_data_event(&mut self, event: &InboundEvent) {
        self.logger.log(LogLevel::Info, RECEIVED_MESSAGE, Some(event.payload()));
        match classify(event) {
            Route::Dispatch(command) => self.store.dispatch(command),
            Route::Unhandled => {
                self.logger.log(LogLevel::Error, UNHANDLED_MESSAGE, Some(event.payload()));
            }
        }
    }

    /// Route one transport event to its handler.
    pub fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connect => self.on_connect(),
            TransportEvent::Disconnect => self.on_disconnect(),
            TransportEvent::Data(event) => self.on_data_event(&event),
        }
    }

    /// Handle events in delivery order until the channel closes.
    pub async fn run(&mut self, events: &mut mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        debug!(path = %self.options.path, "transport event channel closed");
    }

    /// Close the connection and release it.
    pub fn shutdown(mut self) {
        debug!(path = %self.options.path, "shutting down update bridge");
        self.connection.disconnect();
    }

    fn transition(&mut self, event: LifecycleEvent) {
        self.state = event.state();
        self.store.dispatch(lifecycle_command(event));
    }
}

/// Builder for [`UpdateBridge`].
///
/// # Example
/// ```rust,ignore
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let mut bridge = UpdateBridgeBuilder::new("/api/")
///     .store(Arc::new(store))
///     .build(|opts| WsConnection::open("ws://127.0.0.1:6767", opts, tx))?;
/// bridge.run(&mut rx).await;
/// ```
pub struct UpdateBridgeBuilder {
    base_path: String,
    store: Option<Arc<dyn StoreSink>>,
    logger: Arc<dyn LogSink>,
    transports: Vec<TransportKind>,
    reconnect: ReconnectConfig,
}

impl UpdateBridgeBuilder {
    /// Start building a bridge whose endpoint lives under `base_path`.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            store: None,
            logger: Arc::new(TracingLog),
            transports: default_transports(),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// The store commands are dispatched to. Required.
    pub fn store(mut self, store: Arc<dyn StoreSink>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the log sink (default: [`TracingLog`]).
    pub fn logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    /// Override the transport preference list (default: websocket, polling).
    pub fn transports(mut self, transports: Vec<TransportKind>) -> Self {
        self.transports = transports;
        self
    }

    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Open the connection with `open` and ask it to connect.
    ///
    /// Returns as soon as the connect request is issued; the bridge starts
    /// Offline and goes Online on the first connect notification.
    ///
    /// # Errors
    /// [`BridgeError::MissingStore`] when no store was set, or whatever `open`
    /// returns.
    pub fn build<C, F>(self, open: F) -> Result<UpdateBridge<C>, BridgeError>
    where
        C: Connection,
        F: FnOnce(ConnectionOptions) -> Result<C, BridgeError>,
    {
        let store = self.store.ok_or(BridgeError::MissingStore)?;
        let options = ConnectionOptions {
            path: handshake_path(&self.base_path),
            transports: self.transports,
            reconnect: self.reconnect,
        };

        let mut connection = open(options.clone())?;
        connection.connect();
        debug!(path = %options.path, "update bridge connecting");

        Ok(UpdateBridge {
            connection,
            options,
            store,
            logger: self.logger,
            state: ConnectionState::Offline,
        })
    }
}
