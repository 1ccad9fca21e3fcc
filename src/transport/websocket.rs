//! WebSocket connection primitive on top of tokio-tungstenite.
//!
//! One spawned session task owns the socket. It reports `Connect` when the
//! socket opens, one `Data` per `["data", payload]` text frame, and
//! `Disconnect` when the socket closes or fails, then retries according to the
//! [`ReconnectConfig`] it was opened with.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use rand::Rng;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::{Connection, ConnectionOptions, TransportKind};
use crate::config::ReconnectConfig;
use crate::error::BridgeError;
use crate::events::{InboundEvent, TransportEvent, DATA_EVENT};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Link state shared by a connection and its session task.
///
/// `generation` changes on every `disconnect()` and on drop. A session only
/// reports while its generation is current, and the flag flips under the same
/// lock as the matching `Connect` / `Disconnect` send, so the channel always
/// sees them paired and in order.
#[derive(Debug, Default)]
struct Link {
    up: bool,
    generation: u64,
}

type SharedLink = Arc<Mutex<Link>>;

fn lock(link: &SharedLink) -> MutexGuard<'_, Link> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Join a `ws://` / `wss://` origin and a handshake path.
///
/// Trailing slashes on the origin are dropped; the path is used verbatim,
/// with a `/` inserted only when it does not start with one.
pub fn endpoint_url(server_url: &str, path: &str) -> Result<String, BridgeError> {
    let host = server_url
        .strip_prefix("ws://")
        .or_else(|| server_url.strip_prefix("wss://"))
        .ok_or_else(|| BridgeError::InvalidUrl {
            url: server_url.to_string(),
            reason: "expected a ws:// or wss:// origin".into(),
        })?;
    if host.trim_end_matches('/').is_empty() {
        return Err(BridgeError::InvalidUrl {
            url: server_url.to_string(),
            reason: "missing host".into(),
        });
    }

    let origin = server_url.trim_end_matches('/');
    if path.starts_with('/') {
        Ok(format!("{origin}{path}"))
    } else {
        Ok(format!("{origin}/{path}"))
    }
}

/// Decode one text frame.
///
/// Frames are `["<event name>", <payload>]`. Only `"data"` frames produce an
/// event (`Ok(Some(..))`); other names are `Ok(None)`. A missing payload
/// becomes `null`, which the bridge treats as an event without a type.
pub fn decode_frame(text: &str) -> Result<Option<TransportEvent>, BridgeError> {
    let value: Value = serde_json::from_str(text).map_err(|e| BridgeError::Frame(e.to_string()))?;
    let Value::Array(parts) = value else {
        return Err(BridgeError::Frame("expected a [name, payload] array".into()));
    };

    let mut parts = parts.into_iter();
    let name = match parts.next() {
        Some(Value::String(name)) => name,
        _ => return Err(BridgeError::Frame("event name must be a string".into())),
    };
    if name != DATA_EVENT {
        return Ok(None);
    }

    let payload = parts.next().unwrap_or(Value::Null);
    Ok(Some(TransportEvent::Data(InboundEvent::new(payload))))
}

/// Delay before retry number `attempt` (1-based).
///
/// `delay_ms * 2^(attempt - 1)` capped at `delay_max_ms`, then jittered by
/// `± randomization_factor` and clamped back into `[delay_ms, delay_max_ms]`.
pub fn backoff_delay<R: Rng>(config: &ReconnectConfig, attempt: u32, rng: &mut R) -> Duration {
    let lo = config.delay_ms.min(config.delay_max_ms);
    let hi = config.delay_ms.max(config.delay_max_ms);

    let exp = attempt.saturating_sub(1).min(31);
    let base = config.delay_ms.saturating_mul(1u64 << exp).clamp(lo, hi);

    let factor = config.randomization_factor.clamp(0.0, 1.0);
    if factor == 0.0 || base == 0 {
        return Duration::from_millis(base);
    }

    let spread = base as f64 * factor;
    let jittered = base as f64 + rng.gen_range(-spread..=spread);
    Duration::from_millis(jittered.round().clamp(lo as f64, hi as f64) as u64)
}

fn next_delay(config: &ReconnectConfig, attempt: u32) -> Duration {
    backoff_delay(config, attempt, &mut rand::thread_rng())
}

/// [`Connection`] over a single WebSocket.
///
/// Must be driven from inside a tokio runtime; `connect()` outside one is
/// logged and ignored. Dropping the connection aborts the session task.
pub struct WsConnection {
    url: String,
    reconnect: ReconnectConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    link: SharedLink,
    ended: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl WsConnection {
    /// Prepare a connection to `server_url` + `options.path`.
    ///
    /// Does not touch the network. Fails when the URL is not a WebSocket
    /// origin or when `websocket` is missing from the transport list.
    pub fn open(
        server_url: &str,
        options: ConnectionOptions,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self, BridgeError> {
        if !options.transports.contains(&TransportKind::Websocket) {
            let offered: Vec<String> = options.transports.iter().map(ToString::to_string).collect();
            return Err(BridgeError::UnsupportedTransports { offered: offered.join(", ") });
        }
        if options.transports.first() != Some(&TransportKind::Websocket) {
            debug!(transports = ?options.transports, "only the websocket transport is provided");
        }

        let url = endpoint_url(server_url, &options.path)?;
        Ok(Self {
            url,
            reconnect: options.reconnect,
            events,
            link: SharedLink::default(),
            ended: Arc::new(Notify::new()),
            task: None,
        })
    }

    /// Full endpoint URL this connection dials.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether a session task is still alive, including while it waits to retry.
    pub fn session_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signalled once each time a session gives up on its own: reconnection
    /// disabled, `max_attempts` exhausted, or nobody listening any more.
    /// `disconnect()` and drop never signal it.
    pub fn session_ended(&self) -> Arc<Notify> {
        Arc::clone(&self.ended)
    }

    /// Retire the current session: no report from it is delivered after this.
    /// Returns whether the link was up.
    fn retire(&self) -> bool {
        let mut link = lock(&self.link);
        link.generation = link.generation.wrapping_add(1);
        std::mem::take(&mut link.up)
    }
}

impl Connection for WsConnection {
    fn connect(&mut self) {
        if self.session_running() {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(url = %self.url, error = %e, "cannot connect outside a tokio runtime");
                return;
            }
        };

        let session = Session {
            url: self.url.clone(),
            reconnect: self.reconnect.clone(),
            events: self.events.clone(),
            generation: lock(&self.link).generation,
            link: Arc::clone(&self.link),
        };
        let ended = Arc::clone(&self.ended);
        self.task = Some(runtime.spawn(async move {
            session.run().await;
            if session.is_current() {
                ended.notify_one();
            }
        }));
    }

    fn disconnect(&mut self) {
        if self.retire() {
            let _ = self.events.send(TransportEvent::Disconnect);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_connected(&self) -> bool {
        lock(&self.link).up
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.retire();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Session {
    url: String,
    reconnect: ReconnectConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    link: SharedLink,
    generation: u64,
}

impl Session {
    fn is_current(&self) -> bool {
        lock(&self.link).generation == self.generation
    }

    /// Flip the link up and report `Connect`. `false` when this session was
    /// retired or nobody is listening; the link is left down in both cases.
    fn mark_up(&self) -> bool {
        let mut link = lock(&self.link);
        if link.generation != self.generation {
            return false;
        }
        if self.events.send(TransportEvent::Connect).is_err() {
            return false;
        }
        link.up = true;
        true
    }

    /// Flip the link down and report `Disconnect` if it was up. `false` when
    /// this session was retired or nobody is listening.
    fn mark_down(&self) -> bool {
        let mut link = lock(&self.link);
        if link.generation != self.generation {
            return false;
        }
        !std::mem::take(&mut link.up) || self.events.send(TransportEvent::Disconnect).is_ok()
    }

    /// Forward a data event while this session is current.
    fn report(&self, event: TransportEvent) -> bool {
        let link = lock(&self.link);
        link.generation == self.generation && self.events.send(event).is_ok()
    }

    async fn run(&self) {
        let mut attempt: u32 = 0;

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((ws, _response)) => {
                    attempt = 0;
                    if !self.mark_up() {
                        debug!(url = %self.url, "push session retired before reporting connect");
                        return;
                    }
                    info!(url = %self.url, "push connection established");

                    let listening = self.pump(ws).await;
                    if !self.mark_down() || !listening {
                        return;
                    }
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "push connection attempt failed");
                }
            }

            if !self.reconnect.enabled {
                debug!(url = %self.url, "reconnection disabled, session ends");
                return;
            }
            attempt = attempt.saturating_add(1);
            if self.reconnect.max_attempts != 0 && attempt > self.reconnect.max_attempts {
                error!(
                    url = %self.url,
                    attempts = self.reconnect.max_attempts,
                    "giving up on push connection"
                );
                return;
            }

            let delay = next_delay(&self.reconnect, attempt);
            debug!(url = %self.url, attempt, delay_ms = delay.as_millis() as u64, "retrying push connection");
            tokio::time::sleep(delay).await;
        }
    }

    /// Forward frames until the socket ends. Returns `false` once nobody is
    /// listening any more or the session was retired.
    async fn pump(&self, mut ws: WsStream) -> bool {
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Text(text)) => match decode_frame(&text) {
                    Ok(Some(event)) => {
                        if !self.report(event) {
                            return false;
                        }
                    }
                    Ok(None) => debug!(frame = %text, "ignoring non-data push event"),
                    Err(e) => warn!(error = %e, "dropping push frame"),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "push server closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(url = %self.url, error = %e, "push connection lost");
                    break;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn options() -> ConnectionOptions {
        ConnectionOptions::new("/api/")
    }

    // -----------------------------------------------------------------------
    // endpoint_url
    // -----------------------------------------------------------------------

    #[test]
    fn endpoint_url_joins_origin_and_path() {
        assert_eq!(
            endpoint_url("ws://127.0.0.1:6767", "/api/socket.io").unwrap(),
            "ws://127.0.0.1:6767/api/socket.io"
        );
    }

    #[test]
    fn endpoint_url_trims_trailing_slash_on_origin() {
        assert_eq!(
            endpoint_url("wss://push.example/", "/socket.io").unwrap(),
            "wss://push.example/socket.io"
        );
    }

    #[test]
    fn endpoint_url_inserts_separator_for_relative_path() {
        assert_eq!(
            endpoint_url("ws://host:1", "socket.io").unwrap(),
            "ws://host:1/socket.io"
        );
    }

    #[test]
    fn endpoint_url_rejects_http() {
        assert!(matches!(
            endpoint_url("http://host", "/socket.io"),
            Err(BridgeError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn endpoint_url_rejects_missing_host() {
        assert!(matches!(
            endpoint_url("ws://", "/socket.io"),
            Err(BridgeError::InvalidUrl { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // decode_frame
    // -----------------------------------------------------------------------

    #[test]
    fn decode_data_frame() {
        let ev = decode_frame(r#"["data",{"type":"badges"}]"#).unwrap();
        assert_eq!(ev, Some(TransportEvent::Data(json!({"type": "badges"}).into())));
    }

    #[test]
    fn decode_data_frame_without_payload_is_null_event() {
        let ev = decode_frame(r#"["data"]"#).unwrap();
        assert_eq!(ev, Some(TransportEvent::Data(Value::Null.into())));
    }

    #[test]
    fn decode_other_event_names_are_ignored() {
        assert_eq!(decode_frame(r#"["connect"]"#).unwrap(), None);
        assert_eq!(decode_frame(r#"["series",{"id":1}]"#).unwrap(), None);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        assert!(matches!(decode_frame("not json"), Err(BridgeError::Frame(_))));
    }

    #[test]
    fn decode_rejects_non_array() {
        assert!(matches!(decode_frame(r#"{"type":"badges"}"#), Err(BridgeError::Frame(_))));
    }

    #[test]
    fn decode_rejects_empty_array_and_non_string_name() {
        assert!(decode_frame("[]").is_err());
        assert!(decode_frame(r#"[42, {}]"#).is_err());
    }

    // -----------------------------------------------------------------------
    // backoff_delay
    // -----------------------------------------------------------------------

    #[test]
    fn backoff_without_jitter_doubles_then_caps() {
        let cfg = ReconnectConfig { randomization_factor: 0.0, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(7);
        let delays: Vec<u64> = (1..=5)
            .map(|n| backoff_delay(&cfg, n, &mut rng).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 5_000, 5_000]);
    }

    #[test]
    fn backoff_with_jitter_stays_in_bounds() {
        let cfg = ReconnectConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        for attempt in 1..50 {
            let d = backoff_delay(&cfg, attempt, &mut rng);
            assert!(d >= cfg.delay() && d <= cfg.delay_max(), "attempt {attempt}: {d:?}");
        }
    }

    #[test]
    fn backoff_huge_attempt_does_not_overflow() {
        let cfg = ReconnectConfig { randomization_factor: 0.0, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(backoff_delay(&cfg, u32::MAX, &mut rng), cfg.delay_max());
    }

    // -----------------------------------------------------------------------
    // WsConnection
    // -----------------------------------------------------------------------

    #[test]
    fn open_builds_endpoint_url() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = WsConnection::open("ws://127.0.0.1:6767", options(), tx).unwrap();
        assert_eq!(conn.url(), "ws://127.0.0.1:6767/api/socket.io");
        assert!(!conn.is_connected());
    }

    #[test]
    fn open_requires_websocket_transport() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let opts = ConnectionOptions { transports: vec![TransportKind::Polling], ..options() };
        let err = WsConnection::open("ws://127.0.0.1:6767", opts, tx).err().unwrap();
        match err {
            BridgeError::UnsupportedTransports { offered } => assert_eq!(offered, "polling"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn connect_outside_runtime_is_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut conn = WsConnection::open("ws://127.0.0.1:6767", options(), tx).unwrap();
        conn.connect();
        assert!(!conn.is_connected());
        assert!(!conn.session_running());
    }

    fn session_for(conn: &WsConnection) -> Session {
        Session {
            url: conn.url.clone(),
            reconnect: conn.reconnect.clone(),
            events: conn.events.clone(),
            link: Arc::clone(&conn.link),
            generation: lock(&conn.link).generation,
        }
    }

    #[test]
    fn disconnect_pairs_with_connect_report() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut conn = WsConnection::open("ws://127.0.0.1:6767", options(), tx).unwrap();
        let session = session_for(&conn);

        assert!(session.mark_up());
        assert!(conn.is_connected());
        conn.disconnect();

        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Connect);
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Disconnect);
        assert!(!conn.is_connected());
    }

    #[test]
    fn retired_session_reports_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut conn = WsConnection::open("ws://127.0.0.1:6767", options(), tx).unwrap();
        let session = session_for(&conn);
        conn.disconnect();

        assert!(!session.mark_up());
        assert!(!session.report(TransportEvent::Data(json!({"type": "task"}).into())));
        assert!(!session.mark_down());
        assert!(!session.is_current());
        assert!(!conn.is_connected());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failed_connect_report_leaves_link_down() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection::open("ws://127.0.0.1:6767", options(), tx).unwrap();
        let session = session_for(&conn);
        drop(rx);

        assert!(!session.mark_up());
        assert!(!conn.is_connected());
    }

    #[test]
    fn disconnect_when_never_connected_reports_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut conn = WsConnection::open("ws://127.0.0.1:6767", options(), tx).unwrap();
        conn.disconnect();
        assert!(rx.try_recv().is_err());
    }
}
