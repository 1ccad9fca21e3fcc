//! Connection state and the events a connection primitive reports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire name of the lifecycle event fired after a successful (re)connection.
pub const CONNECT_EVENT: &str = "connect";
/// Wire name of the lifecycle event fired once per connection loss.
pub const DISCONNECT_EVENT: &str = "disconnect";
/// Wire name of the application data event.
pub const DATA_EVENT: &str = "data";

/// Liveness of the push connection as last reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Online,
    #[default]
    Offline,
}

impl ConnectionState {
    /// Value of the store's `offline` flag for this state.
    pub fn is_offline(self) -> bool {
        matches!(self, ConnectionState::Offline)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Online  => write!(f, "online"),
            ConnectionState::Offline => write!(f, "offline"),
        }
    }
}

/// A transport-level session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connected,
    Disconnected,
}

impl LifecycleEvent {
    /// The connection state this transition moves to.
    pub fn state(self) -> ConnectionState {
        match self {
            LifecycleEvent::Connected    => ConnectionState::Online,
            LifecycleEvent::Disconnected => ConnectionState::Offline,
        }
    }
}

/// A server-pushed message: `{ "type": ..., ...payload }`.
///
/// Only the `type` discriminator is interpreted. Anything else rides along
/// untouched so it can be logged verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InboundEvent(Value);

impl InboundEvent {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `type` field, when the event is an object carrying a string `type`.
    pub fn event_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// The full event as received.
    pub fn payload(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for InboundEvent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Everything a connection primitive can report, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connect,
    Disconnect,
    Data(InboundEvent),
}

impl TransportEvent {
    /// Wire name of the event (`"connect"`, `"disconnect"` or `"data"`).
    pub fn name(&self) -> &'static str {
        match self {
            TransportEvent::Connect    => CONNECT_EVENT,
            TransportEvent::Disconnect => DISCONNECT_EVENT,
            TransportEvent::Data(_)    => DATA_EVENT,
        }
    }
}

impl From<LifecycleEvent> for TransportEvent {
    fn from(event: LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::Connected    => TransportEvent::Connect,
            LifecycleEvent::Disconnected => TransportEvent::Disconnect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connection_state_defaults_to_offline() {
        assert_eq!(ConnectionState::default(), ConnectionState::Offline);
        assert!(ConnectionState::default().is_offline());
    }

    #[test]
    fn online_is_not_offline() {
        assert!(!ConnectionState::Online.is_offline());
    }

    #[test]
    fn connection_state_display() {
        assert_eq!(ConnectionState::Online.to_string(), "online");
        assert_eq!(ConnectionState::Offline.to_string(), "offline");
    }

    #[test]
    fn lifecycle_maps_to_state() {
        assert_eq!(LifecycleEvent::Connected.state(), ConnectionState::Online);
        assert_eq!(LifecycleEvent::Disconnected.state(), ConnectionState::Offline);
    }

    #[test]
    fn event_type_reads_string_discriminator() {
        let ev = InboundEvent::new(json!({"type": "badges", "count": 3}));
        assert_eq!(ev.event_type(), Some("badges"));
    }

    #[test]
    fn event_type_missing_field_is_none() {
        let ev = InboundEvent::new(json!({"kind": "badges"}));
        assert_eq!(ev.event_type(), None);
    }

    #[test]
    fn event_type_non_string_is_none() {
        let ev = InboundEvent::new(json!({"type": 7}));
        assert_eq!(ev.event_type(), None);
    }

    #[test]
    fn event_type_of_non_object_is_none() {
        assert_eq!(InboundEvent::new(json!(["badges"])).event_type(), None);
        assert_eq!(InboundEvent::new(Value::Null).event_type(), None);
    }

    #[test]
    fn inbound_event_is_transparent_json() {
        let ev: InboundEvent = serde_json::from_str(r#"{"type":"task","id":1}"#).unwrap();
        assert_eq!(ev.payload()["id"], 1);
        assert_eq!(serde_json::to_string(&ev).unwrap(), r#"{"type":"task","id":1}"#);
    }

    #[test]
    fn transport_event_names() {
        assert_eq!(TransportEvent::Connect.name(), "connect");
        assert_eq!(TransportEvent::Disconnect.name(), "disconnect");
        assert_eq!(TransportEvent::Data(json!({}).into()).name(), "data");
    }

    #[test]
    fn lifecycle_converts_to_transport_event() {
        assert_eq!(TransportEvent::from(LifecycleEvent::Connected), TransportEvent::Connect);
        assert_eq!(TransportEvent::from(LifecycleEvent::Disconnected), TransportEvent::Disconnect);
    }
}
