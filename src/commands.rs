//! Commands handed to the downstream state store.

use serde::{Deserialize, Serialize};

use crate::events::{ConnectionState, LifecycleEvent};

/// A normalized store instruction, independent of the wire event that caused it.
///
/// Serializes with a `type` tag so a JSON-speaking store can consume it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreCommand {
    /// Mirror the connection state into the store's `offline` flag.
    #[serde(rename = "site/offline")]
    SiteUpdateOffline { offline: bool },
    /// Recompute every badge count from current state.
    #[serde(rename = "badges/update_all")]
    BadgeUpdateAll,
    /// Reload the task list.
    #[serde(rename = "system/update_tasks")]
    SystemUpdateTasks,
}

impl StoreCommand {
    pub fn site_offline(state: ConnectionState) -> Self {
        StoreCommand::SiteUpdateOffline { offline: state.is_offline() }
    }
}

impl std::fmt::Display for StoreCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreCommand::SiteUpdateOffline { offline } => write!(f, "set site offline = {offline}"),
            StoreCommand::BadgeUpdateAll                => write!(f, "update all badges"),
            StoreCommand::SystemUpdateTasks             => write!(f, "update tasks"),
        }
    }
}

/// The command a lifecycle transition produces. Always exactly one.
pub fn lifecycle_command(event: LifecycleEvent) -> StoreCommand {
    StoreCommand::site_offline(event.state())
}
