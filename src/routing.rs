//! Classification of inbound data events.
//!
//! [`DATA_ROUTES`] is the closed mapping from event `type` to store command.
//! Adding a new event kind means adding one row; [`classify`] never changes.
//! Anything not in the table lands on [`Route::Unhandled`].

use crate::commands::StoreCommand;
use crate::events::InboundEvent;

/// One row of the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRoute {
    pub event_type: &'static str,
    pub command: StoreCommand,
}

pub const DATA_ROUTES: &[DataRoute] = &[
    DataRoute { event_type: "badges", command: StoreCommand::BadgeUpdateAll },
    DataRoute { event_type: "task",   command: StoreCommand::SystemUpdateTasks },
];

/// Outcome of classifying one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dispatch(StoreCommand),
    /// Unknown or missing `type`. Logged with the full payload, then dropped.
    Unhandled,
}

/// Look up the command registered for `event_type`.
pub fn lookup(event_type: &str) -> Option<&'static StoreCommand> {
    DATA_ROUTES
        .iter()
        .find(|route| route.event_type == event_type)
        .map(|route| &route.command)
}

pub fn classify(event: &InboundEvent) -> Route {
    match event.event_type().and_then(lookup) {
        Some(command) => Route::Dispatch(command.clone()),
        None => Route::Unhandled,
    }
}

/// The command an inbound event produces, if any. At most one per event.
pub fn data_command(event: &InboundEvent) -> Option<StoreCommand> {
    match classify(event) {
        Route::Dispatch(command) => Some(command),
        Route::Unhandled => None,
    }
}
