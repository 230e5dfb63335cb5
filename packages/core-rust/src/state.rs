//! Per-route lifecycle state machine.
//!
//! ```text
//! Defined -install-> Installed -start-> Running -stop-> Stopped -start-> Running ...
//! Installed -remove-> Deleted
//! Stopped   -remove-> Deleted (terminal)
//! ```
//!
//! A Running route must be stopped before it can be removed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single route id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    /// Definition built but not yet handed to the engine.
    Defined,
    /// Installed in the engine, not accepting traffic.
    Installed,
    /// Accepting and dispatching traffic.
    Running,
    /// Installed but not accepting traffic.
    Stopped,
    /// Removed from the engine. Terminal.
    Deleted,
}

/// Commands that move a route between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteAction {
    Install,
    Start,
    Stop,
    Remove,
}

/// A command that is not valid in the route's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} a route that is {from}")]
pub struct InvalidTransition {
    pub from: RouteState,
    pub action: RouteAction,
}

impl RouteState {
    /// Returns the state reached by applying `action`.
    ///
    /// Start on a running route and stop on a stopped route are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for commands the state machine forbids,
    /// including every command on a deleted route.
    pub fn apply(self, action: RouteAction) -> Result<Self, InvalidTransition> {
        use RouteAction::{Install, Remove, Start, Stop};
        use RouteState::{Defined, Deleted, Installed, Running, Stopped};

        match (self, action) {
            (Defined, Install) => Ok(Installed),
            (Installed | Running | Stopped, Start) => Ok(Running),
            (Installed | Running | Stopped, Stop) => Ok(Stopped),
            (Installed | Stopped, Remove) => Ok(Deleted),
            (from, action) => Err(InvalidTransition { from, action }),
        }
    }

    /// Returns `true` when the route accepts traffic.
    #[must_use]
    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    /// Lowercase name used in logs and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Defined => "defined",
            Self::Installed => "installed",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Install => "install",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Remove => "remove",
        })
    }
}
