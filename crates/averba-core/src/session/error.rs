//! Session lifecycle error types.

use std::fmt;

use thiserror::Error;

/// Errors that can occur during session lifecycle operations.
///
/// These never cross the orchestrator's public surface; they exist so the
/// transition table is enforced by the type rather than by caller
/// discipline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Attempted an invalid state transition.
    #[error("invalid transition from {from} via {event}")]
    InvalidTransition {
        /// The state the session was in.
        from: StateName,
        /// The operation that was attempted.
        event: &'static str,
    },
}

/// Display names for session states, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateName {
    /// No code has been requested yet.
    NotRequested,
    /// A code was dispatched and confirmation is being polled.
    CodeSent,
    /// The session reached a terminal outcome.
    Resolved,
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequested => write!(f, "NotRequested"),
            Self::CodeSent => write!(f, "CodeSent"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}
