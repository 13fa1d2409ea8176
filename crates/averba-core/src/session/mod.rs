//! Authorization session lifecycle state machine.
//!
//! One `AuthorizationSession` tracks one consultation attempt for one
//! subject, from code request through terminal resolution.
//!
//! # State Machine
//!
//! ```text
//!                  code dispatched
//!   ┌──────────────┐        ┌──────────┐   check: authorized /
//!   │ NotRequested │───────►│ CodeSent │   ineligible / not found /
//!   └──────────────┘        └────┬─────┘   timeout / hard error
//!          ▲                     │                  │
//!          │   expired after     │                  ▼
//!          └─────grace window────┘          ┌────────────────┐
//!                                           │ Resolved(x)    │ (frozen)
//!                                           └────────────────┘
//! ```
//!
//! # Valid Transitions
//!
//! | From | Event | To |
//! |------|-------|----|
//! | `NotRequested` | code dispatched | `CodeSent` |
//! | `NotRequested` | already authorized (fast path) | `CodeSent` (marked) |
//! | `CodeSent` | `begin_check` | `CodeSent` (attempt counter bumped) |
//! | `CodeSent` | `resolve(outcome)` | `Resolved(outcome)` |
//! | `CodeSent` | `revert_expired` | `NotRequested` |
//!
//! `Resolved` is terminal: a session resolves at most once, and any further
//! transition attempt returns [`SessionError::InvalidTransition`]. User
//! retries always produce a new session.
//!
//! The fast path deliberately lands in `CodeSent` rather than jumping
//! straight to `Resolved`: the gateway's status check remains the single
//! code path that extracts the margin payload.

pub mod error;
pub mod state;

pub use error::{SessionError, StateName};
pub use state::{AuthorizationSession, Channel, MarginPayload, Outcome, SessionState};
