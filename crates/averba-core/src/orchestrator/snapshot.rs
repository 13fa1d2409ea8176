//! Observable orchestrator state for the presentation layer.

use std::time::Duration;

use serde::Serialize;

use crate::session::SessionState;
use crate::subject::Cpf;

/// Machine-readable category of a [`Notice`], so the presentation layer can
/// pick recovery actions without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Malformed CPF or phone number; the user corrects and retries.
    InvalidInput,
    /// The partner rejected the request on a business rule.
    BusinessRejection,
    /// A resend was attempted inside the cooldown window.
    ResendThrottled,
    /// The identity credential expired; redirect to re-authentication.
    SessionExpired,
    /// Network-level failure on an explicit request action.
    TransportFailure,
    /// Linkage enforcement denied the consultation before it started.
    LinkageDenied,
}

/// User-facing side-band for recoverable request failures.
///
/// Every notice carries a human-readable reason; terminal non-authorized
/// outcomes pair it with at least two recovery actions in the UI (retry the
/// flow, or escalate to support).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Category for recovery-action selection.
    pub kind: NoticeKind,
    /// Human-readable reason.
    pub message: String,
}

impl Notice {
    pub(crate) fn invalid_input(message: String) -> Self {
        Self {
            kind: NoticeKind::InvalidInput,
            message,
        }
    }

    pub(crate) fn business_rejection(message: String) -> Self {
        Self {
            kind: NoticeKind::BusinessRejection,
            message,
        }
    }

    pub(crate) fn resend_throttled(cooldown: Duration) -> Self {
        Self {
            kind: NoticeKind::ResendThrottled,
            message: format!(
                "aguarde {} entre reenvios de código",
                humantime::format_duration(cooldown)
            ),
        }
    }

    pub(crate) fn session_expired() -> Self {
        Self {
            kind: NoticeKind::SessionExpired,
            message: "sessão expirada, entre novamente".to_string(),
        }
    }

    pub(crate) fn transport_failure(message: String) -> Self {
        Self {
            kind: NoticeKind::TransportFailure,
            message,
        }
    }

    pub(crate) fn linkage_denied(bound: &Cpf) -> Self {
        Self {
            kind: NoticeKind::LinkageDenied,
            message: format!("sua conta já está vinculada ao CPF {bound}"),
        }
    }
}

/// Point-in-time view of the orchestrator, sufficient for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Current session state, `NotRequested` when no session exists.
    pub state: SessionState,
    /// Status checks performed by the current session.
    pub attempt_count: u32,
    /// Attempt ceiling, for progress display.
    pub max_attempts: u32,
    /// Pending user-facing notice, if any.
    pub notice: Option<Notice>,
}

impl Snapshot {
    pub(crate) const fn initial(max_attempts: u32) -> Self {
        Self {
            state: SessionState::NotRequested,
            attempt_count: 0,
            max_attempts,
            notice: None,
        }
    }
}
