//! Authorization session state and the payroll-margin payload.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{SessionError, StateName};
use crate::subject::{Contact, Cpf};

/// Out-of-band channel the authorization code is sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// SMS text message. Wire code `"S"`.
    #[serde(rename = "S")]
    Sms,
    /// WhatsApp message. Wire code `"W"`.
    #[serde(rename = "W")]
    Whatsapp,
}

impl Channel {
    /// Returns the single-letter wire code.
    #[must_use]
    pub const fn wire_code(self) -> &'static str {
        match self {
            Self::Sms => "S",
            Self::Whatsapp => "W",
        }
    }
}

/// Payroll-margin data released by the gateway once the subject confirms.
///
/// Immutable once received. Field names follow the partner wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginPayload {
    /// Worker's registered name.
    pub nome: String,
    /// Subject tax identifier, bare digits.
    pub cpf: String,
    /// Payroll-deductible margin currently available.
    pub margem_disponivel: Decimal,
    /// Base margin before existing reservations.
    pub margem_base: Decimal,
    /// Total declared earnings.
    pub total_rendimentos: Decimal,
    /// Employer name.
    pub orgao: String,
    /// Employment admission date.
    pub data_admissao: NaiveDate,
    /// Whether the subject passes the partner's eligibility rule.
    pub elegivel: bool,
    /// When the partner last refreshed this record.
    pub atualizado_em: DateTime<Utc>,
}

/// Terminal outcome of an authorization session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The subject confirmed and the gateway released margin data.
    Authorized(MarginPayload),
    /// The subject fails the partner's eligibility rule.
    Ineligible(String),
    /// The gateway does not know the subject.
    NotFound(String),
    /// The authorization code expired before confirmation.
    Expired,
    /// The session failed; `"timeout"` when the attempt ceiling was reached
    /// while still pending.
    Error(String),
}

/// Lifecycle state of an authorization session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionState {
    /// No code has been requested (or a late expiry sent the session back
    /// here so the user can request a fresh code).
    NotRequested,
    /// A code was dispatched; confirmation is being polled.
    CodeSent,
    /// Terminal. No transition leaves this state; a user-initiated reset
    /// creates a new session instead.
    Resolved(Outcome),
}

impl SessionState {
    /// Whether the session is waiting on confirmation polling.
    #[must_use]
    pub const fn is_code_sent(&self) -> bool {
        matches!(self, Self::CodeSent)
    }

    /// Whether the session reached a terminal outcome.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    const fn name(&self) -> StateName {
        match self {
            Self::NotRequested => StateName::NotRequested,
            Self::CodeSent => StateName::CodeSent,
            Self::Resolved(_) => StateName::Resolved,
        }
    }
}

/// One authorization consultation attempt for one subject.
///
/// Owned exclusively by a single orchestrator. `attempt_count` is
/// monotonically non-decreasing for the lifetime of the session; a resend or
/// reset produces a fresh session rather than rewinding this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// Subject tax identifier, immutable for the session.
    pub subject: Cpf,
    /// Phone number the code was sent to.
    pub contact: Contact,
    /// Channel the code was sent through.
    pub channel: Channel,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Number of status checks performed. Never decremented.
    pub attempt_count: u32,
    /// When the code dispatch was acknowledged.
    pub created_at: DateTime<Utc>,
    /// When the last status check started, if any.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Set when the gateway reported the subject as already authorized at
    /// request time. The session still goes through one status check so the
    /// payload-extraction path is not duplicated.
    pub fast_path: bool,
}

impl AuthorizationSession {
    /// Creates a session in `CodeSent` for a freshly dispatched code.
    #[must_use]
    pub fn code_sent(subject: Cpf, contact: Contact, channel: Channel, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            contact,
            channel,
            state: SessionState::CodeSent,
            attempt_count: 0,
            created_at: now,
            last_checked_at: None,
            fast_path: false,
        }
    }

    /// Creates a fast-path session for a subject the gateway reported as
    /// already authorized. The state is `CodeSent` so the one sanctioned
    /// path into `Resolved` (a status check) still applies.
    #[must_use]
    pub fn fast_path(subject: Cpf, contact: Contact, channel: Channel, now: DateTime<Utc>) -> Self {
        Self {
            fast_path: true,
            ..Self::code_sent(subject, contact, channel, now)
        }
    }

    /// Records the start of a status check: increments the attempt counter
    /// and stamps `last_checked_at`, before the gateway is called.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the session is in `CodeSent`.
    pub fn begin_check(&mut self, now: DateTime<Utc>) -> Result<u32, SessionError> {
        if !self.state.is_code_sent() {
            return Err(SessionError::InvalidTransition {
                from: self.state.name(),
                event: "begin_check",
            });
        }
        self.attempt_count += 1;
        self.last_checked_at = Some(now);
        Ok(self.attempt_count)
    }

    /// Transitions to a terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the session is in `CodeSent`;
    /// terminal states are frozen.
    pub fn resolve(&mut self, outcome: Outcome) -> Result<(), SessionError> {
        if !self.state.is_code_sent() {
            return Err(SessionError::InvalidTransition {
                from: self.state.name(),
                event: "resolve",
            });
        }
        self.state = SessionState::Resolved(outcome);
        Ok(())
    }

    /// The one sanctioned backward transition: a code that expired after the
    /// grace window sends the session back to `NotRequested` so the user can
    /// request a fresh code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the session is in `CodeSent`.
    pub fn revert_expired(&mut self) -> Result<(), SessionError> {
        if !self.state.is_code_sent() {
            return Err(SessionError::InvalidTransition {
                from: self.state.name(),
                event: "revert_expired",
            });
        }
        self.state = SessionState::NotRequested;
        Ok(())
    }
}
