//! Authorization gateway contract and wire types.
//!
//! The gateway is the partner service that (a) sends a one-time
//! authorization code over SMS/WhatsApp and (b) reports whether the subject
//! confirmed, releasing payroll-margin data once they have.
//!
//! # Architecture
//!
//! ```text
//! AuthorizationGateway (trait)
//!     |
//!     +-- HttpGateway          production client (reqwest + credential cache)
//!     |
//!     +-- ScriptedGateway      deterministic test double
//! ```
//!
//! Partner responses are classified in exactly one place
//! ([`classify`]); nothing outside that module inspects partner status
//! strings or message wording.

pub mod classify;
pub mod credentials;
pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{Channel, MarginPayload};
use crate::subject::{Contact, Cpf};

pub use classify::{DispatchVerdict, StatusVerdict};
pub use credentials::{Credential, CredentialCache, CredentialSource, StaticCredentialSource};
pub use http::HttpGateway;
pub use mock::ScriptedGateway;

/// Errors from gateway calls.
///
/// Credential expiry is distinct from transport failure so the presentation
/// layer can redirect to re-authentication instead of folding it into the
/// polling error path.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network-level failure or non-2xx response.
    #[error(
        "gateway transport failure{}: {message}",
        .status.map(|s| format!(" (status {s})")).unwrap_or_default()
    )]
    Transport {
        /// HTTP status when the response got that far.
        status: Option<u16>,
        /// Underlying failure description.
        message: String,
    },

    /// The bearer credential was rejected; the user must re-authenticate.
    #[error("session credential expired")]
    CredentialExpired,

    /// The gateway answered with a body this client cannot interpret.
    #[error("gateway protocol error: {0}")]
    Protocol(String),
}

/// Request body for the "solicit code" endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CodeRequest {
    /// Subject tax identifier, 11 bare digits.
    #[serde(rename = "subjectId")]
    pub subject_id: Cpf,
    /// Phone number, digits only.
    #[serde(rename = "contactAddress")]
    pub contact_address: Contact,
    /// `"S"` or `"W"`.
    pub channel: Channel,
    /// Name shown in the out-of-band message.
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Response body for the "solicit code" endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeDispatch {
    /// Whether the partner accepted the request.
    pub sucesso: bool,
    /// Human-readable partner message.
    #[serde(default)]
    pub mensagem: String,
    /// `"code_sent"` or `"already_authorized"` on success.
    #[serde(default)]
    pub status: Option<String>,
    /// Partner protocol number for the dispatch, when provided.
    #[serde(default)]
    pub protocolo: Option<String>,
}

/// Request body for the "check authorization" endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusRequest {
    /// Subject tax identifier, 11 bare digits.
    #[serde(rename = "subjectId")]
    pub subject_id: Cpf,
    /// Phone number the code was sent to.
    #[serde(rename = "contactAddress")]
    pub contact_address: Contact,
}

/// Response body for the "check authorization" endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReport {
    /// Whether the partner processed the check.
    pub sucesso: bool,
    /// Partner status string; see [`classify`] for the recognized set.
    #[serde(default)]
    pub status: String,
    /// Human-readable partner message.
    #[serde(default)]
    pub mensagem: String,
    /// Margin data, present only once authorized.
    #[serde(default)]
    pub dados: Option<MarginPayload>,
}

/// The partner service issuing authorization codes and reporting
/// confirmation status.
#[async_trait]
pub trait AuthorizationGateway: Send + Sync {
    /// Triggers the out-of-band code send.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport failure, credential expiry,
    /// or an uninterpretable response. Business-level rejections come back
    /// as a successful call with `sucesso: false`.
    async fn request_code(&self, request: &CodeRequest) -> Result<CodeDispatch, GatewayError>;

    /// Reports whether the subject has confirmed authorization.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport failure, credential expiry,
    /// or an uninterpretable response.
    async fn check_authorization(
        &self,
        request: &StatusRequest,
    ) -> Result<StatusReport, GatewayError>;
}
