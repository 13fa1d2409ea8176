//! Classification of partner gateway responses.
//!
//! This is the only module that inspects partner status strings or message
//! wording. The partner occasionally ships a response with an empty or
//! unknown `status` but a recognizable `mensagem`; the substring fallbacks
//! for those live here and nowhere else, so a partner wording change is a
//! one-place update.
//!
//! Classification is total: every response lands in exactly one verdict,
//! and anything unrecognized fails closed to [`StatusVerdict::Failed`].

use super::{CodeDispatch, StatusReport};
use crate::session::MarginPayload;

/// Canonical verdict for a "solicit code" response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchVerdict {
    /// A code was dispatched to the contact address.
    CodeSent {
        /// Partner protocol number, when provided.
        protocol: Option<String>,
    },
    /// The subject already authorized release; no code is needed.
    AlreadyAuthorized,
    /// Business-rule rejection (e.g. contact bound to another subject).
    /// Recoverable: the user corrects input and retries.
    Rejected(String),
}

/// Canonical verdict for a "check authorization" response.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusVerdict {
    /// The subject confirmed; margin data released.
    Authorized(MarginPayload),
    /// The subject has not responded yet.
    Pending,
    /// The authorization code expired before confirmation.
    Expired,
    /// The subject fails the partner's eligibility rule.
    Ineligible(String),
    /// The partner does not know the subject.
    NotFound(String),
    /// Anything else, including unknown statuses (fail closed).
    Failed(String),
}

/// Classifies a "solicit code" response.
#[must_use]
pub fn classify_dispatch(response: CodeDispatch) -> DispatchVerdict {
    if !response.sucesso {
        return DispatchVerdict::Rejected(reason(response.mensagem, "solicitação recusada"));
    }
    match response.status.as_deref() {
        Some("code_sent") => DispatchVerdict::CodeSent {
            protocol: response.protocolo,
        },
        Some("already_authorized") => DispatchVerdict::AlreadyAuthorized,
        // Legacy responses omit `status`; sniff the message.
        _ if contains_any(&response.mensagem, &["já autorizado", "ja autorizado"]) => {
            DispatchVerdict::AlreadyAuthorized
        },
        _ if contains_any(&response.mensagem, &["código enviado", "codigo enviado"]) => {
            DispatchVerdict::CodeSent {
                protocol: response.protocolo,
            }
        },
        _ => DispatchVerdict::Rejected(reason(response.mensagem, "resposta não reconhecida")),
    }
}

/// Classifies a "check authorization" response.
#[must_use]
pub fn classify_status(report: StatusReport) -> StatusVerdict {
    let StatusReport {
        sucesso,
        status,
        mensagem,
        dados,
    } = report;

    match status.as_str() {
        "authorized" => match dados {
            Some(payload) => StatusVerdict::Authorized(payload),
            // Authorized without data is a partner bug; do not fabricate a
            // payload, fail closed instead.
            None => StatusVerdict::Failed("autorizado sem dados de margem".to_string()),
        },
        "pending" => StatusVerdict::Pending,
        "expired" => StatusVerdict::Expired,
        "ineligible" => StatusVerdict::Ineligible(reason(mensagem, "inelegível")),
        "not_found" => StatusVerdict::NotFound(reason(mensagem, "não encontrado")),
        "error" => StatusVerdict::Failed(reason(mensagem, "erro do parceiro")),
        // Legacy responses carry the classification only in `mensagem`.
        _ => classify_by_message(sucesso, mensagem),
    }
}

fn classify_by_message(sucesso: bool, mensagem: String) -> StatusVerdict {
    let lower = mensagem.to_lowercase();
    if contains_any(&lower, &["expirad"]) {
        StatusVerdict::Expired
    } else if contains_any(&lower, &["margem indisponível", "margem indisponivel", "inelegível", "inelegivel"]) {
        StatusVerdict::Ineligible(mensagem)
    } else if contains_any(&lower, &["não encontrado", "nao encontrado"]) {
        StatusVerdict::NotFound(mensagem)
    } else if sucesso && contains_any(&lower, &["aguardando", "pendente"]) {
        StatusVerdict::Pending
    } else {
        StatusVerdict::Failed(reason(mensagem, "status desconhecido"))
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

fn reason(mensagem: String, fallback: &str) -> String {
    if mensagem.trim().is_empty() {
        fallback.to_string()
    } else {
        mensagem
    }
}
