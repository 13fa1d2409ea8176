//! Deterministic gateway double for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AuthorizationGateway, CodeDispatch, CodeRequest, GatewayError, StatusRequest, StatusReport};
use crate::session::MarginPayload;

/// Gateway double that replays scripted responses in order.
///
/// Each call pops the next scripted reply; an exhausted script fails the
/// call with a protocol error so a test that over-polls fails loudly
/// instead of hanging. Call counts are recorded for exclusivity assertions.
#[derive(Default)]
pub struct ScriptedGateway {
    dispatch_replies: Mutex<VecDeque<Result<CodeDispatch, GatewayError>>>,
    status_replies: Mutex<VecDeque<Result<StatusReport, GatewayError>>>,
    dispatch_calls: AtomicUsize,
    status_calls: AtomicUsize,
    /// Artificial latency applied to every status call.
    status_latency: Option<Duration>,
}

impl ScriptedGateway {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every status call take at least `latency` before replying.
    #[must_use]
    pub const fn with_status_latency(mut self, latency: Duration) -> Self {
        self.status_latency = Some(latency);
        self
    }

    /// Queues a "solicit code" reply.
    pub fn push_dispatch(&self, reply: Result<CodeDispatch, GatewayError>) {
        self.dispatch_replies
            .try_lock()
            .expect("script mutated while a call is in flight")
            .push_back(reply);
    }

    /// Queues a "check authorization" reply.
    pub fn push_status(&self, reply: Result<StatusReport, GatewayError>) {
        self.status_replies
            .try_lock()
            .expect("script mutated while a call is in flight")
            .push_back(reply);
    }

    /// Number of "solicit code" calls made.
    #[must_use]
    pub fn dispatch_calls(&self) -> usize {
        self.dispatch_calls.load(Ordering::SeqCst)
    }

    /// Number of "check authorization" calls made.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    // Reply builders for the common script entries.

    /// A successful `code_sent` dispatch.
    #[must_use]
    pub fn code_sent() -> Result<CodeDispatch, GatewayError> {
        Ok(CodeDispatch {
            sucesso: true,
            mensagem: "Código enviado".to_string(),
            status: Some("code_sent".to_string()),
            protocolo: Some("PROTO-1".to_string()),
        })
    }

    /// A dispatch reporting the subject as already authorized.
    #[must_use]
    pub fn already_authorized() -> Result<CodeDispatch, GatewayError> {
        Ok(CodeDispatch {
            sucesso: true,
            mensagem: String::new(),
            status: Some("already_authorized".to_string()),
            protocolo: None,
        })
    }

    /// A business-rule dispatch rejection.
    #[must_use]
    pub fn dispatch_rejected(mensagem: &str) -> Result<CodeDispatch, GatewayError> {
        Ok(CodeDispatch {
            sucesso: false,
            mensagem: mensagem.to_string(),
            status: None,
            protocolo: None,
        })
    }

    /// A still-pending status report.
    #[must_use]
    pub fn pending() -> Result<StatusReport, GatewayError> {
        Ok(Self::report("pending", "Aguardando confirmação", None))
    }

    /// An authorized status report carrying `payload`.
    #[must_use]
    pub fn authorized(payload: MarginPayload) -> Result<StatusReport, GatewayError> {
        Ok(Self::report("authorized", "", Some(payload)))
    }

    /// An expired-code status report.
    #[must_use]
    pub fn expired() -> Result<StatusReport, GatewayError> {
        Ok(Self::report("expired", "Token expirado", None))
    }

    /// An ineligible status report with the partner's reason.
    #[must_use]
    pub fn ineligible(mensagem: &str) -> Result<StatusReport, GatewayError> {
        Ok(Self::report("ineligible", mensagem, None))
    }

    /// A subject-not-found status report.
    #[must_use]
    pub fn not_found(mensagem: &str) -> Result<StatusReport, GatewayError> {
        Ok(Self::report("not_found", mensagem, None))
    }

    /// A generic partner error status report.
    #[must_use]
    pub fn partner_error(mensagem: &str) -> Result<StatusReport, GatewayError> {
        Ok(Self::report("error", mensagem, None))
    }

    fn report(status: &str, mensagem: &str, dados: Option<MarginPayload>) -> StatusReport {
        StatusReport {
            sucesso: status != "error",
            status: status.to_string(),
            mensagem: mensagem.to_string(),
            dados,
        }
    }

    /// A margin payload for happy-path scripts.
    #[must_use]
    pub fn sample_payload() -> MarginPayload {
        serde_json::from_value(serde_json::json!({
            "nome": "Maria da Silva",
            "cpf": "52998224725",
            "margem_disponivel": "450.10",
            "margem_base": "600.00",
            "total_rendimentos": "2000.00",
            "orgao": "Prefeitura de Vitória",
            "data_admissao": "2015-03-02",
            "elegivel": true,
            "atualizado_em": "2026-08-01T12:00:00Z"
        }))
        .expect("sample payload is valid")
    }
}

#[async_trait]
impl AuthorizationGateway for ScriptedGateway {
    async fn request_code(&self, _request: &CodeRequest) -> Result<CodeDispatch, GatewayError> {
        self.dispatch_calls.fetch_add(1, Ordering::SeqCst);
        self.dispatch_replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Protocol("dispatch script exhausted".to_string())))
    }

    async fn check_authorization(
        &self,
        _request: &StatusRequest,
    ) -> Result<StatusReport, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.status_latency {
            tokio::time::sleep(latency).await;
        }
        self.status_replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Protocol("status script exhausted".to_string())))
    }
}
