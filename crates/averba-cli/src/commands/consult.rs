//! Full margin consultation: dispatch a code, poll, print the result.

use std::sync::Arc;

use anyhow::{Context, Result};
use averba_core::gateway::AuthorizationGateway;
use averba_core::linkage::{LinkageStore, MemoryLinkageStore};
use averba_core::poller;
use averba_core::session::{MarginPayload, Outcome, SessionState};
use averba_core::{Orchestrator, PollingPolicy, Snapshot};
use secrecy::SecretString;
use tokio::sync::watch;

pub struct ConsultArgs {
    pub base_url: String,
    pub token: SecretString,
    pub cpf: String,
    pub phone: String,
    pub channel: String,
    pub user_id: String,
    pub display_name: Option<String>,
    pub max_attempts: Option<u32>,
    pub check_interval: Option<u64>,
    pub enforce_linkage: bool,
}

pub fn run(args: &ConsultArgs) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    rt.block_on(consult(args))
}

async fn consult(args: &ConsultArgs) -> Result<()> {
    let channel = super::parse_channel(&args.channel)?;
    let gateway = Arc::new(super::build_gateway(&args.base_url, args.token.clone())?);
    let linkage = Arc::new(MemoryLinkageStore::new());

    let mut policy = PollingPolicy::default();
    if let Some(max_attempts) = args.max_attempts {
        policy = policy.with_max_attempts(max_attempts);
    }
    if let Some(seconds) = args.check_interval {
        policy.check_interval = std::time::Duration::from_secs(seconds);
    }

    let mut orchestrator = Orchestrator::new(args.user_id.as_str(), gateway, linkage, policy.clone())
        .with_linkage_enforcement(args.enforce_linkage);
    if let Some(name) = &args.display_name {
        orchestrator = orchestrator.with_display_name(name.as_str());
    }
    let orchestrator = Arc::new(orchestrator);

    let snapshot = orchestrator
        .request_authorization(&args.cpf, &args.phone, channel)
        .await;
    if let Some(notice) = &snapshot.notice {
        super::render_notice(notice);
    }

    let snapshot = if snapshot.state.is_code_sent() {
        println!(
            "Confirmation code sent. Waiting for the subject to answer \
             (up to {} checks, Ctrl-C to stop)...",
            snapshot.max_attempts
        );
        poll_until_settled(&orchestrator, &policy).await
    } else {
        snapshot
    };

    render_final(&snapshot);
    Ok(())
}

async fn poll_until_settled<G, L>(
    orchestrator: &Arc<Orchestrator<G, L>>,
    policy: &PollingPolicy,
) -> Snapshot
where
    G: AuthorizationGateway,
    L: LinkageStore,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });
    poller::run(Arc::clone(orchestrator), policy, shutdown_rx).await
}

fn render_final(snapshot: &Snapshot) {
    match &snapshot.state {
        SessionState::NotRequested => {
            println!("The confirmation code expired. Request a new one to continue.");
        },
        SessionState::CodeSent => {
            println!(
                "Still waiting after {} of {} checks. Run the command again to resume.",
                snapshot.attempt_count, snapshot.max_attempts
            );
        },
        SessionState::Resolved(outcome) => render_outcome(outcome),
    }
}

fn render_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Authorized(payload) => render_payload(payload),
        Outcome::Ineligible(reason) => {
            println!("Not eligible: {reason}");
        },
        Outcome::NotFound(reason) => {
            println!("Subject not found at the partner: {reason}");
        },
        Outcome::Expired => {
            println!("The confirmation code expired before it was answered.");
        },
        Outcome::Error(reason) if reason == "timeout" => {
            println!("No answer within the polling window. Request a new code to retry.");
        },
        Outcome::Error(reason) => {
            println!("Consultation failed: {reason}");
        },
    }
}

fn render_payload(payload: &MarginPayload) {
    println!("Authorization confirmed.");
    println!("  Name:             {}", payload.nome);
    println!("  Employer:         {}", payload.orgao);
    println!("  Admission date:   {}", payload.data_admissao);
    println!("  Available margin: {}", payload.margem_disponivel);
    println!("  Base margin:      {}", payload.margem_base);
    println!("  Total earnings:   {}", payload.total_rendimentos);
    println!("  Eligible:         {}", if payload.elegivel { "yes" } else { "no" });
    println!("  Updated at:       {}", payload.atualizado_em);
}
