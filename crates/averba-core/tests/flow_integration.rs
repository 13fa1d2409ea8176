//! End-to-end flows through the orchestrator and the polling driver,
//! exercised against the scripted gateway.

use std::sync::Arc;
use std::time::Duration;

use averba_core::gateway::ScriptedGateway;
use averba_core::linkage::{LinkageStore, MemoryLinkageStore};
use averba_core::orchestrator::Orchestrator;
use averba_core::policy::PollingPolicy;
use averba_core::session::{Channel, Outcome, SessionState};
use averba_core::subject::Cpf;
use averba_core::{poller, Snapshot};
use tokio::sync::watch;

const CPF: &str = "529.982.247-25";
const PHONE: &str = "27999998888";

fn fast_policy() -> PollingPolicy {
    PollingPolicy {
        initial_delay: Duration::from_millis(10),
        check_interval: Duration::from_millis(5),
        max_attempts: 20,
        grace_attempts: 3,
        resend_cooldown: Duration::ZERO,
    }
}

async fn drive(
    orch: &Arc<Orchestrator<ScriptedGateway, MemoryLinkageStore>>,
    policy: &PollingPolicy,
) -> Snapshot {
    let (_tx, rx) = watch::channel(false);
    poller::run(Arc::clone(orch), policy, rx).await
}

#[tokio::test]
async fn full_flow_resolves_authorized_and_links_the_subject() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_dispatch(ScriptedGateway::code_sent());
    for _ in 0..2 {
        gateway.push_status(ScriptedGateway::pending());
    }
    gateway.push_status(ScriptedGateway::authorized(ScriptedGateway::sample_payload()));

    let linkage = Arc::new(MemoryLinkageStore::new());
    let policy = fast_policy();
    let orch = Arc::new(Orchestrator::new(
        "user-1",
        Arc::clone(&gateway),
        Arc::clone(&linkage),
        policy.clone(),
    ));

    orch.request_authorization(CPF, PHONE, Channel::Sms).await;
    let final_snapshot = drive(&orch, &policy).await;

    match final_snapshot.state {
        SessionState::Resolved(Outcome::Authorized(payload)) => {
            assert!(payload.elegivel);
            assert_eq!(payload.orgao, "Prefeitura de Vitória");
        },
        other => panic!("expected authorized, got {other:?}"),
    }
    assert_eq!(final_snapshot.attempt_count, 3);
    assert_eq!(
        linkage.existing_linkage("user-1").await.unwrap(),
        Some(Cpf::parse(CPF).unwrap())
    );
}

#[tokio::test]
async fn late_expiry_flows_back_to_code_entry_then_succeeds_on_resend() {
    let gateway = Arc::new(ScriptedGateway::new());
    // First session: four pendings, then a late expiry past the grace
    // window sends the user back to code entry.
    gateway.push_dispatch(ScriptedGateway::code_sent());
    for _ in 0..4 {
        gateway.push_status(ScriptedGateway::pending());
    }
    gateway.push_status(ScriptedGateway::expired());
    // Second session: authorized on the first check.
    gateway.push_dispatch(ScriptedGateway::code_sent());
    gateway.push_status(ScriptedGateway::authorized(ScriptedGateway::sample_payload()));

    let policy = fast_policy();
    let orch = Arc::new(Orchestrator::new(
        "user-1",
        Arc::clone(&gateway),
        Arc::new(MemoryLinkageStore::new()),
        policy.clone(),
    ));

    orch.request_authorization(CPF, PHONE, Channel::Whatsapp).await;
    let snapshot = drive(&orch, &policy).await;
    assert_eq!(snapshot.state, SessionState::NotRequested);

    // The user requests a fresh code; the new session starts from zero.
    let snapshot = orch.request_authorization(CPF, PHONE, Channel::Whatsapp).await;
    assert_eq!(snapshot.attempt_count, 0);
    let snapshot = drive(&orch, &policy).await;
    assert!(matches!(
        snapshot.state,
        SessionState::Resolved(Outcome::Authorized(_))
    ));
    assert_eq!(gateway.dispatch_calls(), 2);
}

#[tokio::test]
async fn exhausted_polling_times_out_with_explicit_reason() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_dispatch(ScriptedGateway::code_sent());
    for _ in 0..20 {
        gateway.push_status(ScriptedGateway::pending());
    }

    let policy = fast_policy();
    let orch = Arc::new(Orchestrator::new(
        "user-1",
        Arc::clone(&gateway),
        Arc::new(MemoryLinkageStore::new()),
        policy.clone(),
    ));

    orch.request_authorization(CPF, PHONE, Channel::Sms).await;
    let snapshot = drive(&orch, &policy).await;

    assert_eq!(
        snapshot.state,
        SessionState::Resolved(Outcome::Error("timeout".to_string()))
    );
    assert_eq!(snapshot.attempt_count, 20);
    assert_eq!(gateway.status_calls(), 20);
}

#[tokio::test]
async fn fast_path_skips_polling_entirely() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_dispatch(ScriptedGateway::already_authorized());
    gateway.push_status(ScriptedGateway::authorized(ScriptedGateway::sample_payload()));

    let policy = fast_policy();
    let orch = Arc::new(Orchestrator::new(
        "user-1",
        Arc::clone(&gateway),
        Arc::new(MemoryLinkageStore::new()),
        policy.clone(),
    ));

    let snapshot = orch.request_authorization(CPF, PHONE, Channel::Sms).await;
    assert!(matches!(
        snapshot.state,
        SessionState::Resolved(Outcome::Authorized(_))
    ));

    // The poller has nothing left to do.
    let snapshot = drive(&orch, &policy).await;
    assert!(snapshot.state.is_resolved());
    assert_eq!(gateway.status_calls(), 1);
}
