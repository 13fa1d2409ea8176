//! Automatic polling driver for an authorization session.
//!
//! The orchestrator owns the state machine; this module owns the cadence:
//! a longer initial delay (the user needs time to receive and answer the
//! out-of-band message), then a fixed steady interval until the session
//! leaves `CodeSent`. Manual "check now" triggers go straight to
//! [`Orchestrator::check_status`] from anywhere and do not reset the
//! cadence. The attempt ceiling is enforced inside `check_status`; the
//! poller only observes the resulting state and stops.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::gateway::AuthorizationGateway;
use crate::linkage::LinkageStore;
use crate::orchestrator::{Orchestrator, Snapshot};
use crate::policy::PollingPolicy;

/// Drives automatic status checks until the session settles.
///
/// Returns the snapshot that ended polling: a terminal `Resolved`, a
/// backward transition to `NotRequested` (late expiry), or whatever state
/// was current when the shutdown signal fired (presentation teardown).
pub async fn run<G, L>(
    orchestrator: Arc<Orchestrator<G, L>>,
    policy: &PollingPolicy,
    mut shutdown: watch::Receiver<bool>,
) -> Snapshot
where
    G: AuthorizationGateway,
    L: LinkageStore,
{
    loop {
        let snapshot = orchestrator.snapshot();
        if !snapshot.state.is_code_sent() {
            debug!(
                target: "poller",
                attempts = snapshot.attempt_count,
                "polling finished"
            );
            return snapshot;
        }

        let delay = policy.delay_before(snapshot.attempt_count + 1);
        tokio::select! {
            () = tokio::time::sleep(delay) => {
                orchestrator.check_status().await;
            },
            _ = shutdown.changed() => {
                debug!(target: "poller", "polling abandoned");
                return orchestrator.snapshot();
            },
        }
    }
}
