//! Authorization orchestrator.
//!
//! Drives one [`AuthorizationSession`] from code request through terminal
//! resolution, issuing at most one outstanding gateway call at a time and
//! exposing a single observable [`Snapshot`] for the presentation layer.
//!
//! Public operations never return `Err`: every call resolves to a state
//! update the presentation layer renders. Recoverable request failures
//! (bad input, business rejections, throttled resends, expired identity
//! credentials, transport blips) surface as a [`Notice`] beside the session
//! state rather than as session outcomes.
//!
//! One orchestrator instance owns one session. Concurrent sessions for the
//! same subject across tabs or devices are not arbitrated here; that would
//! need a server-side single-writer token.

mod snapshot;


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::gateway::classify::{classify_dispatch, classify_status, DispatchVerdict, StatusVerdict};
use crate::gateway::{AuthorizationGateway, CodeRequest, GatewayError, StatusRequest};
use crate::linkage::{LinkageOutcome, LinkageStore};
use crate::policy::PollingPolicy;
use crate::session::{AuthorizationSession, Channel, Outcome, SessionState};
use crate::subject::{Contact, Cpf};

pub use snapshot::{Notice, NoticeKind, Snapshot};

/// Reason string used when the attempt ceiling is reached while pending.
pub const TIMEOUT_REASON: &str = "timeout";

/// Mutable orchestrator state behind the session lock.
struct Inner {
    session: Option<AuthorizationSession>,
    notice: Option<Notice>,
    last_request_at: Option<chrono::DateTime<Utc>>,
}

/// Clears the in-flight flag when the status check finishes, on every path.
struct InFlightClear<'a>(&'a AtomicBool);

impl Drop for InFlightClear<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one authorization session against the gateway.
pub struct Orchestrator<G, L> {
    user_id: String,
    display_name: String,
    gateway: Arc<G>,
    linkage: Arc<L>,
    policy: PollingPolicy,
    enforce_linkage: bool,
    inner: Mutex<Inner>,
    check_in_flight: AtomicBool,
    watch_tx: watch::Sender<Snapshot>,
}

impl<G, L> Orchestrator<G, L>
where
    G: AuthorizationGateway,
    L: LinkageStore,
{
    /// Creates an orchestrator for the given application user.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        gateway: Arc<G>,
        linkage: Arc<L>,
        policy: PollingPolicy,
    ) -> Self {
        let user_id = user_id.into();
        let (watch_tx, _) = watch::channel(Snapshot::initial(policy.max_attempts));
        Self {
            display_name: user_id.clone(),
            user_id,
            gateway,
            linkage,
            policy,
            enforce_linkage: true,
            inner: Mutex::new(Inner {
                session: None,
                notice: None,
                last_request_at: None,
            }),
            check_in_flight: AtomicBool::new(false),
            watch_tx,
        }
    }

    /// Sets the name shown in the out-of-band message.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Enables or disables linkage enforcement (the administrative bypass
    /// disables it).
    #[must_use]
    pub const fn with_linkage_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_linkage = enforce;
        self
    }

    /// Returns the timing policy this orchestrator was built with.
    #[must_use]
    pub const fn policy(&self) -> &PollingPolicy {
        &self.policy
    }

    /// Returns the current observable state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.watch_tx.borrow().clone()
    }

    /// Subscribes to snapshot updates; a new snapshot is published after
    /// every public operation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.watch_tx.subscribe()
    }

    /// Requests a one-time authorization code for `cpf` via `channel`.
    ///
    /// While a session is in `CodeSent` this doubles as a resend: a fresh
    /// session replaces the old one (same subject, new id, zeroed attempt
    /// counter), throttled by the resend cooldown.
    pub async fn request_authorization(
        &self,
        cpf: &str,
        contact: &str,
        channel: Channel,
    ) -> Snapshot {
        let now = Utc::now();

        let (cpf, contact) = match (Cpf::parse(cpf), Contact::parse(contact)) {
            (Ok(cpf), Ok(contact)) => (cpf, contact),
            (Err(error), _) | (_, Err(error)) => {
                let mut inner = self.inner.lock().await;
                inner.notice = Some(Notice::invalid_input(error.to_string()));
                return self.publish(&inner);
            },
        };

        // Cooldown check; the stamp is reserved up front so two rapid calls
        // cannot both pass, and restored if the gateway call never lands.
        let previous_stamp = {
            let mut inner = self.inner.lock().await;
            if let Some(last) = inner.last_request_at {
                let elapsed = now.signed_duration_since(last);
                let cooldown = chrono::Duration::from_std(self.policy.resend_cooldown)
                    .unwrap_or_else(|_| chrono::Duration::zero());
                if elapsed < cooldown {
                    inner.notice = Some(Notice::resend_throttled(self.policy.resend_cooldown));
                    return self.publish(&inner);
                }
            }
            let previous = inner.last_request_at;
            inner.last_request_at = Some(now);
            previous
        };

        if self.enforce_linkage {
            match self.linkage.existing_linkage(&self.user_id).await {
                Ok(Some(bound)) if bound != cpf => {
                    let mut inner = self.inner.lock().await;
                    inner.last_request_at = previous_stamp;
                    inner.notice = Some(Notice::linkage_denied(&bound));
                    warn!(
                        target: "orchestrator",
                        user = %self.user_id,
                        bound = %bound,
                        requested = %cpf,
                        "linkage pre-flight denied consultation"
                    );
                    return self.publish(&inner);
                },
                Ok(_) => {},
                Err(error) => {
                    let mut inner = self.inner.lock().await;
                    inner.last_request_at = previous_stamp;
                    inner.notice = Some(Notice::transport_failure(error.to_string()));
                    return self.publish(&inner);
                },
            }
        }

        let request = CodeRequest {
            subject_id: cpf.clone(),
            contact_address: contact.clone(),
            channel,
            display_name: self.display_name.clone(),
        };
        let result = self.gateway.request_code(&request).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(dispatch) => match classify_dispatch(dispatch) {
                DispatchVerdict::CodeSent { protocol } => {
                    info!(
                        target: "orchestrator",
                        subject = %cpf,
                        channel = channel.wire_code(),
                        protocol = protocol.as_deref().unwrap_or("-"),
                        "authorization code dispatched"
                    );
                    inner.session =
                        Some(AuthorizationSession::code_sent(cpf, contact, channel, now));
                    inner.notice = None;
                },
                DispatchVerdict::AlreadyAuthorized => {
                    info!(
                        target: "orchestrator",
                        subject = %cpf,
                        "subject pre-authorized, taking fast path"
                    );
                    inner.session =
                        Some(AuthorizationSession::fast_path(cpf, contact, channel, now));
                    inner.notice = None;
                    self.publish(&inner);
                    drop(inner);
                    // One immediate status check so the fast path shares the
                    // normal payload-extraction path.
                    return self.check_status().await;
                },
                DispatchVerdict::Rejected(message) => {
                    debug!(target: "orchestrator", subject = %cpf, %message, "dispatch rejected");
                    inner.notice = Some(Notice::business_rejection(message));
                },
            },
            Err(GatewayError::CredentialExpired) => {
                inner.last_request_at = previous_stamp;
                inner.notice = Some(Notice::session_expired());
            },
            Err(error) => {
                inner.last_request_at = previous_stamp;
                inner.notice = Some(Notice::transport_failure(error.to_string()));
            },
        }
        self.publish(&inner)
    }

    /// Checks whether the subject has confirmed authorization.
    ///
    /// Idempotent no-op outside `CodeSent`. At most one check is in flight
    /// per session: a concurrent call returns the current snapshot without
    /// touching the attempt counter or the gateway.
    pub async fn check_status(&self) -> Snapshot {
        if self
            .check_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return self.snapshot();
        }
        let _clear = InFlightClear(&self.check_in_flight);
        let now = Utc::now();

        let prepared = {
            let mut inner = self.inner.lock().await;
            match inner.session.as_mut() {
                Some(session) if session.state.is_code_sent() => {
                    // Guarded by is_code_sent above; the increment lands
                    // before the gateway call so a slow response cannot
                    // under-count attempts.
                    session.begin_check(now).ok();
                    debug!(
                        target: "orchestrator",
                        session = %session.id,
                        attempt = session.attempt_count,
                        "status check started"
                    );
                    Some((
                        StatusRequest {
                            subject_id: session.subject.clone(),
                            contact_address: session.contact.clone(),
                        },
                        session.id,
                    ))
                },
                _ => None,
            }
        };
        let Some((request, session_id)) = prepared else {
            return self.snapshot();
        };

        let result = self.gateway.check_authorization(&request).await;

        let mut inner = self.inner.lock().await;
        let state = &mut *inner;
        let mut authorized_subject = None;
        match state.session.as_mut() {
            // The session may have been replaced (reset or resend) while the
            // call was in flight; a stale response is discarded.
            Some(session) if session.id == session_id && session.state.is_code_sent() => {
                let attempt = session.attempt_count;
                if result.is_ok() {
                    // A settled reply supersedes any notice left by an
                    // earlier failed check.
                    state.notice = None;
                }
                match result {
                    Ok(report) => match classify_status(report) {
                        StatusVerdict::Authorized(payload) => {
                            info!(
                                target: "orchestrator",
                                session = %session.id,
                                attempt,
                                eligible = payload.elegivel,
                                "authorization confirmed"
                            );
                            authorized_subject = Some(session.subject.clone());
                            session.resolve(Outcome::Authorized(payload)).ok();
                        },
                        StatusVerdict::Pending => {
                            if attempt >= self.policy.max_attempts {
                                info!(
                                    target: "orchestrator",
                                    session = %session.id,
                                    attempt,
                                    "attempt ceiling reached while pending"
                                );
                                session
                                    .resolve(Outcome::Error(TIMEOUT_REASON.to_string()))
                                    .ok();
                            }
                        },
                        StatusVerdict::Expired => {
                            if attempt > self.policy.grace_attempts {
                                info!(
                                    target: "orchestrator",
                                    session = %session.id,
                                    attempt,
                                    "code expired, returning to code entry"
                                );
                                session.revert_expired().ok();
                            }
                            // Within the grace window the confirmation
                            // channel may simply be lagging; stay pending.
                        },
                        StatusVerdict::Ineligible(reason) => {
                            session.resolve(Outcome::Ineligible(reason)).ok();
                        },
                        StatusVerdict::NotFound(reason) => {
                            session.resolve(Outcome::NotFound(reason)).ok();
                        },
                        StatusVerdict::Failed(reason) => {
                            if attempt > self.policy.grace_attempts {
                                session.resolve(Outcome::Error(reason)).ok();
                            }
                        },
                    },
                    Err(GatewayError::CredentialExpired) => {
                        state.notice = Some(Notice::session_expired());
                        // The attempt ceiling applies on this path too; an
                        // expired credential must not extend polling.
                        if attempt >= self.policy.max_attempts {
                            info!(
                                target: "orchestrator",
                                session = %session_id,
                                attempt,
                                "attempt ceiling reached with expired credential"
                            );
                            session
                                .resolve(Outcome::Error(TIMEOUT_REASON.to_string()))
                                .ok();
                        }
                    },
                    Err(error) => {
                        // Transient transport blips ride the normal polling
                        // cadence inside the grace window.
                        if attempt > self.policy.grace_attempts {
                            session.resolve(Outcome::Error(error.to_string())).ok();
                        } else {
                            debug!(
                                target: "orchestrator",
                                session = %session_id,
                                attempt,
                                %error,
                                "transport error tolerated during grace window"
                            );
                        }
                    },
                }
            },
            _ => {},
        }
        let snapshot = self.publish(&inner);
        drop(inner);

        if let Some(subject) = authorized_subject {
            self.record_linkage(&subject).await;
        }
        snapshot
    }

    /// Abandons the current session and returns to `NotRequested`.
    ///
    /// The old session object is dropped, never mutated past its terminal
    /// state. The resend cooldown keeps counting across a reset.
    pub async fn reset(&self) -> Snapshot {
        let mut inner = self.inner.lock().await;
        inner.session = None;
        inner.notice = None;
        self.publish(&inner)
    }

    /// Fire-and-forget linkage creation after a terminal `Authorized`
    /// outcome. A linkage failure never reverts the outcome; the margin
    /// data is still valid.
    async fn record_linkage(&self, subject: &Cpf) {
        if !self.enforce_linkage {
            return;
        }
        match self.linkage.existing_linkage(&self.user_id).await {
            Ok(Some(_)) => {},
            Ok(None) => match self.linkage.create_linkage(&self.user_id, subject).await {
                Ok(LinkageOutcome::Created) => {
                    info!(target: "orchestrator", user = %self.user_id, subject = %subject, "linkage created");
                },
                Ok(LinkageOutcome::Conflict) => {
                    warn!(target: "orchestrator", user = %self.user_id, subject = %subject, "linkage conflict after authorization");
                },
                Err(error) => {
                    warn!(target: "orchestrator", user = %self.user_id, %error, "linkage creation failed");
                },
            },
            Err(error) => {
                warn!(target: "orchestrator", user = %self.user_id, %error, "linkage lookup failed");
            },
        }
    }

    fn publish(&self, inner: &Inner) -> Snapshot {
        let snapshot = Snapshot {
            state: inner
                .session
                .as_ref()
                .map_or(SessionState::NotRequested, |s| s.state.clone()),
            attempt_count: inner.session.as_ref().map_or(0, |s| s.attempt_count),
            max_attempts: self.policy.max_attempts,
            notice: inner.notice.clone(),
        };
        self.watch_tx.send_replace(snapshot.clone());
        snapshot
    }
}
