//! Payroll-margin authorization orchestration.
//!
//! A consumer authorizes a financial-data provider to release their
//! payroll-margin data by answering a one-time code sent over SMS or
//! WhatsApp. There is no push notification: the client polls the partner
//! gateway for confirmation. This crate owns that client-side protocol:
//! the session state machine, the timing policy, the attempt bookkeeping,
//! and the classification of partner responses into canonical outcomes.
//! It must never leave the user stuck or silently dropped.
//!
//! # Components
//!
//! - [`session`]: the `AuthorizationSession` lifecycle state machine.
//! - [`subject`]: validated CPF and phone-number newtypes.
//! - [`policy`]: polling cadence, attempt ceiling, grace window.
//! - [`gateway`]: the partner gateway contract, HTTP client, credential
//!   cache, and response classification.
//! - [`linkage`]: the user-to-subject binding collaborator contract.
//! - [`orchestrator`]: drives one session from code request to terminal
//!   resolution, one observable snapshot at a time.
//! - [`poller`]: automatic check cadence over an orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use averba_core::gateway::{CredentialCache, HttpGateway, StaticCredentialSource};
//! use averba_core::linkage::MemoryLinkageStore;
//! use averba_core::orchestrator::Orchestrator;
//! use averba_core::policy::PollingPolicy;
//! use averba_core::session::Channel;
//! use secrecy::SecretString;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = CredentialCache::new(StaticCredentialSource::new(
//!     SecretString::from("bearer-token".to_string()),
//! ));
//! let gateway = Arc::new(HttpGateway::new("https://gw.example.com", credentials)?);
//! let orchestrator = Arc::new(Orchestrator::new(
//!     "user-1",
//!     gateway,
//!     Arc::new(MemoryLinkageStore::new()),
//!     PollingPolicy::default(),
//! ));
//!
//! let snapshot = orchestrator
//!     .request_authorization("529.982.247-25", "27 99999-8888", Channel::Whatsapp)
//!     .await;
//! println!("{snapshot:?}");
//! # Ok(())
//! # }
//! ```

pub mod gateway;
pub mod linkage;
pub mod orchestrator;
pub mod policy;
pub mod poller;
pub mod session;
pub mod subject;

pub use orchestrator::{Notice, NoticeKind, Orchestrator, Snapshot};
pub use policy::PollingPolicy;
pub use session::{AuthorizationSession, Channel, MarginPayload, Outcome, SessionState};
pub use subject::{Contact, Cpf, SubjectError};
