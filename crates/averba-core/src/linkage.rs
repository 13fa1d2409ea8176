//! Profile linkage: the durable binding of one subject CPF to one user.
//!
//! Created at most once per user. The orchestrator consults this store
//! twice: a pre-flight check before requesting a code (a conflicting
//! linkage short-circuits the whole polling flow with a clear denial), and
//! a fire-and-forget creation after a terminal `Authorized` outcome.
//! Reassignment requires the administrative bypass, which from this crate's
//! point of view is simply linkage enforcement being disabled.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::subject::Cpf;

/// Errors from the linkage store.
#[derive(Debug, Error)]
pub enum LinkageError {
    /// The backing store is unavailable.
    #[error("linkage store unavailable: {0}")]
    Unavailable(String),
}

/// Result of a linkage creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkageOutcome {
    /// The binding was created (or already existed identically).
    Created,
    /// The CPF is bound to another user, or the user is bound to another
    /// CPF.
    Conflict,
}

/// Store of user-to-subject bindings.
#[async_trait]
pub trait LinkageStore: Send + Sync {
    /// Returns the CPF already bound to this user, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LinkageError`] when the store cannot be reached.
    async fn existing_linkage(&self, user_id: &str) -> Result<Option<Cpf>, LinkageError>;

    /// Binds `cpf` to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkageError`] when the store cannot be reached. A
    /// conflicting binding is reported through [`LinkageOutcome::Conflict`],
    /// not as an error.
    async fn create_linkage(&self, user_id: &str, cpf: &Cpf) -> Result<LinkageOutcome, LinkageError>;
}

/// In-memory linkage store for tests and local tooling.
#[derive(Default)]
pub struct MemoryLinkageStore {
    bindings: Mutex<HashMap<String, Cpf>>,
}

impl MemoryLinkageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one binding.
    #[must_use]
    pub fn with_binding(user_id: &str, cpf: Cpf) -> Self {
        let store = Self::new();
        if let Ok(mut bindings) = store.bindings.lock() {
            bindings.insert(user_id.to_string(), cpf);
        }
        store
    }
}

#[async_trait]
impl LinkageStore for MemoryLinkageStore {
    async fn existing_linkage(&self, user_id: &str) -> Result<Option<Cpf>, LinkageError> {
        let bindings = self
            .bindings
            .lock()
            .map_err(|_| LinkageError::Unavailable("lock poisoned".to_string()))?;
        Ok(bindings.get(user_id).cloned())
    }

    async fn create_linkage(&self, user_id: &str, cpf: &Cpf) -> Result<LinkageOutcome, LinkageError> {
        let mut bindings = self
            .bindings
            .lock()
            .map_err(|_| LinkageError::Unavailable("lock poisoned".to_string()))?;

        if let Some(existing) = bindings.get(user_id) {
            return Ok(if existing == cpf {
                LinkageOutcome::Created
            } else {
                LinkageOutcome::Conflict
            });
        }
        if bindings.values().any(|bound| bound == cpf) {
            return Ok(LinkageOutcome::Conflict);
        }

        bindings.insert(user_id.to_string(), cpf.clone());
        Ok(LinkageOutcome::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpf() -> Cpf {
        Cpf::parse("529.982.247-25").unwrap()
    }

    fn other_cpf() -> Cpf {
        // 111.444.777-35 also verifies.
        Cpf::parse("111.444.777-35").unwrap()
    }

    #[tokio::test]
    async fn test_create_then_read_back() {
        let store = MemoryLinkageStore::new();
        assert_eq!(
            store.create_linkage("user-1", &cpf()).await.unwrap(),
            LinkageOutcome::Created
        );
        assert_eq!(
            store.existing_linkage("user-1").await.unwrap(),
            Some(cpf())
        );
    }

    #[tokio::test]
    async fn test_same_binding_twice_is_idempotent() {
        let store = MemoryLinkageStore::new();
        store.create_linkage("user-1", &cpf()).await.unwrap();
        assert_eq!(
            store.create_linkage("user-1", &cpf()).await.unwrap(),
            LinkageOutcome::Created
        );
    }

    #[tokio::test]
    async fn test_user_cannot_bind_second_cpf() {
        let store = MemoryLinkageStore::new();
        store.create_linkage("user-1", &cpf()).await.unwrap();
        assert_eq!(
            store.create_linkage("user-1", &other_cpf()).await.unwrap(),
            LinkageOutcome::Conflict
        );
    }

    #[tokio::test]
    async fn test_cpf_cannot_bind_to_second_user() {
        let store = MemoryLinkageStore::new();
        store.create_linkage("user-1", &cpf()).await.unwrap();
        assert_eq!(
            store.create_linkage("user-2", &cpf()).await.unwrap(),
            LinkageOutcome::Conflict
        );
    }

    #[tokio::test]
    async fn test_unlinked_user_reads_none() {
        let store = MemoryLinkageStore::new();
        assert_eq!(store.existing_linkage("user-9").await.unwrap(), None);
    }
}
