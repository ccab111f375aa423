//! Token persistence port.

use async_trait::async_trait;

use crate::domain::{Category, CategoryTransition, Token, TokenAddress, TokenPatch};
use crate::error::Result;

/// Result of an atomic category commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Patch applied and transition appended; carries the updated token.
    Committed(Token),
    /// The stored category no longer matched; nothing was written.
    Conflict { actual: Category },
}

/// Storage for tokens and their append-only transition history.
///
/// Implementations must apply patches field by field: anything absent from a
/// [`TokenPatch`] is left as stored.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Get a token by address.
    async fn get(&self, address: &TokenAddress) -> Result<Option<Token>>;

    /// Insert a new token.
    ///
    /// Fails with `LifecycleError::TokenExists` if the address is tracked.
    async fn insert(&self, token: &Token) -> Result<()>;

    /// Apply a partial update and return the stored result.
    ///
    /// Fails with `LifecycleError::TokenNotFound` for unknown addresses.
    async fn update(&self, address: &TokenAddress, patch: &TokenPatch) -> Result<Token>;

    /// Atomically apply `patch` and append `record`, provided the token is
    /// still in `expected_from`.
    ///
    /// Either both writes happen or neither does.
    async fn commit_transition(
        &self,
        expected_from: Category,
        patch: &TokenPatch,
        record: &CategoryTransition,
    ) -> Result<CommitOutcome>;

    /// Transition history for a token, oldest first.
    async fn transitions(&self, address: &TokenAddress) -> Result<Vec<CategoryTransition>>;

    /// All tracked tokens, ordered by address.
    async fn list(&self) -> Result<Vec<Token>>;
}
