//! In-memory token repository for tests and `--memory` runs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Category, CategoryTransition, Token, TokenAddress, TokenPatch};
use crate::error::{LifecycleError, Result};
use crate::port::outbound::repository::{CommitOutcome, TokenRepository};

#[derive(Debug, Default)]
struct Tables {
    tokens: BTreeMap<TokenAddress, Token>,
    transitions: HashMap<TokenAddress, Vec<CategoryTransition>>,
}

/// Token repository backed by process memory.
///
/// Both tables sit behind one lock, so `commit_transition` is atomic.
#[derive(Debug, Default)]
pub struct MemoryTokenRepository {
    tables: RwLock<Tables>,
}

impl MemoryTokenRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn get(&self, address: &TokenAddress) -> Result<Option<Token>> {
        Ok(self.tables.read().tokens.get(address).cloned())
    }

    async fn insert(&self, token: &Token) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.tokens.contains_key(&token.address) {
            return Err(LifecycleError::TokenExists(token.address.clone()).into());
        }
        tables.tokens.insert(token.address.clone(), token.clone());
        Ok(())
    }

    async fn update(&self, address: &TokenAddress, patch: &TokenPatch) -> Result<Token> {
        let mut tables = self.tables.write();
        let token = tables
            .tokens
            .get_mut(address)
            .ok_or_else(|| LifecycleError::TokenNotFound(address.clone()))?;
        token.apply(patch);
        Ok(token.clone())
    }

    async fn commit_transition(
        &self,
        expected_from: Category,
        patch: &TokenPatch,
        record: &CategoryTransition,
    ) -> Result<CommitOutcome> {
        let mut tables = self.tables.write();
        let token = tables
            .tokens
            .get_mut(&record.address)
            .ok_or_else(|| LifecycleError::TokenNotFound(record.address.clone()))?;
        if token.category != expected_from {
            return Ok(CommitOutcome::Conflict {
                actual: token.category,
            });
        }
        token.apply(patch);
        let updated = token.clone();
        tables
            .transitions
            .entry(record.address.clone())
            .or_default()
            .push(record.clone());
        Ok(CommitOutcome::Committed(updated))
    }

    async fn transitions(&self, address: &TokenAddress) -> Result<Vec<CategoryTransition>> {
        Ok(self
            .tables
            .read()
            .transitions
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn list(&self) -> Result<Vec<Token>> {
        Ok(self.tables.read().tokens.values().cloned().collect())
    }
}
