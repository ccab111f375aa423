//! Repository wrapper with call counters and failure injection.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::adapter::outbound::memory::MemoryTokenRepository;
use crate::domain::{Category, CategoryTransition, Token, TokenAddress, TokenPatch};
use crate::error::{Error, Result};
use crate::port::outbound::repository::{CommitOutcome, TokenRepository};

/// Delegates to an inner repository, counting writes and failing them on
/// demand.
pub struct RecordingRepository {
    inner: Arc<dyn TokenRepository>,
    fail_writes: AtomicBool,
    updates: AtomicU32,
    commits: AtomicU32,
}

impl RecordingRepository {
    pub fn new(inner: Arc<dyn TokenRepository>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            updates: AtomicU32::new(0),
            commits: AtomicU32::new(0),
        }
    }

    /// Wrap a fresh in-memory repository.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenRepository::new()))
    }

    /// Fail every write with a persistence error until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful `update` calls.
    pub fn updates(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }

    /// Successful `commit_transition` calls, conflicts included.
    pub fn commits(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for RecordingRepository {
    async fn get(&self, address: &TokenAddress) -> Result<Option<Token>> {
        self.inner.get(address).await
    }

    async fn insert(&self, token: &Token) -> Result<()> {
        self.check()?;
        self.inner.insert(token).await
    }

    async fn update(&self, address: &TokenAddress, patch: &TokenPatch) -> Result<Token> {
        self.check()?;
        let token = self.inner.update(address, patch).await?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(token)
    }

    async fn commit_transition(
        &self,
        expected_from: Category,
        patch: &TokenPatch,
        record: &CategoryTransition,
    ) -> Result<CommitOutcome> {
        self.check()?;
        let outcome = self.inner.commit_transition(expected_from, patch, record).await?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }

    async fn transitions(&self, address: &TokenAddress) -> Result<Vec<CategoryTransition>> {
        self.inner.transitions(address).await
    }

    async fn list(&self) -> Result<Vec<Token>> {
        self.inner.list().await
    }
}
