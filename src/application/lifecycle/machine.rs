//! Category state machine.
//!
//! The only writer of a token's `category`. Every change goes through
//! [`TokenRepository::commit_transition`], which updates the token and
//! appends the transition record in one atomic step guarded by the expected
//! source category.
//!
//! # Concurrency
//!
//! Calls for the same token are serialized in-process by [`StripedLocks`].
//! Writers in other processes are caught by the compare-and-set in
//! `commit_transition`: on conflict the token is re-read and the decision is
//! made again, so a concurrent change is never silently overwritten.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::lock::StripedLocks;
use crate::domain::{
    BandTable, Category, CategoryTransition, MarketSnapshot, Token, TokenAddress, TokenPatch,
    TransitionReason,
};
use crate::error::{ConfigError, Error, LifecycleError, Result};
use crate::port::outbound::repository::{CommitOutcome, TokenRepository};

/// Attempts before a persistent conflict is reported to the caller.
const MAX_COMMIT_ATTEMPTS: usize = 8;

const EVENT_CAPACITY: usize = 256;

/// Maps valuations to categories and records every category change.
pub struct CategoryStateMachine {
    repository: Arc<dyn TokenRepository>,
    bands: Arc<BandTable>,
    locks: StripedLocks,
    events: broadcast::Sender<CategoryTransition>,
}

impl CategoryStateMachine {
    pub fn new(repository: Arc<dyn TokenRepository>, bands: Arc<BandTable>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            repository,
            bands,
            locks: StripedLocks::default(),
            events,
        }
    }

    #[must_use]
    pub fn bands(&self) -> &BandTable {
        &self.bands
    }

    /// Receive every committed transition.
    ///
    /// Observers are informational. The scheduler is driven by return values,
    /// not by this channel, so a lagging receiver loses nothing that matters.
    pub fn subscribe(&self) -> broadcast::Receiver<CategoryTransition> {
        self.events.subscribe()
    }

    /// Category whose band contains `valuation`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoMatchingBand`] for negative valuations.
    pub fn assign_initial_category(&self, valuation: Decimal) -> Result<Category, ConfigError> {
        self.bands.category_for(valuation)
    }

    /// Start tracking a newly discovered token.
    ///
    /// The category is derived from the snapshot valuation, zero if absent.
    pub async fn track(&self, address: TokenAddress, snapshot: &MarketSnapshot) -> Result<Token> {
        let valuation = snapshot.valuation_or_zero();
        ensure_non_negative(valuation)?;
        let category = self.assign_initial_category(valuation)?;

        let _guard = self.locks.lock(&address).await;
        let token = Token::new(address, category, snapshot, Utc::now());
        self.repository.insert(&token).await?;

        info!(
            address = %token.address,
            category = %category,
            valuation = %valuation,
            "Token tracked"
        );
        Ok(token)
    }

    /// Store a new valuation and move the token to the matching band.
    ///
    /// Returns the transition when the category changed. An in-band update
    /// writes only the valuation, and not even that if it is unchanged.
    /// Tokens in an absorbing category keep their category.
    pub async fn apply_valuation_update(
        &self,
        address: &TokenAddress,
        valuation: Decimal,
    ) -> Result<Option<CategoryTransition>> {
        self.rebalance(address, valuation, TransitionReason::ValuationBand)
            .await
    }

    async fn rebalance(
        &self,
        address: &TokenAddress,
        valuation: Decimal,
        reason: TransitionReason,
    ) -> Result<Option<CategoryTransition>> {
        ensure_non_negative(valuation)?;
        let target = self.bands.category_for(valuation)?;

        let _guard = self.locks.lock(address).await;
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let token = self.load(address).await?;

            if token.category.is_absorbing() || token.category == target {
                if token.valuation != valuation {
                    self.repository
                        .update(address, &TokenPatch::new().valuation(valuation))
                        .await?;
                }
                return Ok(None);
            }

            let now = Utc::now();
            let record = CategoryTransition::new(
                address.clone(),
                token.category,
                target,
                valuation,
                reason,
                now,
            );
            let patch = TokenPatch::new().category(target, now).valuation(valuation);

            if let Some(record) = self.commit(token.category, &patch, record, attempt).await? {
                return Ok(Some(record));
            }
        }

        Err(Error::Conflict(address.clone()))
    }

    /// Move a token to `to` regardless of its valuation.
    ///
    /// Valid targets are absorbing categories and categories that own a band.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] when the target has no band and
    /// is not absorbing, when the token already sits in an absorbing
    /// category, or when it is already in `to`.
    pub async fn force_transition(
        &self,
        address: &TokenAddress,
        to: Category,
        reason: TransitionReason,
        note: Option<String>,
    ) -> Result<CategoryTransition> {
        match self
            .force_transition_if(address, to, reason, note, |_| true)
            .await?
        {
            Some(record) => Ok(record),
            None => Err(Error::Conflict(address.clone())),
        }
    }

    /// Like [`force_transition`](Self::force_transition), but only while
    /// `applies` holds for the stored token.
    ///
    /// The check runs under the token lock on every attempt. Returns `None`
    /// without writing when it no longer holds.
    pub async fn force_transition_if<F>(
        &self,
        address: &TokenAddress,
        to: Category,
        reason: TransitionReason,
        note: Option<String>,
        applies: F,
    ) -> Result<Option<CategoryTransition>>
    where
        F: Fn(&Token) -> bool + Send + Sync,
    {
        let _guard = self.locks.lock(address).await;
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let token = self.load(address).await?;
            if !applies(&token) {
                return Ok(None);
            }

            let reachable = to.is_absorbing() || self.bands.has_category(to);
            if !reachable || token.category.is_absorbing() || token.category == to {
                return Err(LifecycleError::InvalidTransition {
                    address: address.clone(),
                    from: token.category,
                    to,
                }
                .into());
            }

            let now = Utc::now();
            let mut record = CategoryTransition::new(
                address.clone(),
                token.category,
                to,
                token.valuation,
                reason,
                now,
            );
            if let Some(note) = &note {
                record = record.with_note(note.clone());
            }
            let patch = TokenPatch::new().category(to, now);

            if let Some(record) = self.commit(token.category, &patch, record, attempt).await? {
                return Ok(Some(record));
            }
        }

        Err(Error::Conflict(address.clone()))
    }

    /// Like [`force_transition`](Self::force_transition) with the target
    /// given by name.
    ///
    /// An unknown name is reported as [`LifecycleError::InvalidTarget`].
    pub async fn force_transition_named(
        &self,
        address: &TokenAddress,
        to: &str,
        reason: TransitionReason,
        note: Option<String>,
    ) -> Result<CategoryTransition> {
        match to.parse::<Category>() {
            Ok(category) => self.force_transition(address, category, reason, note).await,
            Err(_) => Err(LifecycleError::InvalidTarget {
                address: address.clone(),
                target: to.to_string(),
            }
            .into()),
        }
    }

    /// Re-derive the category from the stored valuation.
    ///
    /// Used when a time-bounded scan task expires; a resulting transition is
    /// recorded as [`TransitionReason::DurationExpired`].
    pub async fn reconcile(&self, address: &TokenAddress) -> Result<Option<CategoryTransition>> {
        let token = self.load(address).await?;
        if token.category.is_absorbing() {
            return Ok(None);
        }
        self.rebalance(address, token.valuation, TransitionReason::DurationExpired)
            .await
    }

    async fn load(&self, address: &TokenAddress) -> Result<Token> {
        self.repository
            .get(address)
            .await?
            .ok_or_else(|| LifecycleError::TokenNotFound(address.clone()).into())
    }

    async fn commit(
        &self,
        expected_from: Category,
        patch: &TokenPatch,
        record: CategoryTransition,
        attempt: usize,
    ) -> Result<Option<CategoryTransition>> {
        match self
            .repository
            .commit_transition(expected_from, patch, &record)
            .await?
        {
            CommitOutcome::Committed(_) => {
                info!(
                    address = %record.address,
                    from = %record.from,
                    to = %record.to,
                    valuation = %record.valuation,
                    reason = %record.reason,
                    "Category transition"
                );
                let _ = self.events.send(record.clone());
                Ok(Some(record))
            }
            CommitOutcome::Conflict { actual } => {
                debug!(
                    address = %record.address,
                    expected = %expected_from,
                    actual = %actual,
                    attempt,
                    "Category changed underneath, retrying"
                );
                Ok(None)
            }
        }
    }
}

fn ensure_non_negative(valuation: Decimal) -> Result<()> {
    if valuation.is_sign_negative() && !valuation.is_zero() {
        return Err(LifecycleError::NegativeValuation(valuation).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryTokenRepository;
    use crate::testkit::{config, domain as fixtures, repository::RecordingRepository};
    use rust_decimal_macros::dec;

    fn machine_over(repository: Arc<dyn TokenRepository>) -> CategoryStateMachine {
        CategoryStateMachine::new(repository, Arc::new(config::bands()))
    }

    fn machine() -> CategoryStateMachine {
        machine_over(Arc::new(MemoryTokenRepository::new()))
    }

    #[tokio::test]
    async fn track_assigns_band_category() {
        let machine = machine();
        let token = machine
            .track(fixtures::address("mint1"), &fixtures::valued(15_000))
            .await
            .unwrap();
        assert_eq!(token.category, Category::Medium);
    }

    #[tokio::test]
    async fn track_without_valuation_lands_in_lowest_band() {
        let machine = machine();
        let token = machine
            .track(fixtures::address("mint1"), &fixtures::liquid(500))
            .await
            .unwrap();
        assert_eq!(token.category, Category::Low);
        assert_eq!(token.valuation, Decimal::ZERO);
    }

    #[tokio::test]
    async fn track_rejects_negative_valuation() {
        let machine = machine();
        let snapshot = MarketSnapshot {
            valuation: Some(dec!(-1)),
            ..MarketSnapshot::default()
        };
        let err = machine
            .track(fixtures::address("mint1"), &snapshot)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::NegativeValuation(_))
        ));
    }

    #[tokio::test]
    async fn track_twice_is_token_exists() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(10)).await.unwrap();
        let err = machine.track(address, &fixtures::valued(10)).await.unwrap_err();
        assert!(matches!(err, Error::Lifecycle(LifecycleError::TokenExists(_))));
    }

    #[tokio::test]
    async fn in_band_update_records_no_transition() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(1000)).await.unwrap();

        let transition = machine
            .apply_valuation_update(&address, dec!(9999))
            .await
            .unwrap();

        assert!(transition.is_none());
        let repo = &machine.repository;
        assert_eq!(repo.get(&address).await.unwrap().unwrap().valuation, dec!(9999));
        assert!(repo.transitions(&address).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_in_band_update_writes_once() {
        let repo = Arc::new(RecordingRepository::in_memory());
        let machine = machine_over(Arc::clone(&repo) as Arc<dyn TokenRepository>);
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(1000)).await.unwrap();

        for _ in 0..2 {
            let transition = machine
                .apply_valuation_update(&address, dec!(4200))
                .await
                .unwrap();
            assert!(transition.is_none());
        }

        assert_eq!(repo.updates(), 1);
        assert_eq!(repo.commits(), 0);
        assert!(repo.transitions(&address).await.unwrap().is_empty());
        assert_eq!(repo.get(&address).await.unwrap().unwrap().valuation, dec!(4200));
    }

    #[tokio::test]
    async fn cross_band_update_commits_one_transition() {
        let machine = machine();
        let mut events = machine.subscribe();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(1000)).await.unwrap();

        let transition = machine
            .apply_valuation_update(&address, dec!(40000))
            .await
            .unwrap()
            .expect("transition");

        assert_eq!(transition.from, Category::Low);
        assert_eq!(transition.to, Category::High);
        assert_eq!(transition.reason, TransitionReason::ValuationBand);
        assert_eq!(transition.valuation, dec!(40000));

        let history = machine.repository.transitions(&address).await.unwrap();
        assert_eq!(history, vec![transition.clone()]);
        assert_eq!(events.recv().await.unwrap(), transition);
    }

    #[tokio::test]
    async fn band_edge_belongs_to_upper_band() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(9999)).await.unwrap();
        let t = machine
            .apply_valuation_update(&address, dec!(10000))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(t.to, Category::Medium);
    }

    #[tokio::test]
    async fn absorbing_token_keeps_category_on_update() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(100)).await.unwrap();
        machine
            .force_transition(&address, Category::Archived, TransitionReason::Manual, None)
            .await
            .unwrap();

        let t = machine
            .apply_valuation_update(&address, dec!(50000))
            .await
            .unwrap();
        assert!(t.is_none());
        let token = machine.repository.get(&address).await.unwrap().unwrap();
        assert_eq!(token.category, Category::Archived);
        assert_eq!(token.valuation, dec!(50000));
    }

    #[tokio::test]
    async fn force_to_current_category_is_invalid() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(100)).await.unwrap();
        let err = machine
            .force_transition(&address, Category::Low, TransitionReason::Manual, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn force_to_unbanded_category_is_invalid() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(100)).await.unwrap();
        let err = machine
            .force_transition(&address, Category::Peak, TransitionReason::Manual, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::InvalidTransition { to: Category::Peak, .. })
        ));
    }

    #[tokio::test]
    async fn force_out_of_absorbing_is_invalid() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(100)).await.unwrap();
        machine
            .force_transition(&address, Category::Rejected, TransitionReason::Rejected, None)
            .await
            .unwrap();
        let err = machine
            .force_transition(&address, Category::High, TransitionReason::Manual, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Lifecycle(ref e) if e.is_invalid_transition()));
    }

    #[tokio::test]
    async fn force_by_unknown_name_is_invalid_target() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(100)).await.unwrap();
        let err = machine
            .force_transition_named(&address, "moon", TransitionReason::Manual, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::InvalidTarget { ref target, .. }) if target == "moon"
        ));
    }

    #[tokio::test]
    async fn force_keeps_note_and_valuation() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(500)).await.unwrap();
        let t = machine
            .force_transition(
                &address,
                Category::High,
                TransitionReason::Manual,
                Some("listing".into()),
            )
            .await
            .unwrap();
        assert_eq!(t.note.as_deref(), Some("listing"));
        assert_eq!(t.valuation, dec!(500));
        let token = machine.repository.get(&address).await.unwrap().unwrap();
        assert_eq!(token.category, Category::High);
    }

    #[tokio::test]
    async fn guarded_force_checks_the_stored_token() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(500)).await.unwrap();

        let skipped = machine
            .force_transition_if(&address, Category::Archived, TransitionReason::IdleTimeout, None, |t| {
                t.scan_count > 0
            })
            .await
            .unwrap();
        assert!(skipped.is_none());
        assert!(machine.repository.transitions(&address).await.unwrap().is_empty());

        let applied = machine
            .force_transition_if(&address, Category::Archived, TransitionReason::IdleTimeout, None, |t| {
                t.scan_count == 0
            })
            .await
            .unwrap();
        assert_eq!(applied.map(|t| t.to), Some(Category::Archived));
    }

    #[tokio::test]
    async fn reconcile_returns_forced_token_to_its_band() {
        let machine = machine();
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(500)).await.unwrap();
        machine
            .force_transition(&address, Category::High, TransitionReason::Manual, None)
            .await
            .unwrap();

        let t = machine.reconcile(&address).await.unwrap().unwrap();
        assert_eq!((t.from, t.to), (Category::High, Category::Low));
        assert_eq!(t.reason, TransitionReason::DurationExpired);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let machine = machine();
        let err = machine
            .apply_valuation_update(&fixtures::address("ghost"), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Lifecycle(LifecycleError::TokenNotFound(_))));
    }

    #[tokio::test]
    async fn failed_commit_leaves_token_unchanged() {
        let repo = Arc::new(RecordingRepository::in_memory());
        let machine = machine_over(Arc::clone(&repo) as Arc<dyn TokenRepository>);
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(1000)).await.unwrap();

        repo.set_fail_writes(true);
        let err = machine
            .apply_valuation_update(&address, dec!(40000))
            .await
            .unwrap_err();
        assert!(err.is_persistence());

        let token = repo.get(&address).await.unwrap().unwrap();
        assert_eq!(token.category, Category::Low);
        assert_eq!(token.valuation, dec!(1000));
        assert!(repo.transitions(&address).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_form_a_consistent_chain() {
        let machine = Arc::new(machine());
        let address = fixtures::address("mint1");
        machine.track(address.clone(), &fixtures::valued(1000)).await.unwrap();

        let valuations = [dec!(40000), dec!(5000), dec!(20000), dec!(100), dec!(35000)];
        let handles: Vec<_> = (0..40)
            .map(|i| {
                let machine = Arc::clone(&machine);
                let address = address.clone();
                let valuation = valuations[i % valuations.len()];
                tokio::spawn(async move { machine.apply_valuation_update(&address, valuation).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let token = machine.repository.get(&address).await.unwrap().unwrap();
        let history = machine.repository.transitions(&address).await.unwrap();
        let mut current = Category::Low;
        for record in &history {
            assert_eq!(record.from, current);
            assert_ne!(record.from, record.to);
            current = record.to;
        }
        assert_eq!(current, token.category);
        assert_eq!(machine.bands().category_for(token.valuation).unwrap(), token.category);
    }
}
