//! Tiered data router.
//!
//! Fans a request out to every provider admitted by the analysis depth,
//! merges whatever comes back in priority order and charges successful calls
//! against the daily budget. Provider failures never fail the analysis; a
//! token with no data at all simply gets no update.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::budget::DailyBudget;
use crate::domain::{AnalysisDepth, AnalysisResult, MarketSnapshot, Token, TokenAddress, TokenPatch};
use crate::error::{ProviderError, Result};
use crate::port::outbound::provider::MarketDataProvider;
use crate::port::outbound::repository::TokenRepository;

/// Router settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Provider names, highest priority first. Unlisted providers follow in
    /// order of their declared rank.
    pub provider_priority: Vec<String>,
    /// Per-provider call timeout.
    pub provider_timeout: Duration,
    pub daily_budget: Decimal,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            provider_priority: Vec::new(),
            provider_timeout: Duration::from_secs(5),
            daily_budget: Decimal::from(25),
        }
    }
}

/// Routes analyses to providers by tier and merges their snapshots.
pub struct TieredDataRouter {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    repository: Arc<dyn TokenRepository>,
    budget: DailyBudget,
    timeout: Duration,
}

impl TieredDataRouter {
    pub fn new(
        mut providers: Vec<Arc<dyn MarketDataProvider>>,
        repository: Arc<dyn TokenRepository>,
        config: &RouterConfig,
    ) -> Self {
        providers.sort_by_cached_key(|p| {
            let profile = p.profile();
            let position = config
                .provider_priority
                .iter()
                .position(|name| *name == profile.name)
                .unwrap_or(usize::MAX);
            (position, profile.rank, profile.name.clone())
        });
        Self {
            providers,
            repository,
            budget: DailyBudget::new(config.daily_budget),
            timeout: config.provider_timeout,
        }
    }

    /// Providers in merge priority order.
    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn MarketDataProvider>> {
        self.providers.iter()
    }

    /// Providers eligible at `depth`, in priority order.
    pub fn providers_for(
        &self,
        depth: AnalysisDepth,
    ) -> impl Iterator<Item = &Arc<dyn MarketDataProvider>> {
        self.providers
            .iter()
            .filter(move |p| depth.admits(p.profile().tier))
    }

    #[must_use]
    pub fn budget(&self) -> &DailyBudget {
        &self.budget
    }

    /// True once today's paid spend has reached the configured ceiling.
    ///
    /// Advisory: the router never refuses a call on its own.
    #[must_use]
    pub fn is_daily_budget_exceeded(&self) -> bool {
        self.budget.is_exceeded()
    }

    #[must_use]
    pub fn daily_spend(&self) -> Decimal {
        self.budget.spent()
    }

    /// Query providers and merge their answers without writing anything.
    pub async fn collect(&self, address: &TokenAddress, depth: AnalysisDepth) -> AnalysisResult {
        let started = Instant::now();
        let selected: Vec<_> = self.providers_for(depth).collect();

        let calls = selected.into_iter().map(|provider| async move {
            let name = provider.profile().name.clone();
            let outcome = match tokio::time::timeout(self.timeout, provider.fetch_snapshot(address)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout { provider: name }),
            };
            (Arc::clone(provider), outcome)
        });
        let outcomes = join_all(calls).await;

        let mut snapshots = Vec::with_capacity(outcomes.len());
        let mut providers = Vec::new();
        let mut failed = Vec::new();
        let mut cost = Decimal::ZERO;

        for (provider, outcome) in outcomes {
            let profile = provider.profile();
            match outcome {
                Ok(snapshot) => {
                    cost += profile.unit_cost;
                    if !profile.unit_cost.is_zero() {
                        self.budget.record(profile.unit_cost);
                    }
                    providers.push(profile.name.clone());
                    snapshots.push(snapshot);
                }
                Err(e) => {
                    debug!(address = %address, provider = %profile.name, error = %e, "Provider failed");
                    failed.push(profile.name.clone());
                }
            }
        }

        let snapshot = MarketSnapshot::merge_in_priority(&snapshots);
        if providers.is_empty() && !failed.is_empty() {
            warn!(
                address = %address,
                depth = %depth,
                failed = failed.len(),
                "No provider returned data"
            );
        }

        AnalysisResult {
            address: address.clone(),
            depth,
            snapshot,
            providers,
            failed,
            cost,
            duration: started.elapsed(),
        }
    }

    /// Write the fields present in `result` onto the token.
    ///
    /// Returns `None` without writing when no provider contributed.
    pub async fn persist(&self, result: &AnalysisResult) -> Result<Option<Token>> {
        if !result.has_data() {
            return Ok(None);
        }
        let patch = TokenPatch::from_snapshot(&result.snapshot).scan_succeeded(Utc::now());
        let token = self.repository.update(&result.address, &patch).await?;
        Ok(Some(token))
    }

    /// Collect and persist in one step.
    pub async fn analyze(&self, address: &TokenAddress, depth: AnalysisDepth) -> Result<AnalysisResult> {
        let result = self.collect(address, depth).await;
        self.persist(&result).await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryTokenRepository;
    use crate::domain::{Category, ProviderTier};
    use crate::testkit::domain as fixtures;
    use crate::testkit::provider::MockProvider;
    use rust_decimal_macros::dec;

    fn config() -> RouterConfig {
        RouterConfig {
            provider_priority: Vec::new(),
            provider_timeout: Duration::from_secs(2),
            daily_budget: dec!(1),
        }
    }

    fn router(providers: Vec<Arc<dyn MarketDataProvider>>, config: &RouterConfig) -> TieredDataRouter {
        TieredDataRouter::new(providers, Arc::new(MemoryTokenRepository::new()), config)
    }

    #[tokio::test]
    async fn shallow_never_calls_paid_providers() {
        let free = MockProvider::free("free").returning(fixtures::valued(100));
        let paid = MockProvider::paid("paid", dec!(0.01)).returning(fixtures::valued(200));
        let paid_calls = paid.call_counter();
        let router = router(vec![free.into_arc(), paid.into_arc()], &config());

        let result = router.collect(&fixtures::address("mint1"), AnalysisDepth::Shallow).await;

        assert_eq!(paid_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(result.providers, vec!["free".to_string()]);
        assert_eq!(result.cost, Decimal::ZERO);
        assert_eq!(router.daily_spend(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn deep_charges_paid_providers() {
        let free = MockProvider::free("free").returning(fixtures::valued(100));
        let paid = MockProvider::paid("paid", dec!(0.25)).returning(fixtures::liquid(50));
        let router = router(vec![free.into_arc(), paid.into_arc()], &config());

        let result = router.collect(&fixtures::address("mint1"), AnalysisDepth::Deep).await;

        assert_eq!(result.providers.len(), 2);
        assert_eq!(result.cost, dec!(0.25));
        assert_eq!(result.snapshot.valuation, Some(dec!(100)));
        assert_eq!(result.snapshot.liquidity, Some(dec!(50)));
        assert_eq!(router.daily_spend(), dec!(0.25));
    }

    #[tokio::test]
    async fn higher_priority_provider_wins_conflicts() {
        let a = MockProvider::free("a").with_rank(1).returning(fixtures::valued(100));
        let b = MockProvider::free("b").with_rank(2).returning(MarketSnapshot {
            valuation: Some(dec!(999)),
            volume_24h: Some(dec!(7)),
            ..MarketSnapshot::default()
        });
        let router_by_rank = router(vec![b.into_arc(), a.into_arc()], &config());
        let result = router_by_rank.collect(&fixtures::address("mint1"), AnalysisDepth::Shallow).await;
        assert_eq!(result.snapshot.valuation, Some(dec!(100)));
        assert_eq!(result.snapshot.volume_24h, Some(dec!(7)));

        let a = MockProvider::free("a").with_rank(1).returning(fixtures::valued(100));
        let b = MockProvider::free("b").with_rank(2).returning(fixtures::valued(999));
        let prioritized = RouterConfig {
            provider_priority: vec!["b".into()],
            ..config()
        };
        let router_by_priority = router(vec![a.into_arc(), b.into_arc()], &prioritized);
        let names: Vec<_> = router_by_priority.providers().map(|p| p.profile().name.clone()).collect();
        assert_eq!(names, vec!["b", "a"]);
        let result = router_by_priority
            .collect(&fixtures::address("mint1"), AnalysisDepth::Shallow)
            .await;
        assert_eq!(result.snapshot.valuation, Some(dec!(999)));
    }

    #[tokio::test]
    async fn failed_provider_is_reported_not_fatal() {
        let ok = MockProvider::free("ok").returning(fixtures::valued(100));
        let broken = MockProvider::paid("broken", dec!(0.5)).failing();
        let router = router(vec![ok.into_arc(), broken.into_arc()], &config());

        let result = router.collect(&fixtures::address("mint1"), AnalysisDepth::Deep).await;

        assert!(result.has_data());
        assert_eq!(result.failed, vec!["broken".to_string()]);
        assert_eq!(result.cost, Decimal::ZERO);
        assert_eq!(router.daily_spend(), Decimal::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let slow = MockProvider::free("slow")
            .with_delay(Duration::from_secs(30))
            .returning(fixtures::valued(1));
        let fast = MockProvider::free("fast").returning(fixtures::liquid(5));
        let router = router(vec![slow.into_arc(), fast.into_arc()], &config());

        let result = router.collect(&fixtures::address("mint1"), AnalysisDepth::Shallow).await;

        assert_eq!(result.failed, vec!["slow".to_string()]);
        assert_eq!(result.snapshot.valuation, None);
        assert_eq!(result.snapshot.liquidity, Some(dec!(5)));
        assert!(result.duration >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn persist_writes_only_present_fields() {
        let repository: Arc<dyn TokenRepository> = Arc::new(MemoryTokenRepository::new());
        let address = fixtures::address("mint1");
        let mut seed = fixtures::valued(100);
        seed.liquidity = Some(dec!(40));
        repository
            .insert(&Token::new(address.clone(), Category::Low, &seed, Utc::now()))
            .await
            .unwrap();

        let provider = MockProvider::free("p").returning(fixtures::valued(250));
        let router = TieredDataRouter::new(vec![provider.into_arc()], Arc::clone(&repository), &config());
        let result = router.analyze(&address, AnalysisDepth::Shallow).await.unwrap();
        assert_eq!(result.providers.len(), 1);

        let token = repository.get(&address).await.unwrap().unwrap();
        assert_eq!(token.valuation, dec!(250));
        assert_eq!(token.liquidity, dec!(40));
        assert_eq!(token.scan_count, 1);
        assert!(token.last_scanned_at.is_some());
    }

    #[tokio::test]
    async fn persist_skips_results_without_data() {
        let router = router(vec![MockProvider::free("down").failing().into_arc()], &config());
        let result = router.collect(&fixtures::address("ghost"), AnalysisDepth::Shallow).await;
        assert!(!result.has_data());
        assert_eq!(router.persist(&result).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_paid_calls_sum_exactly() {
        let paid = MockProvider::new("paid", ProviderTier::Paid, dec!(0.01)).returning(fixtures::valued(1));
        let router = Arc::new(router(vec![paid.into_arc()], &config()));

        let handles: Vec<_> = fixtures::addresses(50)
            .into_iter()
            .map(|address| {
                let router = Arc::clone(&router);
                tokio::spawn(async move { router.collect(&address, AnalysisDepth::Deep).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(router.daily_spend(), dec!(0.50));
        assert!(!router.is_daily_budget_exceeded());
    }
}
