//! Mock market data provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{MarketSnapshot, ProviderTier, TokenAddress};
use crate::error::ProviderError;
use crate::port::outbound::provider::{MarketDataProvider, ProviderProfile};

/// A provider that answers from a script.
///
/// Scripted results are consumed in order; once exhausted every call gets
/// the fallback (an empty snapshot unless set).
pub struct MockProvider {
    profile: ProviderProfile,
    script: Mutex<VecDeque<Result<MarketSnapshot, ProviderError>>>,
    fallback: Mutex<Result<MarketSnapshot, ProviderError>>,
    calls: Arc<AtomicU32>,
    delay: Option<Duration>,
}

impl MockProvider {
    pub fn new(name: &str, tier: ProviderTier, unit_cost: Decimal) -> Self {
        Self {
            profile: ProviderProfile::new(name, tier, unit_cost, 0),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(MarketSnapshot::default())),
            calls: Arc::new(AtomicU32::new(0)),
            delay: None,
        }
    }

    /// Free-tier provider with no cost.
    pub fn free(name: &str) -> Self {
        Self::new(name, ProviderTier::Free, Decimal::ZERO)
    }

    /// Paid-tier provider charging `unit_cost` per success.
    pub fn paid(name: &str, unit_cost: Decimal) -> Self {
        Self::new(name, ProviderTier::Paid, unit_cost)
    }

    #[must_use]
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.profile.rank = rank;
        self
    }

    /// Answer every unscripted call with `snapshot`.
    #[must_use]
    pub fn returning(self, snapshot: MarketSnapshot) -> Self {
        *self.fallback.lock() = Ok(snapshot);
        self
    }

    /// Fail every unscripted call with HTTP 503.
    #[must_use]
    pub fn failing(self) -> Self {
        *self.fallback.lock() = Err(ProviderError::Status {
            provider: self.profile.name.clone(),
            status: 503,
        });
        self
    }

    /// Sleep before answering. Use with a paused clock.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue one result ahead of the fallback.
    pub fn push(&self, result: Result<MarketSnapshot, ProviderError>) {
        self.script.lock().push_back(result);
    }

    /// Replace the fallback.
    pub fn set_fallback(&self, result: Result<MarketSnapshot, ProviderError>) {
        *self.fallback.lock() = result;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared call counter, still readable after the provider is moved.
    pub fn call_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    pub fn into_arc(self) -> Arc<dyn MarketDataProvider> {
        Arc::new(self)
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn fetch_snapshot(&self, _address: &TokenAddress) -> Result<MarketSnapshot, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.fallback.lock().clone())
    }
}
