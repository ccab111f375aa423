use std::sync::Arc;

use tierwatch::adapter::outbound::memory::MemoryTokenRepository;
use tierwatch::infrastructure::orchestration::Engine;
use tierwatch::port::{MarketDataProvider, TokenRepository};
use tierwatch::testkit::config;
use tierwatch::testkit::provider::MockProvider;

/// Engine over an in-memory repository with the canonical tables.
pub fn memory_engine(providers: Vec<MockProvider>) -> Engine {
    engine_over(Arc::new(MemoryTokenRepository::new()), providers)
}

pub fn engine_over(repository: Arc<dyn TokenRepository>, providers: Vec<MockProvider>) -> Engine {
    let providers: Vec<Arc<dyn MarketDataProvider>> =
        providers.into_iter().map(MockProvider::into_arc).collect();
    Engine::new(
        repository,
        config::bands(),
        config::cadences(),
        providers,
        config::engine_options(),
    )
}
