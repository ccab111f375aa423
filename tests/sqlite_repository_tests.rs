//! SQLite repository against a real database file.

mod support;

use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;
use tierwatch::application::lifecycle::CategoryStateMachine;
use tierwatch::domain::{
    Category, CategoryTransition, MarketSnapshot, Token, TokenPatch, TransitionReason,
};
use tierwatch::error::{Error, LifecycleError};
use tierwatch::port::{CommitOutcome, TokenRepository};
use tierwatch::testkit::config;
use tierwatch::testkit::domain::{address, addresses, valued};

use support::temp_db::TempDb;

fn token(id: &str, category: Category) -> Token {
    Token::new(address(id), category, &valued(1000), Utc::now())
}

fn transition(id: &str, from: Category, to: Category) -> CategoryTransition {
    CategoryTransition::new(address(id), from, to, dec!(1000), TransitionReason::Manual, Utc::now())
}

#[tokio::test]
async fn update_of_unknown_token_is_not_found() {
    let db = TempDb::create();
    let repo = db.repository();
    let err = repo
        .update(&address("ghost"), &TokenPatch::new().valuation(dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Lifecycle(LifecycleError::TokenNotFound(_))));
}

#[tokio::test]
async fn commit_with_stale_source_writes_nothing() {
    let db = TempDb::create();
    let repo = db.repository();
    repo.insert(&token("mint1", Category::Medium)).await.unwrap();

    let record = transition("mint1", Category::Low, Category::High);
    let patch = TokenPatch::new().category(Category::High, record.at);
    let outcome = repo
        .commit_transition(Category::Low, &patch, &record)
        .await
        .unwrap();

    assert_eq!(outcome, CommitOutcome::Conflict { actual: Category::Medium });
    let stored = repo.get(&address("mint1")).await.unwrap().unwrap();
    assert_eq!(stored.category, Category::Medium);
    assert!(repo.transitions(&address("mint1")).await.unwrap().is_empty());
}

#[tokio::test]
async fn commit_updates_token_and_history_together() {
    let db = TempDb::create();
    let repo = db.repository();
    repo.insert(&token("mint1", Category::Low)).await.unwrap();

    let record = transition("mint1", Category::Low, Category::High).with_note("listing");
    let patch = TokenPatch::new().category(Category::High, record.at);
    let outcome = repo
        .commit_transition(Category::Low, &patch, &record)
        .await
        .unwrap();

    let CommitOutcome::Committed(updated) = outcome else {
        panic!("expected commit, got {outcome:?}");
    };
    assert_eq!(updated.category, Category::High);
    let history = repo.transitions(&address("mint1")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, record.id);
    assert_eq!(history[0].note.as_deref(), Some("listing"));
}

#[tokio::test]
async fn optional_fields_survive_partial_updates() {
    let db = TempDb::create();
    let repo = db.repository();
    let snapshot = MarketSnapshot {
        valuation: Some(dec!(1000)),
        security_score: Some(dec!(71.5)),
        concentration: Some(dec!(12.25)),
        holder_count: Some(420),
        ..MarketSnapshot::default()
    };
    repo.insert(&Token::new(address("mint1"), Category::Low, &snapshot, Utc::now()))
        .await
        .unwrap();

    repo.update(
        &address("mint1"),
        &TokenPatch::from_snapshot(&MarketSnapshot {
            liquidity: Some(dec!(88)),
            ..MarketSnapshot::default()
        }),
    )
    .await
    .unwrap();

    let stored = repo.get(&address("mint1")).await.unwrap().unwrap();
    assert_eq!(stored.security_score, Some(dec!(71.5)));
    assert_eq!(stored.concentration, Some(dec!(12.25)));
    assert_eq!(stored.holder_count, 420);
    assert_eq!(stored.liquidity, dec!(88));
}

#[tokio::test]
async fn list_is_ordered_by_address() {
    let db = TempDb::create();
    let repo = db.repository();
    for id in ["c", "a", "b"] {
        repo.insert(&token(id, Category::Low)).await.unwrap();
    }
    let listed: Vec<_> = repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.address.as_str().to_string())
        .collect();
    assert_eq!(listed, vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_writers_never_lose_a_transition() {
    let db = TempDb::create();
    // Separate pools stand in for separate processes.
    let left = Arc::new(CategoryStateMachine::new(
        db.repository() as Arc<dyn TokenRepository>,
        Arc::new(config::bands()),
    ));
    let right = Arc::new(CategoryStateMachine::new(
        db.repository() as Arc<dyn TokenRepository>,
        Arc::new(config::bands()),
    ));
    let mints = addresses(4);
    for mint in &mints {
        left.track(mint.clone(), &valued(1000)).await.unwrap();
    }

    let mut handles = Vec::new();
    for round in 0..10u64 {
        for mint in &mints {
            for (machine, value) in [(&left, 40_000u64), (&right, 15_000u64)] {
                let machine = Arc::clone(machine);
                let mint = mint.clone();
                let value = value + round;
                handles.push(tokio::spawn(async move {
                    machine
                        .apply_valuation_update(&mint, rust_decimal::Decimal::from(value))
                        .await
                }));
            }
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let repo = db.repository();
    for mint in &mints {
        let token = repo.get(mint).await.unwrap().unwrap();
        let history = repo.transitions(mint).await.unwrap();
        let mut current = Category::Low;
        for record in &history {
            assert_eq!(record.from, current, "broken chain for {mint}");
            current = record.to;
        }
        assert_eq!(current, token.category);
    }
}
