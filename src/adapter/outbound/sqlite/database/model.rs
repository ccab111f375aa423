//! Database model types for Diesel ORM.
//!
//! Decimals are stored as text to keep exact values; timestamps as RFC 3339.

use diesel::prelude::*;

use super::schema::{category_transitions, tokens};

/// Database row for a token.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = tokens)]
#[diesel(primary_key(address))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TokenRow {
    pub address: String,
    pub category: String,
    pub valuation: String,
    pub liquidity: String,
    pub volume_24h: String,
    pub holder_count: i64,
    pub security_score: Option<String>,
    pub concentration: Option<String>,
    pub scan_count: i64,
    pub consecutive_failures: i32,
    pub created_at: String,
    pub category_changed_at: String,
    pub last_scanned_at: Option<String>,
}

/// Database row for a transition (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = category_transitions)]
pub struct NewTransitionRow {
    pub id: String,
    pub address: String,
    pub from_category: String,
    pub to_category: String,
    pub valuation: String,
    pub reason: String,
    pub note: Option<String>,
    pub at: String,
}

/// Database row for a transition (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = category_transitions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransitionRow {
    pub seq: Option<i32>,
    pub id: String,
    pub address: String,
    pub from_category: String,
    pub to_category: String,
    pub valuation: String,
    pub reason: String,
    pub note: Option<String>,
    pub at: String,
}
