//! SQLite token repository.
//!
//! Every write runs in an immediate transaction on a blocking thread, so a
//! read-modify-write of a token row can never interleave with another
//! writer, in this process or another.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rust_decimal::Decimal;

use super::database::connection::DbPool;
use super::database::model::{NewTransitionRow, TokenRow, TransitionRow};
use super::database::schema::{category_transitions, tokens};
use crate::domain::{
    Category, CategoryTransition, Token, TokenAddress, TokenPatch, TransitionId, TransitionReason,
};
use crate::error::{Error, LifecycleError, Result};
use crate::port::outbound::repository::{CommitOutcome, TokenRepository};

/// SQLite-backed [`TokenRepository`].
pub struct SqliteTokenRepository {
    pool: DbPool,
}

impl SqliteTokenRepository {
    /// Create a repository over an already migrated pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::Persistence(format!("database task failed: {e}")))?
    }
}

fn load_token(conn: &mut SqliteConnection, address: &TokenAddress) -> Result<Token> {
    let row: Option<TokenRow> = tokens::table
        .find(address.as_str())
        .select(TokenRow::as_select())
        .first(conn)
        .optional()?;
    let row = row.ok_or_else(|| LifecycleError::TokenNotFound(address.clone()))?;
    row_to_token(row)
}

fn token_to_row(token: &Token) -> TokenRow {
    TokenRow {
        address: token.address.as_str().to_string(),
        category: token.category.as_str().to_string(),
        valuation: token.valuation.to_string(),
        liquidity: token.liquidity.to_string(),
        volume_24h: token.volume_24h.to_string(),
        holder_count: i64::try_from(token.holder_count).unwrap_or(i64::MAX),
        security_score: token.security_score.map(|v| v.to_string()),
        concentration: token.concentration.map(|v| v.to_string()),
        scan_count: i64::try_from(token.scan_count).unwrap_or(i64::MAX),
        consecutive_failures: i32::try_from(token.consecutive_failures).unwrap_or(i32::MAX),
        created_at: token.created_at.to_rfc3339(),
        category_changed_at: token.category_changed_at.to_rfc3339(),
        last_scanned_at: token.last_scanned_at.map(|t| t.to_rfc3339()),
    }
}

fn row_to_token(row: TokenRow) -> Result<Token> {
    Ok(Token {
        category: parse_category(&row.category)?,
        valuation: parse_decimal(&row.valuation)?,
        liquidity: parse_decimal(&row.liquidity)?,
        volume_24h: parse_decimal(&row.volume_24h)?,
        holder_count: u64::try_from(row.holder_count).unwrap_or_default(),
        security_score: row.security_score.as_deref().map(parse_decimal).transpose()?,
        concentration: row.concentration.as_deref().map(parse_decimal).transpose()?,
        scan_count: u64::try_from(row.scan_count).unwrap_or_default(),
        consecutive_failures: u32::try_from(row.consecutive_failures).unwrap_or_default(),
        created_at: parse_time(&row.created_at)?,
        category_changed_at: parse_time(&row.category_changed_at)?,
        last_scanned_at: row.last_scanned_at.as_deref().map(parse_time).transpose()?,
        address: TokenAddress::from(row.address),
    })
}

fn transition_to_row(record: &CategoryTransition) -> NewTransitionRow {
    NewTransitionRow {
        id: record.id.to_string(),
        address: record.address.as_str().to_string(),
        from_category: record.from.as_str().to_string(),
        to_category: record.to.as_str().to_string(),
        valuation: record.valuation.to_string(),
        reason: record.reason.as_str().to_string(),
        note: record.note.clone(),
        at: record.at.to_rfc3339(),
    }
}

fn row_to_transition(row: TransitionRow) -> Result<CategoryTransition> {
    Ok(CategoryTransition {
        id: TransitionId::from(row.id),
        address: TokenAddress::from(row.address),
        from: parse_category(&row.from_category)?,
        to: parse_category(&row.to_category)?,
        valuation: parse_decimal(&row.valuation)?,
        reason: TransitionReason::from_str(&row.reason).map_err(Error::Persistence)?,
        note: row.note,
        at: parse_time(&row.at)?,
    })
}

fn parse_category(value: &str) -> Result<Category> {
    Category::from_str(value).map_err(|e| Error::Persistence(e.to_string()))
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| Error::Persistence(format!("bad decimal {value:?}: {e}")))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Persistence(format!("bad timestamp {value:?}: {e}")))
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    async fn get(&self, address: &TokenAddress) -> Result<Option<Token>> {
        let address = address.clone();
        self.with_conn(move |conn| {
            let row: Option<TokenRow> = tokens::table
                .find(address.as_str())
                .select(TokenRow::as_select())
                .first(conn)
                .optional()?;
            row.map(row_to_token).transpose()
        })
        .await
    }

    async fn insert(&self, token: &Token) -> Result<()> {
        let row = token_to_row(token);
        let address = token.address.clone();
        self.with_conn(move |conn| {
            match diesel::insert_into(tokens::table).values(&row).execute(conn) {
                Ok(_) => Ok(()),
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    Err(LifecycleError::TokenExists(address).into())
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn update(&self, address: &TokenAddress, patch: &TokenPatch) -> Result<Token> {
        let address = address.clone();
        let patch = patch.clone();
        self.with_conn(move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let mut token = load_token(conn, &address)?;
                token.apply(&patch);
                diesel::update(tokens::table.find(address.as_str()))
                    .set(&token_to_row(&token))
                    .execute(conn)?;
                Ok(token)
            })
        })
        .await
    }

    async fn commit_transition(
        &self,
        expected_from: Category,
        patch: &TokenPatch,
        record: &CategoryTransition,
    ) -> Result<CommitOutcome> {
        let patch = patch.clone();
        let address = record.address.clone();
        let row = transition_to_row(record);
        self.with_conn(move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let mut token = load_token(conn, &address)?;
                if token.category != expected_from {
                    return Ok(CommitOutcome::Conflict {
                        actual: token.category,
                    });
                }
                token.apply(&patch);

                let updated = diesel::update(
                    tokens::table
                        .filter(tokens::address.eq(address.as_str()))
                        .filter(tokens::category.eq(expected_from.as_str())),
                )
                .set(&token_to_row(&token))
                .execute(conn)?;
                if updated == 0 {
                    let actual = load_token(conn, &address)?.category;
                    return Ok(CommitOutcome::Conflict { actual });
                }

                diesel::insert_into(category_transitions::table)
                    .values(&row)
                    .execute(conn)?;
                Ok(CommitOutcome::Committed(token))
            })
        })
        .await
    }

    async fn transitions(&self, address: &TokenAddress) -> Result<Vec<CategoryTransition>> {
        let address = address.clone();
        self.with_conn(move |conn| {
            let rows: Vec<TransitionRow> = category_transitions::table
                .filter(category_transitions::address.eq(address.as_str()))
                .order(category_transitions::seq.asc())
                .select(TransitionRow::as_select())
                .load(conn)?;
            rows.into_iter().map(row_to_transition).collect()
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Token>> {
        self.with_conn(|conn| {
            let rows: Vec<TokenRow> = tokens::table
                .order(tokens::address.asc())
                .select(TokenRow::as_select())
                .load(conn)?;
            rows.into_iter().map(row_to_token).collect()
        })
        .await
    }
}
