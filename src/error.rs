use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::category::Category;
use crate::domain::id::TokenAddress;

/// Configuration-related errors with structured variants.
///
/// Every variant is fatal at startup: an engine is never constructed from a
/// configuration that produced one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("band table is empty")]
    EmptyBands,

    #[error("band table must start at 0, first band {category} starts at {min}")]
    BandStart { category: Category, min: Decimal },

    #[error("gap between {lower} (ends at {lower_max}) and {upper} (starts at {upper_min})")]
    BandGap {
        lower: Category,
        lower_max: Decimal,
        upper: Category,
        upper_min: Decimal,
    },

    #[error("overlap between {lower} (ends at {lower_max}) and {upper} (starts at {upper_min})")]
    BandOverlap {
        lower: Category,
        lower_max: Decimal,
        upper: Category,
        upper_min: Decimal,
    },

    #[error("band {category} is empty or inverted: [{min}, {max})")]
    BandInverted {
        category: Category,
        min: Decimal,
        max: Decimal,
    },

    #[error("band {category} is unbounded but is not the last band")]
    UnboundedBeforeEnd { category: Category },

    #[error("last band {category} must be unbounded, ends at {max}")]
    BoundedEnd { category: Category, max: Decimal },

    #[error("band {upper} is ordered above {lower} but ranks below it")]
    BandOrder { lower: Category, upper: Category },

    #[error("category {0} has more than one band")]
    DuplicateBand(Category),

    #[error("absorbing category {0} cannot own a valuation band")]
    AbsorbingBand(Category),

    #[error("no band contains valuation {valuation}")]
    NoMatchingBand { valuation: Decimal },

    #[error("no scan cadence configured for category {0}")]
    MissingCadence(Category),

    #[error("no scan handler registered for category {0}")]
    MissingHandler(Category),
}

/// Transient failures from a single market data provider.
///
/// The router absorbs these during its best-effort merge; they never fail a
/// scan on their own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider}: request timed out")]
    Timeout { provider: String },

    #[error("{provider}: rate limited")]
    RateLimited { provider: String },

    #[error("{provider}: HTTP {status}")]
    Status { provider: String, status: u16 },

    #[error("{provider}: token not listed")]
    NotFound { provider: String },

    #[error("{provider}: request failed: {reason}")]
    Request { provider: String, reason: String },

    #[error("{provider}: failed to decode response: {reason}")]
    Decode { provider: String, reason: String },
}

impl ProviderError {
    /// Name of the provider that produced this error.
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::Timeout { provider }
            | Self::RateLimited { provider }
            | Self::Status { provider, .. }
            | Self::NotFound { provider }
            | Self::Request { provider, .. }
            | Self::Decode { provider, .. } => provider,
        }
    }
}

/// Category state machine errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("invalid transition for {address}: {from} -> {to}")]
    InvalidTransition {
        address: TokenAddress,
        from: Category,
        to: Category,
    },

    #[error("invalid transition for {address}: unknown target category {target}")]
    InvalidTarget { address: TokenAddress, target: String },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("token not found: {0}")]
    TokenNotFound(TokenAddress),

    #[error("token already exists: {0}")]
    TokenExists(TokenAddress),

    #[error("valuation must be non-negative, got {0}")]
    NegativeValuation(Decimal),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("concurrent category change for {0}")]
    Conflict(TokenAddress),

    #[error("scan cancelled")]
    Cancelled,

    #[error("scan failed: {0}")]
    Scan(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for storage failures that leave the token in its last known state.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl LifecycleError {
    /// True for both shapes of a rejected forced transition.
    #[must_use]
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::InvalidTarget { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Error::Persistence(err.to_string())
    }
}
