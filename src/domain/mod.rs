//! Core domain types: categories, bands, tokens, transitions and snapshots.
//!
//! Nothing here performs I/O. Invariants (band coverage, fields-present
//! patches, absorbing categories) are enforced by the constructors.

pub mod band;
pub mod category;
pub mod id;
pub mod snapshot;
pub mod token;
pub mod transition;

pub use band::{Band, BandTable};
pub use category::{AnalysisDepth, Category, ProviderTier};
pub use id::{TokenAddress, TransitionId};
pub use snapshot::{AnalysisResult, MarketSnapshot};
pub use token::{FieldKind, FieldUpdate, Token, TokenPatch};
pub use transition::{CategoryTransition, TransitionReason};
