//! SQLite persistence adapter.
//!
//! Stores tokens and their transition history using Diesel ORM.

pub mod database;
mod repository;

pub use repository::SqliteTokenRepository;
