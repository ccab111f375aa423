//! SQLite database modules.
//!
//! Provides connection management, schema definitions and Diesel row types.

pub mod connection;
pub mod model;
pub mod schema;
