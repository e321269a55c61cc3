//! Repository layer wrapping SeaORM queries.
//!
//! Handlers never touch entities directly; each repository owns the queries
//! for one table and keeps token encryption at this boundary.

pub mod communique;
pub mod gmail_connection;
pub mod market_watch;
pub mod media_asset;
pub mod membership;
pub mod meta_connection;
