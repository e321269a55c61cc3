//! SeaORM entity models for the Pressrelay API.

pub mod communique;
pub mod gmail_connection;
pub mod market_watch_document;
pub mod media_asset;
pub mod meta_connection;
pub mod org_membership;
