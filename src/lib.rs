//! # Pressrelay API
//!
//! OAuth connection lifecycle and webhook relay for the Pressrelay
//! press-relations platform: Gmail and Meta account linking with signed
//! state tokens, proactive token refresh, organization-scoped authorization,
//! and best-effort forwarding to the automation engine.

pub mod auth;
pub mod config;
pub mod cors;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod relay;
pub mod repositories;
pub mod server;
pub mod state_token;
pub mod storage;
pub mod telemetry;
pub mod token_refresh;
pub use migration;
