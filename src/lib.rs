//! P2P History Backend Library
//!
//! Serves a caller's completed P2P orders from the Wallet API: pages fetched
//! with time-bounded retries, capped, normalized, behind a self-restarting
//! HTTP server.

pub mod api;
pub mod config;
pub mod credential;
pub mod fetch;
pub mod mapping;
pub mod middleware;
pub mod models;
pub mod server;
pub mod supervisor;
pub mod upstream;
