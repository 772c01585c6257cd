//! Session RPC - JSON-RPC host for the plugin session registry.
//!
//! Exposes session create/lookup/delete and the write path over HTTP. Plugin
//! connections are modelled as per-session outboxes that callers drain.

pub mod handler;
pub mod outbox;
pub mod server;

pub use server::{start_server, AppState};
