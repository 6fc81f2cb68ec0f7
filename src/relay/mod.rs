//! HTTP relay module.
//!
//! Accepts chat-completion requests, forwards them to the configured
//! upstream deployment, and exposes the conversation bookkeeping endpoints.

mod forwarder;
mod handlers;
pub mod retry;
mod server;
pub mod types;

pub use forwarder::Forwarder;
pub use server::{create_router, run_server, AppState};
pub use types::{ChatMessage, ChatRequest};
