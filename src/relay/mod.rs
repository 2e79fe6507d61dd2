//! HTTP relay module.
//!
//! This module provides the inbound HTTP surface: the chat route that
//! dispatches to a provider adapter and the SSE pump that streams the
//! adapter's chunks to the client.

mod handlers;
mod server;
pub mod stream;
pub mod types;

pub use server::{create_router, run_server, AppState};
pub use stream::{sse_frame, sse_response};
pub use types::{PromptData, PromptInstructions, ResponseBlock};
