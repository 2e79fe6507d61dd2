//! prism - Multi-provider LLM chat relay over Server-Sent Events
//!
//! This library provides the core functionality for the prism relay:
//! configuration, the provider adapter set, and the SSE streaming layer.

pub mod config;
pub mod error;
pub mod provider;
pub mod relay;

pub use config::Config;
pub use error::{Error, Result};
