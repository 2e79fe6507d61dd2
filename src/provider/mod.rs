//! Upstream provider adapters.
//!
//! Each supported LLM provider is wrapped behind [`ProviderAdapter`]: given
//! a fully-formed prompt, produce a finite, non-restartable stream of
//! [`StreamChunk`]. The relay layer never sees a provider's native wire
//! shape, so adding a provider means one new adapter and a registry entry.

mod gemini;
mod openai;
pub mod sse;

pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;

use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::relay::types::PromptData;

/// Identifies which upstream LLM service and model handles a request.
///
/// Resolved from a free-text model name; unrecognized names map to
/// [`ProviderId::Unknown`] rather than failing at parse time. The failure
/// is deferred to dispatch, where `Unknown` becomes a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Gpt35,
    Gemini15Flash,
    Unknown,
}

impl ProviderId {
    /// Resolve a model display name to a provider identifier.
    pub fn from_model_name(name: &str) -> Self {
        match name {
            "gpt3.5" => ProviderId::Gpt35,
            "gemini-1.5-flash" => ProviderId::Gemini15Flash,
            _ => ProviderId::Unknown,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::Gpt35 => write!(f, "gpt3.5"),
            ProviderId::Gemini15Flash => write!(f, "gemini-1.5-flash"),
            ProviderId::Unknown => write!(f, "unknown"),
        }
    }
}

/// One unit of upstream model output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamChunk {
    /// Zero or more characters of generated text.
    pub text: String,
    /// True at most once, on the terminal chunk. Providers that signal
    /// completion structurally (transport EOF) never set this.
    pub is_final: bool,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_chunk(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// A finite, non-restartable stream of upstream output.
///
/// Dropping the stream releases the upstream connection; there is no
/// explicit close call.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// A provider adapter wraps one upstream streaming API behind a uniform
/// "lazy sequence of text chunks" contract.
///
/// Adapters are created once at startup, shared across all concurrent
/// requests, and must be safe for simultaneous streams.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    /// The identifier this adapter serves.
    fn id(&self) -> ProviderId;

    /// Open an upstream stream for the given prompt.
    ///
    /// Fails with [`Error::UpstreamConnect`] when the provider rejects the
    /// request before any output is produced (bad credentials, malformed
    /// request, quota).
    async fn open(&self, prompt: &PromptData) -> Result<ChunkStream>;
}

impl std::fmt::Debug for dyn ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProviderAdapter({})", self.id())
    }
}

/// Registry resolving provider identifiers to concrete adapters.
///
/// Built once at process start; shared read-only across requests.
pub struct ProviderRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    /// Build the registry with the standard adapter set.
    pub fn new(http_client: reqwest::Client, providers: &ProvidersConfig) -> Self {
        let mut registry = Self {
            adapters: HashMap::new(),
        };
        registry.register(Arc::new(OpenAiAdapter::new(
            http_client.clone(),
            providers.openai_base_url.clone(),
            providers.openai_api_key.clone(),
        )));
        registry.register(Arc::new(GeminiAdapter::new(
            http_client,
            providers.gemini_base_url.clone(),
            providers.google_ai_key.clone(),
        )));
        registry
    }

    /// Create an empty registry (test construction).
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Add an adapter, keyed by its own identifier.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    /// Resolve an identifier to its adapter.
    ///
    /// `Unknown` (and any identifier with no registered adapter) resolves
    /// to [`Error::UnknownModel`]; no upstream connection is attempted.
    pub fn resolve(&self, id: ProviderId) -> Result<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::UnknownModel {
                model: id.to_string(),
            })
    }
}
