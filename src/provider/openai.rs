//! Delta-style adapter for the OpenAI chat completions API.
//!
//! Upstream emits a sequence of partial-text deltas over SSE; each delta
//! maps 1:1 to a [`StreamChunk`], empty deltas included. Completion is
//! signaled structurally: a `[DONE]` sentinel followed by transport EOF.

use futures::StreamExt;
use reqwest::header;
use serde::{Deserialize, Serialize};

use super::sse;
use super::{ChunkStream, ProviderAdapter, ProviderId, StreamChunk};
use crate::config::ApiKey;
use crate::error::{Error, Result};
use crate::relay::types::PromptData;

const UPSTREAM_MODEL: &str = "gpt-3.5-turbo";
const DONE_SENTINEL: &str = "[DONE]";

/// Adapter for OpenAI's streaming chat completions endpoint.
pub struct OpenAiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

/// A chat message.
#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// One streaming chunk from the upstream SSE body.
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

/// A streaming choice delta.
#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Delta,
}

/// Delta content in a streaming chunk. The first chunk usually carries
/// only the role; content is absent there.
#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(client: reqwest::Client, base_url: String, api_key: ApiKey) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gpt35
    }

    async fn open(&self, prompt: &PromptData) -> Result<ChunkStream> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatCompletionRequest {
            model: UPSTREAM_MODEL,
            messages: vec![
                Message {
                    role: &prompt.instructions.role,
                    content: &prompt.instructions.prompt,
                },
                Message {
                    role: "user",
                    content: &prompt.prompt,
                },
            ],
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::UpstreamConnect(format!("openai: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamConnect(format!(
                "openai returned {status}: {detail}"
            )));
        }

        let chunks = sse::payload_stream(response.bytes_stream())
            .take_while(|payload| {
                futures::future::ready(!matches!(payload, Ok(p) if p == DONE_SENTINEL))
            })
            .map(|payload| payload.and_then(parse_delta_payload));

        Ok(Box::pin(chunks))
    }
}

/// Decode one SSE payload into a chunk.
///
/// A payload with no choices or no delta content still yields a chunk with
/// empty text; the relay frames it as-is. A malformed payload is a
/// mid-stream failure, not something to skip.
fn parse_delta_payload(payload: String) -> Result<StreamChunk> {
    let chunk: ChatCompletionChunk = serde_json::from_str(&payload)
        .map_err(|e| Error::UpstreamStream(format!("openai: malformed chunk: {e}")))?;

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();

    Ok(StreamChunk::text(text))
}
