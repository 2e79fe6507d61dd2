//! Candidate-style adapter for the Google generative language API.
//!
//! Upstream emits whole candidate objects, each carrying one or more
//! content parts. Only text parts surface as chunks; anything else is
//! dropped by policy. A candidate with a `finishReason` marks the final
//! chunk; transport EOF also ends the stream.

use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::sse;
use super::{ChunkStream, ProviderAdapter, ProviderId, StreamChunk};
use crate::config::ApiKey;
use crate::error::{Error, Result};
use crate::relay::types::PromptData;

const UPSTREAM_MODEL: &str = "gemini-1.5-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Adapter for Gemini's streaming generate-content endpoint.
pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

/// Generate-content request body.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

/// One streaming response from the upstream SSE body.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

/// A content part. Non-text parts deserialize with `text: None` and are
/// dropped.
#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client, base_url: String, api_key: ApiKey) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini15Flash
    }

    async fn open(&self, prompt: &PromptData) -> Result<ChunkStream> {
        let url = format!(
            "{}/models/{}:streamGenerateContent",
            self.base_url.trim_end_matches('/'),
            UPSTREAM_MODEL
        );

        // The instruction block is folded into a single text prompt.
        let text = format!(
            "{}: {}\nUser: {}",
            prompt.instructions.role, prompt.instructions.prompt, prompt.prompt
        );
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse")])
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::UpstreamConnect(format!("gemini: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamConnect(format!(
                "gemini returned {status}: {detail}"
            )));
        }

        let chunks = sse::payload_stream(response.bytes_stream())
            .map(|payload| match payload.and_then(parse_candidate_payload) {
                Ok(chunks) => chunks.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
            .flat_map(stream::iter);

        Ok(Box::pin(chunks))
    }
}

/// Decode one SSE payload into zero or more chunks.
///
/// Each text part of the first candidate becomes its own chunk. When the
/// candidate carries a finish reason, the last chunk is flagged final; a
/// finished candidate with no text parts yields a bare final marker.
fn parse_candidate_payload(payload: String) -> Result<Vec<StreamChunk>> {
    let response: GenerateContentResponse = serde_json::from_str(&payload)
        .map_err(|e| Error::UpstreamStream(format!("gemini: malformed chunk: {e}")))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(Vec::new());
    };

    let mut chunks: Vec<StreamChunk> = candidate
        .content
        .into_iter()
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .map(StreamChunk::text)
        .collect();

    if candidate.finish_reason.is_some() {
        match chunks.last_mut() {
            Some(last) => last.is_final = true,
            None => chunks.push(StreamChunk::final_chunk("")),
        }
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_parts() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"Once"},{"text":" upon"}],"role":"model"},"index":0}]}"#;
        let chunks = parse_candidate_payload(payload.to_string()).unwrap();
        assert_eq!(
            chunks,
            vec![StreamChunk::text("Once"), StreamChunk::text(" upon")]
        );
    }

    #[test]
    fn non_text_parts_dropped() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"AAAA"}},{"text":"caption"}],"role":"model"}}]}"#;
        let chunks = parse_candidate_payload(payload.to_string()).unwrap();
        assert_eq!(chunks, vec![StreamChunk::text("caption")]);
    }

    #[test]
    fn finish_reason_marks_last_chunk_final() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"the end"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let chunks = parse_candidate_payload(payload.to_string()).unwrap();
        assert_eq!(chunks, vec![StreamChunk::final_chunk("the end")]);
    }

    #[test]
    fn finish_reason_without_text_yields_bare_final_marker() {
        let payload = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        let chunks = parse_candidate_payload(payload.to_string()).unwrap();
        assert_eq!(chunks, vec![StreamChunk::final_chunk("")]);
    }

    #[test]
    fn no_candidates_yields_nothing() {
        let chunks = parse_candidate_payload("{}".to_string()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn malformed_payload_is_stream_error() {
        let err = parse_candidate_payload("nonsense".to_string()).unwrap_err();
        assert!(matches!(err, Error::UpstreamStream(_)));
    }
}
