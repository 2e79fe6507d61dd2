//! HTTP request handlers.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::stream;
use serde::Deserialize;

use super::server::AppState;
use super::stream::sse_response;
use super::types::PromptData;
use crate::error::{Error, Result};
use crate::provider::{ChunkStream, ProviderId, StreamChunk};

/// Query parameters for the chat endpoint. Both are optional at the
/// extraction layer; absence is handled as a request error below.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    data: Option<String>,
    model: Option<String>,
}

/// Handle GET /api/chat
///
/// Decodes the JSON prompt payload from the `data` query parameter,
/// resolves the model name to a provider, opens the upstream stream, and
/// relays it as SSE. Decode failures are a 400 carrying the decode error
/// text; an unresolvable model is a 404 before any upstream connection.
pub async fn chat(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<Response> {
    let raw = query.data.unwrap_or_default();
    let prompt: PromptData = serde_json::from_str(&raw)
        .map_err(|e| Error::BadRequest(format!("invalid prompt payload: {e}")))?;

    let model = query.model.unwrap_or_default();
    let provider_id = ProviderId::from_model_name(&model);

    tracing::info!(
        model = %model,
        provider = %provider_id,
        "handling chat completion"
    );

    let adapter = state.registry.resolve(provider_id)?;
    let chunks = adapter.open(&prompt).await.inspect_err(|e| {
        tracing::error!(error = %e, provider = %provider_id, "failed to open upstream stream");
    })?;

    Ok(sse_response(chunks))
}

/// Handle GET /api/hello - health-check stub.
pub async fn hello() -> impl IntoResponse {
    "hello"
}

/// Fixed narrative for the demo stream.
const DEMO_TEXT: &str = "As the sun dipped below the horizon, the city skyline transformed \
into a sea of glowing lights, each window a story, each street a vein pulsing with life. \
Among the crowd, a lone figure moved with purpose, their footsteps echoing softly against \
the cobblestones. This was a place where secrets whispered through the cracks in the \
pavement, where dreams waited to be claimed by those brave enough to chase them.";

/// Milliseconds between demo words.
const DEMO_PACE: Duration = Duration::from_millis(50);

/// Handle GET /api/events - scripted demo SSE source.
///
/// Streams a fixed narrative one word per frame at a steady pace, then
/// holds the connection open until the client disconnects. Useful for
/// verifying the relay's transport mechanics without a provider.
pub async fn events() -> Response {
    sse_response(demo_chunks())
}

fn demo_chunks() -> ChunkStream {
    let words: Vec<String> = DEMO_TEXT.split_whitespace().map(String::from).collect();
    Box::pin(stream::unfold(words.into_iter(), |mut words| async move {
        match words.next() {
            Some(word) => {
                tokio::time::sleep(DEMO_PACE).await;
                Some((Ok(StreamChunk::text(word)), words))
            }
            None => {
                // Script exhausted: stay open until the client goes away.
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }))
}
