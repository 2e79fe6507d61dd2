//! StreamRelay: pump one chunk stream into one SSE response body.
//!
//! Exactly one frame per chunk, flushed as soon as the chunk arrives;
//! there is no buffer between the upstream read and the client write, so
//! a slow client throttles upstream consumption. Client disconnect drops
//! the body, which drops the chunk stream and releases the upstream
//! connection.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};

use super::types::ResponseBlock;
use crate::provider::ChunkStream;

/// Encode one chunk of text as a single SSE frame.
pub fn sse_frame(text: &str) -> Bytes {
    let block = ResponseBlock {
        text: text.to_string(),
    };
    // Serializing a struct of one string cannot fail.
    let payload = serde_json::to_string(&block).unwrap();
    Bytes::from(format!("data: {payload}\n\n"))
}

/// Build the SSE response for a chunk stream.
///
/// Headers are committed before the first body byte; after that, the only
/// way to signal a failure is to stop writing and close the connection.
pub fn sse_response(chunks: ChunkStream) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
        .body(Body::from_stream(frame_stream(chunks)))
        .unwrap()
}

/// Map chunks to SSE frames until the stream ends, a chunk is flagged
/// final, or the upstream fails.
///
/// Empty-text chunks still produce a frame. A final chunk that carries
/// text is framed before the stream ends; a bare final marker ends it
/// silently. An upstream error is logged and the body ends without a
/// partial frame; the client observes a truncated stream.
pub fn frame_stream(
    chunks: ChunkStream,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    stream::unfold(Some(chunks), |state| async move {
        let mut chunks = state?;
        match chunks.next().await {
            Some(Ok(chunk)) => {
                if chunk.is_final {
                    if chunk.text.is_empty() {
                        None
                    } else {
                        Some((Ok(sse_frame(&chunk.text)), None))
                    }
                } else {
                    Some((Ok(sse_frame(&chunk.text)), Some(chunks)))
                }
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "upstream stream failed, closing relay");
                None
            }
            None => None,
        }
    })
}
