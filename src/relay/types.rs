//! Inbound and outbound wire types for the chat relay.

use serde::{Deserialize, Serialize};

/// Inbound prompt payload, decoded from the `data` query parameter.
///
/// Owned exclusively by the handling request and discarded when the
/// response completes; nothing is persisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptData {
    /// The user message.
    pub prompt: String,
    /// System/instruction preamble.
    pub instructions: PromptInstructions,
}

/// Instruction block prepended to the conversation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptInstructions {
    /// Label for the instruction speaker (e.g., "system").
    pub role: String,
    /// Instruction text.
    pub prompt: String,
}

/// The single outbound SSE payload envelope.
///
/// Every frame on the wire is `data: {"text": "..."}` followed by a blank
/// line, regardless of which provider produced the chunk.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResponseBlock {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_data_decodes_query_json() {
        let raw = r#"{"prompt":"plan a trip","instructions":{"role":"system","prompt":"be concise"}}"#;
        let data: PromptData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.prompt, "plan a trip");
        assert_eq!(data.instructions.role, "system");
        assert_eq!(data.instructions.prompt, "be concise");
    }

    #[test]
    fn prompt_data_rejects_malformed_json() {
        let err = serde_json::from_str::<PromptData>("{not json").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn response_block_envelope_shape() {
        let block = ResponseBlock {
            text: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&block).unwrap(),
            r#"{"text":"hello"}"#
        );
    }
}
