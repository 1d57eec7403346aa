use super::chat_types::ChatResponse;
use super::gemini_types::GenerateContentResponse;
use crate::error::{RelayError, Result};

/// Parse a 200 body from upstream and pull out the answer.
pub fn parse_gemini_body(body: &str) -> Result<ChatResponse> {
    let resp: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        RelayError::translation(format!("Failed to parse upstream response: {}", e))
    })?;
    gemini_to_chat(&resp)
}

/// Take `candidates[0].content.parts[0].text`. Everything past the first
/// candidate and first part is ignored.
pub fn gemini_to_chat(resp: &GenerateContentResponse) -> Result<ChatResponse> {
    let candidate = resp
        .candidates
        .first()
        .ok_or_else(|| RelayError::translation("Upstream response has no candidates"))?;

    let content = candidate.content.as_ref().ok_or_else(|| {
        match candidate.finish_reason.as_deref() {
            Some(reason) => RelayError::translation(format!(
                "First candidate has no content (finishReason: {})",
                reason
            )),
            None => RelayError::translation("First candidate has no content"),
        }
    })?;

    let part = content
        .parts
        .first()
        .ok_or_else(|| RelayError::translation("First candidate has no content parts"))?;

    let text = part
        .text
        .as_ref()
        .ok_or_else(|| RelayError::translation("First content part has no text"))?;

    Ok(ChatResponse {
        answer: text.clone(),
    })
}
