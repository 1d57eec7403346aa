//! Build the upstream `generateContent` body from a caller's chat request.

use super::chat_types::ChatRequest;
use super::gemini_types::{Content, GenerateContentRequest, Part};

const USER_ROLE: &str = "user";

/// Wrap the message as the single user-role part of a single content entry.
/// The message text is forwarded untouched.
pub fn chat_to_gemini(req: &ChatRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some(USER_ROLE.to_string()),
            parts: vec![Part {
                text: Some(req.message.clone()),
            }],
        }],
    }
}
