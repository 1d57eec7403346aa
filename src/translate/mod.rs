//! Translation between the relay's chat wire format and Gemini `generateContent`.
//!
//! All functions here are pure (no I/O).

pub mod chat_types;
pub mod gemini_types;
pub mod request;
pub mod response;
