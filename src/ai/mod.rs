//! AI reply drafting via the OpenRouter API
//!
//! `AiDrafter` turns a reply request into a subject and HTML body using a
//! tone-specific prompt. Each request is a single completion call.

mod client;
mod drafter;
mod prompts;

pub use client::OpenRouterClient;
pub use drafter::AiDrafter;
