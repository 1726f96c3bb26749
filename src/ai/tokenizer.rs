//! Token Counting
//!
//! BPE token counts for prompts before they are sent, so callers can see how
//! close a request is to the model window.
//!
//! Unknown model names fall back to the `cl100k_base` encoding.

use tiktoken_rs::CoreBPE;
use tracing::debug;

use super::request::Prompt;
use crate::constants::tokens as token_constants;
use crate::types::{DispatchError, Result};

/// Resolve the encoding for a model, falling back to `cl100k_base`
fn encoding_for(model: &str) -> Result<CoreBPE> {
    match tiktoken_rs::get_bpe_from_model(model) {
        Ok(bpe) => Ok(bpe),
        Err(_) => {
            debug!(
                model,
                fallback = token_constants::FALLBACK_ENCODING,
                "Unknown model for tokenizer, using fallback encoding"
            );
            tiktoken_rs::cl100k_base().map_err(|e| DispatchError::Tokenizer(e.to_string()))
        }
    }
}

/// Count tokens of `text` as the given model would see them
pub fn count_tokens(text: &str, model: &str) -> Result<usize> {
    let bpe = encoding_for(model)?;
    Ok(bpe.encode_with_special_tokens(text).len())
}

/// Count tokens of a prompt.
///
/// For message lists only the first message is counted; that is where the
/// bulk context (repository listings, file contents) sits.
pub fn count_prompt_tokens(prompt: &Prompt, model: &str) -> Result<usize> {
    match prompt {
        Prompt::Text(text) => count_tokens(text, model),
        Prompt::Messages(messages) => match messages.first() {
            Some(first) => count_tokens(&first.content, model),
            None => Ok(0),
        },
    }
}
