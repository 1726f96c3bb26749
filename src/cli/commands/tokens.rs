//! Tokens Command
//!
//! Count prompt tokens for a model.
//!
//! Usage:
//!   llm-dispatch tokens --model gpt-4o --text "hello"
//!   llm-dispatch tokens --model gpt-4o --file prompt.txt

use std::path::Path;

use crate::ai::count_tokens;
use crate::types::{DispatchError, Result};

pub fn count(model: &str, text: Option<&str>, file: Option<&Path>) -> Result<usize> {
    let content = match (text, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(DispatchError::Config(
                "Either --text or --file is required".to_string(),
            ));
        }
    };
    count_tokens(&content, model)
}

pub fn run(model: &str, text: Option<&str>, file: Option<&Path>, json: bool) -> Result<()> {
    let tokens = count(model, text, file)?;
    if json {
        println!("{}", serde_json::json!({ "model": model, "tokens": tokens }));
    } else {
        println!("{}", tokens);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_from_text_and_file() {
        assert_eq!(count("gpt-4", Some("hello world"), None).unwrap(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.txt");
        std::fs::write(&path, "hello world").unwrap();
        assert_eq!(count("gpt-4", None, Some(&path)).unwrap(), 2);

        assert!(count("gpt-4", None, None).is_err());
    }
}
