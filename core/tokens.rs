// Token estimation for rendered documents.
//
// The count is advisory: callers log a failure here and keep the document.
use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model};

pub use crate::config::DEFAULT_TOKENIZER_MODEL;
pub const FALLBACK_ENCODING: &str = "cl100k_base";

pub trait TokenCounterOperations: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

pub struct BpeTokenCounter {
    bpe: CoreBPE,
    encoding_label: String,
}

impl BpeTokenCounter {
    // Uses the encoding registered for `model`, falling back to
    // `cl100k_base`. Fails only when neither can be loaded.
    pub fn for_model(model: &str) -> Result<Self> {
        let (bpe, used_fallback) =
            load_with_fallback(model, get_bpe_from_model, cl100k_base)?;
        let encoding_label = if used_fallback {
            FALLBACK_ENCODING.to_string()
        } else {
            model.to_string()
        };
        Ok(Self {
            bpe,
            encoding_label,
        })
    }

    pub fn encoding_label(&self) -> &str {
        &self.encoding_label
    }
}

impl TokenCounterOperations for BpeTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

fn load_with_fallback<T, E1: Display, E2: Display>(
    model: &str,
    primary: impl FnOnce(&str) -> std::result::Result<T, E1>,
    fallback: impl FnOnce() -> std::result::Result<T, E2>,
) -> Result<(T, bool)> {
    match primary(model) {
        Ok(loaded) => {
            log::debug!("Loaded tokenizer encoding for model '{}'", model);
            Ok((loaded, false))
        }
        Err(model_err) => {
            log::warn!(
                "No tokenizer registered for model '{}' ({}), falling back to {}",
                model,
                model_err,
                FALLBACK_ENCODING
            );
            fallback().map(|loaded| (loaded, true)).map_err(|e| {
                AppError::TikToken(format!(
                    "Neither model '{}' nor fallback encoding '{}' is available: {}",
                    model, FALLBACK_ENCODING, e
                ))
            })
        }
    }
}

// Loading an encoding parses a large rank table, so counters are kept per model.
static COUNTERS: Lazy<Mutex<HashMap<String, Arc<BpeTokenCounter>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub fn shared_counter(model: &str) -> Result<Arc<BpeTokenCounter>> {
    let mut counters = COUNTERS
        .lock()
        .map_err(|_| AppError::TikToken("tokenizer cache lock poisoned".to_string()))?;
    if let Some(counter) = counters.get(model) {
        return Ok(Arc::clone(counter));
    }
    let counter = Arc::new(BpeTokenCounter::for_model(model)?);
    counters.insert(model.to_string(), Arc::clone(&counter));
    Ok(counter)
}

pub fn count_tokens(text: &str, model: &str) -> Result<usize> {
    Ok(shared_counter(model)?.count_tokens(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_empty_string() {
        let counter = BpeTokenCounter::for_model(DEFAULT_TOKENIZER_MODEL).unwrap();
        assert_eq!(counter.count_tokens(""), 0);
    }

    #[test]
    fn test_counter_simple_text() {
        let counter = BpeTokenCounter::for_model(DEFAULT_TOKENIZER_MODEL).unwrap();
        assert_eq!(counter.count_tokens("hello world"), 2);
        assert_eq!(counter.encoding_label(), DEFAULT_TOKENIZER_MODEL);
    }

    #[test]
    fn test_unknown_model_falls_back_to_base_encoding() {
        let counter = BpeTokenCounter::for_model("definitely-not-a-model").unwrap();
        assert_eq!(counter.encoding_label(), FALLBACK_ENCODING);
        assert_eq!(counter.count_tokens("hello world"), 2);
    }

    #[test]
    fn test_shared_counter_is_reused() {
        let first = shared_counter(DEFAULT_TOKENIZER_MODEL).unwrap();
        let second = shared_counter(DEFAULT_TOKENIZER_MODEL).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(count_tokens("hello world", DEFAULT_TOKENIZER_MODEL).unwrap(), 2);
    }

    #[test]
    fn test_missing_fallback_is_tiktoken_error() {
        let result = load_with_fallback(
            "m",
            |_| Err::<(), _>("unknown model"),
            || Err::<(), _>("encoding unavailable"),
        );
        match result {
            Err(AppError::TikToken(msg)) => assert!(msg.contains("encoding unavailable")),
            other => panic!("expected TikToken error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let (value, used_fallback) = load_with_fallback(
            "m",
            |_| Ok::<_, String>(7),
            || -> std::result::Result<i32, String> { panic!("fallback must not run") },
        )
        .unwrap();
        assert_eq!(value, 7);
        assert!(!used_fallback);
    }
}
