//! Token measurement.
//!
//! Exact tokenizers differ per model family, so measurement sits behind a
//! trait and a process-wide registry caches one instance per model id.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Measures text in model tokens.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Character-count approximation (roughly four characters per token).
///
/// Intentionally overcounts short texts rather than undercounting long ones,
/// which keeps the budget invariants safe with any real tokenizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// Process-wide cache of tokenizers by model id.
pub struct TokenizerRegistry {
    tokenizers: RwLock<HashMap<String, Arc<dyn Tokenizer>>>,
}

impl TokenizerRegistry {
    fn new() -> Self {
        Self {
            tokenizers: RwLock::new(HashMap::new()),
        }
    }

    /// The shared registry instance.
    pub fn global() -> &'static TokenizerRegistry {
        static REGISTRY: OnceLock<TokenizerRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TokenizerRegistry::new)
    }

    /// Register a tokenizer for a model id, replacing any previous one.
    pub fn register(&self, model_id: impl Into<String>, tokenizer: Arc<dyn Tokenizer>) {
        self.tokenizers.write().insert(model_id.into(), tokenizer);
    }

    /// Tokenizer for a model id, falling back to the heuristic default.
    pub fn for_model(&self, model_id: &str) -> Arc<dyn Tokenizer> {
        if let Some(tokenizer) = self.tokenizers.read().get(model_id) {
            return tokenizer.clone();
        }
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(HeuristicTokenizer);
        self.tokenizers
            .write()
            .entry(model_id.to_string())
            .or_insert_with(|| tokenizer.clone());
        tokenizer
    }
}

#[cfg(test)]
mod tests {
    use super::{HeuristicTokenizer, Tokenizer, TokenizerRegistry};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn heuristic_rounds_up() {
        let tokenizer = HeuristicTokenizer;
        assert_eq!(tokenizer.count_tokens(""), 0);
        assert_eq!(tokenizer.count_tokens("abc"), 1);
        assert_eq!(tokenizer.count_tokens("abcd"), 1);
        assert_eq!(tokenizer.count_tokens("abcde"), 2);
    }

    #[test]
    fn registry_returns_registered_tokenizer() {
        struct FixedTokenizer;
        impl Tokenizer for FixedTokenizer {
            fn count_tokens(&self, _text: &str) -> usize {
                7
            }
        }

        let registry = TokenizerRegistry::global();
        registry.register("fixed-model", Arc::new(FixedTokenizer));
        assert_eq!(registry.for_model("fixed-model").count_tokens("anything"), 7);
        assert_eq!(registry.for_model("unknown-model").count_tokens("abcd"), 1);
    }
}
