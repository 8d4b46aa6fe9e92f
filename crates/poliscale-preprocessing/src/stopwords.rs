use ahash::AHashSet;

// Compact English function-word list. Callers with domain-specific needs
// extend it via `Tokenizer::with_stopwords` or replace it entirely.
const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by",
    "for", "from", "had", "has", "have", "he", "her", "his", "i", "if", "in",
    "into", "is", "it", "its", "it's", "may", "more", "most", "no", "not",
    "of", "on", "or", "our", "shall", "she", "should", "so", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "those", "to", "was", "we", "were", "which", "while", "who", "whose",
    "will", "with", "would", "you", "your",
];

/// The built-in English stopword set.
#[must_use]
pub fn default_stopwords() -> AHashSet<String> {
    DEFAULT_STOPWORDS.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_common_function_words() {
        let stopwords = default_stopwords();
        assert!(stopwords.contains("the"));
        assert!(stopwords.contains("and"));
        assert!(!stopwords.contains("parliament"));
    }
}
