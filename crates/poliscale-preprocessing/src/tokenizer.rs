use std::borrow::Cow;
use std::sync::LazyLock;

use ahash::AHashSet;
use indicatif::{ProgressBar, ProgressIterator, ProgressStyle};
use regex::Regex;
use tracing::debug;

use crate::stopwords::default_stopwords;

/// Minimum number of documents before a progress bar is shown.
const MIN_TEXTS_FOR_PROGRESS: usize = 100;

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+([.,]\d+)*$").unwrap());

fn progress_bar_setup(len: usize, message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    pb
}

/// Splits raw text into normalized tokens.
///
/// A pure function of its input and configuration: the same text always
/// produces the same stream, and empty or whitespace-only text produces an
/// empty stream rather than an error.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    lowercase: bool,
    strip_punctuation: bool,
    drop_numbers: bool,
    min_token_len: usize,
    stopwords: AHashSet<String>,
}

impl Tokenizer {
    /// Tokenizer with case folding, punctuation stripping, and numeric-token
    /// removal enabled and no stopwords.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: true,
            drop_numbers: true,
            min_token_len: 1,
            stopwords: AHashSet::new(),
        }
    }

    /// Keep the original casing instead of lower-casing tokens.
    #[must_use]
    pub fn preserve_case(mut self, preserve: bool) -> Self {
        self.lowercase = !preserve;
        self
    }

    /// Keep punctuation characters inside tokens.
    #[must_use]
    pub fn keep_punctuation(mut self, keep: bool) -> Self {
        self.strip_punctuation = !keep;
        self
    }

    /// Keep purely numeric tokens.
    #[must_use]
    pub fn keep_numbers(mut self, keep: bool) -> Self {
        self.drop_numbers = !keep;
        self
    }

    /// Drop tokens shorter than `len` characters.
    #[must_use]
    pub fn with_min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len;
        self
    }

    /// Replace the stopword set.
    #[must_use]
    pub fn with_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords = words.into_iter().map(Into::into).collect();
        self
    }

    /// Use the built-in English stopword list.
    #[must_use]
    pub fn with_default_stopwords(mut self) -> Self {
        self.stopwords = default_stopwords();
        self
    }

    /// Add words to the current stopword set.
    #[must_use]
    pub fn extend_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords.extend(words.into_iter().map(Into::into));
        self
    }

    /// Tokenize a single document.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for raw in text.split_whitespace() {
            let cleaned = if self.strip_punctuation {
                clean_word(raw)
            } else {
                raw.to_string()
            };
            if cleaned.is_empty() {
                continue;
            }
            let normalized = if self.lowercase {
                cleaned.to_lowercase()
            } else {
                cleaned
            };
            if normalized.chars().count() < self.min_token_len {
                continue;
            }
            if self.drop_numbers && NUMERIC_TOKEN.is_match(&normalized) {
                continue;
            }
            if self.stopwords.contains(&normalized) {
                continue;
            }
            tokens.push(normalized);
        }
        tokens
    }

    /// Tokenize a batch of documents, with a progress bar for larger corpora.
    pub fn tokenize_all<T: AsRef<str>>(&self, texts: &[T]) -> Vec<Vec<String>> {
        debug!(num_texts = texts.len(), "tokenizing corpus");
        if texts.len() >= MIN_TEXTS_FOR_PROGRESS {
            let pb = progress_bar_setup(texts.len(), "Tokenizing documents");
            let result = texts
                .iter()
                .progress_with(pb.clone())
                .map(|text| self.tokenize(text.as_ref()))
                .collect();
            pb.finish_with_message("Tokenization complete");
            result
        } else {
            texts.iter().map(|text| self.tokenize(text.as_ref())).collect()
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

// Keep alphanumerics and interior hyphens; everything else is punctuation.
fn clean_word(word: &str) -> String {
    let cleaned: String = word
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect();
    cleaned.trim_matches('-').to_string()
}
