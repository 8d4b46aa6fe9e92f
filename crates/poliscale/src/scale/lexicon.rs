use std::path::Path;

use ahash::AHashMap;
use tracing::debug;

use crate::corpus::Corpus;
use crate::error::{PipelineError, Result};

use super::{ScoreSet, ScoringContext, ScoringStrategy};

/// Fixed term-to-polarity table.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    weights: AHashMap<String, f64>,
}

impl Lexicon {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            weights: pairs
                .into_iter()
                .map(|(term, weight)| (term.into(), weight))
                .collect(),
        }
    }

    /// Load from CSV rows of `term,weight`. A single header row is tolerated.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let access = |source: csv::Error| PipelineError::DataAccess {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(access)?;
        let mut weights = AHashMap::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(access)?;
            if record.len() < 2 {
                return Err(PipelineError::Configuration {
                    reason: format!("lexicon row {} needs `term,weight` fields", line + 1),
                });
            }
            let term = record[0].trim().to_string();
            match record[1].trim().parse::<f64>() {
                Ok(weight) => {
                    weights.insert(term, weight);
                }
                Err(_) if line == 0 => continue,
                Err(_) => {
                    return Err(PipelineError::Configuration {
                        reason: format!(
                            "lexicon row {}: '{}' is not a numeric weight",
                            line + 1,
                            &record[1]
                        ),
                    });
                }
            }
        }
        debug!(terms = weights.len(), path = %path.display(), "lexicon loaded");
        Ok(Self { weights })
    }

    #[must_use]
    pub fn weight(&self, term: &str) -> Option<f64> {
        self.weights.get(term).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Tallies lexicon weights over each document's token stream.
///
/// No fitting step: the score is a plain sum over matched tokens, so every
/// document receives one, and a document without matches scores 0.
pub struct LexiconScorer {
    column: String,
    lexicon: Lexicon,
}

impl LexiconScorer {
    #[must_use]
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            column: "sentiment".into(),
            lexicon,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

impl ScoringStrategy for LexiconScorer {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn column(&self) -> &str {
        &self.column
    }

    fn score(&self, corpus: &Corpus, ctx: &ScoringContext) -> Result<ScoreSet> {
        if self.lexicon.is_empty() {
            return Err(PipelineError::InsufficientReferenceData {
                reason: "the lexicon has no terms".into(),
            });
        }
        let mut set = ScoreSet::new(self.column.clone());
        for row in 0..corpus.len() {
            let tokens = ctx.tokenizer.tokenize(corpus.text(row));
            let tally: f64 = tokens
                .iter()
                .filter_map(|token| self.lexicon.weight(token))
                .sum();
            set.insert(corpus.id(row).to_string(), tally);
        }
        debug!(documents = set.len(), "lexicon tally complete");
        Ok(set)
    }
}
