//! Scoring strategies.
//!
//! Three interchangeable ways of attaching a per-document score to a corpus:
//! supervised reference-document scaling ([`Wordscores`]), unsupervised
//! latent Poisson scaling ([`Wordfish`]), and dictionary tallying
//! ([`LexiconScorer`]). All three implement [`ScoringStrategy`] so the
//! pipeline can treat them as one capability.

mod lexicon;
mod wordfish;
mod wordscores;

pub use lexicon::{Lexicon, LexiconScorer};
pub use wordfish::Wordfish;
pub use wordscores::Wordscores;

use ahash::{AHashMap, AHashSet};
use poliscale_preprocessing::{DocumentTermMatrix, MatrixParams, Tokenizer};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::corpus::Corpus;
use crate::error::{PipelineError, Result};

/// Shared preparation settings, so every strategy sees identically
/// tokenized and trimmed inputs.
#[derive(Clone, Debug)]
pub struct ScoringContext {
    pub tokenizer: Tokenizer,
    pub matrix_params: MatrixParams,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            tokenizer: Tokenizer::new().with_default_stopwords(),
            matrix_params: MatrixParams::default(),
        }
    }
}

/// A scoring strategy maps a corpus to a (possibly partial) score per
/// document. Partial coverage is expected: the merge step fills the gaps
/// with an explicit missing sentinel.
pub trait ScoringStrategy {
    fn name(&self) -> &'static str;

    /// Name of the column the scores are merged under.
    fn column(&self) -> &str;

    fn score(&self, corpus: &Corpus, ctx: &ScoringContext) -> Result<ScoreSet>;
}

/// Strategy output: a score column name, a `document id -> score` mapping,
/// and optional fit metadata.
#[derive(Clone, Debug)]
pub struct ScoreSet {
    column: String,
    scores: AHashMap<String, f64>,
    converged: Option<bool>,
}

impl ScoreSet {
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            scores: AHashMap::new(),
            converged: None,
        }
    }

    /// Build from pairs, rejecting duplicate identifiers.
    pub fn from_pairs<I>(column: impl Into<String>, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut set = Self::new(column);
        for (id, score) in pairs {
            if set.scores.insert(id.clone(), score).is_some() {
                return Err(PipelineError::AmbiguousJoinKey { id });
            }
        }
        Ok(set)
    }

    pub(crate) fn insert(&mut self, id: String, score: f64) {
        self.scores.insert(id, score);
    }

    /// Record whether an iterative fit reached its tolerance.
    #[must_use]
    pub fn with_converged(mut self, converged: bool) -> Self {
        self.converged = Some(converged);
        self
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<f64> {
        self.scores.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// `None` for strategies without an iterative fit.
    #[must_use]
    pub fn converged(&self) -> Option<bool> {
        self.converged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(id, &score)| (id.as_str(), score))
    }
}

/// How the labeled subset for a supervised fit is chosen. The three modes
/// are mutually exclusive by construction.
#[derive(Clone, Debug)]
pub enum ReferenceSelection {
    /// Explicit (document id, score) pairs.
    Explicit(Vec<(String, f64)>),
    /// Every document carrying a value in the schema's reference column.
    ReferenceColumn,
    /// A seeded random sample of the documents carrying a reference value.
    SampledColumn { size: usize, seed: u64 },
}

impl ReferenceSelection {
    /// Resolve to concrete (id, score) pairs against a corpus.
    ///
    /// A reference id that does not exist in the corpus is an error, never
    /// silently dropped.
    pub(crate) fn resolve(&self, corpus: &Corpus) -> Result<Vec<(String, f64)>> {
        let pairs = match self {
            Self::Explicit(pairs) => {
                let known: AHashSet<&str> =
                    (0..corpus.len()).map(|row| corpus.id(row)).collect();
                let mut seen = AHashSet::new();
                for (id, _) in pairs {
                    if !known.contains(id.as_str()) {
                        return Err(PipelineError::InsufficientReferenceData {
                            reason: format!(
                                "reference document '{id}' does not exist in the corpus"
                            ),
                        });
                    }
                    if !seen.insert(id.as_str()) {
                        return Err(PipelineError::AmbiguousJoinKey { id: id.clone() });
                    }
                }
                pairs.clone()
            }
            Self::ReferenceColumn => column_references(corpus)?,
            Self::SampledColumn { size, seed } => {
                if *size == 0 {
                    return Err(PipelineError::Configuration {
                        reason: "reference sample size must be at least 1".into(),
                    });
                }
                let pool = column_references(corpus)?;
                if *size >= pool.len() {
                    pool
                } else {
                    let mut rng = ChaCha8Rng::seed_from_u64(*seed);
                    let sampled: Vec<(String, f64)> =
                        pool.choose_multiple(&mut rng, *size).cloned().collect();
                    debug!(pool = pool.len(), sampled = sampled.len(), seed, "reference sample drawn");
                    sampled
                }
            }
        };
        if pairs.is_empty() {
            return Err(PipelineError::InsufficientReferenceData {
                reason: "no reference documents selected".into(),
            });
        }
        Ok(pairs)
    }
}

fn column_references(corpus: &Corpus) -> Result<Vec<(String, f64)>> {
    if !corpus.has_reference_column() {
        return Err(PipelineError::Configuration {
            reason: "corpus schema does not name a reference score column".into(),
        });
    }
    Ok((0..corpus.len())
        .filter_map(|row| {
            corpus
                .reference_score(row)
                .map(|score| (corpus.id(row).to_string(), score))
        })
        .collect())
}

/// Tokenize a corpus and build its trimmed document-term matrix.
pub(crate) fn corpus_matrix(
    corpus: &Corpus,
    ctx: &ScoringContext,
) -> Result<DocumentTermMatrix> {
    let ids = corpus.ids();
    let texts = corpus.texts();
    let streams = ctx.tokenizer.tokenize_all(&texts);
    Ok(DocumentTermMatrix::build(&ids, &streams, &ctx.matrix_params)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusSchema;

    fn corpus_with_references() -> Corpus {
        let schema = CorpusSchema::default().with_reference_column("position");
        Corpus::from_rows(
            vec!["id".into(), "text".into(), "position".into()],
            vec![
                vec!["A".into(), "t".into(), "-1".into()],
                vec!["B".into(), "t".into(), "1".into()],
                vec!["C".into(), "t".into(), String::new()],
                vec!["D".into(), "t".into(), "0.5".into()],
            ],
            &schema,
        )
        .unwrap()
    }

    #[test]
    fn explicit_unknown_id_is_an_error() {
        let corpus = corpus_with_references();
        let selection = ReferenceSelection::Explicit(vec![("Z".into(), 1.0)]);
        let err = selection.resolve(&corpus).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientReferenceData { .. }));
    }

    #[test]
    fn explicit_duplicate_id_is_ambiguous() {
        let corpus = corpus_with_references();
        let selection =
            ReferenceSelection::Explicit(vec![("A".into(), 1.0), ("A".into(), -1.0)]);
        let err = selection.resolve(&corpus).unwrap_err();
        assert!(matches!(err, PipelineError::AmbiguousJoinKey { id } if id == "A"));
    }

    #[test]
    fn reference_column_collects_filled_rows() {
        let corpus = corpus_with_references();
        let pairs = ReferenceSelection::ReferenceColumn.resolve(&corpus).unwrap();
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|(id, _)| id != "C"));
    }

    #[test]
    fn sampling_is_reproducible() {
        let corpus = corpus_with_references();
        let selection = ReferenceSelection::SampledColumn { size: 2, seed: 7 };
        let first = selection.resolve(&corpus).unwrap();
        let second = selection.resolve(&corpus).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn oversized_sample_uses_the_whole_pool() {
        let corpus = corpus_with_references();
        let selection = ReferenceSelection::SampledColumn { size: 10, seed: 7 };
        assert_eq!(selection.resolve(&corpus).unwrap().len(), 3);
    }

    #[test]
    fn zero_sample_size_is_a_configuration_error() {
        let corpus = corpus_with_references();
        let selection = ReferenceSelection::SampledColumn { size: 0, seed: 7 };
        let err = selection.resolve(&corpus).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn score_set_rejects_duplicate_pairs() {
        let err = ScoreSet::from_pairs(
            "s",
            [("A".to_string(), 1.0), ("A".to_string(), 2.0)],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::AmbiguousJoinKey { id } if id == "A"));
    }
}
