use ahash::AHashMap;
use tracing::debug;

use crate::corpus::Corpus;
use crate::error::{PipelineError, Result};

use super::{corpus_matrix, ReferenceSelection, ScoreSet, ScoringContext, ScoringStrategy};

/// Supervised reference-document scaling.
///
/// Each term is scored as the average position of the reference documents,
/// weighted by the share of the term's reference occurrences each document
/// holds. A document's score is then the frequency-weighted mean of its
/// scored terms. Documents sharing no vocabulary with the reference set
/// receive no score and surface as missing after the merge.
pub struct Wordscores {
    column: String,
    reference: ReferenceSelection,
}

impl Wordscores {
    #[must_use]
    pub fn new(reference: ReferenceSelection) -> Self {
        Self {
            column: "wordscores".into(),
            reference,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

impl ScoringStrategy for Wordscores {
    fn name(&self) -> &'static str {
        "wordscores"
    }

    fn column(&self) -> &str {
        &self.column
    }

    fn score(&self, corpus: &Corpus, ctx: &ScoringContext) -> Result<ScoreSet> {
        let references = self.reference.resolve(corpus)?;

        let mut positions: Vec<f64> = references.iter().map(|&(_, score)| score).collect();
        positions.sort_by(f64::total_cmp);
        positions.dedup();
        if positions.len() < 2 {
            return Err(PipelineError::InsufficientReferenceData {
                reason: "the reference set needs at least 2 distinct score values".into(),
            });
        }

        let matrix = corpus_matrix(corpus, ctx)?;
        let row_of: AHashMap<&str, usize> = matrix
            .doc_ids()
            .iter()
            .enumerate()
            .map(|(row, id)| (id.as_str(), row))
            .collect();
        let mut ref_rows: Vec<(usize, f64)> = Vec::with_capacity(references.len());
        for (id, score) in &references {
            if let Some(&row) = row_of.get(id.as_str()) {
                ref_rows.push((row, *score));
            }
        }

        // Total occurrences of each term across the reference documents.
        let n_terms = matrix.n_terms();
        let mut ref_totals = vec![0.0; n_terms];
        for &(row, _) in &ref_rows {
            if let Some(counts) = matrix.counts().outer_view(row) {
                for (col, &count) in counts.iter() {
                    ref_totals[col] += count;
                }
            }
        }
        let scored_terms = ref_totals.iter().filter(|&&total| total > 0.0).count();
        if scored_terms == 0 {
            return Err(PipelineError::InsufficientReferenceData {
                reason: "the reference documents share no vocabulary with the corpus".into(),
            });
        }

        // Term score: share-weighted mean of reference positions.
        let mut term_scores = vec![0.0; n_terms];
        for &(row, position) in &ref_rows {
            if let Some(counts) = matrix.counts().outer_view(row) {
                for (col, &count) in counts.iter() {
                    term_scores[col] += (count / ref_totals[col]) * position;
                }
            }
        }
        debug!(scored_terms, total_terms = n_terms, "term scores estimated");

        // Predict every document with at least one scored term.
        let mut set = ScoreSet::new(self.column.clone());
        for (row, id) in matrix.doc_ids().iter().enumerate() {
            let Some(counts) = matrix.counts().outer_view(row) else {
                continue;
            };
            let mut weighted_sum = 0.0;
            let mut total = 0.0;
            for (col, &count) in counts.iter() {
                if ref_totals[col] > 0.0 {
                    weighted_sum += count * term_scores[col];
                    total += count;
                }
            }
            if total > 0.0 {
                set.insert(id.clone(), weighted_sum / total);
            }
        }
        debug!(
            scored = set.len(),
            documents = matrix.n_docs(),
            "documents scored"
        );
        Ok(set)
    }
}
