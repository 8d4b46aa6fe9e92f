use ahash::AHashMap;
use sprs::CsMat;
use thiserror::Error;
use tracing::debug;

mod params;
pub use params::MatrixParams;

#[derive(Debug, Error)]
pub enum MatrixError {
    /// Trimming removed every term. Scoring models cannot fit on zero
    /// features, so this is reported instead of returning an empty matrix.
    #[error(
        "vocabulary is empty after trimming \
         (min_term_frequency={min_term_frequency}, min_doc_frequency={min_doc_frequency})"
    )]
    EmptyVocabulary {
        min_term_frequency: usize,
        min_doc_frequency: usize,
    },
}

/// Sparse document-term frequency matrix.
///
/// Rows are documents in corpus order, columns the lexicographically sorted
/// vocabulary surviving trimming. The column set is identical for every row
/// of one build, and rows with no surviving terms are kept as empty rows.
#[derive(Clone, Debug)]
pub struct DocumentTermMatrix {
    doc_ids: Vec<String>,
    terms: Vec<String>,
    term_index: AHashMap<String, usize>,
    counts: CsMat<f64>,
}

impl DocumentTermMatrix {
    /// Build a matrix from one token stream per document.
    pub fn build(
        doc_ids: &[String],
        token_streams: &[Vec<String>],
        params: &MatrixParams,
    ) -> Result<Self, MatrixError> {
        assert_eq!(
            doc_ids.len(),
            token_streams.len(),
            "one token stream per document id"
        );
        debug!(num_docs = doc_ids.len(), "building document-term matrix");

        let mut doc_counts: Vec<AHashMap<&str, f64>> = Vec::with_capacity(token_streams.len());
        for tokens in token_streams {
            let mut counts: AHashMap<&str, f64> = AHashMap::new();
            for token in tokens {
                *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
            }
            doc_counts.push(counts);
        }

        // Corpus-wide term frequency and document frequency per term.
        let mut totals: AHashMap<&str, (f64, usize)> = AHashMap::new();
        for counts in &doc_counts {
            for (&term, &count) in counts {
                let entry = totals.entry(term).or_insert((0.0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        let full_size = totals.len();
        let mut kept: Vec<&str> = totals
            .iter()
            .filter(|&(_, &(tf, df))| {
                tf >= params.min_term_frequency() as f64 && df >= params.min_doc_frequency()
            })
            .map(|(&term, _)| term)
            .collect();
        if kept.is_empty() {
            return Err(MatrixError::EmptyVocabulary {
                min_term_frequency: params.min_term_frequency(),
                min_doc_frequency: params.min_doc_frequency(),
            });
        }
        // Sorted vocabulary keeps repeated builds byte-identical.
        kept.sort_unstable();
        debug!(
            full_size,
            trimmed_size = kept.len(),
            "vocabulary trimmed"
        );

        let terms: Vec<String> = kept.iter().map(|&t| t.to_string()).collect();
        let term_index: AHashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();

        // Build CSR format directly.
        let mut indptr = Vec::with_capacity(doc_ids.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for counts in &doc_counts {
            let mut row_entries: Vec<(usize, f64)> = counts
                .iter()
                .filter_map(|(&term, &count)| term_index.get(term).map(|&col| (col, count)))
                .collect();
            row_entries.sort_unstable_by_key(|&(col, _)| col);
            for (col, count) in row_entries {
                indices.push(col);
                data.push(count);
            }
            indptr.push(indices.len());
        }

        let counts = CsMat::new((doc_ids.len(), terms.len()), indptr, indices, data);
        debug!(non_zero_entries = counts.nnz(), "matrix build complete");

        Ok(Self {
            doc_ids: doc_ids.to_vec(),
            terms,
            term_index,
            counts,
        })
    }

    #[must_use]
    pub fn n_docs(&self) -> usize {
        self.doc_ids.len()
    }

    #[must_use]
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn doc_ids(&self) -> &[String] {
        &self.doc_ids
    }

    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Column index of a term, if it survived trimming.
    #[must_use]
    pub fn term_position(&self, term: &str) -> Option<usize> {
        self.term_index.get(term).copied()
    }

    /// The underlying CSR count matrix (documents x terms).
    #[must_use]
    pub fn counts(&self) -> &CsMat<f64> {
        &self.counts
    }

    /// Total token count of one document row.
    #[must_use]
    pub fn doc_total(&self, row: usize) -> f64 {
        self.counts
            .outer_view(row)
            .map(|v| v.iter().map(|(_, &count)| count).sum())
            .unwrap_or(0.0)
    }
}
