/// Trimming thresholds for vocabulary selection.
///
/// Both thresholds are absolute counts. A term survives only when its total
/// frequency across the corpus reaches `min_term_frequency` AND it appears
/// in at least `min_doc_frequency` distinct documents; terms below either
/// threshold are dropped entirely, not zeroed.
#[derive(Clone, Debug)]
pub struct MatrixParams {
    min_term_frequency: usize,
    min_doc_frequency: usize,
}

impl MatrixParams {
    pub fn new(min_term_frequency: usize, min_doc_frequency: usize) -> Self {
        assert!(
            min_term_frequency >= 1,
            "min_term_frequency must be at least 1"
        );
        assert!(
            min_doc_frequency >= 1,
            "min_doc_frequency must be at least 1"
        );
        Self {
            min_term_frequency,
            min_doc_frequency,
        }
    }

    #[must_use]
    pub fn min_term_frequency(&self) -> usize {
        self.min_term_frequency
    }

    #[must_use]
    pub fn min_doc_frequency(&self) -> usize {
        self.min_doc_frequency
    }
}

impl Default for MatrixParams {
    fn default() -> Self {
        Self {
            min_term_frequency: 1,
            min_doc_frequency: 1,
        }
    }
}
