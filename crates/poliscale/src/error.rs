use std::path::PathBuf;

use poliscale_preprocessing::MatrixError;
use thiserror::Error;

/// Error type for corpus access, reference selection, and merge failures.
///
/// Every variant is fatal to the current run; inputs are static batch files,
/// so nothing is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot access '{}': {}", .path.display(), .source)]
    DataAccess {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("required column '{column}' not found in the corpus")]
    MissingColumn { column: String },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error("insufficient reference data: {reason}")]
    InsufficientReferenceData { reason: String },
    #[error("ambiguous join key: document identifier '{id}' appears more than once")]
    AmbiguousJoinKey { id: String },
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
