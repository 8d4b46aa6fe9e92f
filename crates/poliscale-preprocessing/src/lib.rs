//! Text preparation for corpus scaling.
//!
//! This crate turns raw document text into the inputs the scoring models
//! consume: normalized token streams and a trimmed sparse document-term
//! matrix. Both steps are deterministic; building the same corpus twice
//! with the same parameters yields an identical matrix.

mod matrix;
mod stopwords;
mod tokenizer;

pub use matrix::{DocumentTermMatrix, MatrixError, MatrixParams};
pub use stopwords::default_stopwords;
pub use tokenizer::Tokenizer;
