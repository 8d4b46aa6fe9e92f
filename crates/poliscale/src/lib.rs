//! # poliscale
//!
//! Score-and-merge text scaling for CSV document corpora.
//!
//! A corpus flows through one linear pipeline: load the table, tokenize
//! each document, build a trimmed sparse document-term matrix, run a
//! scoring strategy (supervised reference scaling, unsupervised latent
//! scaling, or a dictionary tally), left-join the scores back onto the
//! table under an explicit `NA` sentinel for uncovered rows, write the
//! enriched CSV, and render a distribution summary.
//!
//! ## Quick start
//!
//! ```rust
//! use poliscale::{
//!     Corpus, CorpusSchema, Lexicon, LexiconScorer, ScoringContext, ScoringStrategy,
//!     Tokenizer,
//! };
//!
//! let corpus = Corpus::from_rows(
//!     vec!["id".into(), "text".into()],
//!     vec![
//!         vec!["A".into(), "good good great".into()],
//!         vec!["B".into(), "bad terrible".into()],
//!     ],
//!     &CorpusSchema::default(),
//! )?;
//! let lexicon = Lexicon::from_pairs([
//!     ("good", 1.0),
//!     ("great", 1.0),
//!     ("bad", -1.0),
//!     ("terrible", -1.0),
//! ]);
//! let strategy = LexiconScorer::new(lexicon);
//! let ctx = ScoringContext {
//!     tokenizer: Tokenizer::new(),
//!     ..ScoringContext::default()
//! };
//! let scores = strategy.score(&corpus, &ctx)?;
//! assert_eq!(scores.get("A"), Some(2.0));
//! assert_eq!(scores.get("B"), Some(-2.0));
//! # Ok::<(), poliscale::PipelineError>(())
//! ```
//!
//! ## File-to-file runs
//!
//! ```rust,no_run
//! use poliscale::{Pipeline, ReferenceSelection, Wordscores};
//! use std::path::Path;
//!
//! let strategy = Wordscores::new(ReferenceSelection::Explicit(vec![
//!     ("RC-2019-0017".into(), -1.0),
//!     ("RC-2021-0255".into(), 1.0),
//! ]));
//! let report = Pipeline::new(Box::new(strategy))
//!     .run(Path::new("resolutions.csv"), Path::new("scored.csv"))?;
//! println!("{}", report.rendered_summary);
//! # Ok::<(), poliscale::PipelineError>(())
//! ```

mod corpus;
mod error;
mod pipeline;
mod scale;
mod summary;

pub use poliscale_preprocessing::{
    default_stopwords, DocumentTermMatrix, MatrixError, MatrixParams, Tokenizer,
};

pub use corpus::{Corpus, CorpusSchema, MISSING_SCORE};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, RunReport};
pub use scale::{
    Lexicon, LexiconScorer, ReferenceSelection, ScoreSet, ScoringContext, ScoringStrategy,
    Wordfish, Wordscores,
};
pub use summary::{group_means, render_group_means, HistogramBin, ScoreSummary};
