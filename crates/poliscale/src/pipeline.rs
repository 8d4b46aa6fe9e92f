use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::corpus::{Corpus, CorpusSchema};
use crate::error::Result;
use crate::scale::{ScoringContext, ScoringStrategy};
use crate::summary::{group_means, render_group_means, ScoreSummary};

/// One-shot batch driver: load -> score -> merge -> export -> summarize.
///
/// Each stage fully materializes its output before the next begins, and any
/// stage error aborts the run before the output file is written. A corpus
/// with half-computed scores is never a deliverable.
pub struct Pipeline {
    schema: CorpusSchema,
    context: ScoringContext,
    strategy: Box<dyn ScoringStrategy>,
    summary_bins: usize,
    summary_path: Option<PathBuf>,
}

impl Pipeline {
    #[must_use]
    pub fn new(strategy: Box<dyn ScoringStrategy>) -> Self {
        Self {
            schema: CorpusSchema::default(),
            context: ScoringContext::default(),
            strategy,
            summary_bins: 10,
            summary_path: None,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: CorpusSchema) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: ScoringContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_summary_bins(mut self, bins: usize) -> Self {
        self.summary_bins = bins;
        self
    }

    /// Also write the rendered summary to a sidecar text file.
    #[must_use]
    pub fn with_summary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    pub fn run(&self, input: &Path, output: &Path) -> Result<RunReport> {
        info!(
            strategy = self.strategy.name(),
            column = self.strategy.column(),
            input = %input.display(),
            "run started"
        );
        let corpus = Corpus::from_csv_path(input, &self.schema)?;
        let scores = self.strategy.score(&corpus, &self.context)?;
        let enriched = corpus.with_scores(&scores)?;
        enriched.write_csv_path(output)?;

        // The summary comes after the export: a rendering or sidecar-write
        // problem must not take down a completed export.
        let values: Vec<f64> = (0..corpus.len())
            .filter_map(|row| scores.get(corpus.id(row)))
            .collect();
        let missing = corpus.len() - values.len();
        let summary = ScoreSummary::from_scores(&values, missing, self.summary_bins);
        let mut rendered =
            summary.render(&format!("{} score distribution", self.strategy.name()));
        if corpus.has_group_column() {
            let pairs = (0..corpus.len()).filter_map(|row| {
                match (corpus.group(row), scores.get(corpus.id(row))) {
                    (Some(group), Some(score)) => Some((group, score)),
                    _ => None,
                }
            });
            let means = group_means(pairs);
            if !means.is_empty() {
                rendered.push('\n');
                rendered.push_str(&render_group_means(&means));
            }
        }
        if let Some(path) = &self.summary_path {
            if let Err(err) = fs::write(path, &rendered) {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "summary file could not be written; the export already completed"
                );
            }
        }

        info!(
            rows = corpus.len(),
            scored = values.len(),
            unscored = missing,
            output = %output.display(),
            "run complete"
        );
        Ok(RunReport {
            rows: corpus.len(),
            scored: values.len(),
            unscored: missing,
            score_column: scores.column().to_string(),
            converged: scores.converged(),
            output: output.display().to_string(),
            summary,
            rendered_summary: rendered,
        })
    }
}

/// Serializable account of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub rows: usize,
    pub scored: usize,
    pub unscored: usize,
    pub score_column: String,
    /// `None` for strategies without an iterative fit; `Some(false)` marks a
    /// non-converged fit whose scores were kept.
    pub converged: Option<bool>,
    pub output: String,
    pub summary: ScoreSummary,
    #[serde(skip)]
    pub rendered_summary: String,
}
