use std::path::Path;

use ahash::AHashSet;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::scale::ScoreSet;

/// Sentinel written for documents the scoring strategy did not cover.
/// Distinct from `0`, which is a valid score in several strategies.
pub const MISSING_SCORE: &str = "NA";

/// Names of the columns the pipeline reads from a corpus file.
///
/// Only the identifier and text columns are required; all other columns are
/// carried through untouched so an exported corpus round-trips exactly.
#[derive(Clone, Debug)]
pub struct CorpusSchema {
    pub id_column: String,
    pub text_column: String,
    pub group_column: Option<String>,
    pub reference_column: Option<String>,
}

impl CorpusSchema {
    pub fn new(id_column: impl Into<String>, text_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            text_column: text_column.into(),
            group_column: None,
            reference_column: None,
        }
    }

    #[must_use]
    pub fn with_group_column(mut self, column: impl Into<String>) -> Self {
        self.group_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_reference_column(mut self, column: impl Into<String>) -> Self {
        self.reference_column = Some(column.into());
        self
    }
}

impl Default for CorpusSchema {
    fn default() -> Self {
        Self::new("id", "text")
    }
}

/// Ordered collection of document records sharing one header schema.
///
/// Immutable: scoring appends columns via [`Corpus::with_scores`], which
/// returns a new value and never mutates rows in place.
#[derive(Clone, Debug)]
pub struct Corpus {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    id_idx: usize,
    text_idx: usize,
    group_idx: Option<usize>,
    reference_idx: Option<usize>,
}

impl Corpus {
    /// Load a character-delimited corpus file.
    pub fn from_csv_path(path: &Path, schema: &CorpusSchema) -> Result<Self> {
        let access = |source: csv::Error| PipelineError::DataAccess {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::Reader::from_path(path).map_err(access)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(access)?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(access)?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        let corpus = Self::from_rows(headers, rows, schema)?;
        info!(path = %path.display(), rows = corpus.len(), "corpus loaded");
        Ok(corpus)
    }

    /// Build a corpus from already-parsed headers and rows.
    pub fn from_rows(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        schema: &CorpusSchema,
    ) -> Result<Self> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|header| header == column)
                .ok_or_else(|| PipelineError::MissingColumn {
                    column: column.to_string(),
                })
        };
        let id_idx = find(&schema.id_column)?;
        let text_idx = find(&schema.text_column)?;
        let group_idx = match &schema.group_column {
            Some(column) => Some(find(column)?),
            None => None,
        };
        let reference_idx = match &schema.reference_column {
            Some(column) => Some(find(column)?),
            None => None,
        };
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(PipelineError::Configuration {
                    reason: format!(
                        "row {} has {} fields but the header has {}",
                        row_idx + 1,
                        row.len(),
                        headers.len()
                    ),
                });
            }
        }
        Ok(Self {
            headers,
            rows,
            id_idx,
            text_idx,
            group_idx,
            reference_idx,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn has_group_column(&self) -> bool {
        self.group_idx.is_some()
    }

    #[must_use]
    pub fn has_reference_column(&self) -> bool {
        self.reference_idx.is_some()
    }

    /// Document identifier of one row.
    #[must_use]
    pub fn id(&self, row: usize) -> &str {
        &self.rows[row][self.id_idx]
    }

    /// Raw document text of one row.
    #[must_use]
    pub fn text(&self, row: usize) -> &str {
        &self.rows[row][self.text_idx]
    }

    /// Group label of one row, if a grouping column is configured and filled.
    #[must_use]
    pub fn group(&self, row: usize) -> Option<&str> {
        self.group_idx
            .map(|idx| self.rows[row][idx].as_str())
            .filter(|value| !value.is_empty())
    }

    /// Pre-assigned reference score of one row, if present and numeric.
    #[must_use]
    pub fn reference_score(&self, row: usize) -> Option<f64> {
        let idx = self.reference_idx?;
        let value = self.rows[row][idx].trim();
        if value.is_empty() || value == MISSING_SCORE {
            return None;
        }
        match value.parse::<f64>() {
            Ok(score) => Some(score),
            Err(_) => {
                debug!(row, value, "reference column value is not numeric; skipped");
                None
            }
        }
    }

    /// Arbitrary column value of one row.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|header| header == column)?;
        Some(&self.rows[row][idx])
    }

    /// All document identifiers, in row order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row[self.id_idx].clone())
            .collect()
    }

    /// All document texts, in row order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row[self.text_idx].as_str()).collect()
    }

    /// Left join a score mapping onto the corpus, appending one column.
    ///
    /// Documents absent from the mapping receive [`MISSING_SCORE`].
    /// Duplicate identifiers among the corpus rows make the join ambiguous
    /// and are rejected.
    pub fn with_scores(&self, scores: &ScoreSet) -> Result<Self> {
        let mut seen = AHashSet::new();
        for row in 0..self.len() {
            let id = self.id(row);
            if !seen.insert(id) {
                return Err(PipelineError::AmbiguousJoinKey { id: id.to_string() });
            }
        }
        if self.headers.iter().any(|header| header == scores.column()) {
            return Err(PipelineError::Configuration {
                reason: format!(
                    "column '{}' already exists in the corpus",
                    scores.column()
                ),
            });
        }

        let mut headers = self.headers.clone();
        headers.push(scores.column().to_string());
        let mut rows = Vec::with_capacity(self.rows.len());
        for (row_idx, row) in self.rows.iter().enumerate() {
            let mut row = row.clone();
            match scores.get(self.id(row_idx)) {
                Some(score) => row.push(score.to_string()),
                None => row.push(MISSING_SCORE.to_string()),
            }
            rows.push(row);
        }
        debug!(
            column = scores.column(),
            scored = scores.len(),
            rows = rows.len(),
            "scores merged"
        );
        Ok(Self {
            headers,
            rows,
            id_idx: self.id_idx,
            text_idx: self.text_idx,
            group_idx: self.group_idx,
            reference_idx: self.reference_idx,
        })
    }

    /// Write the corpus to a CSV file, overwriting any previous run's output.
    pub fn write_csv_path(&self, path: &Path) -> Result<()> {
        let access = |source: csv::Error| PipelineError::DataAccess {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(access)?;
        writer.write_record(&self.headers).map_err(access)?;
        for row in &self.rows {
            writer.write_record(row).map_err(access)?;
        }
        writer.flush().map_err(|err| access(err.into()))?;
        info!(path = %path.display(), rows = self.len(), "corpus written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScoreSet;

    fn corpus_fixture() -> Corpus {
        let schema = CorpusSchema::default().with_group_column("legislature");
        Corpus::from_rows(
            vec!["id".into(), "text".into(), "legislature".into()],
            vec![
                vec!["A".into(), "first text".into(), "EP9".into()],
                vec!["B".into(), "second text".into(), "EP10".into()],
                vec!["C".into(), "third text".into(), String::new()],
            ],
            &schema,
        )
        .unwrap()
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let err = Corpus::from_rows(
            vec!["id".into(), "body".into()],
            vec![],
            &CorpusSchema::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { column } if column == "text"));
    }

    #[test]
    fn accessors_resolve_schema_columns() {
        let corpus = corpus_fixture();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.id(1), "B");
        assert_eq!(corpus.text(0), "first text");
        assert_eq!(corpus.group(0), Some("EP9"));
        assert_eq!(corpus.group(2), None);
    }

    #[test]
    fn reference_scores_parse_or_skip() {
        let schema = CorpusSchema::default().with_reference_column("position");
        let corpus = Corpus::from_rows(
            vec!["id".into(), "text".into(), "position".into()],
            vec![
                vec!["A".into(), "t".into(), "-1.5".into()],
                vec!["B".into(), "t".into(), String::new()],
                vec!["C".into(), "t".into(), "NA".into()],
                vec!["D".into(), "t".into(), "junk".into()],
            ],
            &schema,
        )
        .unwrap();
        assert_eq!(corpus.reference_score(0), Some(-1.5));
        assert_eq!(corpus.reference_score(1), None);
        assert_eq!(corpus.reference_score(2), None);
        assert_eq!(corpus.reference_score(3), None);
    }

    #[test]
    fn merge_is_total_over_rows() {
        let corpus = corpus_fixture();
        let scores =
            ScoreSet::from_pairs("position", [("A".to_string(), 0.5), ("C".to_string(), 0.0)])
                .unwrap();
        let merged = corpus.with_scores(&scores).unwrap();

        assert_eq!(merged.headers().last().map(String::as_str), Some("position"));
        assert_eq!(merged.value(0, "position"), Some("0.5"));
        assert_eq!(merged.value(1, "position"), Some(MISSING_SCORE));
        // zero is a real score, not the missing sentinel
        assert_eq!(merged.value(2, "position"), Some("0"));
        // original rows untouched
        assert_eq!(merged.text(0), "first text");
        assert_eq!(corpus.headers().len() + 1, merged.headers().len());
    }

    #[test]
    fn duplicate_corpus_id_breaks_the_join() {
        let corpus = Corpus::from_rows(
            vec!["id".into(), "text".into()],
            vec![
                vec!["A".into(), "one".into()],
                vec!["A".into(), "two".into()],
            ],
            &CorpusSchema::default(),
        )
        .unwrap();
        let scores = ScoreSet::from_pairs("s", [("A".to_string(), 1.0)]).unwrap();
        let err = corpus.with_scores(&scores).unwrap_err();
        assert!(matches!(err, PipelineError::AmbiguousJoinKey { id } if id == "A"));
    }

    #[test]
    fn existing_column_name_is_rejected() {
        let corpus = corpus_fixture();
        let scores = ScoreSet::from_pairs("text", [("A".to_string(), 1.0)]).unwrap();
        let err = corpus.with_scores(&scores).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Corpus::from_rows(
            vec!["id".into(), "text".into()],
            vec![vec!["A".into()]],
            &CorpusSchema::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }
}
