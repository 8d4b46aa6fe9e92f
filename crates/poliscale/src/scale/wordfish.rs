//! Unsupervised latent scaling of documents.
//!
//! Fits `y_ij ~ Poisson(exp(alpha_i + psi_j + beta_j * theta_i))`, where
//! `theta_i` is the latent position of document `i`, by alternating damped
//! Newton updates over the word and document parameter blocks. `theta` is
//! re-standardized after every sweep (with compensating adjustments to
//! `psi` and `beta`, so the fitted rates are unchanged) and its direction
//! is fixed by a pair of anchor documents.

use ndarray::{Array1, Array2, Axis};
use tracing::{debug, warn};

use crate::corpus::Corpus;
use crate::error::{PipelineError, Result};

use super::{corpus_matrix, ScoreSet, ScoringContext, ScoringStrategy};

/// Cap on a single Newton step, keeping early sweeps from overshooting.
const NEWTON_STEP_LIMIT: f64 = 1.0;
/// Linear predictors are clamped to this magnitude before exponentiation.
const ETA_LIMIT: f64 = 30.0;

pub struct Wordfish {
    column: String,
    max_iter: usize,
    tolerance: f64,
    anchors: Option<(String, String)>,
}

impl Wordfish {
    #[must_use]
    pub fn new() -> Self {
        Self {
            column: "wordfish".into(),
            max_iter: 200,
            tolerance: 1e-6,
            anchors: None,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Fix the scale's direction: `low` is placed left of `high`.
    /// Defaults to the first and last placed documents.
    #[must_use]
    pub fn with_anchors(mut self, low: impl Into<String>, high: impl Into<String>) -> Self {
        self.anchors = Some((low.into(), high.into()));
        self
    }
}

impl Default for Wordfish {
    fn default() -> Self {
        Self::new()
    }
}

struct PoissonFit {
    theta: Array1<f64>,
    converged: bool,
    iterations: usize,
}

impl ScoringStrategy for Wordfish {
    fn name(&self) -> &'static str {
        "wordfish"
    }

    fn column(&self) -> &str {
        &self.column
    }

    fn score(&self, corpus: &Corpus, ctx: &ScoringContext) -> Result<ScoreSet> {
        let matrix = corpus_matrix(corpus, ctx)?;

        // Documents with no surviving terms cannot be placed on the scale;
        // they stay out of the fit and surface as missing after the merge.
        let fit_rows: Vec<usize> = (0..matrix.n_docs())
            .filter(|&row| matrix.doc_total(row) > 0.0)
            .collect();
        if fit_rows.len() < 2 {
            return Err(PipelineError::Configuration {
                reason: "latent scaling needs at least two documents with surviving terms"
                    .into(),
            });
        }

        let n = fit_rows.len();
        let m = matrix.n_terms();
        let mut y = Array2::zeros((n, m));
        for (i, &row) in fit_rows.iter().enumerate() {
            if let Some(counts) = matrix.counts().outer_view(row) {
                for (col, &count) in counts.iter() {
                    y[[i, col]] = count;
                }
            }
        }

        let fit = fit_poisson_scaling(&y, self.max_iter, self.tolerance);
        if fit.converged {
            debug!(iterations = fit.iterations, "scaling converged");
        } else {
            warn!(
                iterations = fit.iterations,
                tolerance = self.tolerance,
                "scaling did not converge; positions remain usable for ranking"
            );
        }

        let ids: Vec<&String> = fit_rows.iter().map(|&row| &matrix.doc_ids()[row]).collect();
        let mut theta = fit.theta;
        orient(&mut theta, &ids, self.anchors.as_ref())?;

        let mut set = ScoreSet::new(self.column.clone());
        for (i, id) in ids.iter().enumerate() {
            set.insert((*id).clone(), theta[i]);
        }
        Ok(set.with_converged(fit.converged))
    }
}

fn orient(
    theta: &mut Array1<f64>,
    ids: &[&String],
    anchors: Option<&(String, String)>,
) -> Result<()> {
    let (low, high) = match anchors {
        Some((low, high)) => {
            let position = |wanted: &str| {
                ids.iter()
                    .position(|id| id.as_str() == wanted)
                    .ok_or_else(|| PipelineError::InsufficientReferenceData {
                        reason: format!(
                            "anchor document '{wanted}' was not placed by the scaling"
                        ),
                    })
            };
            (position(low)?, position(high)?)
        }
        None => (0, ids.len() - 1),
    };
    if low == high {
        return Err(PipelineError::Configuration {
            reason: "direction anchors must name two different documents".into(),
        });
    }
    if theta[low] > theta[high] {
        theta.mapv_inplace(|t| -t);
    }
    Ok(())
}

fn fit_poisson_scaling(y: &Array2<f64>, max_iter: usize, tolerance: f64) -> PoissonFit {
    let (n, m) = y.dim();
    let row_totals = y.sum_axis(Axis(1));
    let col_totals = y.sum_axis(Axis(0));
    let mean_row_total = row_totals.sum() / n as f64;

    // Margin-based starting values; theta starts from the leading left
    // singular vector of the double-centered log counts.
    let mut alpha: Array1<f64> = row_totals.mapv(|total| (total / mean_row_total).ln());
    let mut psi: Array1<f64> = col_totals.mapv(|total| ((total + 0.1) / n as f64).ln());
    let mut beta: Array1<f64> = Array1::zeros(m);
    let mut theta = initial_theta(y);

    let mut last_ll = f64::NEG_INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..max_iter {
        iterations = iter + 1;

        // Word block: joint Newton step for (psi_j, beta_j).
        for j in 0..m {
            let mut g_psi = 0.0;
            let mut g_beta = 0.0;
            let mut h11 = 0.0;
            let mut h12 = 0.0;
            let mut h22 = 0.0;
            for i in 0..n {
                let mu = rate(alpha[i], psi[j], beta[j], theta[i]);
                let resid = y[[i, j]] - mu;
                g_psi += resid;
                g_beta += theta[i] * resid;
                h11 += mu;
                h12 += theta[i] * mu;
                h22 += theta[i] * theta[i] * mu;
            }
            let det = h11 * h22 - h12 * h12;
            if det.abs() < 1e-12 {
                continue;
            }
            psi[j] += clamp_step((h22 * g_psi - h12 * g_beta) / det);
            beta[j] += clamp_step((h11 * g_beta - h12 * g_psi) / det);
        }

        // Document block: joint Newton step for (alpha_i, theta_i).
        for i in 0..n {
            let mut g_alpha = 0.0;
            let mut g_theta = 0.0;
            let mut h11 = 0.0;
            let mut h12 = 0.0;
            let mut h22 = 0.0;
            for j in 0..m {
                let mu = rate(alpha[i], psi[j], beta[j], theta[i]);
                let resid = y[[i, j]] - mu;
                g_alpha += resid;
                g_theta += beta[j] * resid;
                h11 += mu;
                h12 += beta[j] * mu;
                h22 += beta[j] * beta[j] * mu;
            }
            let det = h11 * h22 - h12 * h12;
            if det.abs() < 1e-12 {
                continue;
            }
            alpha[i] += clamp_step((h22 * g_alpha - h12 * g_theta) / det);
            theta[i] += clamp_step((h11 * g_theta - h12 * g_alpha) / det);
        }

        // Identification: anchor the first document's alpha at zero and
        // standardize theta, compensating psi and beta so every fitted
        // rate is unchanged.
        let alpha0 = alpha[0];
        alpha.mapv_inplace(|a| a - alpha0);
        psi.mapv_inplace(|p| p + alpha0);

        let mean = theta.sum() / n as f64;
        let sd = (theta.mapv(|t| (t - mean) * (t - mean)).sum() / n as f64).sqrt();
        if sd > 1e-12 {
            psi = &psi + &beta.mapv(|b| b * mean);
            beta.mapv_inplace(|b| b * sd);
            theta.mapv_inplace(|t| (t - mean) / sd);
        }

        let ll = log_likelihood(y, &alpha, &psi, &beta, &theta);
        if iter > 0 && (ll - last_ll).abs() / last_ll.abs().max(1.0) < tolerance {
            last_ll = ll;
            converged = true;
            break;
        }
        last_ll = ll;
    }

    debug!(iterations, log_likelihood = last_ll, "fit finished");
    PoissonFit {
        theta,
        converged,
        iterations,
    }
}

fn rate(alpha: f64, psi: f64, beta: f64, theta: f64) -> f64 {
    (alpha + psi + beta * theta).clamp(-ETA_LIMIT, ETA_LIMIT).exp()
}

fn clamp_step(step: f64) -> f64 {
    if step.is_finite() {
        step.clamp(-NEWTON_STEP_LIMIT, NEWTON_STEP_LIMIT)
    } else {
        0.0
    }
}

fn log_likelihood(
    y: &Array2<f64>,
    alpha: &Array1<f64>,
    psi: &Array1<f64>,
    beta: &Array1<f64>,
    theta: &Array1<f64>,
) -> f64 {
    let (n, m) = y.dim();
    let mut ll = 0.0;
    for i in 0..n {
        for j in 0..m {
            let eta = (alpha[i] + psi[j] + beta[j] * theta[i]).clamp(-ETA_LIMIT, ETA_LIMIT);
            ll += y[[i, j]] * eta - eta.exp();
        }
    }
    ll
}

/// Leading left singular vector of the double-centered log counts, found by
/// power iteration; a deterministic starting point for theta.
fn initial_theta(y: &Array2<f64>) -> Array1<f64> {
    let (n, m) = y.dim();
    let logs = y.mapv(|count| (count + 1.0).ln());
    let row_means = logs.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(n));
    let col_means = logs.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(m));
    let grand_mean = logs.sum() / (n * m) as f64;
    let mut residuals = Array2::zeros((n, m));
    for i in 0..n {
        for j in 0..m {
            residuals[[i, j]] = logs[[i, j]] - row_means[i] - col_means[j] + grand_mean;
        }
    }

    let mut u = Array1::from_elem(n, 1.0 / (n as f64).sqrt());
    for _ in 0..50 {
        let v = residuals.t().dot(&u);
        let v_norm = v.dot(&v).sqrt();
        if v_norm < 1e-12 {
            break;
        }
        let v = v / v_norm;
        let next = residuals.dot(&v);
        let norm = next.dot(&next).sqrt();
        if norm < 1e-12 {
            break;
        }
        u = next / norm;
    }
    standardize(&u)
}

fn standardize(values: &Array1<f64>) -> Array1<f64> {
    let n = values.len() as f64;
    let mean = values.sum() / n;
    let sd = (values.mapv(|v| (v - mean) * (v - mean)).sum() / n).sqrt();
    if sd < 1e-9 {
        // Degenerate start: spread the documents evenly instead.
        let spread = Array1::from_iter((0..values.len()).map(|i| i as f64));
        let spread_mean = spread.sum() / n;
        let spread_sd =
            (spread.mapv(|v| (v - spread_mean) * (v - spread_mean)).sum() / n).sqrt();
        return spread.mapv(|v| (v - spread_mean) / spread_sd);
    }
    values.mapv(|v| (v - mean) / sd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusSchema;
    use poliscale_preprocessing::Tokenizer;

    fn context() -> ScoringContext {
        ScoringContext {
            tokenizer: Tokenizer::new(),
            ..ScoringContext::default()
        }
    }

    fn corpus(rows: &[(&str, &str)]) -> Corpus {
        Corpus::from_rows(
            vec!["id".into(), "text".into()],
            rows.iter()
                .map(|&(id, text)| vec![id.to_string(), text.to_string()])
                .collect(),
            &CorpusSchema::default(),
        )
        .unwrap()
    }

    fn block_corpus() -> Corpus {
        corpus(&[
            ("E1", "economy trade market economy trade"),
            ("E2", "economy market trade growth economy"),
            ("E3", "trade market growth economy trade"),
            ("R1", "rights freedom democracy rights freedom"),
            ("R2", "freedom democracy rights dignity freedom"),
            ("R3", "democracy rights dignity freedom democracy"),
        ])
    }

    #[test]
    fn positions_are_standardized_and_finite() {
        let scores = Wordfish::new()
            .score(&block_corpus(), &context())
            .unwrap();
        assert_eq!(scores.len(), 6);

        let values: Vec<f64> = scores.iter().map(|(_, score)| score).collect();
        assert!(values.iter().all(|v| v.is_finite()));
        let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
        let sd = (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
            / values.len() as f64)
            .sqrt();
        assert!(mean.abs() < 1e-6, "mean was {mean}");
        assert!((sd - 1.0).abs() < 1e-6, "sd was {sd}");
    }

    #[test]
    fn disjoint_vocabulary_blocks_separate() {
        let scores = Wordfish::new()
            .with_anchors("E1", "R1")
            .score(&block_corpus(), &context())
            .unwrap();

        let econ_mean: f64 =
            ["E1", "E2", "E3"].iter().map(|id| scores.get(id).unwrap()).sum::<f64>() / 3.0;
        let rights_mean: f64 =
            ["R1", "R2", "R3"].iter().map(|id| scores.get(id).unwrap()).sum::<f64>() / 3.0;
        assert!(econ_mean < rights_mean);
        assert!(rights_mean - econ_mean > 0.5);
    }

    #[test]
    fn anchor_order_is_respected() {
        let forward = Wordfish::new()
            .with_anchors("E1", "R1")
            .score(&block_corpus(), &context())
            .unwrap();
        let reversed = Wordfish::new()
            .with_anchors("R1", "E1")
            .score(&block_corpus(), &context())
            .unwrap();
        assert!(forward.get("E1").unwrap() < forward.get("R1").unwrap());
        assert!(reversed.get("R1").unwrap() < reversed.get("E1").unwrap());
    }

    #[test]
    fn unknown_anchor_is_an_error() {
        let err = Wordfish::new()
            .with_anchors("E1", "missing")
            .score(&block_corpus(), &context())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientReferenceData { .. }
        ));
    }

    #[test]
    fn empty_documents_are_left_unplaced() {
        let corpus = corpus(&[
            ("A", "economy trade economy"),
            ("B", "rights freedom rights"),
            ("C", "economy rights trade freedom"),
            ("empty", ""),
        ]);
        let scores = Wordfish::new().score(&corpus, &context()).unwrap();
        assert!(scores.get("empty").is_none());
        assert_eq!(scores.len(), 3);
    }

    #[test]
    fn reports_convergence_state() {
        let starved = Wordfish::new()
            .with_max_iter(1)
            .score(&block_corpus(), &context())
            .unwrap();
        assert_eq!(starved.converged(), Some(false));

        let full = Wordfish::new().score(&block_corpus(), &context()).unwrap();
        assert_eq!(full.converged(), Some(true));
    }

    #[test]
    fn too_few_documents_is_a_configuration_error() {
        let corpus = corpus(&[("A", "economy"), ("B", "")]);
        let err = Wordfish::new().score(&corpus, &context()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }
}
