//! Terminal-style distribution summaries for score columns.

use std::fmt::Write as _;

use ahash::AHashMap;
use serde::Serialize;

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Descriptive statistics plus fixed-width histogram bins for one score
/// column.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSummary {
    pub scored: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub bins: Vec<HistogramBin>,
}

impl ScoreSummary {
    #[must_use]
    pub fn from_scores(values: &[f64], missing: usize, bin_count: usize) -> Self {
        if values.is_empty() {
            return Self {
                scored: 0,
                missing,
                min: None,
                max: None,
                mean: None,
                stddev: None,
                bins: Vec::new(),
            };
        }

        let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let stddev = (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
            / values.len() as f64)
            .sqrt();

        let bin_count = bin_count.max(1);
        let range = max - min;
        let width = if range > 0.0 {
            range / bin_count as f64
        } else {
            1.0
        };
        let mut bins: Vec<HistogramBin> = (0..bin_count)
            .map(|idx| HistogramBin {
                lower: min + idx as f64 * width,
                upper: min + (idx + 1) as f64 * width,
                count: 0,
            })
            .collect();
        for &value in values {
            let idx = (((value - min) / width) as usize).min(bin_count - 1);
            bins[idx].count += 1;
        }

        Self {
            scored: values.len(),
            missing,
            min: Some(min),
            max: Some(max),
            mean: Some(mean),
            stddev: Some(stddev),
            bins,
        }
    }

    /// Render an ASCII histogram for terminal or sidecar-file output.
    #[must_use]
    pub fn render(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
        if self.scored == 0 {
            let _ = writeln!(out, "(no documents were scored; missing={})", self.missing);
            return out;
        }
        let _ = writeln!(
            out,
            "n={} missing={} min={:.3} max={:.3} mean={:.3} sd={:.3}",
            self.scored,
            self.missing,
            self.min.unwrap_or(f64::NAN),
            self.max.unwrap_or(f64::NAN),
            self.mean.unwrap_or(f64::NAN),
            self.stddev.unwrap_or(f64::NAN),
        );
        let peak = self.bins.iter().map(|bin| bin.count).max().unwrap_or(0).max(1);
        for bin in &self.bins {
            let bar_len = bin.count * BAR_WIDTH / peak;
            let _ = writeln!(
                out,
                "{:>9.3} .. {:<9.3} | {:<width$} {}",
                bin.lower,
                bin.upper,
                "#".repeat(bar_len),
                bin.count,
                width = BAR_WIDTH,
            );
        }
        out
    }
}

/// Mean score and document count per group label, sorted by label.
pub fn group_means<'a, I>(pairs: I) -> Vec<(String, f64, usize)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut acc: AHashMap<&str, (f64, usize)> = AHashMap::new();
    for (group, score) in pairs {
        let entry = acc.entry(group).or_insert((0.0, 0));
        entry.0 += score;
        entry.1 += 1;
    }
    let mut means: Vec<(String, f64, usize)> = acc
        .into_iter()
        .map(|(group, (sum, count))| (group.to_string(), sum / count as f64, count))
        .collect();
    means.sort_by(|a, b| a.0.cmp(&b.0));
    means
}

/// Render the per-group means as a fixed-width table.
#[must_use]
pub fn render_group_means(means: &[(String, f64, usize)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Mean score by group");
    let _ = writeln!(out, "===================");
    let label_width = means
        .iter()
        .map(|(group, _, _)| group.chars().count())
        .max()
        .unwrap_or(5)
        .max(5);
    let _ = writeln!(out, "{:>width$} {:>10} {:>6}", "group", "mean", "n", width = label_width);
    for (group, mean, count) in means {
        let _ = writeln!(
            out,
            "{:>width$} {:>10.3} {:>6}",
            group,
            mean,
            count,
            width = label_width
        );
    }
    out
}
