use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use poliscale::{
    CorpusSchema, Lexicon, LexiconScorer, MatrixParams, Pipeline, ReferenceSelection,
    RunReport, ScoringContext, ScoringStrategy, Tokenizer, Wordfish, Wordscores,
};

#[derive(Parser)]
#[command(name = "poliscale")]
#[command(about = "Score a CSV text corpus and merge the scores back", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Supervised scaling from scored reference documents
    Wordscores {
        #[command(flatten)]
        common: CommonArgs,

        /// Reference document as ID=SCORE (repeatable)
        #[arg(long = "reference", value_name = "ID=SCORE", conflicts_with = "reference_column")]
        references: Vec<String>,

        /// Column holding pre-assigned reference scores
        #[arg(long, value_name = "COLUMN")]
        reference_column: Option<String>,

        /// Draw a random reference sample of this size from the reference column
        #[arg(long, requires = "reference_column")]
        sample: Option<usize>,

        /// Seed for the reference sample
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Unsupervised latent scaling of all documents
    Wordfish {
        #[command(flatten)]
        common: CommonArgs,

        /// Iteration cap for the fit
        #[arg(long, default_value_t = 200)]
        max_iter: usize,

        /// Relative log-likelihood tolerance for convergence
        #[arg(long, default_value_t = 1e-6)]
        tolerance: f64,

        /// Direction anchors as LOW,HIGH document ids
        #[arg(long, value_name = "LOW,HIGH")]
        anchors: Option<String>,
    },
    /// Dictionary tally over a term,weight lexicon
    Lexicon {
        #[command(flatten)]
        common: CommonArgs,

        /// CSV file of term,weight rows
        #[arg(long, value_name = "PATH")]
        lexicon: PathBuf,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Input corpus CSV
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Output CSV (overwritten on rerun)
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// Column holding the document identifier
    #[arg(long, default_value = "id")]
    id_column: String,

    /// Column holding the document text
    #[arg(long, default_value = "text")]
    text_column: String,

    /// Optional grouping column for the per-group summary
    #[arg(long)]
    group_column: Option<String>,

    /// Name of the appended score column (default: per strategy)
    #[arg(long)]
    score_column: Option<String>,

    /// Minimum total term frequency kept in the vocabulary
    #[arg(long, default_value_t = 1)]
    min_tf: usize,

    /// Minimum document frequency kept in the vocabulary
    #[arg(long, default_value_t = 1)]
    min_df: usize,

    /// Additional stopword file (one word per line)
    #[arg(long, value_name = "PATH")]
    stopwords: Option<PathBuf>,

    /// Disable the built-in English stopword list
    #[arg(long)]
    no_stopwords: bool,

    /// Keep the original casing of tokens
    #[arg(long)]
    keep_case: bool,

    /// Keep purely numeric tokens
    #[arg(long)]
    keep_numbers: bool,

    /// Keep punctuation characters inside tokens
    #[arg(long)]
    keep_punctuation: bool,

    /// Drop tokens shorter than this many characters
    #[arg(long, default_value_t = 1)]
    min_token_len: usize,

    /// Histogram bin count for the summary
    #[arg(long, default_value_t = 10)]
    bins: usize,

    /// Also write the rendered summary to this file
    #[arg(long, value_name = "PATH")]
    summary_file: Option<PathBuf>,

    /// Output format for the run report
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (suppress the rendered summary)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    /// Rendered summary plus a one-line report
    Text,
    /// The run report as JSON
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (common, reference_column, strategy) = build_strategy(cli.command)?;

    let schema = build_schema(&common, reference_column);
    let context = build_context(&common)?;

    let mut pipeline = Pipeline::new(strategy)
        .with_schema(schema)
        .with_context(context)
        .with_summary_bins(common.bins);
    if let Some(path) = &common.summary_file {
        pipeline = pipeline.with_summary_path(path);
    }

    let report = pipeline
        .run(&common.input, &common.output)
        .with_context(|| format!("scoring run over '{}' failed", common.input.display()))?;
    print_report(&report, &common)?;
    Ok(())
}

type StrategyArgs = (CommonArgs, Option<String>, Box<dyn ScoringStrategy>);

/// Returns the common args, the reference column the schema must resolve
/// (wordscores column modes only), and the configured strategy.
fn build_strategy(command: Command) -> Result<StrategyArgs> {
    match command {
        Command::Wordscores {
            common,
            references,
            reference_column,
            sample,
            seed,
        } => {
            let selection = match (&references[..], &reference_column) {
                ([], None) => bail!(
                    "wordscores needs either --reference pairs or --reference-column"
                ),
                (pairs, None) => ReferenceSelection::Explicit(
                    pairs
                        .iter()
                        .map(|raw| parse_reference(raw))
                        .collect::<Result<Vec<_>>>()?,
                ),
                ([], Some(_)) => match sample {
                    Some(size) => ReferenceSelection::SampledColumn { size, seed },
                    None => ReferenceSelection::ReferenceColumn,
                },
                _ => unreachable!("clap rejects --reference with --reference-column"),
            };
            let mut strategy = Wordscores::new(selection);
            if let Some(column) = &common.score_column {
                strategy = strategy.with_column(column.as_str());
            }
            Ok((common, reference_column, Box::new(strategy)))
        }
        Command::Wordfish {
            common,
            max_iter,
            tolerance,
            anchors,
        } => {
            let mut strategy = Wordfish::new()
                .with_max_iter(max_iter)
                .with_tolerance(tolerance);
            if let Some(anchors) = anchors {
                let (low, high) = anchors.split_once(',').context(
                    "--anchors expects two comma-separated document ids (LOW,HIGH)",
                )?;
                strategy = strategy.with_anchors(low.trim(), high.trim());
            }
            if let Some(column) = &common.score_column {
                strategy = strategy.with_column(column.as_str());
            }
            Ok((common, None, Box::new(strategy)))
        }
        Command::Lexicon { common, lexicon } => {
            let lexicon = Lexicon::from_csv_path(&lexicon)?;
            let mut strategy = LexiconScorer::new(lexicon);
            if let Some(column) = &common.score_column {
                strategy = strategy.with_column(column.as_str());
            }
            Ok((common, None, Box::new(strategy)))
        }
    }
}

fn parse_reference(raw: &str) -> Result<(String, f64)> {
    let (id, score) = raw
        .split_once('=')
        .with_context(|| format!("'{raw}' is not of the form ID=SCORE"))?;
    let score: f64 = score
        .trim()
        .parse()
        .with_context(|| format!("'{score}' is not a numeric score"))?;
    Ok((id.trim().to_string(), score))
}

fn build_schema(common: &CommonArgs, reference_column: Option<String>) -> CorpusSchema {
    let mut schema = CorpusSchema::new(common.id_column.as_str(), common.text_column.as_str());
    if let Some(column) = &common.group_column {
        schema = schema.with_group_column(column.as_str());
    }
    if let Some(column) = reference_column {
        schema = schema.with_reference_column(column);
    }
    schema
}

fn build_context(common: &CommonArgs) -> Result<ScoringContext> {
    let mut tokenizer = Tokenizer::new()
        .preserve_case(common.keep_case)
        .keep_numbers(common.keep_numbers)
        .keep_punctuation(common.keep_punctuation)
        .with_min_token_len(common.min_token_len);
    if !common.no_stopwords {
        tokenizer = tokenizer.with_default_stopwords();
    }
    if let Some(path) = &common.stopwords {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot read stopword file '{}'", path.display()))?;
        let words: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!(words = words.len(), "stopword file loaded");
        tokenizer = tokenizer.extend_stopwords(words);
    }
    Ok(ScoringContext {
        tokenizer,
        matrix_params: MatrixParams::new(common.min_tf, common.min_df),
    })
}

fn print_report(report: &RunReport, common: &CommonArgs) -> Result<()> {
    match common.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            if !common.quiet {
                println!("{}", report.rendered_summary);
            }
            let convergence = match report.converged {
                Some(true) => " (converged)",
                Some(false) => " (did not converge)",
                None => "",
            };
            println!(
                "{}: scored {}/{} documents into '{}'{}",
                report.score_column, report.scored, report.rows, report.output, convergence
            );
        }
    }
    Ok(())
}
