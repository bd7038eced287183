use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use days_rf::config::{CompareOptions, MatrixConfig, Metric, ParseOptions};
use days_rf::config::{DEFAULT_BRANCH_LENGTH, MIN_BRANCH_LENGTH};
use days_rf::io::write_matrix_csv;
use days_rf::matrix::matrix_from_file;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

/// Compute pairwise Robinson–Foulds distances (Day's algorithm) between all
/// trees of a newick file and write the distance matrix as headerless CSV.
#[derive(Parser, Debug)]
#[command(name = "days-rf", version, about = "Pairwise RF distance matrix for newick trees")]
struct Args {
    /// Path to a file with one newick tree per line (.gz accepted)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output path for the CSV distance matrix (.gz compresses)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Distance metric to compute: rf | normalized | rfl
    #[arg(long = "metric", value_enum, default_value_t = MetricArg::Rf)]
    metric: MetricArg,

    /// Compare trees as rooted
    #[arg(long = "rooted", default_value_t = false)]
    rooted: bool,

    /// Number of worker threads (defaults to available cores)
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,

    /// Branches not longer than this are ignored
    #[arg(long = "min-branch-length", default_value_t = MIN_BRANCH_LENGTH)]
    min_branch_length: f64,

    /// Length given to branches without one
    #[arg(long = "default-branch-length", default_value_t = DEFAULT_BRANCH_LENGTH)]
    default_branch_length: f64,

    /// Factor applied to every parsed branch length
    #[arg(long = "length-scale", default_value_t = 1.0)]
    length_scale: f64,

    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MetricArg {
    Rf,
    Normalized,
    Rfl,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Rf => Metric::Rf,
            MetricArg::Normalized => Metric::NormalizedRf,
            MetricArg::Rfl => Metric::Rfl,
        }
    }
}

impl Args {
    fn config(&self) -> MatrixConfig {
        let mut config = MatrixConfig::default()
            .with_parse(
                ParseOptions::default()
                    .with_default_branch_length(self.default_branch_length)
                    .with_length_scale(self.length_scale),
            )
            .with_compare(
                CompareOptions::default()
                    .with_rooted(self.rooted)
                    .with_min_branch_length(self.min_branch_length),
            )
            .with_metric(self.metric.into());
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = args.config();

    let t0 = Instant::now();
    let matrix = matrix_from_file(&args.input, &config)
        .with_context(|| format!("Failed to compute distances for {:?}", args.input))?;
    info!(
        "Determining distances using {:?} {:.3}s",
        config.metric,
        t0.elapsed().as_secs_f64()
    );

    let t1 = Instant::now();
    write_matrix_csv(&args.output, &matrix)
        .with_context(|| format!("Failed to write output {:?}", args.output))?;
    info!("Writing to output {:.3}s", t1.elapsed().as_secs_f64());

    Ok(())
}
