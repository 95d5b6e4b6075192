use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tickseq_core::PipelineConfig;
use tickseq_eval::{argmax, evaluate, Batcher, PriorPredictor, UniformPredictor};
use tickseq_features::{OutcomeSummary, Pipeline};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about = "Turn trade ticks into sliding-window training examples", long_about = None)]
struct Cli {
    /// Trade CSV file with sequence, time, price and volume columns
    path: PathBuf,

    /// JSON pipeline configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bucket width in seconds
    #[arg(long)]
    interval_length: Option<u64>,

    /// Prediction horizon in buckets
    #[arg(long)]
    predict_length: Option<usize>,

    /// Rows per window
    #[arg(long)]
    window_length: Option<usize>,

    /// Examples per batch in the report
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Write examples as JSON lines to this file ("-" for stdout)
    #[arg(long)]
    dump: Option<PathBuf>,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(secs) = self.interval_length {
            config.aggregation.interval_length_secs = secs;
        }
        if let Some(p) = self.predict_length {
            config.target.predict_length = p;
        }
        if let Some(w) = self.window_length {
            config.window.window_length = w;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    if cli.batch_size == 0 {
        anyhow::bail!("--batch-size must be positive");
    }

    let pipeline = Pipeline::new(cli.pipeline_config()?).context("invalid pipeline configuration")?;
    let data = pipeline
        .prepare_path(&cli.path)
        .with_context(|| format!("preparing {}", cli.path.display()))?;

    let stats = &data.stats;
    info!(
        trades = stats.trades,
        buckets = stats.buckets,
        filled = stats.filled_buckets,
        dropped_leading = stats.dropped_leading,
        non_finite_changes = stats.non_finite_changes,
        non_finite_outcomes = stats.non_finite_outcomes,
        clipped = stats.clipped_outcomes,
        "data quality"
    );

    match OutcomeSummary::from_outcomes(&data.outcomes, pipeline.quantizer()) {
        Some(summary) => info!(
            mean = summary.mean,
            std_dev = summary.std_dev,
            q05 = summary.q05,
            median = summary.median,
            q95 = summary.q95,
            clipped_frac = summary.clipped_frac,
            "outcome distribution"
        ),
        None => warn!("no finite outcomes"),
    }

    let targets = pipeline.quantize(&data.outcomes);
    let num_classes = pipeline.quantizer().num_classes();
    let generator = pipeline.examples(data)?;
    let num_examples = generator.len();
    let num_batches = Batcher::new(generator.clone(), cli.batch_size).count();
    let columns: Vec<&str> = generator.columns().iter().map(|c| c.name()).collect();
    info!(
        examples = num_examples,
        batches = num_batches,
        classes = num_classes,
        columns = %columns.join(","),
        "windows ready"
    );

    // In-sample baselines
    let uniform = evaluate(&UniformPredictor::new(num_classes), &mut generator.clone())?;
    let prior = PriorPredictor::fit(targets, num_classes, 1.0)?;
    let modal_change = argmax(prior.probs()).map(|class| pipeline.quantizer().bin_center(class));
    let prior = evaluate(&prior, &mut generator.clone())?;
    info!(
        uniform_ce = uniform.mean_cross_entropy,
        prior_ce = prior.mean_cross_entropy,
        prior_accuracy = prior.accuracy,
        modal_change = ?modal_change,
        "baselines"
    );

    if let Some(dump) = &cli.dump {
        let mut out: Box<dyn Write> = if dump.as_os_str() == "-" {
            Box::new(BufWriter::new(io::stdout().lock()))
        } else {
            let file = File::create(dump).with_context(|| format!("creating {}", dump.display()))?;
            Box::new(BufWriter::new(file))
        };
        let mut written = 0usize;
        for example in generator {
            let line = json!({
                "window": example.window.to_rows(),
                "target": example.target,
                "reference_price": example.reference_price,
            });
            writeln!(out, "{line}")?;
            written += 1;
        }
        out.flush()?;
        info!(examples = written, path = %dump.display(), "dumped examples");
    }

    Ok(())
}
