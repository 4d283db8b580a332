use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use taiwan_loader::{Loader, LoaderConfig};
use tracing::{error, info, info_span};
use tracing_subscriber::{fmt, EnvFilter};

/// Load the Taiwan credit dataset into `s3://{bucket}/{prefix}taiwan.csv`.
#[derive(Parser, Debug)]
struct Args {
    /// Destination bucket
    #[arg(long)]
    bucket: String,

    /// Key prefix, used verbatim (include a trailing `/` for a folder)
    #[arg(long, default_value = "")]
    prefix: String,

    /// Optional YAML config overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();

    // ─── 2) load config ──────────────────────────────────────────────
    let config = match &args.config {
        Some(path) => LoaderConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };

    // ─── 3) run ──────────────────────────────────────────────────────
    let span = info_span!("taiwan", bucket = %args.bucket, prefix = %args.prefix);
    let loader = Loader::from_config(config, span)
        .await
        .context("initialising loader")?;

    let report = loader
        .run(&args.bucket, &args.prefix)
        .await
        .inspect_err(|e| error!(error = ?e, "load failed"))
        .context("loading dataset")?;

    info!(
        destination = %report.destination,
        rows = report.rows,
        columns = report.columns,
        bytes = report.bytes,
        fallback = report.outcome.used_fallback(),
        "all done"
    );
    Ok(())
}
