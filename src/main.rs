use anyhow::{Context, Result, bail};
use birdclips::domain::config::AppConfig;
use birdclips::domain::entities::{DurationLimits, SegmentationPolicy};
use birdclips::infrastructure::audio::{WavFileSink, WavFileSource};
use birdclips::infrastructure::catalog::{self, HttpCatalog};
use birdclips::infrastructure::pipeline::{ClipExporter, ExportSummary};
use birdclips::preprocessing::segmenter::Segmenter;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "birdclips")]
#[command(about = "Split bird recordings into dataset clips")]
#[command(version)]
struct Cli {
    /// TOML config with detector, noise gate and output settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for written files (defaults to next to each input)
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Replace files that already exist
    #[arg(long, global = true)]
    overwrite: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut recordings around their non-silent regions
    Silence {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Drop clips shorter than this many seconds
        #[arg(long)]
        min: Option<f64>,

        /// Drop clips longer than this many seconds
        #[arg(long)]
        max: Option<f64>,

        /// Detect silence on the raw recording instead of a denoised copy
        #[arg(long)]
        no_denoise: bool,
    },

    /// Cut recordings into fixed-length windows
    Time {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Window length in seconds
        #[arg(long, default_value = "1")]
        duration: f64,

        /// Strip leading and trailing silence first
        #[arg(long)]
        trim: bool,
    },

    /// Write a background-noise-reduced copy of each recording
    Denoise {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Download catalog recordings of one subspecies
    Fetch {
        genus: String,

        subspecies: String,

        /// Download at most this many recordings (0 for all)
        #[arg(long)]
        limit: Option<usize>,

        /// Seconds to wait after each download
        #[arg(long)]
        wait: Option<u64>,

        /// Download again even if the file exists
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

fn progress_bar(len: usize, message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

/// Runs `job` on every file, logging failures and carrying on.
fn for_each_file<F>(files: &[PathBuf], message: &'static str, mut job: F) -> Result<usize>
where
    F: FnMut(&Path) -> Result<()>,
{
    let pb = progress_bar(files.len(), message)?;
    let mut failed = 0;
    for path in files {
        if let Err(err) = job(path) {
            warn!(path = %path.display(), "{err:#}");
            failed += 1;
        }
        pb.inc(1);
    }
    pb.finish_with_message(format!("{message} completed!"));
    Ok(failed)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    let failed = match &cli.command {
        Commands::Silence { files, min, max, no_denoise } => {
            let limits = match (min, max) {
                (None, None) => None,
                (min, max) => Some(DurationLimits::new(
                    min.unwrap_or(0.0),
                    max.unwrap_or(f64::INFINITY),
                )?),
            };
            let policy = SegmentationPolicy::silence(limits, !no_denoise);
            segment_all(&build_exporter(&cli, &config)?, files, &policy)?
        }
        Commands::Time { files, duration, trim } => {
            let policy = SegmentationPolicy::time(*duration, *trim);
            segment_all(&build_exporter(&cli, &config)?, files, &policy)?
        }
        Commands::Denoise { files } => {
            let exporter = build_exporter(&cli, &config)?;
            for_each_file(files, "Denoising audio files", |path| {
                exporter
                    .denoise_file(path)
                    .with_context(|| format!("failed to denoise {}", path.display()))?;
                Ok(())
            })?
        }
        Commands::Fetch { genus, subspecies, limit, wait, force } => {
            let out = cli.out.as_deref().unwrap_or(Path::new("."));
            let limit = limit.unwrap_or(config.catalog.limit);
            let wait = Duration::from_secs(wait.unwrap_or(config.catalog.wait_secs));
            fetch(&config, genus, subspecies, out, limit, wait, *force)?;
            0
        }
    };

    if failed > 0 {
        bail!("{failed} file(s) failed");
    }
    Ok(())
}

fn build_exporter(
    cli: &Cli,
    config: &AppConfig,
) -> Result<ClipExporter<WavFileSource, WavFileSink>> {
    let overwrite = cli.overwrite || config.output.overwrite;
    let segmenter = Segmenter::from_config(config).context("invalid segmentation config")?;
    let mut exporter = ClipExporter::new(
        WavFileSource::new(config.output.target_sample_rate),
        WavFileSink::new(config.output.format),
        segmenter,
    )
    .with_overwrite(overwrite);
    if let Some(out) = &cli.out {
        exporter = exporter.with_output_dir(out);
    }
    exporter.setup_output_dir().context("failed to create output directory")?;
    Ok(exporter)
}

fn segment_all(
    exporter: &ClipExporter<WavFileSource, WavFileSink>,
    files: &[PathBuf],
    policy: &SegmentationPolicy,
) -> Result<usize> {
    let mut total = ExportSummary::default();
    let failed = for_each_file(files, "Segmenting audio files", |path| {
        let summary = exporter
            .process_file(path, policy)
            .with_context(|| format!("failed to segment {}", path.display()))?;
        total.merge(summary);
        Ok(())
    })?;
    info!(
        clips = total.clips,
        written = total.written,
        skipped = total.skipped,
        failed,
        "segmentation finished"
    );
    Ok(failed)
}

fn fetch(
    config: &AppConfig,
    genus: &str,
    subspecies: &str,
    out: &Path,
    limit: usize,
    wait: Duration,
    force: bool,
) -> Result<()> {
    let client = HttpCatalog::new().context("failed to build HTTP client")?;
    let recordings =
        catalog::get_recordings_list(&client, &config.catalog.endpoint, genus, subspecies)
            .with_context(|| format!("failed to query {}", catalog::CATALOG_NAME))?;
    let (paths, downloaded) =
        catalog::download_recordings(&recordings, out, limit, wait, force, &client)
            .context("failed to download recordings")?;
    info!(
        found = recordings.len(),
        stored = paths.len(),
        downloaded,
        out = %out.display(),
        "fetch finished"
    );
    Ok(())
}
