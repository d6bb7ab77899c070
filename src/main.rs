use std::{path::PathBuf, time::Instant};

use anyhow::Context;
use clap::Parser;
use diagnosis_roi::{BatchDriver, DiagnosisExtractor, PipelineConfig, Preset, TesseractEngine};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Crop the "Provisional Diagnosis" field out of scanned forms.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Directory containing .png/.jpg pages.
    input: PathBuf,
    /// Directory the crops are written to; created if missing.
    output: PathBuf,
    /// TOML pipeline configuration. Takes precedence over --preset.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "batch")]
    preset: PresetArg,
    /// Also write each page with the located regions outlined.
    #[arg(long)]
    annotate: bool,
    /// Also write the OCR tokens of each page as JSON.
    #[arg(long)]
    tokens: bool,
    /// Tesseract language(s), e.g. `eng` or `eng+hin`.
    #[arg(long)]
    lang: Option<String>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PresetArg {
    Batch,
    Upload,
}

impl From<PresetArg> for Preset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Batch => Preset::Batch,
            PresetArg::Upload => Preset::Upload,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {path:?}"))?,
        None => PipelineConfig::preset(cli.preset.into()),
    };
    if cli.annotate {
        config.output.draw_markers = true;
        config.output.write_annotated = true;
    }
    config.output.write_tokens |= cli.tokens;
    if let Some(lang) = cli.lang {
        config.tesseract.lang = lang;
    }

    match TesseractEngine::version() {
        Ok(version) => log::debug!("Using {}", version.trim()),
        Err(err) => log::warn!("Could not query tesseract version: {err}"),
    }

    let extractor = DiagnosisExtractor::builder()
        .config(config)
        .build()
        .context("Failed to build extractor")?;

    let start = Instant::now();
    let report = BatchDriver::new(extractor)
        .process(&cli.input, &cli.output)
        .with_context(|| format!("Batch over {:?} failed", cli.input))?;
    log::info!(
        "Processed {} images, wrote {} files, skipped {}, dropped {} empty regions in {:?}",
        report.processed.len(),
        report.written.len(),
        report.skipped.len(),
        report.dropped_rois,
        start.elapsed()
    );
    for skipped in &report.skipped {
        log::warn!("Skipped {:?}: {}", skipped.path, skipped.reason);
    }
    Ok(())
}
