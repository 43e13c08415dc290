use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use micrograph_convert_rs::image_pipeline::conversions::batch;
use micrograph_convert_rs::image_pipeline::{
    BatchConfig, ConversionConfig, ConversionDriver, SourceFormat, TargetFormat,
};
use micrograph_convert_rs::logger;

use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Bin,
    Dm3,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetArg {
    Tiff,
    Png,
}

#[derive(Parser)]
#[command(name = "convert")]
#[command(about = "Convert raw .bin and DM3 micrographs to TIFF or PNG")]
struct Cli {
    /// Convert every matching file in the current directory
    #[arg(short, long)]
    all: bool,

    /// Source format
    #[arg(short, long, value_enum, default_value = "bin")]
    from: SourceArg,

    /// Target format (16-bit TIFF or 8-bit PNG)
    #[arg(short, long, value_enum, default_value = "tiff")]
    to: TargetArg,

    /// Directory for converted files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Worker threads (defaults to one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Files to convert; the extension may be omitted
    #[arg(required_unless_present = "all")]
    files: Vec<PathBuf>,
}

impl Cli {
    fn batch_config(&self) -> BatchConfig {
        let source = match self.from {
            SourceArg::Bin => SourceFormat::Bin,
            SourceArg::Dm3 => SourceFormat::Dm3,
        };
        let target = match self.to {
            TargetArg::Tiff => TargetFormat::Tiff,
            TargetArg::Png => TargetFormat::Png,
        };
        let mut config = BatchConfig::new(source, target);
        config.input_paths = self.files.clone();
        config.batch_mode = self.all;
        config.output_dir = self.output_dir.clone();
        config.jobs = self.jobs;
        config
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let config = cli.batch_config();
    let working_dir = std::env::current_dir().context("reading current directory")?;

    let jobs = batch::plan(&config, &working_dir).context("planning conversions")?;
    if jobs.is_empty() {
        info!("No {} files to convert", config.source_format);
        return Ok(0);
    }

    let driver = ConversionDriver::new(ConversionConfig::default());
    let summary = batch::run(&driver, &config, &jobs).context("running conversions")?;

    if summary.failed() > 0 {
        error!(
            "{} of {} files failed to convert",
            summary.failed(),
            summary.results.len()
        );
    }
    Ok(summary.exit_code())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(if cli.verbose { "debug" } else { "info" });

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
