//! Batch planning and parallel execution of per-file conversions.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::image_pipeline::{
    common::error::{ConversionError, ImageError, Result},
    conversions::driver::{ConversionDriver, ConversionReport},
    conversions::formats::{SourceFormat, TargetFormat},
    dm3::Dm3Decoder,
    encode::ImageEncoder,
    raw::RawImageReader,
};

/// Everything a batch needs to know, in place of global argument state.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Files named on the command line; ignored in batch mode
    pub input_paths: Vec<PathBuf>,
    /// Discover every matching file in the working directory
    pub batch_mode: bool,
    /// Where outputs go; defaults depend on the mode
    pub output_dir: Option<PathBuf>,
    pub source_format: SourceFormat,
    pub target_format: TargetFormat,
    /// Worker threads; `None` uses one per core
    pub jobs: Option<usize>,
}

impl BatchConfig {
    pub fn new(source_format: SourceFormat, target_format: TargetFormat) -> Self {
        Self {
            input_paths: Vec::new(),
            batch_mode: false,
            output_dir: None,
            source_format,
            target_format,
            jobs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Directory created under the working directory by `--all` runs.
pub fn default_output_subdir(source: SourceFormat, target: TargetFormat) -> &'static str {
    match (source, target) {
        (SourceFormat::Bin, TargetFormat::Tiff) => "Tiffs",
        (SourceFormat::Bin, TargetFormat::Png) => "PNGs",
        (SourceFormat::Dm3, TargetFormat::Tiff) => "TiffsFromDm3Files",
        (SourceFormat::Dm3, TargetFormat::Png) => "PNGsFromDm3Files",
    }
}

/// Resolves the config into concrete source/output pairs, creating the
/// output directory when one is needed.
///
/// Repeated sources are planned once. Two distinct sources that resolve to
/// the same output fail planning with `InvalidArgument`.
pub fn plan(config: &BatchConfig, working_dir: &Path) -> Result<Vec<ConversionJob>> {
    let source_ext = config.source_format.extension();
    let target_ext = config.target_format.extension();

    let output_dir = match (&config.output_dir, config.batch_mode) {
        (Some(dir), _) => Some(working_dir.join(dir)),
        (None, true) => Some(working_dir.join(default_output_subdir(
            config.source_format,
            config.target_format,
        ))),
        (None, false) => None,
    };

    let sources = if config.batch_mode {
        if !config.input_paths.is_empty() {
            warn!("Ignoring {} named files in batch mode", config.input_paths.len());
        }
        discover(working_dir, source_ext)?
    } else {
        config
            .input_paths
            .iter()
            .map(|name| working_dir.join(with_source_extension(name, source_ext)))
            .collect()
    };

    let mut seen_sources = HashSet::new();
    let mut seen_outputs = HashSet::new();
    let mut jobs = Vec::with_capacity(sources.len());
    for source in sources {
        if !seen_sources.insert(source.clone()) {
            warn!("Skipping duplicate input {}", source.display());
            continue;
        }
        let output = match &output_dir {
            Some(dir) => {
                let name = source.file_name().map(PathBuf::from).unwrap_or_default();
                dir.join(name.with_extension(target_ext))
            }
            None => source.with_extension(target_ext),
        };
        if !seen_outputs.insert(output.clone()) {
            return Err(ImageError::InvalidArgument(format!(
                "{} and another input would both be written to {}",
                source.display(),
                output.display()
            )));
        }
        jobs.push(ConversionJob { source, output });
    }

    if let Some(dir) = &output_dir {
        std::fs::create_dir_all(dir).map_err(|e| {
            ImageError::OutputWriteError(format!("{}: {}", dir.display(), e))
        })?;
    }
    Ok(jobs)
}

fn discover(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ImageError::InputReadError(format!("{}: {}", dir.display(), e)))?;

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect();
    found.sort();
    Ok(found)
}

/// Appends `.extension` unless the name already ends with it.
fn with_source_extension(name: &Path, extension: &str) -> PathBuf {
    if name.extension().is_some_and(|ext| ext == extension) {
        return name.to_path_buf();
    }
    let mut full = OsString::from(name.as_os_str());
    full.push(".");
    full.push(extension);
    PathBuf::from(full)
}

/// Per-file results of a batch, in job order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub results: Vec<std::result::Result<ConversionReport, ConversionError>>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ConversionError> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    /// 0 when every file converted, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.failed() == 0 { 0 } else { 1 }
    }
}

/// Converts every job on a rayon pool. A failing file never stops the others.
pub fn run<R, D, E>(
    driver: &ConversionDriver<R, D, E>,
    config: &BatchConfig,
    jobs: &[ConversionJob],
) -> Result<BatchSummary>
where
    R: RawImageReader + Sync,
    D: Dm3Decoder + Sync,
    E: ImageEncoder + Sync,
{
    let convert_all = || {
        jobs.par_iter()
            .map(|job| convert_one(driver, config, job))
            .collect::<Vec<_>>()
    };

    let results = match config.jobs {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| ImageError::InvalidArgument(format!("worker pool: {}", e)))?;
            pool.install(convert_all)
        }
        None => convert_all(),
    };

    let summary = BatchSummary { results };
    info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "Batch complete"
    );
    Ok(summary)
}

fn convert_one<R, D, E>(
    driver: &ConversionDriver<R, D, E>,
    config: &BatchConfig,
    job: &ConversionJob,
) -> std::result::Result<ConversionReport, ConversionError>
where
    R: RawImageReader,
    D: Dm3Decoder,
    E: ImageEncoder,
{
    info!(
        "Converting {} from {} to {}",
        job.source.display(),
        config.source_format,
        config.target_format
    );
    let result = driver.convert(
        &job.source,
        &job.output,
        config.source_format,
        config.target_format,
    );
    match &result {
        Ok(report) => info!(
            "Wrote {} ({}x{})",
            report.output.display(),
            report.width,
            report.height
        ),
        Err(e) => error!("{}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_explicit_names_get_extension_and_sibling_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BatchConfig::new(SourceFormat::Bin, TargetFormat::Tiff);
        config.input_paths = vec![PathBuf::from("scan"), PathBuf::from("other.bin")];

        let jobs = plan(&config, dir.path()).unwrap();

        assert_eq!(
            jobs,
            vec![
                ConversionJob {
                    source: dir.path().join("scan.bin"),
                    output: dir.path().join("scan.tif"),
                },
                ConversionJob {
                    source: dir.path().join("other.bin"),
                    output: dir.path().join("other.tif"),
                },
            ]
        );
    }

    #[test]
    fn test_dotted_names_keep_their_stem() {
        assert_eq!(
            with_source_extension(Path::new("run.v2"), "dm3"),
            PathBuf::from("run.v2.dm3")
        );
        assert_eq!(
            with_source_extension(Path::new("run.dm3"), "dm3"),
            PathBuf::from("run.dm3")
        );
    }

    #[test]
    fn test_batch_mode_discovers_matching_files_only() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.dm3"));
        touch(&dir.path().join("a.dm3"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("upper.DM3"));
        std::fs::create_dir(dir.path().join("folder.dm3")).unwrap();

        let mut config = BatchConfig::new(SourceFormat::Dm3, TargetFormat::Png);
        config.batch_mode = true;
        let jobs = plan(&config, dir.path()).unwrap();

        let out_dir = dir.path().join("PNGsFromDm3Files");
        assert!(out_dir.is_dir());
        assert_eq!(
            jobs,
            vec![
                ConversionJob {
                    source: dir.path().join("a.dm3"),
                    output: out_dir.join("a.png"),
                },
                ConversionJob {
                    source: dir.path().join("b.dm3"),
                    output: out_dir.join("b.png"),
                },
            ]
        );
    }

    #[test]
    fn test_existing_output_dir_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Tiffs")).unwrap();
        touch(&dir.path().join("x.bin"));

        let mut config = BatchConfig::new(SourceFormat::Bin, TargetFormat::Tiff);
        config.batch_mode = true;
        let jobs = plan(&config, dir.path()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].output, dir.path().join("Tiffs").join("x.tif"));
    }

    #[test]
    fn test_explicit_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BatchConfig::new(SourceFormat::Bin, TargetFormat::Png);
        config.input_paths = vec![PathBuf::from("sub/img.bin")];
        config.output_dir = Some(PathBuf::from("out/pngs"));

        let jobs = plan(&config, dir.path()).unwrap();
        assert!(dir.path().join("out/pngs").is_dir());
        assert_eq!(jobs[0].source, dir.path().join("sub/img.bin"));
        assert_eq!(jobs[0].output, dir.path().join("out/pngs/img.png"));
    }

    #[test]
    fn test_same_stem_into_one_output_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BatchConfig::new(SourceFormat::Bin, TargetFormat::Tiff);
        config.input_paths = vec![PathBuf::from("a/x.bin"), PathBuf::from("b/x")];
        config.output_dir = Some(PathBuf::from("out"));

        let err = plan(&config, dir.path()).unwrap_err();
        assert!(matches!(err, ImageError::InvalidArgument(_)));
        assert!(err.to_string().contains("x.tif"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_same_stem_in_separate_dirs_is_fine_without_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BatchConfig::new(SourceFormat::Bin, TargetFormat::Tiff);
        config.input_paths = vec![PathBuf::from("a/x.bin"), PathBuf::from("b/x")];

        let jobs = plan(&config, dir.path()).unwrap();
        assert_eq!(jobs[0].output, dir.path().join("a/x.tif"));
        assert_eq!(jobs[1].output, dir.path().join("b/x.tif"));
    }

    #[test]
    fn test_repeated_input_is_planned_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BatchConfig::new(SourceFormat::Dm3, TargetFormat::Png);
        config.input_paths = vec![
            PathBuf::from("scan"),
            PathBuf::from("scan.dm3"),
            PathBuf::from("other"),
        ];

        let jobs = plan(&config, dir.path()).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].source, dir.path().join("scan.dm3"));
        assert_eq!(jobs[1].source, dir.path().join("other.dm3"));
    }

    #[test]
    fn test_summary_exit_code() {
        let empty = BatchSummary::default();
        assert_eq!(empty.exit_code(), 0);

        let failed = BatchSummary {
            results: vec![Err(ConversionError::new(
                crate::image_pipeline::common::error::Phase::Decoding,
                "a.bin",
                ImageError::DecodeError("truncated header".to_string()),
            ))],
        };
        assert_eq!(failed.failed(), 1);
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(failed.errors().count(), 1);
    }
}
