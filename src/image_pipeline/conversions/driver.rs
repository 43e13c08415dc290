use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::image_pipeline::{
    common::error::{ConversionError, ImageError, Phase, Result},
    common::grid::{ImageGrid, SampleType, ValueRange},
    conversions::config::ConversionConfig,
    conversions::formats::{SourceFormat, TargetFormat},
    conversions::timing::{PipelineTimings, Timer},
    dm3::{Dm3Decoder, Dm3FileDecoder},
    encode::{ImageEncoder, StandardImageEncoder},
    raw::{HeaderedRawReader, RawImageReader},
    rescale::{IntensityRescaler, RangePolicy},
};

/// Progress of one file through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Decoding,
    Rescaling,
    Encoding,
    Done,
    Failed(Phase),
}

impl ConversionState {
    pub fn phase(self) -> Option<Phase> {
        match self {
            ConversionState::Decoding => Some(Phase::Decoding),
            ConversionState::Rescaling => Some(Phase::Rescaling),
            ConversionState::Encoding => Some(Phase::Encoding),
            ConversionState::Done | ConversionState::Failed(_) => None,
        }
    }

    pub fn advance(self) -> Self {
        match self {
            ConversionState::Decoding => ConversionState::Rescaling,
            ConversionState::Rescaling => ConversionState::Encoding,
            ConversionState::Encoding => ConversionState::Done,
            terminal => terminal,
        }
    }

    pub fn fail(self) -> Self {
        match self.phase() {
            Some(phase) => ConversionState::Failed(phase),
            None => self,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.phase().is_none()
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: usize,
    pub height: usize,
    pub sample_type: SampleType,
    pub range: ValueRange,
    pub timings: PipelineTimings,
}

pub struct ConversionDriver<R: RawImageReader, D: Dm3Decoder, E: ImageEncoder> {
    raw_reader: R,
    dm3_decoder: D,
    encoder: E,
    rescaler: IntensityRescaler,
    config: ConversionConfig,
}

impl ConversionDriver<HeaderedRawReader, Dm3FileDecoder, StandardImageEncoder> {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            raw_reader: HeaderedRawReader,
            dm3_decoder: Dm3FileDecoder,
            encoder: StandardImageEncoder,
            rescaler: IntensityRescaler,
            config,
        }
    }
}

impl<R: RawImageReader, D: Dm3Decoder, E: ImageEncoder> ConversionDriver<R, D, E> {
    pub fn with_custom(raw_reader: R, dm3_decoder: D, encoder: E, config: ConversionConfig) -> Self {
        Self {
            raw_reader,
            dm3_decoder,
            encoder,
            rescaler: IntensityRescaler,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions(width as i64, height as i64));
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                return Err(ImageError::InvalidDimensions(width as i64, height as i64));
            }
        }

        Ok(())
    }

    fn decode(
        &self,
        source: &Path,
        format: SourceFormat,
    ) -> Result<(ImageGrid, Option<ValueRange>)> {
        let (grid, cuts) = match format {
            SourceFormat::Bin => (self.raw_reader.read(source)?, None),
            SourceFormat::Dm3 => {
                let image = self.dm3_decoder.decode(source)?;
                info!(
                    data_type = ?image.data_type(),
                    sample_type = %image.grid.sample_type(),
                    tags = image.tags.len(),
                    "Decoded DM3 image"
                );
                (image.grid, image.cuts)
            }
        };
        self.validate_dimensions(grid.width(), grid.height())?;
        Ok((grid, cuts))
    }

    fn range_policy(&self, format: SourceFormat) -> RangePolicy {
        match format {
            SourceFormat::Dm3 if self.config.prefer_display_cuts => RangePolicy::PreferCuts,
            _ => RangePolicy::Computed,
        }
    }

    /// Runs one phase, recording its timing and moving `state` forward on
    /// success or to `Failed` on error.
    fn step<T>(
        &self,
        state: &mut ConversionState,
        timings: &mut PipelineTimings,
        source: &Path,
        run: impl FnOnce() -> Result<T>,
    ) -> std::result::Result<T, ConversionError> {
        let phase = state.phase().unwrap_or(Phase::Decoding);
        let _span = tracing::info_span!("phase", %phase).entered();
        let timer = Timer::start(phase);
        let outcome = run();
        let (phase, elapsed) = timer.stop();
        timings.add_step(phase, elapsed);

        match outcome {
            Ok(value) => {
                let next = state.advance();
                debug!("{:?} -> {:?}", state, next);
                *state = next;
                Ok(value)
            }
            Err(cause) => {
                *state = state.fail();
                debug!("{:?}: {}", state, cause);
                Err(ConversionError::new(phase, source, cause))
            }
        }
    }

    #[instrument(skip(self, source, output), fields(source = %source.as_ref().display()))]
    pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        output: Q,
        source_format: SourceFormat,
        target_format: TargetFormat,
    ) -> std::result::Result<ConversionReport, ConversionError> {
        let source = source.as_ref();
        let output = output.as_ref();

        info!(
            input = %source.display(),
            output = %output.display(),
            "Converting file"
        );

        let mut state = ConversionState::Decoding;
        let mut timings = PipelineTimings::new();

        let (grid, cuts) = self.step(&mut state, &mut timings, source, || {
            self.decode(source, source_format)
        })?;

        let width = grid.width();
        let height = grid.height();
        let sample_type = grid.sample_type();
        let range = self.range_policy(source_format).resolve(&grid, cuts);
        let depth = target_format.bit_depth();

        let rescaled = self.step(&mut state, &mut timings, source, || {
            self.rescaler.rescale(grid, range, depth)
        })?;

        self.step(&mut state, &mut timings, source, || {
            self.encoder.write(
                output,
                &rescaled,
                target_format.pixel_mode(),
                target_format.container(),
            )
        })?;

        debug_assert_eq!(state, ConversionState::Done);
        timings.log_summary();
        info!(width, height, %range, "Conversion complete");

        Ok(ConversionReport {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            width,
            height,
            sample_type,
            range,
            timings,
        })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ConversionConfig) {
        self.config = config;
    }
}
