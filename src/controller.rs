//! Conversion controller: owns the accepted source, the parameter snapshot,
//! the estimation engine and the last converted artifact.
//!
//! The controller is what a front end drives:
//!
//! ```text
//! accept_file ──► set_params* ──► convert ──► download
//!      │               │
//!      └── estimation passes run in the background, observed via
//!          poll()/wait() and the optional event channel
//! ```
//!
//! Intake failures never change state. Estimation failures are surfaced
//! through [`Converter::last_error`] and returned from [`Converter::convert`].

use crate::config::RecastConfig;
use crate::estimate::{EngineState, Estimate, EstimateError, EstimateEvent, Estimator};
use crate::imaging::{ConversionParams, ImageBackend, OutputFormat};
use crate::naming;
use crate::source::{self, DEFAULT_MAX_FILE_SIZE, IncomingFile, SourceImage, ValidationError};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No image selected")]
    NoImageSelected,
    #[error("Nothing has been converted yet")]
    NotConverted,
    #[error("Error loading image: {0}")]
    Decode(String),
    #[error(transparent)]
    Estimate(#[from] EstimateError),
    #[error("Failed to save {file_name}: {source}")]
    Io {
        file_name: String,
        #[source]
        source: io::Error,
    },
}

/// Intake and naming knobs, usually taken from [`RecastConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    pub max_file_size: u64,
    /// Embed the compression ratio in artifact names.
    pub embed_ratio: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            embed_ratio: true,
        }
    }
}

impl ConverterOptions {
    pub fn from_config(config: &RecastConfig) -> Self {
        Self {
            max_file_size: config.limits.max_file_size,
            embed_ratio: config.naming.embed_ratio,
        }
    }
}

/// The file produced by [`Converter::convert`], ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedArtifact {
    pub bytes: Arc<[u8]>,
    pub file_name: String,
    pub format: OutputFormat,
    pub compression_ratio: i64,
    pub encoded_size: u64,
}

/// Destination for downloaded artifacts.
pub trait FileSaver {
    fn save(&self, bytes: &[u8], file_name: &str) -> io::Result<()>;
}

/// Writes artifacts into a directory, creating it on first save.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, bytes: &[u8], file_name: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(file_name), bytes)
    }
}

/// Validate `file` and read its dimensions, without starting any encode.
pub fn open_source<B: ImageBackend + ?Sized>(
    backend: &B,
    file: IncomingFile,
    max_file_size: u64,
) -> Result<SourceImage, ConvertError> {
    source::validate(&file, max_file_size)?;
    let dimensions = backend
        .identify(&file.bytes)
        .map_err(|e| ConvertError::Decode(e.to_string()))?;
    Ok(SourceImage::from_file(file, dimensions))
}

pub struct Converter<B> {
    backend: Arc<B>,
    options: ConverterOptions,
    source: Option<Arc<SourceImage>>,
    estimator: Estimator<B>,
    artifact: Option<ConvertedArtifact>,
}

impl<B: ImageBackend + 'static> Converter<B> {
    pub fn new(backend: Arc<B>, options: ConverterOptions, params: ConversionParams) -> Self {
        let estimator = Estimator::new(Arc::clone(&backend), params);
        Self {
            backend,
            options,
            source: None,
            estimator,
            artifact: None,
        }
    }

    /// Forward engine events to `events`.
    pub fn with_events(mut self, events: Sender<EstimateEvent>) -> Self {
        self.estimator = self.estimator.with_events(events);
        self
    }

    /// Validate `file`, read its dimensions and make it the current source.
    ///
    /// On success any previous artifact and estimate are dropped and a pass
    /// starts. When resize is off the parameter dimensions follow the new
    /// image. On failure nothing changes.
    pub fn accept_file(&mut self, file: IncomingFile) -> Result<&SourceImage, ConvertError> {
        let source = Arc::new(open_source(
            &*self.backend,
            file,
            self.options.max_file_size,
        )?);
        let dimensions = source.dimensions;
        log::info!(
            "accepted {} ({}, {} bytes, {}x{})",
            source.name,
            source.mime_type,
            source.original_size,
            dimensions.width,
            dimensions.height
        );

        let mut params = *self.estimator.params();
        if !params.resize {
            params.width = dimensions.width;
            params.height = dimensions.height;
        }
        // Resize is off or unchanged here, so this never schedules a pass on
        // the outgoing source.
        self.estimator.set_params(params);
        self.estimator.load(Arc::clone(&source));
        self.artifact = None;

        Ok(&**self.source.insert(source))
    }

    /// Replace the parameter snapshot. Never fails; quality is inert for
    /// formats that ignore it.
    pub fn set_params(&mut self, next: ConversionParams) {
        self.estimator.set_params(next);
    }

    /// Produce the artifact from the settled estimate.
    ///
    /// Blocks until no pass is in flight. The artifact name always agrees
    /// with the bytes: both come from the same estimate.
    pub fn convert(&mut self) -> Result<ConvertedArtifact, ConvertError> {
        let Some(source) = &self.source else {
            return Err(ConvertError::NoImageSelected);
        };
        self.estimator.wait();

        if let Some(error) = self.estimator.last_error() {
            return Err(error.clone().into());
        }
        let estimate = self
            .estimator
            .latest()
            .ok_or(ConvertError::Estimate(EstimateError::WorkerLost))?;

        let ratio = self
            .options
            .embed_ratio
            .then_some(estimate.compression_ratio);
        let artifact = ConvertedArtifact {
            bytes: Arc::clone(&estimate.bytes),
            file_name: naming::artifact_file_name(&source.name, estimate.params.format, ratio),
            format: estimate.params.format,
            compression_ratio: estimate.compression_ratio,
            encoded_size: estimate.encoded_size,
        };
        log::info!(
            "converted {} → {} ({} bytes)",
            source.name,
            artifact.file_name,
            artifact.encoded_size
        );
        self.artifact = Some(artifact.clone());
        Ok(artifact)
    }

    /// Hand the last converted artifact to `saver`.
    pub fn download<S: FileSaver + ?Sized>(
        &self,
        saver: &S,
    ) -> Result<&ConvertedArtifact, ConvertError> {
        let artifact = self.artifact.as_ref().ok_or(ConvertError::NotConverted)?;
        saver
            .save(&artifact.bytes, &artifact.file_name)
            .map_err(|source| ConvertError::Io {
                file_name: artifact.file_name.clone(),
                source,
            })?;
        Ok(artifact)
    }

    /// Drop the source, estimate and artifact.
    pub fn clear(&mut self) {
        self.source = None;
        self.artifact = None;
        self.estimator.clear();
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_deref()
    }

    pub fn params(&self) -> &ConversionParams {
        self.estimator.params()
    }

    pub fn estimate(&self) -> Option<&Estimate> {
        self.estimator.latest()
    }

    pub fn state(&self) -> EngineState {
        self.estimator.state()
    }

    pub fn last_error(&self) -> Option<&EstimateError> {
        self.estimator.last_error()
    }

    pub fn artifact(&self) -> Option<&ConvertedArtifact> {
        self.artifact.as_ref()
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Non-blocking: consume a finished pass if there is one.
    pub fn poll(&mut self) -> bool {
        self.estimator.poll()
    }

    /// Block until the engine settles.
    pub fn wait(&mut self) {
        self.estimator.wait();
    }
}
