//! Estimation engine: keeps a live encode of the source at the current
//! parameters, and the exact size that encode came out at.
//!
//! # States
//!
//! ```text
//!            load                  pass done
//!   Idle ───────────► Computing ─────────────► Ready
//!                      │    ▲                    │
//!             mutation │    │ pass done          │ mutation
//!                      ▼    │ (result dropped,   │
//!                     Stale ┘  follow-up starts) ▼
//!                                            Computing
//! ```
//!
//! Every relevant mutation (a new source, or parameters that change what the
//! encoder would produce) requests a pass. At most one pass is in flight. A
//! mutation arriving while a pass runs marks the engine `Stale`; any further
//! mutations while `Stale` are absorbed. When the in-flight pass resolves its
//! result is dropped, since it describes a superseded snapshot, and exactly
//! one follow-up pass starts from the latest snapshot.
//!
//! # Threading
//!
//! Each pass runs on its own worker thread and reports on a per-pass
//! channel. The engine itself is single-owner: completions are consumed in
//! [`Estimator::poll`] or [`Estimator::wait`], never by the worker. The source
//! is shared with the worker through an `Arc`; parameters are copied into
//! the pass, so later writes never tear a running pass.

use crate::imaging::{
    BackendError, ConversionParams, ImageBackend, OutputFormat, PixelBuffer, compression_ratio,
    target_dimensions,
};
use crate::source::SourceImage;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No source image.
    Idle,
    /// Source present, nothing in flight.
    Ready,
    /// A pass is in flight and matches the latest snapshot.
    Computing,
    /// A pass is in flight but the snapshot has moved on.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeFailure {
    /// The backend cannot produce the format.
    Unsupported(String),
    /// The backend returned no bytes.
    EmptyResult,
}

impl fmt::Display for EncodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeFailure::Unsupported(reason) => f.write_str(reason),
            EncodeFailure::EmptyResult => f.write_str("encoder produced no data"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstimateError {
    #[error("Error loading image: {0}")]
    Decode(String),
    #[error("Failed to convert to {}: {reason}", .format.extension().to_uppercase())]
    EncodeFailed {
        format: OutputFormat,
        reason: EncodeFailure,
    },
    #[error("Estimation worker exited without reporting a result")]
    WorkerLost,
}

impl From<BackendError> for EstimateError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::Decode(message) => EstimateError::Decode(message),
            BackendError::Encode { format, reason } => EstimateError::EncodeFailed {
                format,
                reason: EncodeFailure::Unsupported(reason),
            },
        }
    }
}

/// Outcome of one recompute pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Estimate {
    pub bytes: Arc<[u8]>,
    /// Exact length of `bytes`.
    pub encoded_size: u64,
    pub original_size: u64,
    pub compression_ratio: i64,
    /// The snapshot these bytes were encoded from.
    pub params: ConversionParams,
    pub width: u32,
    pub height: u32,
}

/// Progress notifications for observers (the CLI prints these).
#[derive(Debug, Clone, PartialEq)]
pub enum EstimateEvent {
    PassStarted {
        pass: u64,
        params: ConversionParams,
    },
    Superseded {
        pass: u64,
    },
    Published {
        pass: u64,
        format: OutputFormat,
        encoded_size: u64,
        original_size: u64,
        compression_ratio: i64,
    },
    Failed {
        pass: u64,
        error: EstimateError,
    },
}

/// Decode the source and measure one encode at `params`.
pub fn run_pass<B: ImageBackend + ?Sized>(
    backend: &B,
    source: &SourceImage,
    params: &ConversionParams,
) -> Result<Estimate, EstimateError> {
    let pixels = backend.decode(&source.bytes, &source.mime_type)?;
    measure(backend, &pixels, source.original_size, params)
}

/// Encode already-decoded pixels at `params` and measure the result.
pub fn measure<B: ImageBackend + ?Sized>(
    backend: &B,
    pixels: &PixelBuffer,
    original_size: u64,
    params: &ConversionParams,
) -> Result<Estimate, EstimateError> {
    let (width, height) = target_dimensions(pixels.dimensions(), params);
    let bytes = backend.encode(
        pixels,
        width,
        height,
        params.format,
        params.effective_quality(),
    )?;
    if bytes.is_empty() {
        return Err(EstimateError::EncodeFailed {
            format: params.format,
            reason: EncodeFailure::EmptyResult,
        });
    }

    let encoded_size = bytes.len() as u64;
    Ok(Estimate {
        bytes: bytes.into(),
        encoded_size,
        original_size,
        compression_ratio: compression_ratio(original_size, encoded_size),
        params: *params,
        width,
        height,
    })
}

/// Estimate every output format for `source` in parallel, decoding once.
///
/// `base` supplies quality and resize; its format is ignored. Successful
/// estimates come first, smallest first, then failures in format order.
/// Runs on the global rayon pool and bypasses the [`Estimator`] state
/// machine entirely.
pub fn compare_formats<B: ImageBackend + ?Sized>(
    backend: &B,
    source: &SourceImage,
    base: &ConversionParams,
) -> Result<Vec<(OutputFormat, Result<Estimate, EstimateError>)>, EstimateError> {
    let pixels = backend.decode(&source.bytes, &source.mime_type)?;
    let mut results: Vec<_> = OutputFormat::ALL[..]
        .par_iter()
        .map(|&format| {
            let params = ConversionParams { format, ..*base };
            (format, measure(backend, &pixels, source.original_size, &params))
        })
        .collect();
    results.sort_by_key(|(_, result)| match result {
        Ok(estimate) => (0, estimate.encoded_size),
        Err(_) => (1, 0),
    });
    Ok(results)
}

struct InFlight {
    pass: u64,
    generation: u64,
    results: Receiver<Result<Estimate, EstimateError>>,
}

pub struct Estimator<B> {
    backend: Arc<B>,
    source: Option<Arc<SourceImage>>,
    /// Bumped whenever the source is replaced or cleared.
    generation: u64,
    params: ConversionParams,
    state: EngineState,
    in_flight: Option<InFlight>,
    latest: Option<Estimate>,
    last_error: Option<EstimateError>,
    passes_started: u64,
    events: Option<Sender<EstimateEvent>>,
}

impl<B: ImageBackend + 'static> Estimator<B> {
    pub fn new(backend: Arc<B>, params: ConversionParams) -> Self {
        Self {
            backend,
            source: None,
            generation: 0,
            params,
            state: EngineState::Idle,
            in_flight: None,
            latest: None,
            last_error: None,
            passes_started: 0,
            events: None,
        }
    }

    /// Send [`EstimateEvent`]s to `events` from now on.
    pub fn with_events(mut self, events: Sender<EstimateEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn params(&self) -> &ConversionParams {
        &self.params
    }

    /// Most recent published estimate. `None` while the first pass for a
    /// source runs, and after a failed pass.
    pub fn latest(&self) -> Option<&Estimate> {
        self.latest.as_ref()
    }

    pub fn last_error(&self) -> Option<&EstimateError> {
        self.last_error.as_ref()
    }

    pub fn passes_started(&self) -> u64 {
        self.passes_started
    }

    /// Replace the source and request a pass. The cached estimate is dropped.
    pub fn load(&mut self, source: Arc<SourceImage>) {
        log::debug!(
            "estimator: loading {} ({} bytes)",
            source.name,
            source.original_size
        );
        self.source = Some(source);
        self.generation += 1;
        self.latest = None;
        self.last_error = None;
        self.request();
    }

    /// Drop the source. A pass already in flight runs to completion and its
    /// result is discarded.
    pub fn clear(&mut self) {
        self.source = None;
        self.generation += 1;
        self.latest = None;
        self.last_error = None;
        self.state = if self.in_flight.is_some() {
            EngineState::Computing
        } else {
            EngineState::Idle
        };
    }

    /// Replace the parameter snapshot, requesting a pass only if the encoder
    /// output could change.
    pub fn set_params(&mut self, next: ConversionParams) {
        let same_output = self.params.encodes_same_as(&next);
        self.params = next;
        if self.source.is_none() {
            return;
        }
        if same_output {
            log::debug!("estimator: parameter change does not affect {} output", next.format);
            return;
        }
        self.request();
    }

    fn request(&mut self) {
        match self.state {
            EngineState::Idle | EngineState::Ready => self.start_pass(),
            EngineState::Computing => {
                self.state = EngineState::Stale;
                if let Some(in_flight) = &self.in_flight {
                    log::debug!("estimator: pass {} superseded", in_flight.pass);
                    self.emit(EstimateEvent::Superseded {
                        pass: in_flight.pass,
                    });
                }
            }
            EngineState::Stale => log::debug!("estimator: follow-up already queued"),
        }
    }

    fn start_pass(&mut self) {
        let Some(source) = self.source.clone() else {
            self.state = EngineState::Idle;
            return;
        };

        self.passes_started += 1;
        let pass = self.passes_started;
        let params = self.params;
        let backend = Arc::clone(&self.backend);
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("estimate-{pass}"))
            .spawn(move || {
                // The receiver is gone if the engine was dropped mid-pass.
                let _ = tx.send(run_pass(backend.as_ref(), &source, &params));
            });
        if let Err(e) = spawned {
            log::warn!("estimator: could not start pass {pass}: {e}");
            self.fail(pass, EstimateError::WorkerLost);
            return;
        }

        log::debug!("estimator: pass {pass} started for {params:?}");
        self.emit(EstimateEvent::PassStarted { pass, params });
        self.in_flight = Some(InFlight {
            pass,
            generation: self.generation,
            results: rx,
        });
        self.state = EngineState::Computing;
    }

    /// Consume a finished pass if there is one. Returns `true` when a pass
    /// completed (successfully or not).
    pub fn poll(&mut self) -> bool {
        let Some(in_flight) = &self.in_flight else {
            return false;
        };
        let result = match in_flight.results.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(EstimateError::WorkerLost),
        };
        self.complete(result);
        true
    }

    /// Block until no pass is in flight, follow-ups included.
    pub fn wait(&mut self) {
        while let Some(in_flight) = &self.in_flight {
            let result = in_flight
                .results
                .recv()
                .unwrap_or(Err(EstimateError::WorkerLost));
            self.complete(result);
        }
    }

    fn complete(&mut self, result: Result<Estimate, EstimateError>) {
        let Some(finished) = self.in_flight.take() else {
            return;
        };

        if self.state == EngineState::Stale {
            log::debug!(
                "estimator: dropping result of pass {}, starting follow-up",
                finished.pass
            );
            self.state = EngineState::Ready;
            self.start_pass();
            return;
        }

        if self.source.is_none() || finished.generation != self.generation {
            log::debug!("estimator: dropping result of pass {} for a cleared source", finished.pass);
            self.state = if self.source.is_some() {
                EngineState::Ready
            } else {
                EngineState::Idle
            };
            return;
        }

        match result {
            Ok(estimate) => {
                log::info!(
                    "estimator: pass {} → {} {} bytes ({}%)",
                    finished.pass,
                    estimate.params.format,
                    estimate.encoded_size,
                    estimate.compression_ratio
                );
                self.emit(EstimateEvent::Published {
                    pass: finished.pass,
                    format: estimate.params.format,
                    encoded_size: estimate.encoded_size,
                    original_size: estimate.original_size,
                    compression_ratio: estimate.compression_ratio,
                });
                self.latest = Some(estimate);
                self.last_error = None;
                self.state = EngineState::Ready;
            }
            Err(error) => {
                log::warn!("estimator: pass {} failed: {error}", finished.pass);
                self.fail(finished.pass, error);
            }
        }
    }

    fn fail(&mut self, pass: u64, error: EstimateError) {
        self.emit(EstimateEvent::Failed {
            pass,
            error: error.clone(),
        });
        self.latest = None;
        self.last_error = Some(error);
        self.state = EngineState::Ready;
    }

    fn emit(&self, event: EstimateEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
