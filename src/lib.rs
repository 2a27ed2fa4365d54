//! # recast
//!
//! Re-encode a single raster image into JPEG, PNG, WebP, BMP or GIF, with a
//! live estimate of the resulting size and the compression ratio against the
//! original.
//!
//! # Architecture: Controller Over an Estimation Engine
//!
//! ```text
//! IncomingFile ──validate──► SourceImage ──► Estimator ──► Estimate ──► ConvertedArtifact
//!                                              ▲   │
//!                          ConversionParams ───┘   └── EstimateEvent (observers)
//! ```
//!
//! The [`controller::Converter`] accepts a file, keeps the current
//! [`imaging::ConversionParams`], and owns the [`estimate::Estimator`]. Every
//! change that could alter the encoder output re-runs the real encoder on a
//! worker thread, so the published size is exact rather than predicted.
//! `convert()` packages the latest estimate; the bytes the user saves are the
//! bytes that were measured.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | Intake: MIME sniffing, the `image/*` check and the size ceiling |
//! | [`imaging`] | Formats, quality, the backend trait and the `image`/libwebp backend |
//! | [`estimate`] | The `Idle/Ready/Computing/Stale` engine with coalesced recompute |
//! | [`controller`] | Accept, set parameters, convert, download |
//! | [`naming`] | Artifact file names (`photo-42pct-reduced.webp`) |
//! | [`config`] | `recast.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Measure, Don't Predict
//!
//! Size estimates come from actually encoding the image. Encoders differ too
//! much across content for a model to be trusted, and an encode of a single
//! image is cheap enough to redo on every change.
//!
//! ## Coalesce, Don't Cancel
//!
//! Codecs cannot be interrupted midway. A change that arrives while a pass
//! runs marks the engine stale; when the pass finishes its result is dropped
//! and one follow-up pass runs with the newest parameters, however many
//! changes arrived in between.
//!
//! ## Pure-Rust Codecs, libwebp for Lossy WebP
//!
//! JPEG, PNG, BMP and GIF go through the `image` crate. The `image` crate
//! only writes lossless WebP, so lossy WebP with a quality knob goes through
//! the `webp` crate.

pub mod config;
pub mod controller;
pub mod estimate;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod source;

#[cfg(test)]
pub(crate) mod test_helpers;
