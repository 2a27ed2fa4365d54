//! Raster encode/decode: the `image` crate plus libwebp.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image` crate decoders, content-sniffed |
//! | **Resize** | `resize_exact` with a configurable filter |
//! | **Encode** | `image` writers (JPEG, PNG, BMP, GIF) + `webp` (lossy WebP) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for sizes, ratios and dimensions (unit testable)
//! - **Parameters**: Output format, quality and the conversion snapshot
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, PixelBuffer};
pub use calculations::{compression_ratio, format_file_size, target_dimensions};
pub use params::{ConversionParams, OutputFormat, ParseFormatError, Quality};
pub use rust_backend::RustBackend;
