//! Pure Rust image backend, plus libwebp for lossy WebP.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, WebP, BMP, GIF) | `image` crate, content-sniffed, MIME type as fallback |
//! | Resize | `image::DynamicImage::resize_exact` with the configured filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → WebP | `webp::Encoder` (lossy, quality 0–100) |
//! | Encode → PNG / BMP / GIF | `image::DynamicImage::write_to` |

use super::backend::{BackendError, Dimensions, ImageBackend, PixelBuffer};
use super::params::{OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::borrow::Cow;
use std::io::Cursor;

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    filter: FilterType,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader<'a>(
    bytes: &'a [u8],
    mime_type: Option<&str>,
) -> Result<ImageReader<Cursor<&'a [u8]>>, BackendError> {
    let mut reader = ImageReader::new(Cursor::new(bytes));
    if let Some(format) = mime_type.and_then(|mime| ImageFormat::from_mime_type(mime)) {
        reader.set_format(format);
    }
    // Sniffing overrides the hint; the hint only survives unrecognised headers.
    reader
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("Failed to read image header: {e}")))
}

fn encode_jpeg(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.value() as u8)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode {
            format: OutputFormat::Jpeg,
            reason: e.to_string(),
        })?;
    Ok(out)
}

fn encode_webp(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgba = image.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let encoded = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| BackendError::Encode {
            format: OutputFormat::Webp,
            reason: format!("{e:?}"),
        })?;
    Ok(encoded.to_vec())
}

/// Encode through the `image` crate's built-in writers (no quality knob).
fn encode_lossless(
    image: &DynamicImage,
    format: OutputFormat,
    target: ImageFormat,
) -> Result<Vec<u8>, BackendError> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, target)
        .map_err(|e| BackendError::Encode {
            format,
            reason: e.to_string(),
        })?;
    Ok(cursor.into_inner())
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(bytes, None)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, bytes: &[u8], mime_type: &str) -> Result<PixelBuffer, BackendError> {
        let image = reader(bytes, Some(mime_type))?
            .decode()
            .map_err(|e| BackendError::Decode(format!("Failed to decode {mime_type}: {e}")))?;
        Ok(PixelBuffer::new(image))
    }

    fn encode(
        &self,
        pixels: &PixelBuffer,
        width: u32,
        height: u32,
        format: OutputFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, BackendError> {
        let source = pixels.image();
        let scaled = if (width, height) == (source.width(), source.height()) {
            Cow::Borrowed(source)
        } else {
            Cow::Owned(source.resize_exact(width, height, self.filter))
        };

        match format {
            OutputFormat::Jpeg => encode_jpeg(&scaled, quality.unwrap_or_default()),
            OutputFormat::Webp => encode_webp(&scaled, quality.unwrap_or_default()),
            OutputFormat::Png => encode_lossless(&scaled, format, ImageFormat::Png),
            // BMP and GIF writers only take 8-bit RGB(A).
            OutputFormat::Bmp => encode_lossless(
                &DynamicImage::ImageRgba8(scaled.to_rgba8()),
                format,
                ImageFormat::Bmp,
            ),
            OutputFormat::Gif => encode_lossless(
                &DynamicImage::ImageRgba8(scaled.to_rgba8()),
                format,
                ImageFormat::Gif,
            ),
        }
    }
}
