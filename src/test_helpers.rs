//! Shared test utilities: synthetic images and ready-made sources.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let png = sample_png(128, 96);           // real, decodable PNG bytes
//! let source = mock_source(10_000);        // 64x48 source for MockBackend
//! ```

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

use crate::imaging::Dimensions;
use crate::source::{IncomingFile, SourceImage};

/// An RGB image with enough texture that lossy quality visibly changes
/// the encoded size.
fn textured(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = ((x * 7 + y * 13) % 256) as u8;
        Rgb([r, g, b])
    });
    DynamicImage::ImageRgb8(img)
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, format).unwrap();
    cursor.into_inner()
}

/// PNG bytes of a `width` x `height` textured image.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    encode(&textured(width, height), ImageFormat::Png)
}

/// JPEG bytes of a `width` x `height` textured image.
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(&textured(width, height), ImageFormat::Jpeg)
}

/// A `photo.png` source of `size` filler bytes, 64x48 to match
/// [`MockBackend`](crate::imaging::backend::tests::MockBackend)'s default.
pub fn mock_source(size: usize) -> Arc<SourceImage> {
    let file = IncomingFile::new("photo.png", "image/png", vec![0u8; size]);
    Arc::new(SourceImage::from_file(
        file,
        Dimensions {
            width: 64,
            height: 48,
        },
    ))
}
