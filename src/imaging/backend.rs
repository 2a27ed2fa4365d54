//! Raster backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the estimation
//! engine needs: identify, decode and encode. Everything above this trait
//! works on bytes and [`PixelBuffer`]s and never touches a codec directly.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the recording
//! [`MockBackend`](tests::MockBackend), which can also hold encodes in flight
//! to exercise the engine's coalescing.

use super::params::{OutputFormat, Quality};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Cannot encode {format}: {reason}")]
    Encode { format: OutputFormat, reason: String },
}

/// Natural size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Decoded pixels at the image's natural size.
#[derive(Debug, Clone)]
pub struct PixelBuffer(DynamicImage);

impl PixelBuffer {
    pub fn new(image: DynamicImage) -> Self {
        Self(image)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.0
    }
}

/// Trait for raster backends.
///
/// Implementations must be callable from a worker thread. `encode` receives
/// `quality` only for formats that honour it; a backend handed `Some` for a
/// lossless format must ignore it rather than fail.
pub trait ImageBackend: Send + Sync {
    /// Read the natural dimensions from the image header.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode an encoded blob. `mime_type` is a hint; backends may sniff.
    fn decode(&self, bytes: &[u8], mime_type: &str) -> Result<PixelBuffer, BackendError>;

    /// Encode `pixels` scaled to `width` x `height` into `format`.
    fn encode(
        &self,
        pixels: &PixelBuffer,
        width: u32,
        height: u32,
        format: OutputFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{Receiver, Sender, channel};

    /// Mock backend that records operations and fabricates encoded bytes.
    ///
    /// Encoded length is a pure function of the request (see
    /// [`MockBackend::encoded_len`]) so tests can assert exact sizes.
    pub struct MockBackend {
        pub dimensions: Dimensions,
        pub operations: Mutex<Vec<RecordedOp>>,
        pub fail_decode: AtomicBool,
        pub fail_format: Mutex<Option<OutputFormat>>,
        pub empty_format: Mutex<Option<OutputFormat>>,
        gate: Option<Mutex<Receiver<()>>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify,
        Decode {
            mime_type: String,
        },
        Encode {
            format: OutputFormat,
            width: u32,
            height: u32,
            quality: Option<u32>,
        },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::with_dimensions(Dimensions {
                width: 64,
                height: 48,
            })
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dimensions: Dimensions) -> Self {
            Self {
                dimensions,
                operations: Mutex::new(Vec::new()),
                fail_decode: AtomicBool::new(false),
                fail_format: Mutex::new(None),
                empty_format: Mutex::new(None),
                gate: None,
            }
        }

        /// A backend whose encodes each block until the returned sender
        /// delivers one permit. Dropping the sender releases all waiters.
        pub fn gated() -> (Self, Sender<()>) {
            let (tx, rx) = channel();
            let backend = Self {
                gate: Some(Mutex::new(rx)),
                ..Self::default()
            };
            (backend, tx)
        }

        pub fn encoded_len(
            format: OutputFormat,
            width: u32,
            height: u32,
            quality: Option<Quality>,
        ) -> usize {
            let pixels = (width * height) as usize;
            let q = quality.map(|q| q.value() as usize).unwrap_or(100);
            match format {
                OutputFormat::Jpeg => pixels * q / 100 + 100,
                OutputFormat::Webp => pixels * q / 200 + 40,
                OutputFormat::Png => pixels * 2,
                OutputFormat::Bmp => pixels * 4 + 54,
                OutputFormat::Gif => pixels + 800,
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encodes(&self) -> Vec<RecordedOp> {
            self.get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::Encode { .. }))
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, _bytes: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Identify);
            if self.fail_decode.load(Ordering::SeqCst) {
                return Err(BackendError::Decode("mock identify failure".to_string()));
            }
            Ok(self.dimensions)
        }

        fn decode(&self, _bytes: &[u8], mime_type: &str) -> Result<PixelBuffer, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Decode {
                mime_type: mime_type.to_string(),
            });
            if self.fail_decode.load(Ordering::SeqCst) {
                return Err(BackendError::Decode("mock decode failure".to_string()));
            }
            Ok(PixelBuffer::new(DynamicImage::new_rgba8(
                self.dimensions.width,
                self.dimensions.height,
            )))
        }

        fn encode(
            &self,
            _pixels: &PixelBuffer,
            width: u32,
            height: u32,
            format: OutputFormat,
            quality: Option<Quality>,
        ) -> Result<Vec<u8>, BackendError> {
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv();
            }
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format,
                width,
                height,
                quality: quality.map(Quality::value),
            });
            if *self.fail_format.lock().unwrap() == Some(format) {
                return Err(BackendError::Encode {
                    format,
                    reason: "mock encoder unavailable".to_string(),
                });
            }
            if *self.empty_format.lock().unwrap() == Some(format) {
                return Ok(Vec::new());
            }
            Ok(vec![0u8; Self::encoded_len(format, width, height, quality)])
        }
    }

    #[test]
    fn mock_records_identify_and_decode() {
        let backend = MockBackend::new();

        let dims = backend.identify(b"whatever").unwrap();
        assert_eq!(dims.width, 64);
        assert_eq!(dims.height, 48);

        let pixels = backend.decode(b"whatever", "image/png").unwrap();
        assert_eq!(pixels.dimensions(), dims);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[1], RecordedOp::Decode { mime_type } if mime_type == "image/png"));
    }

    #[test]
    fn mock_encode_length_follows_request() {
        let backend = MockBackend::new();
        let pixels = backend.decode(b"", "image/png").unwrap();

        let bytes = backend
            .encode(&pixels, 10, 10, OutputFormat::Jpeg, Some(Quality::new(50)))
            .unwrap();
        assert_eq!(bytes.len(), 150);

        assert_eq!(
            backend.encodes(),
            vec![RecordedOp::Encode {
                format: OutputFormat::Jpeg,
                width: 10,
                height: 10,
                quality: Some(50),
            }]
        );
    }

    #[test]
    fn mock_injects_failures() {
        let backend = MockBackend::new();
        let pixels = backend.decode(b"", "image/png").unwrap();

        *backend.fail_format.lock().unwrap() = Some(OutputFormat::Gif);
        assert!(matches!(
            backend.encode(&pixels, 4, 4, OutputFormat::Gif, None),
            Err(BackendError::Encode {
                format: OutputFormat::Gif,
                ..
            })
        ));

        backend.fail_decode.store(true, Ordering::SeqCst);
        assert!(backend.decode(b"", "image/png").is_err());
    }
}
