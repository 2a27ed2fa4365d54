//! Source intake: the file the user picked and the checks it must pass.
//!
//! A file arrives as an [`IncomingFile`] (name, MIME type, bytes). Front ends
//! that read from disk get the MIME type by sniffing magic bytes with `infer`,
//! falling back to the extension. [`validate`] then applies the only checks the
//! converter makes before decoding:
//!
//! 1. the MIME type is `image/*`
//! 2. the file is not empty
//! 3. the file is no larger than the configured ceiling (10 MiB by default)
//!
//! A file that passes becomes a [`SourceImage`] once the backend has read its
//! dimensions (see [`Converter::accept_file`](crate::controller::Converter::accept_file)).

use crate::imaging::{Dimensions, format_file_size};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Bytes read from an oversized file to tell an image from anything else.
const SNIFF_LEN: u64 = 8 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select an image file (got {mime_type})")]
    NotAnImage { mime_type: String },
    #[error("File size exceeds {} limit ({})", format_file_size(*.limit), format_file_size(*.size))]
    TooLarge { size: u64, limit: u64 },
    #[error("File is empty")]
    Empty,
}

/// Failure reading a file from disk.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A file handed to the converter, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk and sniff its MIME type.
    ///
    /// A file over `max_file_size` is never loaded: only its head is read,
    /// to report `NotAnImage` ahead of `TooLarge` the way [`validate`] does.
    pub fn read(path: &Path, max_file_size: u64) -> Result<Self, ReadError> {
        let io_error = |source: io::Error| ReadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut file = File::open(path).map_err(io_error)?;
        let size = file.metadata().map_err(io_error)?.len();
        if size > max_file_size {
            let mut head = Vec::new();
            file.by_ref()
                .take(SNIFF_LEN)
                .read_to_end(&mut head)
                .map_err(io_error)?;
            let mime_type = sniff_mime_type(&head, &name);
            if !is_image_mime(&mime_type) {
                return Err(ValidationError::NotAnImage { mime_type }.into());
            }
            return Err(ValidationError::TooLarge {
                size,
                limit: max_file_size,
            }
            .into());
        }

        // A file that grows while being read stops one byte past the
        // ceiling, which `validate` then rejects.
        let mut bytes = Vec::new();
        file.take(max_file_size.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(io_error)?;
        let mime_type = sniff_mime_type(&bytes, &name);
        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// MIME type from magic bytes, then from the extension, then
/// `application/octet-stream`.
pub fn sniff_mime_type(bytes: &[u8], file_name: &str) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    mime_from_extension(file_name)
        .unwrap_or(FALLBACK_MIME_TYPE)
        .to_string()
}

fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mime)
}

/// Whether a MIME type names an image (`image/*`).
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Check an incoming file against the intake rules.
pub fn validate(file: &IncomingFile, max_file_size: u64) -> Result<(), ValidationError> {
    if !is_image_mime(&file.mime_type) {
        return Err(ValidationError::NotAnImage {
            mime_type: file.mime_type.clone(),
        });
    }
    if file.bytes.is_empty() {
        return Err(ValidationError::Empty);
    }
    if file.size() > max_file_size {
        return Err(ValidationError::TooLarge {
            size: file.size(),
            limit: max_file_size,
        });
    }
    Ok(())
}

/// The accepted image. Immutable once created; replaced wholesale when a
/// new file is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// Size at accept time. Every compression ratio is measured against this.
    pub original_size: u64,
    pub dimensions: Dimensions,
}

impl SourceImage {
    pub(crate) fn from_file(file: IncomingFile, dimensions: Dimensions) -> Self {
        let original_size = file.size();
        Self {
            name: file.name,
            mime_type: file.mime_type,
            bytes: file.bytes,
            original_size,
            dimensions,
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }
}
