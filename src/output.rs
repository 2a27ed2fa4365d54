//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! photo.png
//!     Type: image/png
//!     Size: 1.46 MB
//!     Dimensions: 1920x1080
//! ```
//!
//! ## Convert
//!
//! Estimate events as they arrive, then the saved artifact:
//!
//! ```text
//! [1] Estimating WEBP q80 at 1920x1080
//! [1] superseded
//! [2] Estimating WEBP q60 at 1920x1080
//! [2] WEBP 212.4 KB (86% smaller)
//! Saved photo-86pct-reduced.webp (212.4 KB, 86% smaller)
//!     Path: out/photo-86pct-reduced.webp
//! ```
//!
//! ## Compare
//!
//! ```text
//! photo.png (1.46 MB, 1920x1080)
//!     WEBP  212.4 KB  86% smaller
//!     JPEG  301.9 KB  80% smaller
//!     PNG   1.4 MB    4% smaller
//!     GIF   failed: Failed to convert to GIF: ...
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::controller::ConvertedArtifact;
use crate::estimate::{Estimate, EstimateError, EstimateEvent};
use crate::imaging::{ConversionParams, OutputFormat, format_file_size};
use crate::source::SourceImage;
use serde::Serialize;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable ratio: `42% smaller`, `15% larger`.
pub fn ratio_label(ratio: i64) -> String {
    if ratio < 0 {
        format!("{}% larger", ratio.unsigned_abs())
    } else {
        format!("{ratio}% smaller")
    }
}

/// Upper-case format tag: `JPEG`, `WEBP`.
fn format_tag(format: OutputFormat) -> String {
    format.extension().to_uppercase()
}

/// Short parameter summary: `JPEG q80 at 640x480`, `PNG at 640x480`.
fn params_label(params: &ConversionParams) -> String {
    let mut label = format_tag(params.format);
    if let Some(quality) = params.effective_quality() {
        label.push_str(&format!(" q{}", quality.value()));
    }
    label.push_str(&format!(" at {}x{}", params.width, params.height));
    label
}

// ============================================================================
// Info
// ============================================================================

pub fn format_source_info(source: &SourceImage) -> Vec<String> {
    vec![
        source.name.clone(),
        format!("{}Type: {}", indent(1), source.mime_type),
        format!("{}Size: {}", indent(1), format_file_size(source.original_size)),
        format!(
            "{}Dimensions: {}x{}",
            indent(1),
            source.width(),
            source.height()
        ),
    ]
}

pub fn print_source_info(source: &SourceImage) {
    for line in format_source_info(source) {
        println!("{}", line);
    }
}

// ============================================================================
// Convert
// ============================================================================

/// Format one estimation engine event.
pub fn format_estimate_event(event: &EstimateEvent) -> Vec<String> {
    match event {
        EstimateEvent::PassStarted { pass, params } => {
            vec![format!("[{}] Estimating {}", pass, params_label(params))]
        }
        EstimateEvent::Superseded { pass } => vec![format!("[{}] superseded", pass)],
        EstimateEvent::Published {
            pass,
            format,
            encoded_size,
            compression_ratio,
            ..
        } => vec![format!(
            "[{}] {} {} ({})",
            pass,
            format_tag(*format),
            format_file_size(*encoded_size),
            ratio_label(*compression_ratio)
        )],
        EstimateEvent::Failed { pass, error } => vec![format!("[{}] {}", pass, error)],
    }
}

/// Format the saved artifact and where it landed.
pub fn format_artifact(artifact: &ConvertedArtifact, path: &Path) -> Vec<String> {
    vec![
        format!(
            "Saved {} ({}, {})",
            artifact.file_name,
            format_file_size(artifact.encoded_size),
            ratio_label(artifact.compression_ratio)
        ),
        format!("{}Path: {}", indent(1), path.display()),
    ]
}

pub fn print_artifact(artifact: &ConvertedArtifact, path: &Path) {
    for line in format_artifact(artifact, path) {
        println!("{}", line);
    }
}

// ============================================================================
// Compare
// ============================================================================

/// One row of a multi-format comparison, as emitted by `compare --json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareRow {
    pub format: OutputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareReport {
    pub source: String,
    pub original_size: u64,
    pub width: u32,
    pub height: u32,
    pub results: Vec<CompareRow>,
}

impl CompareReport {
    pub fn new(
        source: &SourceImage,
        results: &[(OutputFormat, Result<Estimate, EstimateError>)],
    ) -> Self {
        let rows = results
            .iter()
            .map(|(format, result)| match result {
                Ok(estimate) => CompareRow {
                    format: *format,
                    encoded_size: Some(estimate.encoded_size),
                    compression_ratio: Some(estimate.compression_ratio),
                    error: None,
                },
                Err(error) => CompareRow {
                    format: *format,
                    encoded_size: None,
                    compression_ratio: None,
                    error: Some(error.to_string()),
                },
            })
            .collect();
        Self {
            source: source.name.clone(),
            original_size: source.original_size,
            width: source.width(),
            height: source.height(),
            results: rows,
        }
    }
}

/// Format a comparison as an aligned table, rows in report order.
pub fn format_compare_report(report: &CompareReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, {}x{})",
        report.source,
        format_file_size(report.original_size),
        report.width,
        report.height
    )];

    let sizes: Vec<Option<String>> = report
        .results
        .iter()
        .map(|row| row.encoded_size.map(format_file_size))
        .collect();
    let size_width = sizes.iter().flatten().map(String::len).max().unwrap_or(0);

    for (row, size) in report.results.iter().zip(sizes) {
        let line = match (size, row.compression_ratio, &row.error) {
            (Some(size), Some(ratio), _) => format!(
                "{}{:<5} {:<size_width$}  {}",
                indent(1),
                format_tag(row.format),
                size,
                ratio_label(ratio)
            ),
            (_, _, Some(error)) => {
                format!("{}{:<5} failed: {}", indent(1), format_tag(row.format), error)
            }
            _ => format!("{}{:<5} no result", indent(1), format_tag(row.format)),
        };
        lines.push(line);
    }
    lines
}

pub fn print_compare_report(report: &CompareReport) {
    for line in format_compare_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::EncodeFailure;
    use crate::imaging::Quality;
    use crate::test_helpers::mock_source;
    use std::sync::Arc;

    fn estimate(format: OutputFormat, encoded_size: u64, ratio: i64) -> Estimate {
        Estimate {
            bytes: vec![0u8; encoded_size as usize].into(),
            encoded_size,
            original_size: 10_000,
            compression_ratio: ratio,
            params: ConversionParams::new(format),
            width: 64,
            height: 48,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn ratio_label_smaller_and_larger() {
        assert_eq!(ratio_label(42), "42% smaller");
        assert_eq!(ratio_label(0), "0% smaller");
        assert_eq!(ratio_label(-15), "15% larger");
    }

    #[test]
    fn params_label_omits_quality_for_lossless() {
        let jpeg = ConversionParams {
            quality: Quality::new(80),
            width: 640,
            height: 480,
            ..ConversionParams::new(OutputFormat::Jpeg)
        };
        assert_eq!(params_label(&jpeg), "JPEG q80 at 640x480");

        let png = ConversionParams {
            format: OutputFormat::Png,
            ..jpeg
        };
        assert_eq!(params_label(&png), "PNG at 640x480");
    }

    // =========================================================================
    // Info
    // =========================================================================

    #[test]
    fn source_info_lines() {
        let source = mock_source(1536);
        let lines = format_source_info(&source);
        assert_eq!(
            lines,
            vec![
                "photo.png",
                "    Type: image/png",
                "    Size: 1.5 KB",
                "    Dimensions: 64x48",
            ]
        );
    }

    // =========================================================================
    // Convert
    // =========================================================================

    #[test]
    fn pass_started_event() {
        let event = EstimateEvent::PassStarted {
            pass: 3,
            params: ConversionParams {
                quality: Quality::new(60),
                width: 64,
                height: 48,
                ..ConversionParams::new(OutputFormat::Webp)
            },
        };
        assert_eq!(
            format_estimate_event(&event),
            vec!["[3] Estimating WEBP q60 at 64x48"]
        );
    }

    #[test]
    fn superseded_event() {
        let event = EstimateEvent::Superseded { pass: 1 };
        assert_eq!(format_estimate_event(&event), vec!["[1] superseded"]);
    }

    #[test]
    fn published_event() {
        let event = EstimateEvent::Published {
            pass: 2,
            format: OutputFormat::Bmp,
            encoded_size: 2048,
            original_size: 1024,
            compression_ratio: -100,
        };
        assert_eq!(
            format_estimate_event(&event),
            vec!["[2] BMP 2 KB (100% larger)"]
        );
    }

    #[test]
    fn failed_event_shows_error() {
        let event = EstimateEvent::Failed {
            pass: 4,
            error: EstimateError::EncodeFailed {
                format: OutputFormat::Gif,
                reason: EncodeFailure::EmptyResult,
            },
        };
        assert_eq!(
            format_estimate_event(&event),
            vec!["[4] Failed to convert to GIF: encoder produced no data"]
        );
    }

    #[test]
    fn artifact_lines() {
        let artifact = ConvertedArtifact {
            bytes: Arc::from(vec![0u8; 10]),
            file_name: "photo-42pct-reduced.webp".to_string(),
            format: OutputFormat::Webp,
            compression_ratio: 42,
            encoded_size: 1_048_576,
        };
        let lines = format_artifact(&artifact, Path::new("out/photo-42pct-reduced.webp"));
        assert_eq!(
            lines,
            vec![
                "Saved photo-42pct-reduced.webp (1 MB, 42% smaller)",
                "    Path: out/photo-42pct-reduced.webp",
            ]
        );
    }

    // =========================================================================
    // Compare
    // =========================================================================

    #[test]
    fn compare_report_keeps_order_and_errors() {
        let source = mock_source(10_000);
        let results = vec![
            (OutputFormat::Webp, Ok(estimate(OutputFormat::Webp, 808, 92))),
            (OutputFormat::Bmp, Ok(estimate(OutputFormat::Bmp, 12_342, -23))),
            (
                OutputFormat::Gif,
                Err(EstimateError::Decode("boom".to_string())),
            ),
        ];
        let report = CompareReport::new(&source, &results);

        assert_eq!(report.original_size, 10_000);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[0].encoded_size, Some(808));
        assert_eq!(
            report.results[2].error.as_deref(),
            Some("Error loading image: boom")
        );

        let lines = format_compare_report(&report);
        assert_eq!(lines[0], "photo.png (9.77 KB, 64x48)");
        assert_eq!(lines[1], "    WEBP  808 Bytes  92% smaller");
        assert_eq!(lines[2], "    BMP   12.05 KB   23% larger");
        assert_eq!(lines[3], "    GIF   failed: Error loading image: boom");
    }

    #[test]
    fn compare_report_serializes_without_empty_fields() {
        let source = mock_source(10_000);
        let results = vec![(OutputFormat::Png, Ok(estimate(OutputFormat::Png, 500, 95)))];
        let json = serde_json::to_value(CompareReport::new(&source, &results)).unwrap();

        assert_eq!(json["source"], "photo.png");
        assert_eq!(json["results"][0]["format"], "png");
        assert_eq!(json["results"][0]["encoded_size"], 500);
        assert!(json["results"][0].get("error").is_none());
    }
}
