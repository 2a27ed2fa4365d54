//! Pure calculation functions for sizes, ratios and dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::ConversionParams;

/// Units for [`format_file_size`]. There is nothing past GB: larger inputs
/// are shown as a (large) number of gigabytes.
const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Render a byte count as a human-readable size.
///
/// The magnitude is the largest power of 1024 not exceeding `bytes`, capped
/// at GB. The value is rounded to two decimals with trailing zeros dropped.
///
/// # Examples
/// ```
/// # use recast::imaging::format_file_size;
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let (value, unit) = size_magnitude(bytes);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// Scaled value and unit index for a non-zero byte count.
fn size_magnitude(bytes: u64) -> (f64, usize) {
    let mut unit = 0;
    let mut divisor: u64 = 1;
    while unit + 1 < SIZE_UNITS.len() && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }
    (bytes as f64 / divisor as f64, unit)
}

/// Percentage saved by the encode relative to the original.
///
/// Returns `0` when either size is `0` (the ratio is undefined). Growth is
/// reported as a negative percentage and is never clamped. Halves round
/// toward positive infinity, so -12.5% reports as -12.
///
/// # Examples
/// ```
/// # use recast::imaging::compression_ratio;
/// assert_eq!(compression_ratio(100, 50), 50);
/// assert_eq!(compression_ratio(100, 150), -50);
/// assert_eq!(compression_ratio(0, 150), 0);
/// ```
pub fn compression_ratio(original: u64, encoded: u64) -> i64 {
    if original == 0 || encoded == 0 {
        return 0;
    }
    let percent = 100.0 * (1.0 - encoded as f64 / original as f64);
    (percent + 0.5).floor() as i64
}

/// Canvas dimensions for an encode.
///
/// With `resize` on, the requested width and height are used as-is (aspect
/// ratio is the caller's business); zero is bumped to one pixel. Otherwise
/// the natural dimensions pass through.
pub fn target_dimensions(natural: Dimensions, params: &ConversionParams) -> (u32, u32) {
    if params.resize {
        (params.width.max(1), params.height.max(1))
    } else {
        (natural.width, natural.height)
    }
}
