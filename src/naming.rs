//! Suggested file names for converted artifacts.
//!
//! The base name is the source name with its last extension stripped. A name
//! without an extension (or one that is all extension, like `.hidden`) is used
//! whole:
//! - `holiday.photo.png` → `holiday.photo`
//! - `scan` → `scan`
//! - `.hidden` → `.hidden`
//!
//! The artifact name is `<base>.<ext>`, or with the compression ratio embedded:
//! - `holiday-42pct-reduced.webp` when the encode saved 42%
//! - `holiday-15pct-larger.bmp` when it grew by 15%

use crate::imaging::OutputFormat;

/// Source name with its last extension removed.
pub fn base_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    }
}

/// Build the download name for an artifact.
///
/// `ratio` is the compression ratio of the estimate whose bytes are being
/// saved; pass `None` for a plain `<base>.<ext>` name.
pub fn artifact_file_name(source_name: &str, format: OutputFormat, ratio: Option<i64>) -> String {
    let base = base_name(source_name);
    let ext = format.extension();
    match ratio {
        None => format!("{base}.{ext}"),
        Some(r) if r < 0 => format!("{base}-{}pct-larger.{ext}", r.unsigned_abs()),
        Some(r) => format!("{base}-{r}pct-reduced.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_extension() {
        assert_eq!(base_name("photo.png"), "photo");
    }

    #[test]
    fn strips_only_last_extension() {
        assert_eq!(base_name("holiday.photo.png"), "holiday.photo");
        assert_eq!(base_name("archive.tar.gz"), "archive.tar");
    }

    #[test]
    fn name_without_extension_is_kept_whole() {
        assert_eq!(base_name("scan"), "scan");
    }

    #[test]
    fn leading_dot_only_is_kept_whole() {
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[test]
    fn trailing_dot_is_stripped() {
        assert_eq!(base_name("weird."), "weird");
    }

    #[test]
    fn plain_name_swaps_extension() {
        assert_eq!(
            artifact_file_name("photo.PNG", OutputFormat::Webp, None),
            "photo.webp"
        );
        assert_eq!(
            artifact_file_name("scan", OutputFormat::Jpeg, None),
            "scan.jpeg"
        );
    }

    #[test]
    fn ratio_name_reports_reduction() {
        assert_eq!(
            artifact_file_name("photo.png", OutputFormat::Jpeg, Some(42)),
            "photo-42pct-reduced.jpeg"
        );
        assert_eq!(
            artifact_file_name("photo.png", OutputFormat::Png, Some(0)),
            "photo-0pct-reduced.png"
        );
    }

    #[test]
    fn ratio_name_reports_growth() {
        assert_eq!(
            artifact_file_name("photo.jpg", OutputFormat::Bmp, Some(-315)),
            "photo-315pct-larger.bmp"
        );
    }
}
