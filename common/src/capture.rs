use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Every persisted capture is named `screenshot_<timestamp>.png`.
pub const FILE_PREFIX: &str = "screenshot_";
pub const FILE_EXTENSION: &str = "png";

/// One capture as presented to the shell: both renderings are inline
/// data URIs, never bare file paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureView {
    /// File name of the persisted capture.
    pub name: String,
    /// Where the full-resolution PNG lives on disk, for reference.
    pub storage_path: String,
    /// Width-bounded rendering as a `data:image/png;base64,` URI.
    pub thumbnail: String,
    /// Full-resolution rendering as a `data:image/png;base64,` URI.
    pub full_data: String,
}

/// Derive the file name for a capture taken at `ts`.
///
/// The RFC 3339 timestamp is made filesystem-safe by replacing `:` and `.`
/// with `-`; zero-padded fields keep lexicographic order equal to
/// chronological order.
pub fn file_name(ts: DateTime<Utc>) -> String {
    let stamp = ts
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{FILE_PREFIX}{stamp}.{FILE_EXTENSION}")
}

/// Whether a directory entry looks like one of our captures.
pub fn is_capture_file(name: &str) -> bool {
    name.starts_with(FILE_PREFIX) && name.ends_with(&format!(".{FILE_EXTENSION}"))
}

/// Encode PNG bytes as an inline-embeddable data URI.
pub fn png_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_is_filesystem_safe() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let name = file_name(ts);
        assert_eq!(name, "screenshot_2024-01-01T00-00-00-000Z.png");
        let stem = name.trim_end_matches(".png");
        assert!(!stem.contains(':'));
        assert!(!stem.contains('.'));
    }

    #[test]
    fn file_names_sort_chronologically() {
        let earlier = file_name(Utc.with_ymd_and_hms(2024, 1, 1, 9, 59, 59).unwrap());
        let later = file_name(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        assert!(later > earlier);
    }

    #[test]
    fn recognizer_accepts_own_names_only() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
        assert!(is_capture_file(&file_name(ts)));
        assert!(!is_capture_file("notes.txt"));
        assert!(!is_capture_file("screenshot_2024.jpeg"));
        assert!(!is_capture_file("other_2024-06-01.png"));
    }

    #[test]
    fn data_uri_is_inline_png() {
        let uri = png_data_uri(&[0x89, 0x50, 0x4E, 0x47]);
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
    }
}
