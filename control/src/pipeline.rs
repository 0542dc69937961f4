use chrono::Utc;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

use shotclock_common::capture::{self, CaptureView};
use shotclock_common::config::CaptureConfig;

use crate::store::{RetentionStore, StoreError};

/// Capture, listing, and purge over the retention store.
///
/// Every operation catches its own failures and degrades to a safe
/// default (`None`, an empty list, or `false`); nothing here is allowed
/// to surface as a fault across the bridge.
pub struct ScreenshotPipeline {
    store: RetentionStore,
    display_limit: usize,
    thumbnail_width: u32,
}

impl ScreenshotPipeline {
    pub fn new(store: RetentionStore, config: &CaptureConfig) -> Self {
        Self {
            store,
            display_limit: config.display_limit,
            thumbnail_width: config.thumbnail_width,
        }
    }

    /// Take one screenshot of the primary display and persist it.
    ///
    /// Returns `None` when no display can be captured or the image cannot
    /// be stored; no file is written in that case.
    pub fn capture(&self) -> Option<CaptureView> {
        let image = match grab_primary_display() {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "screen capture unavailable");
                return None;
            }
        };

        let png = match encode_png(&image) {
            Ok(png) => png,
            Err(e) => {
                warn!(error = %e, "failed to encode capture");
                return None;
            }
        };

        let name = capture::file_name(Utc::now());
        let path = match self.store.write(&name, &png) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "failed to persist capture");
                return None;
            }
        };

        let thumbnail = match encode_png(&self.thumbnail_of(&image)) {
            Ok(thumb) => capture::png_data_uri(&thumb),
            Err(e) => {
                warn!(error = %e, "failed to encode thumbnail, reusing full image");
                capture::png_data_uri(&png)
            }
        };

        info!(
            name,
            width = image.width(),
            height = image.height(),
            "capture stored"
        );
        Some(CaptureView {
            name,
            storage_path: path.display().to_string(),
            thumbnail,
            full_data: capture::png_data_uri(&png),
        })
    }

    /// The newest captures, re-rendered on every call.
    ///
    /// An unreadable or undecodable file is skipped with a warning; the
    /// rest of the listing proceeds.
    pub fn list_recent(&self) -> Vec<CaptureView> {
        let mut views = Vec::new();
        for path in self
            .store
            .list_newest_first()
            .into_iter()
            .take(self.display_limit)
        {
            match self.render(&path) {
                Ok(view) => views.push(view),
                Err(e) => warn!(error = %e, path = %path.display(), "skipping unreadable capture"),
            }
        }
        views
    }

    /// Delete every persisted capture. True unless a deletion failed.
    pub fn purge(&self) -> bool {
        let ok = self.store.purge();
        info!(ok, "retention store purged");
        ok
    }

    fn render(&self, path: &Path) -> Result<CaptureView, PipelineError> {
        let png = std::fs::read(path)
            .map_err(|e| PipelineError::Read(path.display().to_string(), e))?;
        let image = image::load_from_memory(&png)
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        let thumbnail = encode_png(&self.thumbnail_of(&image))?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(CaptureView {
            name,
            storage_path: path.display().to_string(),
            thumbnail: capture::png_data_uri(&thumbnail),
            full_data: capture::png_data_uri(&png),
        })
    }

    /// Width-bounded rendering; aspect ratio preserved, never upscaled.
    fn thumbnail_of(&self, image: &DynamicImage) -> DynamicImage {
        if image.width() <= self.thumbnail_width || image.width() == 0 {
            return image.clone();
        }
        let height = (self.thumbnail_width as f64 * image.height() as f64
            / image.width() as f64)
            .round()
            .max(1.0) as u32;
        image.resize_exact(self.thumbnail_width, height, FilterType::Triangle)
    }
}

/// Grab the primary display at native resolution (physical pixels).
///
/// Resizing happens only at thumbnail derivation, never at capture.
fn grab_primary_display() -> Result<DynamicImage, PipelineError> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| PipelineError::CaptureUnavailable(e.to_string()))?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary())
        .or_else(|| monitors.first())
        .ok_or_else(|| PipelineError::CaptureUnavailable("no capturable display".into()))?;

    debug!(
        name = %monitor.name(),
        width = monitor.width(),
        height = monitor.height(),
        scale = monitor.scale_factor(),
        "capturing primary display"
    );

    let raw = monitor
        .capture_image()
        .map_err(|e| PipelineError::CaptureUnavailable(e.to_string()))?;
    // Rebuild the buffer under our own image-crate version.
    let (width, height) = (raw.width(), raw.height());
    let buffer = image::RgbaImage::from_raw(width, height, raw.into_raw())
        .ok_or_else(|| PipelineError::CaptureUnavailable("capture buffer size mismatch".into()))?;
    Ok(DynamicImage::ImageRgba8(buffer))
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PipelineError::Encode(e.to_string()))?;
    Ok(buf)
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no capturable display: {0}")]
    CaptureUnavailable(String),
    #[error("failed to encode PNG: {0}")]
    Encode(String),
    #[error("failed to decode capture: {0}")]
    Decode(String),
    #[error("failed to read capture {0}: {1}")]
    Read(String, std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shotclock_common::capture::file_name;
    use shotclock_common::config::CaptureConfig;

    fn pipeline_in(dir: &Path) -> ScreenshotPipeline {
        let config = CaptureConfig {
            display_limit: 3,
            thumbnail_width: 600,
        };
        ScreenshotPipeline::new(RetentionStore::new(dir.join("screenshots")), &config)
    }

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([10, 20, 30, 255]),
        ));
        encode_png(&image).unwrap()
    }

    fn seed_capture(pipeline: &ScreenshotPipeline, hour: u32, png: &[u8]) -> String {
        let name = file_name(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap());
        std::fs::create_dir_all(pipeline.store.dir()).unwrap();
        std::fs::write(pipeline.store.dir().join(&name), png).unwrap();
        name
    }

    #[test]
    fn list_recent_returns_at_most_three_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(tmp.path());
        let png = png_fixture(8, 6);
        let names: Vec<String> = (0..5).map(|h| seed_capture(&pipeline, h, &png)).collect();

        let views = pipeline.list_recent();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].name, names[4]);
        assert_eq!(views[1].name, names[3]);
        assert_eq!(views[2].name, names[2]);
    }

    #[test]
    fn list_recent_is_empty_without_store() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(pipeline_in(tmp.path()).list_recent().is_empty());
    }

    #[test]
    fn list_recent_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(tmp.path());
        let png = png_fixture(4, 4);
        seed_capture(&pipeline, 0, &png);
        seed_capture(&pipeline, 1, &png);

        let first: Vec<(String, String)> = pipeline
            .list_recent()
            .into_iter()
            .map(|v| (v.name, v.storage_path))
            .collect();
        let second: Vec<(String, String)> = pipeline
            .list_recent()
            .into_iter()
            .map(|v| (v.name, v.storage_path))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn list_recent_skips_undecodable_files() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(tmp.path());
        let png = png_fixture(4, 4);
        let good = seed_capture(&pipeline, 1, &png);
        seed_capture(&pipeline, 2, b"definitely not a png");

        let views = pipeline.list_recent();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].name, good);
    }

    #[test]
    fn rendered_views_are_inline_data() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(tmp.path());
        seed_capture(&pipeline, 0, &png_fixture(8, 6));

        let views = pipeline.list_recent();
        assert!(views[0].thumbnail.starts_with("data:image/png;base64,"));
        assert!(views[0].full_data.starts_with("data:image/png;base64,"));
        assert!(views[0].storage_path.ends_with(&views[0].name));
    }

    #[test]
    fn thumbnail_bounds_width_and_keeps_aspect() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(tmp.path());
        let wide = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1200,
            400,
            image::Rgba([0, 0, 0, 255]),
        ));
        let thumb = pipeline.thumbnail_of(&wide);
        assert_eq!(thumb.width(), 600);
        assert_eq!(thumb.height(), 200);
    }

    #[test]
    fn thumbnail_never_upscales() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(tmp.path());
        let small = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            320,
            200,
            image::Rgba([0, 0, 0, 255]),
        ));
        let thumb = pipeline.thumbnail_of(&small);
        assert_eq!((thumb.width(), thumb.height()), (320, 200));
    }

    #[test]
    fn purge_then_list_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(tmp.path());
        let png = png_fixture(4, 4);
        seed_capture(&pipeline, 0, &png);
        seed_capture(&pipeline, 1, &png);

        assert!(pipeline.purge());
        assert!(pipeline.list_recent().is_empty());

        // A fresh capture after a purge shows up alone.
        seed_capture(&pipeline, 2, &png);
        assert_eq!(pipeline.list_recent().len(), 1);
    }

    #[test]
    fn purge_without_store_is_success() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(pipeline_in(tmp.path()).purge());
    }
}
