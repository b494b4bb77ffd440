pub mod remote;

use std::io::Cursor;
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use thiserror::Error;

use crate::storage::disk::DiskGuard;

pub use remote::RemoteSegmenter;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("insufficient disk space (free: {free_mb}MB, required: {required_mb}MB)")]
    InsufficientStorage { free_mb: i64, required_mb: i64 },
    #[error("empty image upload")]
    EmptyUpload,
    #[error("image decode failed: {0}")]
    Decode(#[source] image::ImageError),
    #[error("background removal failed: {0}")]
    Removal(String),
    #[error("cutout PNG encode failed: {0}")]
    Encode(#[source] image::ImageError),
}

// Background-removal capability: returns the input with background pixels
// fully transparent. Must be callable from concurrent blocking tasks.
pub trait Segmenter: Send + Sync {
    fn remove(&self, image: DynamicImage) -> Result<DynamicImage, SegmentError>;
}

pub type SharedSegmenter = Arc<dyn Segmenter>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutoutResult {
    pub png_base64: String,
    pub width: u32,
    pub height: u32,
}

// Decode -> remove background -> trim transparent margins -> PNG/base64.
// Everything here is CPU-bound; callers run it on the blocking pool.
pub struct CutoutPipeline {
    segmenter: SharedSegmenter,
    disk_guard: DiskGuard,
}

impl CutoutPipeline {
    pub fn new(segmenter: SharedSegmenter, disk_guard: DiskGuard) -> Self {
        Self {
            segmenter,
            disk_guard,
        }
    }

    pub fn cut(&self, bytes: &[u8]) -> Result<CutoutResult, SegmentError> {
        let status = self.disk_guard.check();
        if !status.sufficient {
            return Err(SegmentError::InsufficientStorage {
                free_mb: status.free_mb,
                required_mb: self.disk_guard.min_required_mb(),
            });
        }
        if bytes.is_empty() {
            return Err(SegmentError::EmptyUpload);
        }

        let input = image::load_from_memory(bytes).map_err(SegmentError::Decode)?;
        let removed = self.segmenter.remove(input)?.into_rgba8();

        let cutout = match alpha_bounding_box(&removed) {
            Some((x, y, width, height)) => {
                DynamicImage::ImageRgba8(removed).crop_imm(x, y, width, height)
            }
            // Fully transparent output has no bounding box; keep the frame
            // as-is instead of failing.
            None => DynamicImage::ImageRgba8(removed),
        };

        let (width, height) = (cutout.width(), cutout.height());
        let mut png = Vec::new();
        cutout
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(SegmentError::Encode)?;

        Ok(CutoutResult {
            png_base64: BASE64_STANDARD.encode(png.as_slice()),
            width,
            height,
        })
    }
}

// Smallest (x, y, width, height) covering every pixel with non-zero alpha;
// None when the image is fully transparent.
fn alpha_bounding_box(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut seen = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        seen = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    if !seen {
        return None;
    }
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::Rgba;
    use pretty_assertions::assert_eq;

    use crate::storage::disk::{DiskProbe, MIN_DISK_SPACE_MB};

    struct IdentitySegmenter;

    impl Segmenter for IdentitySegmenter {
        fn remove(&self, image: DynamicImage) -> Result<DynamicImage, SegmentError> {
            Ok(image)
        }
    }

    struct BlankingSegmenter;

    impl Segmenter for BlankingSegmenter {
        fn remove(&self, image: DynamicImage) -> Result<DynamicImage, SegmentError> {
            let blank = RgbaImage::from_pixel(image.width(), image.height(), Rgba([0, 0, 0, 0]));
            Ok(DynamicImage::ImageRgba8(blank))
        }
    }

    struct CountingSegmenter {
        calls: AtomicUsize,
    }

    impl Segmenter for CountingSegmenter {
        fn remove(&self, image: DynamicImage) -> Result<DynamicImage, SegmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(image)
        }
    }

    struct FixedProbe(u64);

    impl DiskProbe for FixedProbe {
        fn available_mb(&self) -> io::Result<u64> {
            Ok(self.0)
        }
    }

    fn roomy_guard() -> DiskGuard {
        DiskGuard::new(Arc::new(FixedProbe(MIN_DISK_SPACE_MB as u64 * 10)))
    }

    fn full_guard() -> DiskGuard {
        DiskGuard::new(Arc::new(FixedProbe(1)))
    }

    fn png_with_opaque_rect(
        frame: (u32, u32),
        rect: (u32, u32, u32, u32),
    ) -> Vec<u8> {
        let (frame_w, frame_h) = frame;
        let (rx, ry, rw, rh) = rect;
        let mut img = RgbaImage::from_pixel(frame_w, frame_h, Rgba([0, 0, 0, 0]));
        for y in ry..ry + rh {
            for x in rx..rx + rw {
                img.put_pixel(x, y, Rgba([200, 40, 40, 255]));
            }
        }
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .expect("test PNG should encode");
        png
    }

    #[test]
    fn cutout_is_trimmed_to_opaque_bounding_box() {
        let pipeline = CutoutPipeline::new(Arc::new(IdentitySegmenter), roomy_guard());
        let png = png_with_opaque_rect((100, 80), (10, 20, 30, 40));

        let result = pipeline.cut(png.as_slice()).expect("cut should succeed");
        assert_eq!((result.width, result.height), (30, 40));

        let decoded = BASE64_STANDARD
            .decode(result.png_base64.as_bytes())
            .expect("payload should be base64");
        let cutout = image::load_from_memory(decoded.as_slice()).expect("payload should be PNG");
        assert_eq!((cutout.width(), cutout.height()), (30, 40));
    }

    #[test]
    fn fully_transparent_result_keeps_original_dimensions() {
        let pipeline = CutoutPipeline::new(Arc::new(BlankingSegmenter), roomy_guard());
        let png = png_with_opaque_rect((64, 48), (0, 0, 64, 48));

        let result = pipeline.cut(png.as_slice()).expect("cut should succeed");
        assert_eq!((result.width, result.height), (64, 48));
    }

    #[test]
    fn empty_upload_is_rejected() {
        let pipeline = CutoutPipeline::new(Arc::new(IdentitySegmenter), roomy_guard());
        assert!(matches!(
            pipeline.cut(&[]).expect_err("empty upload should fail"),
            SegmentError::EmptyUpload
        ));
    }

    #[test]
    fn undecodable_upload_is_rejected() {
        let pipeline = CutoutPipeline::new(Arc::new(IdentitySegmenter), roomy_guard());
        assert!(matches!(
            pipeline
                .cut(b"definitely not an image")
                .expect_err("garbage upload should fail"),
            SegmentError::Decode(_)
        ));
    }

    #[test]
    fn insufficient_disk_space_blocks_before_removal_runs() {
        let segmenter = Arc::new(CountingSegmenter {
            calls: AtomicUsize::new(0),
        });
        let pipeline = CutoutPipeline::new(segmenter.clone(), full_guard());
        let png = png_with_opaque_rect((16, 16), (0, 0, 8, 8));

        let error = pipeline
            .cut(png.as_slice())
            .expect_err("cut should fail on full disk");
        match error {
            SegmentError::InsufficientStorage {
                free_mb,
                required_mb,
            } => {
                assert_eq!(free_mb, 1);
                assert_eq!(required_mb, MIN_DISK_SPACE_MB);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(segmenter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn single_opaque_pixel_trims_to_one_by_one() {
        let pipeline = CutoutPipeline::new(Arc::new(IdentitySegmenter), roomy_guard());
        let png = png_with_opaque_rect((32, 32), (31, 31, 1, 1));

        let result = pipeline.cut(png.as_slice()).expect("cut should succeed");
        assert_eq!((result.width, result.height), (1, 1));
    }
}
