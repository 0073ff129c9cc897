use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, ExtendedColorType, GenericImageView};

use crate::error::{Error, Result};

/// Largest dimension of the transmitted payload. Images already within this
/// bound are never upscaled.
pub const MAX_DIMENSION: u32 = 800;

/// JPEG quality of the re-encoded payload (the web original's 0.7 factor).
pub const JPEG_QUALITY: u8 = 70;

/// How many images may be decoded/encoded at once. Kept at 1 on purpose:
/// preparing multiple large photos concurrently spikes peak memory for no
/// user-visible gain, so batches run strictly one file at a time.
pub const MAX_CONCURRENT_PREP: usize = 1;

/// One product photo, normalized for upload: resized within
/// [`MAX_DIMENSION`], re-encoded as JPEG, base64 payload ready for an
/// `inlineData` part.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub id: String,
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub encoded: String,
}

impl PreparedImage {
    /// One-line preview shown in the upload list.
    pub fn summary(&self) -> String {
        let name = self
            .path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.clone());
        let kb = (self.encoded.len() * 3 / 4) / 1024;
        format!("{} {}x{} ({} KB)", name, self.width, self.height, kb)
    }
}

/// Decode, bound, and re-encode a photo from disk.
pub fn prepare_file(id: &str, path: &Path) -> Result<PreparedImage> {
    let img = image::open(path)
        .map_err(|e| Error::ImageProcessing(format!("{}: {}", path.display(), e)))?;
    let mut prepared = prepare_image(id, &img)?;
    prepared.path = Some(path.to_path_buf());
    Ok(prepared)
}

/// Core of the pipeline, shared by the file path and the tests: downscale so
/// the larger dimension is at most [`MAX_DIMENSION`] (aspect ratio kept,
/// never upscaling), then JPEG-encode and base64 the bytes.
pub fn prepare_image(id: &str, img: &DynamicImage) -> Result<PreparedImage> {
    let (orig_w, orig_h) = img.dimensions();

    let bounded = if orig_w > MAX_DIMENSION || orig_h > MAX_DIMENSION {
        img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        img.clone()
    };

    let (width, height) = bounded.dimensions();
    let rgb = bounded.to_rgb8();

    let mut jpeg_bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut jpeg_bytes), JPEG_QUALITY);
    encoder
        .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| Error::ImageProcessing(format!("JPEG encode failed: {}", e)))?;

    Ok(PreparedImage {
        id: id.to_string(),
        path: None,
        width,
        height,
        encoded: general_purpose::STANDARD.encode(&jpeg_bytes),
    })
}

/// Prepare a selection of files, at most [`MAX_CONCURRENT_PREP`] in flight
/// per chunk. Stops at the first failure.
pub fn prepare_batch(paths: &[PathBuf]) -> Result<Vec<PreparedImage>> {
    let mut prepared = Vec::with_capacity(paths.len());
    for chunk in paths.chunks(MAX_CONCURRENT_PREP) {
        for path in chunk {
            let id = format!("img-{}", prepared.len() + 1);
            prepared.push(prepare_file(&id, path)?);
        }
    }
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    fn decode_payload(prepared: &PreparedImage) -> DynamicImage {
        let bytes = general_purpose::STANDARD.decode(&prepared.encoded).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn large_landscape_is_bounded_to_800_wide() {
        let prepared = prepare_image("t", &test_image(1600, 1000)).unwrap();
        assert_eq!(prepared.width, 800);
        assert_eq!(prepared.height, 500);
        let decoded = decode_payload(&prepared);
        assert_eq!(decoded.dimensions(), (800, 500));
    }

    #[test]
    fn large_portrait_is_bounded_to_800_tall() {
        let prepared = prepare_image("t", &test_image(900, 1800)).unwrap();
        assert_eq!(prepared.height, 800);
        assert_eq!(prepared.width, 400);
    }

    #[test]
    fn small_image_is_never_upscaled() {
        let prepared = prepare_image("t", &test_image(200, 150)).unwrap();
        assert_eq!((prepared.width, prepared.height), (200, 150));
        assert_eq!(decode_payload(&prepared).dimensions(), (200, 150));
    }

    #[test]
    fn payload_is_standalone_jpeg() {
        let prepared = prepare_image("t", &test_image(64, 64)).unwrap();
        let bytes = general_purpose::STANDARD.decode(&prepared.encoded).unwrap();
        // JPEG SOI marker, no data-url prefix.
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[test]
    fn undecodable_file_reports_image_processing_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.jpg");
        std::fs::write(&path, b"plain text, not pixels").unwrap();
        match prepare_file("t", &path) {
            Err(Error::ImageProcessing(_)) => {}
            other => panic!("expected ImageProcessing error, got {:?}", other),
        }
    }

    #[test]
    fn batch_prepares_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        test_image(32, 32).save(&a).unwrap();
        test_image(48, 16).save(&b).unwrap();
        let prepared = prepare_batch(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].path.as_deref(), Some(a.as_path()));
        assert_eq!(prepared[1].path.as_deref(), Some(b.as_path()));
        assert_eq!(prepared[0].id, "img-1");
        assert_eq!(prepared[1].id, "img-2");
    }
}
