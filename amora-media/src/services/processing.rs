use image::imageops::FilterType;
use image::DynamicImage;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

/// Blur variants are heavily downscaled before the gaussian pass so
/// no recoverable detail survives re-upscaling on the client.
const BLUR_MAX_DIM: u32 = 96;
const BLUR_SIGMA: f32 = 8.0;
const JPEG_QUALITY: u8 = 70;

pub struct ProcessedImage {
    pub image: DynamicImage,
    pub width: i32,
    pub height: i32,
    pub quality_score: i32,
}

/// Decode an upload, validating it is a real image, and compute its
/// display-quality score.
pub fn process_upload(data: &[u8]) -> AppResult<ProcessedImage> {
    let image = image::load_from_memory(data)
        .map_err(|e| AppError::new(ErrorCode::InvalidImageFormat, format!("not a decodable image: {e}")))?;

    let width = image.width();
    let height = image.height();
    if width < 200 || height < 200 {
        return Err(AppError::new(
            ErrorCode::InvalidImageFormat,
            "image too small, minimum 200x200",
        ));
    }

    let quality_score = quality_score(width, height);

    Ok(ProcessedImage {
        image,
        width: width as i32,
        height: height as i32,
        quality_score,
    })
}

/// Resolution-and-aspect heuristic in 0..=100. Resolution contributes
/// up to 70 points (saturating at 1080px on the short edge), aspect
/// sanity the remaining 30 (portrait-ish frames score full marks).
pub fn quality_score(width: u32, height: u32) -> i32 {
    let short_edge = width.min(height) as f64;
    let resolution = (short_edge / 1080.0).min(1.0) * 70.0;

    let ratio = width.max(height) as f64 / width.min(height) as f64;
    let aspect = if ratio <= 1.8 {
        30.0
    } else if ratio <= 2.5 {
        15.0
    } else {
        0.0
    };

    (resolution + aspect).round() as i32
}

/// Produce the degraded (blurred) rendition as JPEG bytes.
pub fn blur_variant(image: &DynamicImage) -> AppResult<Vec<u8>> {
    let thumb = image.resize(BLUR_MAX_DIM, BLUR_MAX_DIM, FilterType::Triangle);
    let blurred = thumb.blur(BLUR_SIGMA);

    let mut out = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode_image(&blurred)
        .map_err(|e| AppError::internal(format!("blur encode failed: {e}")))?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_and_scores_a_valid_upload() {
        let processed = process_upload(&png_bytes(1080, 1350)).unwrap();
        assert_eq!(processed.width, 1080);
        assert_eq!(processed.height, 1350);
        assert_eq!(processed.quality_score, 100);
    }

    #[test]
    fn rejects_non_image_payload() {
        let err = process_upload(b"definitely not an image");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_tiny_images() {
        assert!(process_upload(&png_bytes(100, 100)).is_err());
    }

    #[test]
    fn quality_scales_with_resolution() {
        assert!(quality_score(400, 400) < quality_score(800, 800));
        assert_eq!(quality_score(1080, 1080), 100);
    }

    #[test]
    fn extreme_aspect_ratio_is_penalized() {
        assert!(quality_score(1080, 4000) < quality_score(1080, 1350));
    }

    #[test]
    fn quality_stays_in_bounds() {
        for (w, h) in [(200, 200), (1080, 1080), (240, 4000), (8000, 8000)] {
            let s = quality_score(w, h);
            assert!((0..=100).contains(&s), "{w}x{h} -> {s}");
        }
    }

    #[test]
    fn blur_variant_is_a_small_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1080, 1080));
        let jpeg = blur_variant(&img).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert!(decoded.width() <= BLUR_MAX_DIM);
    }
}
