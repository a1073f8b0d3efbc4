//! Image normalizer: bounds an uploaded photo's dimensions, flattens
//! transparency onto white and re-encodes as JPEG until it fits a byte budget.
//!
//! The size bound is best-effort: a highly incompressible image may still
//! exceed `max_size_bytes` once the quality floor is reached. Callers must
//! not treat the bound as absolute.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ImageBuffer, Rgb, Rgba};
use thiserror::Error;

use crate::blob::EmbeddableBlob;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no photo supplied")]
    EmptyInput,
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("jpeg encode failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality on the first encode pass, in 0.0..=1.0.
    pub initial_quality: f32,
    pub quality_step: f32,
    pub min_quality: f32,
    pub max_size_bytes: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 800,
            initial_quality: 0.8,
            quality_step: 0.1,
            min_quality: 0.1,
            max_size_bytes: 500 * 1024,
        }
    }
}

impl NormalizeConfig {
    /// Upper bound on re-encode passes after the first one.
    pub fn pass_budget(&self) -> u32 {
        ((self.initial_quality - self.min_quality) / self.quality_step).ceil() as u32
    }
}

/// A photo that has been bounded, flattened and re-encoded. Always JPEG,
/// always fully opaque.
#[derive(Debug, Clone)]
pub struct NormalizedPhoto {
    blob: EmbeddableBlob,
    pub width: u32,
    pub height: u32,
}

impl NormalizedPhoto {
    pub fn blob(&self) -> &EmbeddableBlob {
        &self.blob
    }
}

pub fn normalize(raw: &[u8], cfg: &NormalizeConfig) -> Result<NormalizedPhoto, NormalizeError> {
    if raw.is_empty() {
        return Err(NormalizeError::EmptyInput);
    }

    let decoded = image::load_from_memory(raw)
        .map_err(|e| NormalizeError::Decode(e.to_string()))?
        .to_rgba8();

    let (w, h) = decoded.dimensions();
    let (out_w, out_h) = bounded_dimensions(w, h, cfg.max_width, cfg.max_height);

    let resized = if (out_w, out_h) == (w, h) {
        decoded
    } else {
        imageops::resize(&decoded, out_w, out_h, imageops::FilterType::Lanczos3)
    };

    let flattened = flatten_on_white(&resized);

    let mut quality = cfg.initial_quality;
    let mut bytes = encode_jpeg(&flattened, quality)?;
    let mut passes = 0;
    while bytes.len() > cfg.max_size_bytes
        && quality - cfg.quality_step > cfg.min_quality
        && passes < cfg.pass_budget()
    {
        quality -= cfg.quality_step;
        bytes = encode_jpeg(&flattened, quality)?;
        passes += 1;
    }

    Ok(NormalizedPhoto {
        blob: EmbeddableBlob::new("image/jpeg", bytes),
        width: out_w,
        height: out_h,
    })
}

/// Uniform downscale factor keeping aspect ratio; never upscales.
/// Dimensions are truncated to whole pixels, clamped to at least 1.
fn bounded_dimensions(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if w <= max_w && h <= max_h {
        return (w, h);
    }
    let ratio = (max_w as f64 / w as f64).min(max_h as f64 / h as f64);
    let out_w = ((w as f64 * ratio) as u32).max(1);
    let out_h = ((h as f64 * ratio) as u32).max(1);
    (out_w, out_h)
}

/// Composite onto an opaque white backdrop so transparent inputs never end up
/// against an undefined background.
fn flatten_on_white(src: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let (w, h) = src.dimensions();
    let mut out = ImageBuffer::from_pixel(w, h, Rgb([255u8, 255, 255]));
    for (x, y, p) in src.enumerate_pixels() {
        let a = p.0[3] as f32 / 255.0;
        if a <= 0.0 {
            continue;
        }
        let inv = 1.0 - a;
        let dst = out.get_pixel_mut(x, y);
        dst.0[0] = (p.0[0] as f32 * a + 255.0 * inv) as u8;
        dst.0[1] = (p.0[1] as f32 * a + 255.0 * inv) as u8;
        dst.0[2] = (p.0[2] as f32 * a + 255.0 * inv) as u8;
    }
    out
}

fn encode_jpeg(img: &ImageBuffer<Rgb<u8>, Vec<u8>>, quality: f32) -> Result<Vec<u8>, NormalizeError> {
    let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, q);
    img.write_with_encoder(encoder)
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    fn png_bytes(img: RgbaImage) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba(px))
    }

    #[test]
    fn oversized_input_is_bounded_with_aspect_kept() {
        let raw = png_bytes(solid(1600, 800, [10, 20, 30, 255]));
        let out = normalize(&raw, &NormalizeConfig::default()).unwrap();
        assert_eq!(out.width, 800);
        assert_eq!(out.height, 400);
        let decoded = image::load_from_memory(&out.blob().bytes).unwrap();
        assert_eq!(decoded.width(), 800);
        assert_eq!(decoded.height(), 400);
    }

    #[test]
    fn tall_input_bounded_by_height() {
        let raw = png_bytes(solid(400, 1000, [0, 0, 0, 255]));
        let out = normalize(&raw, &NormalizeConfig::default()).unwrap();
        assert_eq!(out.height, 800);
        assert_eq!(out.width, 320);
    }

    #[test]
    fn in_bounds_input_is_never_upscaled() {
        let raw = png_bytes(solid(300, 200, [50, 60, 70, 255]));
        let out = normalize(&raw, &NormalizeConfig::default()).unwrap();
        assert_eq!((out.width, out.height), (300, 200));
    }

    #[test]
    fn transparency_is_flattened_to_white() {
        let raw = png_bytes(solid(64, 64, [0, 0, 0, 0]));
        let out = normalize(&raw, &NormalizeConfig::default()).unwrap();
        assert_eq!(out.blob().mime, "image/jpeg");
        let decoded = image::load_from_memory(&out.blob().bytes).unwrap().to_rgb8();
        let p = decoded.get_pixel(32, 32);
        // JPEG is lossy; a fully transparent source must still come out near-white.
        assert!(p.0.iter().all(|&c| c > 245), "pixel was {:?}", p);
    }

    #[test]
    fn quality_loop_terminates_and_respects_floor() {
        // Impossible 1-byte budget: the loop must stop at the quality floor.
        let cfg = NormalizeConfig {
            max_size_bytes: 1,
            ..NormalizeConfig::default()
        };
        assert_eq!(cfg.pass_budget(), 7);
        let raw = png_bytes(solid(400, 400, [120, 40, 200, 255]));
        let out = normalize(&raw, &cfg).unwrap();
        assert!(!out.blob().bytes.is_empty());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            normalize(&[], &NormalizeConfig::default()),
            Err(NormalizeError::EmptyInput)
        ));
    }

    #[test]
    fn garbage_bytes_fail_decode() {
        assert!(matches!(
            normalize(b"not an image at all", &NormalizeConfig::default()),
            Err(NormalizeError::Decode(_))
        ));
    }
}
