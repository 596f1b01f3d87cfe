//! Variable-bit-depth grayscale codec.
//!
//! Text pipeline (bit-packed):
//!
//! ```text
//! resize ─▶ [dither] ─▶ quantize ─▶ pack ─▶ zstd ─▶ base64
//! ```
//!
//! Binary pipeline (container bytes as-is):
//!
//! ```text
//! file bytes ─▶ zstd ─▶ hex
//! ```
//!
//! Quantization rounds to the nearest level, `q = round(p * m / 255)` with
//! `m = 2^depth - 1`. Decoding rescales with `ceil(q * 255 / m)`, which
//! quantizes back to `q`, so a decoded image re-encodes to identical bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::CodecError;
use crate::imaging::Grayscale;
use crate::imaging::bitpack;

/// zstd level for image payloads. Airtime is far more expensive than CPU.
pub const COMPRESSION_LEVEL: i32 = 19;

// ── ImageFormat ──────────────────────────────────────────────────

/// Bit depth and target size agreed by both ends of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFormat {
    pub bit_depth: u8,
    pub width: u32,
    pub height: u32,
}

impl ImageFormat {
    pub fn new(bit_depth: u8, width: u32, height: u32) -> Self {
        Self {
            bit_depth,
            width,
            height,
        }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        if !(1..=7).contains(&self.bit_depth) {
            return Err(CodecError::InvalidDepth(self.bit_depth));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CodecError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A compressed, bit-packed image plus the format needed to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

impl EncodedImage {
    /// Text transport form.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

// ── Levels ───────────────────────────────────────────────────────

fn max_level(depth: u8) -> u32 {
    (1u32 << depth) - 1
}

/// Map an 8-bit pixel to one of `2^depth` levels.
pub fn quantize(pixel: u8, depth: u8) -> u8 {
    let m = max_level(depth);
    ((pixel as u32 * m + 127) / 255) as u8
}

/// Map a level back to 8 bits. `quantize(rescale(v, d), d) == v`.
pub fn rescale(level: u8, depth: u8) -> u8 {
    let m = max_level(depth);
    ((level as u32 * 255).div_ceil(m)).min(255) as u8
}

/// Floyd–Steinberg error diffusion, returning quantized levels.
fn dithered_levels(image: &Grayscale, depth: u8) -> Vec<u8> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut buf: Vec<f32> = image.pixels().iter().map(|&p| p as f32).collect();
    let mut levels = Vec::with_capacity(w * h);

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let old = buf[idx];
            let level = quantize(old.round().clamp(0.0, 255.0) as u8, depth);
            levels.push(level);
            let err = old - rescale(level, depth) as f32;

            let mut spread = |nx: usize, ny: usize, weight: f32| {
                let n = ny * w + nx;
                buf[n] = (buf[n] + err * weight).clamp(0.0, 255.0);
            };
            if x + 1 < w {
                spread(x + 1, y, 7.0 / 16.0);
            }
            if y + 1 < h {
                if x > 0 {
                    spread(x - 1, y + 1, 3.0 / 16.0);
                }
                spread(x, y + 1, 5.0 / 16.0);
                if x + 1 < w {
                    spread(x + 1, y + 1, 1.0 / 16.0);
                }
            }
        }
    }
    levels
}

// ── Text pipeline ────────────────────────────────────────────────

/// Resize, optionally dither, quantize and bit-pack, without compressing.
pub fn pack_pixels(
    image: &Grayscale,
    format: ImageFormat,
    dither: bool,
) -> Result<Vec<u8>, CodecError> {
    format.validate()?;
    let resized = image.resize(format.width, format.height)?;
    let levels = if dither {
        dithered_levels(&resized, format.bit_depth)
    } else {
        resized
            .pixels()
            .iter()
            .map(|&p| quantize(p, format.bit_depth))
            .collect()
    };
    Ok(bitpack::pack(&levels, format.bit_depth))
}

pub fn encode(
    image: &Grayscale,
    format: ImageFormat,
    dither: bool,
) -> Result<EncodedImage, CodecError> {
    let packed = pack_pixels(image, format, dither)?;
    Ok(EncodedImage {
        format,
        data: compress(&packed)?,
    })
}

pub fn decode(data: &[u8], format: ImageFormat) -> Result<Grayscale, CodecError> {
    format.validate()?;
    let packed = decompress(data)?;
    let expected = format.pixel_count();
    let levels = bitpack::unpack(&packed, format.bit_depth, expected);
    if levels.len() < expected {
        return Err(CodecError::Incomplete {
            expected,
            actual: levels.len(),
        });
    }
    let pixels = levels
        .into_iter()
        .map(|v| rescale(v, format.bit_depth))
        .collect();
    Grayscale::new(format.width, format.height, pixels)
}

pub fn encode_text(
    image: &Grayscale,
    format: ImageFormat,
    dither: bool,
) -> Result<String, CodecError> {
    Ok(encode(image, format, dither)?.to_base64())
}

pub fn decode_text(text: &str, format: ImageFormat) -> Result<Grayscale, CodecError> {
    let data = STANDARD.decode(text.trim())?;
    decode(&data, format)
}

// ── Binary pipeline ──────────────────────────────────────────────

/// Compress raw container bytes (PNG, JPEG, ...) and hex-encode them.
pub fn encode_binary(raw: &[u8]) -> Result<String, CodecError> {
    Ok(hex::encode(compress(raw)?))
}

pub fn decode_binary(text: &str) -> Result<Vec<u8>, CodecError> {
    let data = hex::decode(text.trim())?;
    decompress(&data)
}

// ── Compression ──────────────────────────────────────────────────

fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    zstd::encode_all(data, COMPRESSION_LEVEL).map_err(|e| CodecError::Compression(e.to_string()))
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    zstd::decode_all(data).map_err(|e| CodecError::Compression(e.to_string()))
}
