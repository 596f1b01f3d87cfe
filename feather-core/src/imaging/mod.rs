//! Grayscale images and the variable-bit-depth image codec.
//!
//! The codec itself ([`codec`], [`bitpack`]) is pure: it only sees pixel
//! buffers and bytes. Reading captures from disk and writing reconstructed
//! images lives here, on top of the `image` crate.

pub mod bitpack;
pub mod codec;

use std::path::Path;

use crate::error::CodecError;

pub use codec::{
    EncodedImage, ImageFormat, decode, decode_binary, decode_text, encode, encode_binary,
    encode_text, pack_pixels, quantize, rescale,
};

/// An 8-bit grayscale pixel grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grayscale {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Grayscale {
    /// Wrap a row-major buffer. `pixels.len()` must equal `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CodecError> {
        if width == 0 || height == 0 || pixels.len() != width as usize * height as usize {
            return Err(CodecError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Nearest-neighbor resize. Target column `i` samples source column
    /// `floor(i * orig_w / w)`; rows likewise.
    pub fn resize(&self, width: u32, height: u32) -> Result<Self, CodecError> {
        if width == 0 || height == 0 {
            return Err(CodecError::InvalidDimensions { width, height });
        }
        let (ow, oh) = (self.width as u64, self.height as u64);
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for j in 0..height as u64 {
            let src_y = (j * oh / height as u64) as u32;
            for i in 0..width as u64 {
                let src_x = (i * ow / width as u64) as u32;
                pixels.push(self.get(src_x, src_y));
            }
        }
        Self::new(width, height, pixels)
    }

    /// Load any PNG/JPEG file as 8-bit grayscale.
    ///
    /// Color images are reduced with `0.299 R + 0.587 G + 0.114 B`.
    pub fn load(path: &Path) -> Result<Self, CodecError> {
        let decoded = image::open(path)?;
        let (width, height) = (decoded.width(), decoded.height());
        let pixels = match decoded {
            image::DynamicImage::ImageLuma8(gray) => gray.into_raw(),
            other => other
                .to_rgb8()
                .pixels()
                .map(|p| {
                    let [r, g, b] = p.0;
                    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
                        .round()
                        .clamp(0.0, 255.0) as u8
                })
                .collect(),
        };
        Self::new(width, height, pixels)
    }

    /// Write as an 8-bit grayscale image; the container follows the
    /// file extension.
    pub fn save(&self, path: &Path) -> Result<(), CodecError> {
        let buffer = image::GrayImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or(CodecError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        buffer.save(path)?;
        Ok(())
    }
}
