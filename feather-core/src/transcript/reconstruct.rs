//! Rebuilding an image file from a transcript.
//!
//! The text path (bit-packed, base64) is preferred. If it fails and hex
//! payloads exist, the binary path (compressed container bytes) is tried.
//! The transcript is emptied only after an image has been written, so a
//! failed attempt leaves everything in place for diagnosis.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{FeatherError, Result};
use crate::imaging::{ImageFormat, decode_binary, decode_text};
use crate::transcript::scanner::extract;

/// Where and how to rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructOptions {
    /// Must match what the drone encoded with.
    pub format: ImageFormat,
    /// Output for the text path.
    pub text_output: PathBuf,
    /// Output for the binary path, written byte for byte.
    pub binary_output: PathBuf,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::new(4, 64, 64),
            text_output: PathBuf::from("reconstructed_text.png"),
            binary_output: PathBuf::from("reconstructed_binary.png"),
        }
    }
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconstruction {
    Text {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    Binary {
        path: PathBuf,
        bytes: usize,
    },
}

impl Reconstruction {
    pub fn path(&self) -> &Path {
        match self {
            Reconstruction::Text { path, .. } | Reconstruction::Binary { path, .. } => path,
        }
    }
}

/// Scan `transcript`, decode, write the image and clear the transcript.
pub async fn reconstruct(transcript: &Path, options: &ReconstructOptions) -> Result<Reconstruction> {
    let raw = tokio::fs::read(transcript).await?;
    let log = String::from_utf8_lossy(&raw);
    let candidates = extract(&log);
    if candidates.is_empty() {
        return Err(FeatherError::NoImageData);
    }

    let result = if candidates.base64.is_empty() {
        write_binary(&candidates.hex, options).await
    } else {
        match write_text(&candidates.base64, options).await {
            Err(e) if !candidates.hex.is_empty() => {
                warn!("text reconstruction failed ({e}), trying binary");
                write_binary(&candidates.hex, options).await
            }
            other => other,
        }
    };
    let result = result?;

    tokio::fs::write(transcript, b"").await?;
    info!("reconstructed {}", result.path().display());
    Ok(result)
}

async fn write_text(payload: &str, options: &ReconstructOptions) -> Result<Reconstruction> {
    let image = decode_text(payload, options.format)?;
    ensure_parent(&options.text_output).await?;
    image.save(&options.text_output)?;
    Ok(Reconstruction::Text {
        path: options.text_output.clone(),
        width: image.width(),
        height: image.height(),
    })
}

async fn write_binary(payload: &str, options: &ReconstructOptions) -> Result<Reconstruction> {
    let bytes = decode_binary(payload)?;
    ensure_parent(&options.binary_output).await?;
    tokio::fs::write(&options.binary_output, &bytes).await?;
    Ok(Reconstruction::Binary {
        path: options.binary_output.clone(),
        bytes: bytes.len(),
    })
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}
