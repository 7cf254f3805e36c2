// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Pixel buffer for '{name}' holds {actual} bytes, expected {expected}")]
    PixelLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// A decoded RGBA8 bitmap, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageAsset {
    pub fn from_rgba(
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, AssetError> {
        let name = name.into();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(AssetError::PixelLength {
                name,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            name,
            width,
            height,
            pixels,
        })
    }

    /// Builds a single-colour image, handy for fallbacks and tests.
    pub fn solid(name: impl Into<String>, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            name: name.into(),
            width,
            height,
            pixels,
        }
    }

    pub fn from_image(name: impl Into<String>, image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let rgba = match image {
            DynamicImage::ImageRgba8(img) => img,
            other => other.into_rgba8(),
        };
        Self {
            name: name.into(),
            width,
            height,
            pixels: rgba.into_raw(),
        }
    }

    pub fn decode(name: impl Into<String>, bytes: &[u8]) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(name, image))
    }

    pub fn load_from_file(name: impl Into<String>, path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path)?;
        Self::decode(name, &bytes)
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}
