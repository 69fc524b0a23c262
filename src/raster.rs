//! # Raster Image Data Model
//!
//! This module defines the boundary representation of an image: a flat
//! interleaved 8-bit byte buffer plus width, height, and channel layout.
//! It is the type that crosses the execution-host boundary; the pipeline
//! itself works on decoded [`image::DynamicImage`] values.
//!
//! The length invariant `data.len() == width * height * channels` is
//! enforced at construction and holds for the lifetime of the value, so
//! conversions to decoded buffers cannot fail on length.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::errors::DeskewError;

/// Interleaved channel layouts supported at the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Single luminance channel.
    Gray,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl ChannelLayout {
    /// Number of interleaved bytes per pixel for this layout.
    pub fn channels(self) -> u8 {
        match self {
            ChannelLayout::Gray => 1,
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
        }
    }
}

/// A rectangular pixel grid with an explicit channel layout.
///
/// Exclusively owned by whichever stage currently holds it; pipeline stages
/// consume their input and produce a fresh image, so buffer release is
/// automatic and exactly-once by move semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    layout: ChannelLayout,
    data: Vec<u8>,
}

impl RasterImage {
    /// Builds an image from a raw interleaved byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DeskewError::InvalidImageData`] if either dimension is zero
    /// or the buffer length does not equal `width * height * channels`.
    pub fn from_bytes(
        data: Vec<u8>,
        width: u32,
        height: u32,
        layout: ChannelLayout,
    ) -> Result<Self, DeskewError> {
        if width == 0 || height == 0 {
            return Err(DeskewError::InvalidImageData(format!(
                "image dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let expected = width as usize * height as usize * layout.channels() as usize;
        if data.len() != expected {
            return Err(DeskewError::InvalidImageData(format!(
                "buffer length {} does not match {}x{} with {} channels (expected {})",
                data.len(),
                width,
                height,
                layout.channels(),
                expected
            )));
        }

        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Builds a 4-channel image from a raw RGBA byte buffer.
    pub fn from_rgba_bytes(data: Vec<u8>, width: u32, height: u32) -> Result<Self, DeskewError> {
        Self::from_bytes(data, width, height, ChannelLayout::Rgba)
    }

    /// Wraps a decoded RGBA buffer without copying.
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            layout: ChannelLayout::Rgba,
            data: image.into_raw(),
        }
    }

    /// Converts a decoded image into the boundary representation.
    ///
    /// # Errors
    ///
    /// Returns [`DeskewError::UnsupportedFormat`] for decoded layouts other
    /// than 1, 3, or 4 interleaved 8-bit channels.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self, DeskewError> {
        match image {
            DynamicImage::ImageLuma8(gray) => {
                let (width, height) = gray.dimensions();
                Ok(Self {
                    width,
                    height,
                    layout: ChannelLayout::Gray,
                    data: gray.clone().into_raw(),
                })
            }
            DynamicImage::ImageRgb8(rgb) => {
                let (width, height) = rgb.dimensions();
                Ok(Self {
                    width,
                    height,
                    layout: ChannelLayout::Rgb,
                    data: rgb.clone().into_raw(),
                })
            }
            DynamicImage::ImageRgba8(rgba) => {
                let (width, height) = rgba.dimensions();
                Ok(Self {
                    width,
                    height,
                    layout: ChannelLayout::Rgba,
                    data: rgba.clone().into_raw(),
                })
            }
            other => Err(DeskewError::UnsupportedFormat {
                channels: other.color().channel_count(),
            }),
        }
    }

    /// Decodes into a [`DynamicImage`] for pipeline processing.
    ///
    /// The byte buffer is copied; the boundary value stays usable.
    pub fn to_dynamic(&self) -> DynamicImage {
        let data = self.data.clone();
        match self.layout {
            ChannelLayout::Gray => DynamicImage::ImageLuma8(
                GrayImage::from_raw(self.width, self.height, data)
                    .expect("length invariant guarantees a valid gray buffer"),
            ),
            ChannelLayout::Rgb => DynamicImage::ImageRgb8(
                RgbImage::from_raw(self.width, self.height, data)
                    .expect("length invariant guarantees a valid rgb buffer"),
            ),
            ChannelLayout::Rgba => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(self.width, self.height, data)
                    .expect("length invariant guarantees a valid rgba buffer"),
            ),
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout of the buffer.
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Borrow the interleaved byte buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the image, returning the interleaved byte buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
