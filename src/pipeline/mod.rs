//! # Deskew Pipeline
//!
//! This module provides the corrective pipeline for scanned and
//! photographed page images: automatic skew correction, manual rotation,
//! and white-border cropping, composed in fixed order with each stage
//! independently toggleable.
//!
//! The module is organized into focused sub-modules:
//! - `skew`: line-based skew-angle estimation and correction
//! - `rotation`: the shared expanded-canvas rotation primitive
//! - `cropping`: content-bounding-box border removal
//! - `types`: options and result types

pub mod cropping;
pub mod rotation;
pub mod skew;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{DeskewOptions, DeskewOutcome};

use std::time::Instant;

use image::DynamicImage;
use tracing::debug;

use crate::errors::DeskewError;

/// Runs the deskew pipeline on a decoded image.
///
/// Stages execute strictly in order: auto skew-correction (iff
/// `options.auto_detect`), manual rotation (iff `options.rotate_angle` is
/// nonzero), border cropping (iff `options.crop_white_border`). The result
/// is always 4-channel RGBA regardless of which stages ran; 1- and
/// 3-channel sources are converted, and a 4-channel source comes back as an
/// owned copy, never an alias of the input.
///
/// # Arguments
///
/// * `image` - The decoded input image (1, 3, or 4 channels)
/// * `options` - Which corrective stages to run
///
/// # Errors
///
/// Returns [`DeskewError::UnsupportedFormat`] for other channel layouts and
/// [`DeskewError::Processing`] if a vision primitive fails. Unreliable
/// detections are not errors; the affected stage is skipped.
///
/// # Examples
///
/// ```no_run
/// use page_deskew::pipeline::{deskew, DeskewOptions};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("scan.png")?;
/// let outcome = deskew(
///     &img,
///     &DeskewOptions {
///         auto_detect: true,
///         crop_white_border: true,
///         rotate_angle: 0.0,
///     },
/// )?;
/// println!("corrected skew: {:?}", outcome.detected_skew_degrees);
/// # Ok(())
/// # }
/// ```
pub fn deskew(
    image: &DynamicImage,
    options: &DeskewOptions,
) -> Result<DeskewOutcome, DeskewError> {
    let start_time = Instant::now();

    // Only 8-bit gray, RGB, and RGBA layouts are supported.
    if !matches!(
        image,
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)
    ) {
        return Err(DeskewError::UnsupportedFormat {
            channels: image.color().channel_count(),
        });
    }

    let mut working = image.clone();
    let mut detected_skew_degrees = None;
    let mut cropped = false;

    if options.auto_detect {
        if let Some(correction) = skew::auto_correct_skew(&working)? {
            detected_skew_degrees = Some(correction.angle_degrees);
            working = correction.image;
        }
    }

    if options.rotate_angle != 0.0 {
        working = rotation::rotate_image(&working, options.rotate_angle)?;
    }

    if options.crop_white_border {
        if let Some(trimmed) = cropping::crop_border(&working)? {
            working = trimmed;
            cropped = true;
        }
    }

    // Normalize to RGBA. `working` is owned by the pipeline at this point,
    // so an already-RGBA image moves its buffer without aliasing the input.
    let rgba = working.into_rgba8();

    let processing_time = start_time.elapsed();
    debug!(
        target: "deskew_pipeline",
        width = rgba.width(),
        height = rgba.height(),
        detected_skew_degrees,
        cropped,
        elapsed_ms = processing_time.as_millis() as u64,
        "deskew pipeline complete"
    );

    Ok(DeskewOutcome {
        image: rgba,
        detected_skew_degrees,
        auto_corrected: detected_skew_degrees.is_some(),
        cropped,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}
