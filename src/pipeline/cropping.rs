//! # Border Cropping
//!
//! Trims the white margin around page content. Content is isolated by
//! inverse thresholding near-white pixels, fragments are merged with a
//! morphological close, and the largest external contour's bounding box
//! (plus a fixed padding) becomes the crop region. Unreliable detections
//! make the stage a no-op.

use image::DynamicImage;
use tracing::debug;

use crate::errors::DeskewError;
use crate::vision::{self, ThresholdKind};

/// Pixels above this luminance count as white border.
const WHITE_CUTOFF: u8 = 250;

/// Side length of the square closing kernel that merges nearby text-stroke
/// fragments into contiguous blobs.
const CLOSE_KERNEL_SIZE: u8 = 5;

/// A best bounding box covering less than this share of the image area is
/// treated as noise rather than page content (near-blank or fully-dark
/// pages).
const MIN_CONTENT_RATIO: f32 = 0.1;

/// Fixed padding around the detected content box, clamped to image bounds.
const CROP_PADDING: i32 = 10;

/// Crops the image to its detected content region.
///
/// Returns `Ok(None)` when no contours are found or the best candidate
/// region is too small to be trusted; the caller keeps the uncropped image.
pub(crate) fn crop_border(image: &DynamicImage) -> Result<Option<DynamicImage>, DeskewError> {
    let gray = vision::to_grayscale(image)?;
    let binary = vision::threshold(&gray, WHITE_CUTOFF, ThresholdKind::BinaryInverted);
    let closed = vision::morphological_close(&binary, CLOSE_KERNEL_SIZE);

    let contours = vision::find_external_contours(&closed);
    if contours.is_empty() {
        debug!(
            target: "deskew_pipeline",
            "no content contours found; skipping border crop"
        );
        return Ok(None);
    }

    let mut best_rect = None;
    let mut best_area = 0u64;
    for contour in &contours {
        if let Some(rect) = vision::bounding_rect(contour) {
            let area = rect.width() as u64 * rect.height() as u64;
            if area > best_area {
                best_area = area;
                best_rect = Some(rect);
            }
        }
    }

    let rect = match best_rect {
        Some(rect) => rect,
        None => return Ok(None),
    };

    let (width, height) = (image.width(), image.height());
    let image_area = width as u64 * height as u64;
    if (best_area as f32) < image_area as f32 * MIN_CONTENT_RATIO {
        debug!(
            target: "deskew_pipeline",
            best_area,
            image_area,
            "content region too small to trust; skipping border crop"
        );
        return Ok(None);
    }

    // Pad the box on all sides, clamped to the image bounds.
    let x = rect.left().saturating_sub(CROP_PADDING).max(0) as u32;
    let y = rect.top().saturating_sub(CROP_PADDING).max(0) as u32;
    let crop_width = (rect.width() + 2 * CROP_PADDING as u32).min(width - x);
    let crop_height = (rect.height() + 2 * CROP_PADDING as u32).min(height - y);

    debug!(
        target: "deskew_pipeline",
        x,
        y,
        crop_width,
        crop_height,
        "cropping to content region"
    );

    // crop_imm copies the view out; the source is released by the caller.
    Ok(Some(image.crop_imm(x, y, crop_width, crop_height)))
}
