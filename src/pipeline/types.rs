//! # Shared Types for the Deskew Pipeline
//!
//! This module contains the option and result types used across the
//! pipeline sub-modules.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Options controlling which corrective stages run.
///
/// Each stage is independently toggleable; with all corrections off the
/// pipeline is the identity transform apart from the forced conversion to
/// 4-channel output. Field names serialize in the camelCase wire shape used
/// by the execution host (`autoDetect`, `cropWhiteBorder`, `rotateAngle`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeskewOptions {
    /// Run automatic skew-angle detection and correction.
    pub auto_detect: bool,
    /// Crop the white border around the page content after rotation.
    pub crop_white_border: bool,
    /// Additional manual rotation in degrees; `0` means no manual rotation.
    pub rotate_angle: f32,
}

impl Default for DeskewOptions {
    fn default() -> Self {
        Self {
            auto_detect: false,
            crop_white_border: false,
            rotate_angle: 0.0,
        }
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct DeskewOutcome {
    /// The corrected image, always 4-channel RGBA.
    pub image: RgbaImage,
    /// Skew estimate that was corrected, in degrees. `None` when the
    /// auto-correction stage did not run or detected nothing reliable.
    pub detected_skew_degrees: Option<f32>,
    /// Whether the automatic skew correction rotated the image.
    pub auto_corrected: bool,
    /// Whether the border-cropping stage trimmed the image.
    pub cropped: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
