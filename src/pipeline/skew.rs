//! # Automatic Skew Correction
//!
//! Estimates the dominant rotational tilt of page content from detected
//! line segments (text baselines, table rules, column edges) and corrects
//! it. Detection failures are never errors: any unreliable estimate makes
//! the stage a no-op, preferring a partially-corrected image over a hard
//! failure.

use image::DynamicImage;
use tracing::debug;

use crate::errors::DeskewError;
use crate::pipeline::rotation::rotate_image;
use crate::vision::{self, LineSegmentParams};

/// Canny thresholds for the edge map the line detector runs on.
const EDGE_LOW_THRESHOLD: f32 = 50.0;
const EDGE_HIGH_THRESHOLD: f32 = 150.0;

/// Corrections below this magnitude are skipped: rotating an already
/// straight page introduces visible resampling jitter for no gain.
const MIN_CORRECTION_DEGREES: f32 = 0.5;

/// A skew correction applied by [`auto_correct_skew`].
pub(crate) struct SkewCorrection {
    /// The rotated image.
    pub image: DynamicImage,
    /// The estimate that was corrected, in degrees.
    pub angle_degrees: f32,
}

/// Detects and corrects the dominant skew of the image.
///
/// Returns `Ok(None)` when no correction is warranted: no line segments
/// found, no segment orientation falls into a classification band, or the
/// median folded angle is below [`MIN_CORRECTION_DEGREES`].
pub(crate) fn auto_correct_skew(
    image: &DynamicImage,
) -> Result<Option<SkewCorrection>, DeskewError> {
    let gray = vision::to_grayscale(image)?;
    let edges = vision::detect_edges(&gray, EDGE_LOW_THRESHOLD, EDGE_HIGH_THRESHOLD);
    let segments = vision::detect_line_segments(&edges, &LineSegmentParams::default());

    if segments.is_empty() {
        debug!(
            target: "deskew_pipeline",
            "no line segments detected; skipping skew correction"
        );
        return Ok(None);
    }

    let angles = fold_segment_angles(segments.iter().map(|s| s.angle_degrees()));
    if angles.is_empty() {
        debug!(
            target: "deskew_pipeline",
            segment_count = segments.len(),
            "no segment orientation classifiable; skipping skew correction"
        );
        return Ok(None);
    }

    let median = median_angle(angles);
    if !needs_correction(median) {
        debug!(
            target: "deskew_pipeline",
            median_degrees = median,
            "skew below correction floor; skipping"
        );
        return Ok(None);
    }

    debug!(
        target: "deskew_pipeline",
        median_degrees = median,
        segment_count = segments.len(),
        "correcting detected skew"
    );

    let corrected = rotate_image(image, -median)?;
    Ok(Some(SkewCorrection {
        image: corrected,
        angle_degrees: median,
    }))
}

/// Folds segment orientations into the near-horizontal band.
///
/// Orientations with magnitude below 45° are kept as-is; those strictly
/// between 45° and 135° are near-vertical and folded by subtracting
/// `90° * sign`. Orientations exactly at 45° or 135° satisfy neither
/// comparison and are dropped from the population.
fn fold_segment_angles(angles: impl Iterator<Item = f32>) -> Vec<f32> {
    let mut folded = Vec::new();
    for angle in angles {
        let magnitude = angle.abs();
        if magnitude < 45.0 {
            folded.push(angle);
        } else if magnitude > 45.0 && magnitude < 135.0 {
            folded.push(angle - 90.0 * angle.signum());
        }
    }
    folded
}

/// Whether a median estimate is large enough to correct.
///
/// The comparison is strictly-less against the floor: an estimate of
/// exactly [`MIN_CORRECTION_DEGREES`] is corrected.
fn needs_correction(median_degrees: f32) -> bool {
    median_degrees.abs() >= MIN_CORRECTION_DEGREES
}

/// Median of the angle population: the upper-middle element of the sorted
/// angles for even counts. Chosen over the mean for robustness against
/// outlier detections from text strokes and noise.
///
/// Callers must pass a non-empty population.
fn median_angle(mut angles: Vec<f32>) -> f32 {
    debug_assert!(!angles.is_empty());
    angles.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    angles[angles.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn fold(angles: &[f32]) -> Vec<f32> {
        fold_segment_angles(angles.iter().copied())
    }

    #[test]
    fn test_fold_keeps_near_horizontal() {
        assert_eq!(fold(&[0.0, 3.0, -44.9]), vec![0.0, 3.0, -44.9]);
    }

    #[test]
    fn test_fold_wraps_near_vertical() {
        let folded = fold(&[90.0, 92.0, -88.0]);
        assert_eq!(folded.len(), 3);
        assert!((folded[0] - 0.0).abs() < 1e-4);
        assert!((folded[1] - 2.0).abs() < 1e-4);
        assert!((folded[2] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_fold_drops_exact_band_boundaries() {
        // 45 and 135 satisfy neither classification comparison and vanish
        // from the population, while angles just inside either band survive.
        assert!(fold(&[45.0, -45.0, 135.0, -135.0]).is_empty());
        assert_eq!(fold(&[44.999]).len(), 1);
        assert_eq!(fold(&[45.001]).len(), 1);
        assert_eq!(fold(&[134.999]).len(), 1);
    }

    #[test]
    fn test_fold_drops_beyond_135() {
        assert!(fold(&[150.0, -170.0, 180.0]).is_empty());
    }

    #[test]
    fn test_median_odd_population() {
        assert_eq!(median_angle(vec![3.0, -1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_median_even_population_takes_upper_middle() {
        assert_eq!(median_angle(vec![1.0, 2.0, 3.0, 4.0]), 3.0);
    }

    #[test]
    fn test_median_single_element() {
        assert_eq!(median_angle(vec![-2.5]), -2.5);
    }

    #[test]
    fn test_correction_floor_boundary() {
        // Strictly below the floor skips; exactly at the floor corrects.
        assert!(!needs_correction(0.49));
        assert!(!needs_correction(-0.49));
        assert!(needs_correction(0.5));
        assert!(needs_correction(-0.5));
        assert!(needs_correction(3.0));
    }

    #[test]
    fn test_blank_image_is_noop() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 200, Luma([255])));
        let result = auto_correct_skew(&blank).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_straight_lines_below_floor_are_noop() {
        // Horizontal rules produce a ~0 degree median, under the 0.5 floor.
        let mut img = GrayImage::from_pixel(300, 200, Luma([255]));
        for y in [50u32, 100, 150] {
            for x in 20..280 {
                img.put_pixel(x, y, Luma([0]));
            }
        }

        let result = auto_correct_skew(&DynamicImage::ImageLuma8(img)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_unsupported_format_propagates() {
        let img = DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(64, 64));
        let result = auto_correct_skew(&img);
        assert!(matches!(
            result,
            Err(DeskewError::UnsupportedFormat { channels: 2 })
        ));
    }
}
