//! # Vision Primitive Operations
//!
//! Thin adapter over the `image`/`imageproc` stack exposing exactly the
//! operations the deskew pipeline needs: color-space conversion, edge
//! detection, thresholding, morphological closing, contour extraction, and
//! affine warping. Every operation allocates a fresh output buffer owned by
//! the caller.

use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use imageproc::contours::{BorderType, Contour};
use imageproc::contrast::ThresholdType;
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::rect::Rect;

use crate::errors::DeskewError;

/// Thresholding modes supported by [`threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    /// Pixels above the cutoff become 255, others 0.
    Binary,
    /// Pixels above the cutoff become 0, others 255.
    BinaryInverted,
}

/// Row-major 2x3 affine transform matrix.
///
/// Layout: `[m00, m01, m02, m10, m11, m12]` mapping source coordinates to
/// destination coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMatrix {
    m: [f32; 6],
}

impl AffineMatrix {
    /// Builds a matrix from its six row-major entries.
    pub fn new(m: [f32; 6]) -> Self {
        Self { m }
    }

    /// The six row-major entries.
    pub fn entries(&self) -> [f32; 6] {
        self.m
    }

    /// Adds to the translation terms in place.
    ///
    /// Used by the rotation primitive to re-center rotated content inside an
    /// expanded canvas.
    pub fn translate_by(&mut self, dx: f32, dy: f32) {
        self.m[2] += dx;
        self.m[5] += dy;
    }

    fn to_projection(&self) -> Option<Projection> {
        let [m00, m01, m02, m10, m11, m12] = self.m;
        Projection::from_matrix([m00, m01, m02, m10, m11, m12, 0.0, 0.0, 1.0])
    }
}

/// Converts a decoded image to a single-channel grayscale image.
///
/// Accepts 1-, 3-, and 4-channel sources.
///
/// # Errors
///
/// Returns [`DeskewError::UnsupportedFormat`] for any other channel layout.
pub fn to_grayscale(image: &DynamicImage) -> Result<GrayImage, DeskewError> {
    match image {
        DynamicImage::ImageLuma8(gray) => Ok(gray.clone()),
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Ok(image.to_luma8()),
        other => Err(DeskewError::UnsupportedFormat {
            channels: other.color().channel_count(),
        }),
    }
}

/// Canny edge detection, producing a binary edge map (edges = 255).
///
/// Deterministic for fixed inputs. The backend's Sobel aperture is fixed at
/// 3x3.
pub fn detect_edges(gray: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    imageproc::edges::canny(gray, low_threshold, high_threshold)
}

/// Global thresholding with max value 255.
pub fn threshold(gray: &GrayImage, cutoff: u8, kind: ThresholdKind) -> GrayImage {
    let mode = match kind {
        ThresholdKind::Binary => ThresholdType::Binary,
        ThresholdKind::BinaryInverted => ThresholdType::BinaryInverted,
    };
    imageproc::contrast::threshold(gray, cutoff, mode)
}

/// Morphological closing with a square structuring element.
///
/// `kernel_size` is the side length of the square kernel and must be odd.
pub fn morphological_close(binary: &GrayImage, kernel_size: u8) -> GrayImage {
    debug_assert!(kernel_size % 2 == 1, "kernel size must be odd");
    let k = kernel_size / 2;
    imageproc::morphology::close(binary, Norm::LInf, k)
}

/// Finds the outermost foreground contours of a binary image.
///
/// Foreground is any non-zero pixel. Hole boundaries and nested contours are
/// excluded; only top-level outer borders are returned. An empty result is
/// not an error.
pub fn find_external_contours(binary: &GrayImage) -> Vec<Contour<u32>> {
    imageproc::contours::find_contours::<u32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Tight axis-aligned bounding rectangle of a contour.
///
/// Returns `None` for a contour with no points.
pub fn bounding_rect(contour: &Contour<u32>) -> Option<Rect> {
    let first = contour.points.first()?;
    let (mut min_x, mut max_x) = (first.x, first.x);
    let (mut min_y, mut max_y) = (first.y, first.y);

    for point in &contour.points[1..] {
        min_x = min_x.min(point.x);
        max_x = max_x.max(point.x);
        min_y = min_y.min(point.y);
        max_y = max_y.max(point.y);
    }

    Some(
        Rect::at(min_x as i32, min_y as i32).of_size(max_x - min_x + 1, max_y - min_y + 1),
    )
}

/// Builds the 2x3 rotation matrix about `center` by `angle_degrees` at the
/// given scale.
///
/// Matches the conventional rotation-about-a-point form
/// `[[a, b, (1-a)*cx - b*cy], [-b, a, b*cx + (1-a)*cy]]` with
/// `a = scale * cos(angle)` and `b = scale * sin(angle)`.
pub fn rotation_matrix(center: (f32, f32), angle_degrees: f32, scale: f32) -> AffineMatrix {
    let radians = angle_degrees.to_radians();
    let a = scale * radians.cos();
    let b = scale * radians.sin();
    let (cx, cy) = center;

    AffineMatrix::new([
        a,
        b,
        (1.0 - a) * cx - b * cy,
        -b,
        a,
        b * cx + (1.0 - a) * cy,
    ])
}

/// Applies an affine transform, producing an image of exactly `out_size`.
///
/// Samples falling outside the source take the constant `fill` color.
///
/// # Errors
///
/// Returns [`DeskewError::Processing`] if the matrix is degenerate
/// (non-invertible).
pub fn warp_affine(
    image: &RgbaImage,
    matrix: &AffineMatrix,
    out_size: (u32, u32),
    interpolation: Interpolation,
    fill: Rgba<u8>,
) -> Result<RgbaImage, DeskewError> {
    let projection = matrix
        .to_projection()
        .ok_or_else(|| DeskewError::Processing("degenerate affine transform".to_string()))?;

    let (out_width, out_height) = out_size;
    let mut output = RgbaImage::from_pixel(out_width, out_height, fill);
    warp_into(image, &projection, interpolation, fill, &mut output);

    Ok(output)
}

/// Gaussian blur on a grayscale image.
pub fn gaussian_blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(gray, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn white_square_on_black(width: u32, height: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for y in y0..(y0 + side).min(height) {
            for x in x0..(x0 + side).min(width) {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        img
    }

    #[test]
    fn test_to_grayscale_supported_layouts() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(8, 8));
        assert_eq!(to_grayscale(&gray).unwrap().dimensions(), (8, 8));

        let rgb = DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
        assert_eq!(to_grayscale(&rgb).unwrap().dimensions(), (8, 8));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        assert_eq!(to_grayscale(&rgba).unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn test_to_grayscale_rejects_luma_alpha() {
        let img = DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(8, 8));
        assert!(matches!(
            to_grayscale(&img),
            Err(DeskewError::UnsupportedFormat { channels: 2 })
        ));
    }

    #[test]
    fn test_threshold_binary_inverted_isolates_content() {
        let mut gray = GrayImage::from_pixel(10, 10, Luma([255]));
        gray.put_pixel(5, 5, Luma([0]));

        let binary = threshold(&gray, 250, ThresholdKind::BinaryInverted);

        // Near-white background becomes 0, the dark content pixel becomes 255.
        assert_eq!(binary.get_pixel(0, 0).0[0], 0);
        assert_eq!(binary.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn test_threshold_binary_keeps_bright() {
        let mut gray = GrayImage::new(4, 4);
        gray.put_pixel(1, 1, Luma([200]));

        let binary = threshold(&gray, 128, ThresholdKind::Binary);
        assert_eq!(binary.get_pixel(1, 1).0[0], 255);
        assert_eq!(binary.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_morphological_close_bridges_small_gap() {
        // Two foreground blocks separated by a 2px gap; a 5x5 close merges them.
        let mut img = GrayImage::new(20, 9);
        for y in 2..7 {
            for x in 2..8 {
                img.put_pixel(x, y, Luma([255]));
            }
            for x in 10..16 {
                img.put_pixel(x, y, Luma([255]));
            }
        }

        let closed = morphological_close(&img, 5);
        assert_eq!(closed.get_pixel(8, 4).0[0], 255);
        assert_eq!(closed.get_pixel(9, 4).0[0], 255);
    }

    #[test]
    fn test_find_external_contours_single_square() {
        let img = white_square_on_black(30, 30, 5, 8, 10);
        let contours = find_external_contours(&img);
        assert_eq!(contours.len(), 1);

        let rect = bounding_rect(&contours[0]).unwrap();
        assert_eq!(rect.left(), 5);
        assert_eq!(rect.top(), 8);
        assert_eq!(rect.width(), 10);
        assert_eq!(rect.height(), 10);
    }

    #[test]
    fn test_find_external_contours_empty_image() {
        let img = GrayImage::new(16, 16);
        assert!(find_external_contours(&img).is_empty());
    }

    #[test]
    fn test_rotation_matrix_zero_angle_is_identity() {
        let m = rotation_matrix((10.0, 10.0), 0.0, 1.0).entries();
        assert_eq!(m, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_warp_affine_identity_preserves_content() {
        let mut img = RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 255]));
        img.put_pixel(2, 3, Rgba([10, 20, 30, 255]));

        let identity = AffineMatrix::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let warped = warp_affine(
            &img,
            &identity,
            (6, 6),
            Interpolation::Nearest,
            Rgba([255, 255, 255, 255]),
        )
        .unwrap();

        assert_eq!(warped.get_pixel(2, 3), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_warp_affine_fills_expanded_canvas() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let identity = AffineMatrix::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        let warped = warp_affine(
            &img,
            &identity,
            (8, 8),
            Interpolation::Bilinear,
            Rgba([255, 255, 255, 255]),
        )
        .unwrap();

        assert_eq!(warped.dimensions(), (8, 8));
        // The region beyond the source bounds takes the constant fill.
        assert_eq!(warped.get_pixel(7, 7), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_warp_affine_degenerate_matrix() {
        let img = RgbaImage::new(4, 4);
        let collapsed = AffineMatrix::new([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let result = warp_affine(
            &img,
            &collapsed,
            (4, 4),
            Interpolation::Bilinear,
            Rgba([255, 255, 255, 255]),
        );
        assert!(matches!(result, Err(DeskewError::Processing(_))));
    }

    #[test]
    fn test_translate_by_adjusts_translation_terms() {
        let mut m = rotation_matrix((0.0, 0.0), 0.0, 1.0);
        m.translate_by(3.5, -2.0);
        let entries = m.entries();
        assert_eq!(entries[2], 3.5);
        assert_eq!(entries[5], -2.0);
    }

    #[test]
    fn test_gaussian_blur_preserves_dimensions() {
        let img = white_square_on_black(15, 12, 4, 4, 5);
        let blurred = gaussian_blur(&img, 1.2);
        assert_eq!(blurred.dimensions(), (15, 12));
    }
}
