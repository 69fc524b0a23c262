//! # Shared Rotation Primitive
//!
//! Rotation about the image center onto an expanded canvas that fully
//! contains the rotated rectangle. Used by both the automatic skew
//! correction and the manual-rotation stage.

use image::{DynamicImage, Rgba};
use imageproc::geometric_transformations::Interpolation;
use tracing::debug;

use crate::errors::DeskewError;
use crate::vision;

/// Fill for canvas regions outside the rotated content. White matches a
/// paper-scan background; black would read as a scanning artifact.
const BORDER_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Rotates an image by `angle_degrees` about its center.
///
/// The output canvas is expanded to `floor(h*|sin| + w*|cos|)` by
/// `floor(h*|cos| + w*|sin|)` and the rotated content re-centered inside it,
/// so no corner is clipped. Resampling is bilinear; the output is always
/// RGBA.
pub(crate) fn rotate_image(
    image: &DynamicImage,
    angle_degrees: f32,
) -> Result<DynamicImage, DeskewError> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut matrix = vision::rotation_matrix(
        (width as f32 / 2.0, height as f32 / 2.0),
        angle_degrees,
        1.0,
    );

    let radians = angle_degrees.to_radians();
    let cos_a = radians.cos().abs();
    let sin_a = radians.sin().abs();
    let new_width = (height as f32 * sin_a + width as f32 * cos_a).floor() as u32;
    let new_height = (height as f32 * cos_a + width as f32 * sin_a).floor() as u32;

    // Shift the rotated content into the middle of the expanded canvas. The
    // deltas can be negative for extreme aspect ratios, so this stays in
    // float space.
    matrix.translate_by(
        (new_width as f32 - width as f32) / 2.0,
        (new_height as f32 - height as f32) / 2.0,
    );

    let rotated = vision::warp_affine(
        &rgba,
        &matrix,
        (new_width, new_height),
        Interpolation::Bilinear,
        BORDER_FILL,
    )?;

    debug!(
        target: "deskew_pipeline",
        angle_degrees,
        new_width,
        new_height,
        "applied rotation"
    );

    Ok(DynamicImage::ImageRgba8(rotated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use image::RgbaImage;

    fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn test_zero_rotation_preserves_dimensions_and_content() {
        let image = solid_image(40, 30, [10, 20, 30, 255]);
        let rotated = rotate_image(&image, 0.0).unwrap();

        assert_eq!(rotated.width(), 40);
        assert_eq!(rotated.height(), 30);
        assert_eq!(
            rotated.to_rgba8().get_pixel(20, 15),
            &Rgba([10, 20, 30, 255])
        );
    }

    #[test]
    fn test_quarter_turn_swaps_dimensions() {
        let image = solid_image(40, 30, [0, 0, 0, 255]);
        let rotated = rotate_image(&image, 90.0).unwrap();

        assert_eq!(rotated.width(), 30);
        assert_eq!(rotated.height(), 40);
    }

    #[test]
    fn test_small_rotation_expands_canvas() {
        let image = solid_image(100, 80, [0, 0, 0, 255]);
        let rotated = rotate_image(&image, 3.0).unwrap();

        // floor(80*sin3 + 100*cos3) x floor(80*cos3 + 100*sin3)
        assert_eq!(rotated.width(), 104);
        assert_eq!(rotated.height(), 85);
    }

    #[test]
    fn test_opposite_angles_produce_same_canvas() {
        let image = solid_image(100, 80, [0, 0, 0, 255]);
        let clockwise = rotate_image(&image, 3.0).unwrap();
        let counter = rotate_image(&image, -3.0).unwrap();

        assert_eq!(clockwise.dimensions(), counter.dimensions());
        assert!(clockwise.width() >= 100);
        assert!(clockwise.height() >= 80);
    }

    #[test]
    fn test_exposed_corners_filled_white() {
        let image = solid_image(50, 50, [0, 0, 0, 255]);
        let rotated = rotate_image(&image, 45.0).unwrap();
        let rgba = rotated.to_rgba8();

        // A 45-degree rotation of a square leaves the canvas corners empty.
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        let (w, h) = rgba.dimensions();
        assert_eq!(rgba.get_pixel(w - 1, h - 1), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_output_is_rgba_for_gray_input() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            20,
            20,
            image::Luma([128]),
        ));
        let rotated = rotate_image(&gray, 10.0).unwrap();
        assert_eq!(rotated.color().channel_count(), 4);
    }
}
