//! # Line Segment Detection
//!
//! Probabilistic-style line segment detection over a binary edge map. Hough
//! voting (`imageproc::hough`) proposes candidate lines; segments are then
//! extracted by walking the edge pixels along each candidate, splitting runs
//! at gaps wider than `max_line_gap` and discarding runs shorter than
//! `min_line_length`. Distance resolution is 1 px and angle resolution 1°,
//! fixed by the accumulator.

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};

/// Tuning parameters for [`detect_line_segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegmentParams {
    /// Minimum accumulator votes for a candidate line.
    pub vote_threshold: u32,
    /// Minimum segment length in pixels.
    pub min_line_length: u32,
    /// Maximum run of non-edge pixels tolerated inside one segment.
    pub max_line_gap: u32,
    /// Non-maximum suppression radius in the accumulator, to drop
    /// near-duplicate candidate lines.
    pub suppression_radius: u32,
}

impl Default for LineSegmentParams {
    fn default() -> Self {
        Self {
            vote_threshold: 100,
            min_line_length: 100,
            max_line_gap: 10,
            suppression_radius: 8,
        }
    }
}

/// A detected line segment with endpoint coordinates in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    /// Orientation of the segment in degrees.
    ///
    /// Computed as `atan2(y2 - y1, x2 - x1)` in image coordinates (y grows
    /// downward). Detected segments have canonical endpoint order
    /// (left-to-right, top-to-bottom for verticals), so their orientation
    /// lies in `[-90, 90]`.
    pub fn angle_degrees(&self) -> f32 {
        ((self.y2 - self.y1) as f32)
            .atan2((self.x2 - self.x1) as f32)
            .to_degrees()
    }

    /// Euclidean length of the segment in pixels.
    pub fn length(&self) -> f32 {
        let dx = (self.x2 - self.x1) as f32;
        let dy = (self.y2 - self.y1) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Detects line segments in a binary edge map.
///
/// May return an empty list; this is not an error.
pub fn detect_line_segments(edges: &GrayImage, params: &LineSegmentParams) -> Vec<LineSegment> {
    let candidates = detect_lines(
        edges,
        LineDetectionOptions {
            vote_threshold: params.vote_threshold,
            suppression_radius: params.suppression_radius,
        },
    );

    let mut segments = Vec::new();
    for line in &candidates {
        collect_segments_along(edges, line, params, &mut segments);
    }
    segments
}

/// In-flight run of edge pixels along a candidate line.
struct Run {
    first: (i32, i32),
    last: (i32, i32),
    gap: u32,
}

/// Walks the edge map along one polar candidate line, emitting the edge-pixel
/// runs that satisfy the gap and length constraints.
fn collect_segments_along(
    edges: &GrayImage,
    line: &PolarLine,
    params: &LineSegmentParams,
    out: &mut Vec<LineSegment>,
) {
    let (width, height) = edges.dimensions();
    let theta = (line.angle_in_degrees as f32).to_radians();
    let (sin_t, cos_t) = theta.sin_cos();

    // Point on the line closest to the origin, and the unit direction along
    // the line: r = x*cos(theta) + y*sin(theta).
    let base_x = line.r * cos_t;
    let base_y = line.r * sin_t;
    let (dir_x, dir_y) = (-sin_t, cos_t);

    let diagonal = ((width as f32).powi(2) + (height as f32).powi(2)).sqrt().ceil() as i32;

    let mut run: Option<Run> = None;
    for t in -diagonal..=diagonal {
        let x = (base_x + t as f32 * dir_x).round() as i32;
        let y = (base_y + t as f32 * dir_y).round() as i32;

        let on_edge = x >= 0
            && y >= 0
            && (x as u32) < width
            && (y as u32) < height
            && edges.get_pixel(x as u32, y as u32).0[0] > 0;

        if on_edge {
            match run.as_mut() {
                Some(current) => {
                    current.last = (x, y);
                    current.gap = 0;
                }
                None => {
                    run = Some(Run {
                        first: (x, y),
                        last: (x, y),
                        gap: 0,
                    });
                }
            }
        } else if let Some(current) = run.as_mut() {
            current.gap += 1;
            let gap_exceeded = current.gap > params.max_line_gap;
            if gap_exceeded {
                flush_run(run.take(), params, out);
            }
        }
    }
    flush_run(run.take(), params, out);
}

fn flush_run(run: Option<Run>, params: &LineSegmentParams, out: &mut Vec<LineSegment>) {
    if let Some(run) = run {
        // Canonical endpoint order: x grows from first to last (y breaks ties
        // for verticals), so orientations land in [-90, 90].
        let (first, last) = if run.last.0 < run.first.0
            || (run.last.0 == run.first.0 && run.last.1 < run.first.1)
        {
            (run.last, run.first)
        } else {
            (run.first, run.last)
        };

        let segment = LineSegment {
            x1: first.0,
            y1: first.1,
            x2: last.0,
            y2: last.1,
        };
        if segment.length() >= params.min_line_length as f32 {
            out.push(segment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn horizontal_edge(width: u32, height: u32, y: u32, x0: u32, x1: u32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for x in x0..x1 {
            img.put_pixel(x, y, Luma([255]));
        }
        img
    }

    fn relaxed_params(min_length: u32) -> LineSegmentParams {
        LineSegmentParams {
            vote_threshold: 40,
            min_line_length: min_length,
            max_line_gap: 10,
            suppression_radius: 8,
        }
    }

    #[test]
    fn test_detects_horizontal_segment() {
        let edges = horizontal_edge(200, 100, 50, 10, 190);
        let segments = detect_line_segments(&edges, &relaxed_params(100));

        assert!(!segments.is_empty());
        let longest = segments
            .iter()
            .max_by(|a, b| a.length().partial_cmp(&b.length()).unwrap())
            .unwrap();
        assert!(longest.length() >= 150.0);
        assert!(longest.angle_degrees().abs() < 2.0);
    }

    #[test]
    fn test_detects_vertical_segment() {
        let mut edges = GrayImage::new(100, 200);
        for y in 10..190 {
            edges.put_pixel(50, y, Luma([255]));
        }

        let segments = detect_line_segments(&edges, &relaxed_params(100));
        assert!(!segments.is_empty());
        let longest = segments
            .iter()
            .max_by(|a, b| a.length().partial_cmp(&b.length()).unwrap())
            .unwrap();
        assert!((longest.angle_degrees().abs() - 90.0).abs() < 2.0);
    }

    #[test]
    fn test_gap_splits_runs() {
        // Two 60px runs separated by a 30px hole: wider than max_line_gap,
        // so they must come back as separate segments.
        let mut edges = GrayImage::new(200, 50);
        for x in 10..70 {
            edges.put_pixel(x, 25, Luma([255]));
        }
        for x in 100..160 {
            edges.put_pixel(x, 25, Luma([255]));
        }

        let segments = detect_line_segments(&edges, &relaxed_params(40));
        assert!(segments.len() >= 2);
        assert!(segments.iter().all(|s| s.length() < 70.0));
    }

    #[test]
    fn test_small_gap_bridged() {
        // A 5px hole is within max_line_gap and must not split the segment.
        let mut edges = GrayImage::new(200, 50);
        for x in 10..90 {
            edges.put_pixel(x, 25, Luma([255]));
        }
        for x in 95..180 {
            edges.put_pixel(x, 25, Luma([255]));
        }

        let segments = detect_line_segments(&edges, &relaxed_params(120));
        assert!(!segments.is_empty());
        assert!(segments.iter().any(|s| s.length() >= 150.0));
    }

    #[test]
    fn test_empty_edge_map_yields_no_segments() {
        let edges = GrayImage::new(120, 120);
        let segments = detect_line_segments(&edges, &LineSegmentParams::default());
        assert!(segments.is_empty());
    }

    #[test]
    fn test_short_runs_discarded() {
        let edges = horizontal_edge(200, 100, 50, 10, 40);
        let segments = detect_line_segments(&edges, &relaxed_params(100));
        assert!(segments.is_empty());
    }

    #[test]
    fn test_segment_angle_and_length() {
        let segment = LineSegment {
            x1: 0,
            y1: 0,
            x2: 100,
            y2: 100,
        };
        assert!((segment.angle_degrees() - 45.0).abs() < 1e-4);
        assert!((segment.length() - 141.42136).abs() < 1e-3);
    }
}
