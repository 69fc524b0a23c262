//! # Vision Primitives Adapter
//!
//! Thin bindings to the vision backend (`image` + `imageproc`) exposing
//! exactly the operations the deskew pipeline needs, plus the one-shot
//! runtime lifecycle shared by all requests to one execution host.
//!
//! The module is organized into focused sub-modules:
//! - `ops`: per-image primitives (grayscale, edges, threshold, morphology,
//!   contours, affine warps)
//! - `lines`: line-segment detection over a binary edge map
//! - `runtime`: runtime initialization state machine

pub mod lines;
pub mod ops;
pub mod runtime;

// Re-export the adapter surface for convenience
pub use lines::{detect_line_segments, LineSegment, LineSegmentParams};
pub use ops::{
    bounding_rect, detect_edges, find_external_contours, gaussian_blur, morphological_close,
    rotation_matrix, threshold, to_grayscale, warp_affine, AffineMatrix, ThresholdKind,
};
pub use runtime::{RuntimeHandle, RuntimeState};
