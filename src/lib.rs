//! # page-deskew
//!
//! Skew correction for scanned and photographed page images: automatic
//! line-based skew detection and rotation, manual rotation, and
//! white-border cropping, run off the caller's thread by a message-passing
//! execution host with a one-shot-initialized vision runtime.
//!
//! The crate is organized in three layers:
//! - [`vision`]: thin adapter over the `image`/`imageproc` vision stack
//! - [`pipeline`]: the corrective stages and their orchestration
//! - [`worker`]: the isolated execution host and its request/response
//!   protocol

pub mod config;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod raster;
pub mod vision;
pub mod worker;

// Re-export types for easier access
pub use config::{AppConfig, HostConfig, LogConfig};
pub use errors::{DeskewError, DeskewResult};
pub use pipeline::{deskew, DeskewOptions, DeskewOutcome};
pub use raster::{ChannelLayout, RasterImage};
pub use vision::runtime::RuntimeState;
pub use worker::{DeskewArtifact, DeskewHost, DeskewJob, WorkerRequest, WorkerResponse};
