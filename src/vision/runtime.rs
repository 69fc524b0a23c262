//! # Vision Runtime Lifecycle
//!
//! The vision backend is initialized once per execution host and shared by
//! every request the host services. This module models that lifecycle as an
//! explicit state machine rather than a readiness flag, so concurrent-init
//! races and failure terminality are first-class, testable states.
//!
//! Readiness waiting uses a condition variable with a hard deadline instead
//! of an interval poll: the observable contract (bounded wait, one load
//! attempt, shared outcome) is unchanged, without the busy-wait.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::geometric_transformations::Interpolation;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::errors::{DeskewError, DeskewResult};
use crate::vision::ops;

/// Observable lifecycle states of the vision runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeState {
    /// No initialization has been requested yet.
    Uninitialized,
    /// A load is in flight. At most one load ever runs; later initializers
    /// wait for this one's outcome.
    Initializing,
    /// Terminal success: the runtime accepts work indefinitely.
    Ready,
    /// Terminal failure: a fresh host instance is required to retry.
    Failed(DeskewError),
}

type Loader = Box<dyn Fn() -> Result<(), String> + Send + Sync>;

struct Inner {
    state: Mutex<RuntimeState>,
    ready: Condvar,
    init_timeout: Duration,
    loader: Loader,
}

/// Shared handle to the one-shot-initialized vision runtime.
///
/// Cloning is cheap and clones observe the same underlying state. The state
/// is write-once (set on the `Initializing` transition out), read-only
/// thereafter; no further locking discipline is required of callers.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Arc<Inner>,
}

impl RuntimeHandle {
    /// Creates an uninitialized handle that performs the backend warm-up
    /// self-check on first [`ensure_ready`](Self::ensure_ready).
    pub fn new(init_timeout: Duration) -> Self {
        Self::with_loader(init_timeout, Box::new(warm_up))
    }

    /// Creates a handle with a custom load step. Used by tests to observe
    /// load counts and inject failures.
    pub(crate) fn with_loader(init_timeout: Duration, loader: Loader) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(RuntimeState::Uninitialized),
                ready: Condvar::new(),
                init_timeout,
                loader,
            }),
        }
    }

    /// Snapshot of the current lifecycle state.
    pub fn state(&self) -> RuntimeState {
        self.inner.state.lock().clone()
    }

    /// Whether the runtime has reached `Ready`.
    pub fn is_ready(&self) -> bool {
        matches!(*self.inner.state.lock(), RuntimeState::Ready)
    }

    /// Drives the runtime to `Ready`, performing the one-shot load on first
    /// call.
    ///
    /// Concurrent callers during the load wait for the same outcome; exactly
    /// one load attempt is ever made. Waiting is bounded by the configured
    /// init ceiling.
    ///
    /// # Errors
    ///
    /// - [`DeskewError::InitTimeout`] if the runtime did not become ready
    ///   within the ceiling. The handle transitions to the terminal `Failed`
    ///   state.
    /// - [`DeskewError::InitLoadFailure`] if the load step failed, or on any
    ///   call after the handle reached `Failed`.
    pub fn ensure_ready(&self) -> DeskewResult<()> {
        let mut deadline: Option<Instant> = None;
        let mut state = self.inner.state.lock();

        loop {
            match &*state {
                RuntimeState::Ready => return Ok(()),
                RuntimeState::Failed(err) => return Err(err.clone()),
                RuntimeState::Initializing => {
                    let until =
                        *deadline.get_or_insert_with(|| Instant::now() + self.inner.init_timeout);
                    if self.inner.ready.wait_until(&mut state, until).timed_out() {
                        // The loader may have finished during the final wait
                        // slice; its recorded outcome wins over the timeout.
                        match &*state {
                            RuntimeState::Ready => return Ok(()),
                            RuntimeState::Failed(err) => return Err(err.clone()),
                            _ => {}
                        }

                        let timeout_secs = self.inner.init_timeout.as_secs();
                        let err = DeskewError::InitTimeout { timeout_secs };
                        warn!(
                            target: "deskew_worker",
                            timeout_secs,
                            "vision runtime init exceeded ceiling; marking host failed"
                        );
                        *state = RuntimeState::Failed(err.clone());
                        self.inner.ready.notify_all();
                        return Err(err);
                    }
                }
                RuntimeState::Uninitialized => {
                    *state = RuntimeState::Initializing;
                    info!(target: "deskew_worker", "initializing vision runtime");
                    self.spawn_loader();
                }
            }
        }
    }

    fn spawn_loader(&self) {
        let inner = Arc::clone(&self.inner);
        thread::spawn(move || {
            let outcome = (inner.loader)();
            let mut state = inner.state.lock();

            // A waiter may already have timed the runtime out; terminal
            // states are never overwritten.
            if *state != RuntimeState::Initializing {
                debug!(
                    target: "deskew_worker",
                    "vision runtime load finished after state became terminal; discarding"
                );
                return;
            }

            *state = match outcome {
                Ok(()) => {
                    info!(target: "deskew_worker", "vision runtime ready");
                    RuntimeState::Ready
                }
                Err(message) => {
                    error!(target: "deskew_worker", error = %message, "vision runtime load failed");
                    RuntimeState::Failed(DeskewError::InitLoadFailure(message))
                }
            };
            inner.ready.notify_all();
        });
    }
}

/// Backend warm-up self-check: pushes a small synthetic frame through each
/// primitive family and verifies the outputs have the expected shape. Any
/// anomaly is reported as a load failure.
fn warm_up() -> Result<(), String> {
    let mut frame = GrayImage::new(32, 32);
    for y in 8..24 {
        for x in 8..24 {
            frame.put_pixel(x, y, Luma([255]));
        }
    }

    let edges = ops::detect_edges(&frame, 50.0, 150.0);
    if edges.dimensions() != (32, 32) {
        return Err("edge detector returned unexpected dimensions".to_string());
    }

    let binary = ops::threshold(&frame, 128, ops::ThresholdKind::Binary);
    let closed = ops::morphological_close(&binary, 5);
    let contours = ops::find_external_contours(&closed);
    if contours.is_empty() {
        return Err("contour extraction found no content in warm-up frame".to_string());
    }
    if ops::bounding_rect(&contours[0]).is_none() {
        return Err("warm-up contour has no bounding rectangle".to_string());
    }

    let white = Rgba([255u8, 255, 255, 255]);
    let canvas = RgbaImage::from_pixel(8, 8, Rgba([0u8, 0, 0, 255]));
    let matrix = ops::rotation_matrix((4.0, 4.0), 90.0, 1.0);
    let warped = ops::warp_affine(&canvas, &matrix, (8, 8), Interpolation::Bilinear, white)
        .map_err(|err| err.to_string())?;
    if warped.dimensions() != (8, 8) {
        return Err("affine warp returned unexpected dimensions".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_starts_uninitialized() {
        let handle = RuntimeHandle::new(Duration::from_secs(60));
        assert_eq!(handle.state(), RuntimeState::Uninitialized);
        assert!(!handle.is_ready());
    }

    #[test]
    fn test_default_warm_up_reaches_ready() {
        let handle = RuntimeHandle::new(Duration::from_secs(60));
        handle.ensure_ready().unwrap();
        assert_eq!(handle.state(), RuntimeState::Ready);
    }

    #[test]
    fn test_concurrent_initializers_share_one_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let handle = RuntimeHandle::with_loader(
            Duration::from_secs(10),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                Ok(())
            }),
        );

        let mut joins = Vec::new();
        for _ in 0..4 {
            let handle = handle.clone();
            joins.push(thread::spawn(move || handle.ensure_ready()));
        }
        for join in joins {
            assert!(join.join().unwrap().is_ok());
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), RuntimeState::Ready);
    }

    #[test]
    fn test_load_failure_is_terminal_and_shared() {
        let handle = RuntimeHandle::with_loader(
            Duration::from_secs(10),
            Box::new(|| Err("backend exploded".to_string())),
        );

        let first = handle.ensure_ready();
        assert_eq!(
            first,
            Err(DeskewError::InitLoadFailure("backend exploded".to_string()))
        );

        // Terminal: a retry observes the recorded failure without reloading.
        let second = handle.ensure_ready();
        assert_eq!(first, second);
        assert!(matches!(handle.state(), RuntimeState::Failed(_)));
    }

    #[test]
    fn test_slow_load_times_out_and_stays_failed() {
        let handle = RuntimeHandle::with_loader(
            Duration::from_millis(50),
            Box::new(|| {
                thread::sleep(Duration::from_millis(400));
                Ok(())
            }),
        );

        let result = handle.ensure_ready();
        assert_eq!(result, Err(DeskewError::InitTimeout { timeout_secs: 0 }));

        // Even after the loader eventually succeeds, the terminal Failed
        // state is never overwritten.
        thread::sleep(Duration::from_millis(500));
        assert!(matches!(handle.state(), RuntimeState::Failed(_)));
        assert!(handle.ensure_ready().is_err());
    }
}
