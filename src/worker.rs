//! # Isolated Execution Host
//!
//! Runs the deskew pipeline on a dedicated worker thread so a
//! multi-megapixel correction never blocks the caller's thread. Callers and
//! the worker communicate exclusively by message passing: a request channel
//! into the worker and a oneshot reply per request, correlated by a
//! monotonically increasing id. The vision runtime is initialized once per
//! host and shared by every request it services.
//!
//! Requests are serviced one at a time in arrival order. `init` must
//! complete (success or failure) before any `deskew` is serviced; the
//! readiness gate enforces this on the worker side, not by caller
//! discipline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::errors::{DeskewError, DeskewResult};
use crate::pipeline::{self, DeskewOptions};
use crate::raster::RasterImage;
use crate::vision::runtime::{RuntimeHandle, RuntimeState};

/// Operation tag carried by requests and echoed by responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Init,
    Deskew,
}

/// Pixel payload and options for one deskew request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskewJob {
    /// Interleaved RGBA bytes; length must equal `width * height * 4`.
    pub image_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub options: DeskewOptions,
}

/// Inbound message from a caller to the execution host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    /// Initialize the vision runtime (idempotent once resolved).
    Init { id: u64 },
    /// Run the pipeline on the supplied pixel buffer.
    Deskew { id: u64, data: DeskewJob },
}

impl WorkerRequest {
    /// Correlation id of the request.
    pub fn id(&self) -> u64 {
        match self {
            WorkerRequest::Init { id } => *id,
            WorkerRequest::Deskew { id, .. } => *id,
        }
    }

    /// Operation tag of the request.
    pub fn kind(&self) -> RequestKind {
        match self {
            WorkerRequest::Init { .. } => RequestKind::Init,
            WorkerRequest::Deskew { .. } => RequestKind::Deskew,
        }
    }
}

/// Corrected pixel buffer returned by a successful deskew request.
///
/// Output dimensions may differ from the input when the image was rotated
/// or cropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskewArtifact {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Outbound message from the execution host to a caller.
///
/// Exactly one response is produced per request id. Failures are always
/// structured: `error` carries the typed error and `fatal` tells the caller
/// whether the host instance is still usable, so recovery strategy never
/// depends on parsing error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Echoes the request's operation tag.
    #[serde(rename = "type")]
    pub kind: RequestKind,
    /// Echoes the request's correlation id.
    pub id: u64,
    pub success: bool,
    /// Present iff `!success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DeskewError>,
    /// True when the error terminates this host instance.
    pub fatal: bool,
    /// Present iff `success` and the request was a deskew.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DeskewArtifact>,
}

impl WorkerResponse {
    fn ok(kind: RequestKind, id: u64, result: Option<DeskewArtifact>) -> Self {
        Self {
            kind,
            id,
            success: true,
            error: None,
            fatal: false,
            result,
        }
    }

    fn failure(kind: RequestKind, id: u64, error: DeskewError) -> Self {
        let fatal = error.is_fatal();
        Self {
            kind,
            id,
            success: false,
            error: Some(error),
            fatal,
            result: None,
        }
    }
}

/// One queued request plus its reply slot.
struct Envelope {
    request: WorkerRequest,
    reply: oneshot::Sender<WorkerResponse>,
}

/// Client handle to a deskew worker thread.
///
/// The handle is the caller side of the isolation boundary: it assigns
/// request ids, submits requests, and suspends on the reply without
/// blocking other caller-side work. Dropping the last handle closes the
/// request channel and the worker thread exits after draining it.
///
/// # Examples
///
/// ```no_run
/// use page_deskew::{DeskewHost, DeskewOptions, HostConfig, RasterImage};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let host = DeskewHost::spawn(&HostConfig::default());
/// host.init().await?;
///
/// let image = RasterImage::from_rgba_bytes(vec![255; 4 * 100 * 80], 100, 80)?;
/// let corrected = host
///     .deskew(
///         image,
///         DeskewOptions {
///             auto_detect: true,
///             crop_white_border: true,
///             rotate_angle: 0.0,
///         },
///     )
///     .await?;
/// println!("corrected: {}x{}", corrected.width(), corrected.height());
/// # Ok(())
/// # }
/// ```
pub struct DeskewHost {
    sender: mpsc::UnboundedSender<Envelope>,
    runtime: RuntimeHandle,
    next_id: AtomicU64,
}

impl DeskewHost {
    /// Spawns a worker thread with an uninitialized vision runtime.
    ///
    /// Callers must submit an `init` request (see [`init`](Self::init))
    /// before deskew requests will be serviced.
    pub fn spawn(config: &HostConfig) -> Self {
        let runtime = RuntimeHandle::new(Duration::from_secs(config.init_timeout_secs));
        Self::spawn_with_runtime(runtime)
    }

    /// Spawns a worker around an existing runtime handle. Used by tests to
    /// inject load behavior.
    pub(crate) fn spawn_with_runtime(runtime: RuntimeHandle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker_runtime = runtime.clone();
        thread::spawn(move || host_loop(receiver, worker_runtime));

        Self {
            sender,
            runtime,
            next_id: AtomicU64::new(0),
        }
    }

    /// Snapshot of the host's runtime lifecycle state.
    pub fn status(&self) -> RuntimeState {
        self.runtime.state()
    }

    /// Initializes the vision runtime.
    ///
    /// Safe to call from several tasks: all initializations before the
    /// first completes share one load attempt and observe the same outcome,
    /// and later calls resolve immediately with the recorded outcome.
    pub async fn init(&self) -> DeskewResult<()> {
        let id = self.next_request_id();
        let response = self.submit(WorkerRequest::Init { id }).await?;
        match response.error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Runs the pipeline on a 4-channel image in the worker thread.
    ///
    /// # Errors
    ///
    /// [`DeskewError::NotReady`] before a successful [`init`](Self::init),
    /// [`DeskewError::InvalidImageData`] for non-RGBA payloads, plus any
    /// pipeline error. Fatal init errors are returned for every request
    /// once the host has failed.
    pub async fn deskew(
        &self,
        image: RasterImage,
        options: DeskewOptions,
    ) -> DeskewResult<RasterImage> {
        let id = self.next_request_id();
        let (width, height) = (image.width(), image.height());
        let request = WorkerRequest::Deskew {
            id,
            data: DeskewJob {
                image_data: image.into_bytes(),
                width,
                height,
                options,
            },
        };

        let response = self.submit(request).await?;
        if let Some(error) = response.error {
            return Err(error);
        }

        let artifact = response.result.ok_or_else(|| {
            DeskewError::Processing("worker response carried no result payload".to_string())
        })?;
        RasterImage::from_rgba_bytes(artifact.data, artifact.width, artifact.height)
    }

    /// Submits a raw protocol request and awaits its response.
    ///
    /// The response's id always equals the request's id.
    pub async fn submit(&self, request: WorkerRequest) -> DeskewResult<WorkerResponse> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(Envelope { request, reply })
            .map_err(|_| DeskewError::HostUnavailable)?;
        receiver.await.map_err(|_| DeskewError::HostUnavailable)
    }

    /// Next correlation id; one counter covers init and deskew requests.
    pub fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Serial message loop run on the worker thread.
fn host_loop(mut receiver: mpsc::UnboundedReceiver<Envelope>, runtime: RuntimeHandle) {
    info!(target: "deskew_worker", "deskew worker thread started");

    while let Some(envelope) = receiver.blocking_recv() {
        let response = handle_request(&runtime, envelope.request);
        // A caller that gave up on the reply just discards the response.
        let _ = envelope.reply.send(response);
    }

    info!(
        target: "deskew_worker",
        "request channel closed; deskew worker thread exiting"
    );
}

fn handle_request(runtime: &RuntimeHandle, request: WorkerRequest) -> WorkerResponse {
    let kind = request.kind();
    let id = request.id();
    let started = Instant::now();

    let outcome = match request {
        WorkerRequest::Init { .. } => runtime.ensure_ready().map(|()| None),
        WorkerRequest::Deskew { data, .. } => run_deskew(runtime, data).map(Some),
    };

    match outcome {
        Ok(result) => {
            debug!(
                target: "deskew_worker",
                id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request complete"
            );
            WorkerResponse::ok(kind, id, result)
        }
        Err(error) => {
            warn!(
                target: "deskew_worker",
                id,
                error = %error,
                fatal = error.is_fatal(),
                "request failed"
            );
            WorkerResponse::failure(kind, id, error)
        }
    }
}

fn run_deskew(runtime: &RuntimeHandle, job: DeskewJob) -> DeskewResult<DeskewArtifact> {
    match runtime.state() {
        RuntimeState::Ready => {}
        // A failed host reports its recorded fatal error for every request.
        RuntimeState::Failed(error) => return Err(error),
        RuntimeState::Uninitialized | RuntimeState::Initializing => {
            return Err(DeskewError::NotReady)
        }
    }

    let image = RasterImage::from_rgba_bytes(job.image_data, job.width, job.height)?;
    let outcome = pipeline::deskew(&image.to_dynamic(), &job.options)?;

    let (width, height) = outcome.image.dimensions();
    Ok(DeskewArtifact {
        data: outcome.image.into_raw(),
        width,
        height,
    })
}
