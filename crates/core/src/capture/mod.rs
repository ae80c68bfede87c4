//! Capture of the rendered canvas into a single downloadable artifact.
//!
//! The controller never talks to a real encoder directly. A
//! [`CapturePlatform`] opens a [`MediaEncoder`] over the render surface and the
//! encoder reports its output through a [`ChunkSink`]; the controller drains
//! the matching [`ChunkQueue`] once the encoder says it has stopped.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{timeline::FramePose, LavaError, Result};

mod artifact;
mod queue;
mod trace;

pub use artifact::{container_mime, extension_for_mime, Artifact, ArtifactHandle, ArtifactStore};
pub use queue::{chunk_channel, ChunkQueue, ChunkSink};
pub use trace::{TraceCapturePlatform, TraceHeader, TraceRecord, TRACE_MIME_TYPE};

/// Configuration options for the capture subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub fps: u32,
    pub video_bits_per_second: u32,
    pub mime_type: String,
    pub file_stem: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            fps: 60,
            video_bits_per_second: 6_000_000,
            mime_type: "video/webm;codecs=vp9".to_string(),
            file_stem: "lava-icecream".to_string(),
        }
    }
}

impl CaptureSettings {
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(LavaError::msg("capture fps must be non-zero"));
        }
        if self.video_bits_per_second == 0 {
            return Err(LavaError::msg("capture bitrate must be non-zero"));
        }
        if container_mime(&self.mime_type).is_empty() {
            return Err(LavaError::msg("capture mime type must not be empty"));
        }
        if self.file_stem.trim().is_empty() {
            return Err(LavaError::msg("capture file stem must not be empty"));
        }
        Ok(())
    }

    pub fn download_name(&self, artifact: &Artifact) -> String {
        format!("{}.{}", self.file_stem, artifact.extension())
    }
}

/// The canvas a capture stream is opened over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSurface {
    pub width: u32,
    pub height: u32,
}

impl RenderSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Host facility that turns a render surface into an encoded media stream.
pub trait CapturePlatform {
    /// Opens a stream of `surface` at `settings.fps` and an encoder over it.
    /// Hosts without capture support return [`LavaError::UnsupportedCapture`].
    fn open_encoder(
        &mut self,
        surface: &RenderSurface,
        settings: &CaptureSettings,
        sink: ChunkSink,
    ) -> Result<Box<dyn MediaEncoder>>;
}

/// A running encoder. Output reaches the controller only through the
/// [`ChunkSink`] the encoder was opened with.
pub trait MediaEncoder {
    /// Container MIME type of the produced chunks.
    fn mime_type(&self) -> &str;
    fn start(&mut self) -> Result<()>;
    fn encode_frame(&mut self, frame: &FramePose) -> Result<()>;
    /// Requests a stop. The encoder flushes and then calls
    /// [`ChunkSink::stopped`], possibly later.
    fn stop(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureStatus {
    #[default]
    Idle,
    Recording,
    Complete,
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => Ok(()),
            Self::Recording => f.write_str("Recording..."),
            Self::Complete => f.write_str("Recording complete."),
        }
    }
}

/// Result of [`CaptureController::start_capture`]. Refusals leave every piece
/// of state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A session is already recording.
    Busy,
    /// No render surface exists yet.
    NoSurface,
}

struct CaptureSession {
    encoder: Box<dyn MediaEncoder>,
    queue: ChunkQueue,
    stop_at: Option<Duration>,
    stop_requested: bool,
    frames: u64,
}

/// Drives at most one capture session at a time and owns the resulting
/// download handle.
pub struct CaptureController {
    settings: CaptureSettings,
    session: Option<CaptureSession>,
    store: ArtifactStore,
    current: Option<ArtifactHandle>,
    status: CaptureStatus,
}

impl CaptureController {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            session: None,
            store: ArtifactStore::new(),
            current: None,
            status: CaptureStatus::Idle,
        }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Chunks buffered by the active session so far.
    pub fn buffered_chunks(&self) -> Result<usize> {
        match &self.session {
            Some(session) => session.queue.len(),
            None => Ok(0),
        }
    }

    /// Opens a session over `surface` that stops itself `duration` after
    /// `now`. Once the encoder is running the previous artifact is released;
    /// if the platform fails, the previous artifact and status are kept.
    pub fn start_capture(
        &mut self,
        surface: Option<&RenderSurface>,
        platform: &mut dyn CapturePlatform,
        duration: Duration,
        now: Duration,
    ) -> Result<StartOutcome> {
        if self.session.is_some() {
            tracing::debug!("capture already running, ignoring start request");
            return Ok(StartOutcome::Busy);
        }
        let Some(surface) = surface else {
            tracing::debug!("no render surface yet, ignoring start request");
            return Ok(StartOutcome::NoSurface);
        };

        let (sink, queue) = chunk_channel();
        let mut encoder = platform.open_encoder(surface, &self.settings, sink)?;
        encoder.start()?;

        self.release_artifact();

        tracing::info!(
            width = surface.width,
            height = surface.height,
            fps = self.settings.fps,
            duration_ms = duration.as_millis() as u64,
            mime = encoder.mime_type(),
            "capture started"
        );

        self.session = Some(CaptureSession {
            encoder,
            queue,
            stop_at: Some(now + duration),
            stop_requested: false,
            frames: 0,
        });
        self.status = CaptureStatus::Recording;
        Ok(StartOutcome::Started)
    }

    /// Hands one rendered frame to the active encoder. An encoder failure
    /// abandons the session so the controller returns to `Idle`.
    pub fn capture_frame(&mut self, frame: &FramePose) -> Result<()> {
        let Some(session) = &mut self.session else {
            return Ok(());
        };
        if session.stop_requested {
            return Ok(());
        }

        match session.encoder.encode_frame(frame) {
            Ok(()) => {
                session.frames += 1;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "encoder failed, abandoning capture");
                if let Err(stop_err) = self.cancel() {
                    tracing::warn!(error = %stop_err, "failed to stop encoder after error");
                }
                Err(err)
            }
        }
    }

    /// Fires the deferred stop once `now` reaches it and finalizes the session
    /// after the encoder reports it has stopped. Returns the new handle on the
    /// call that finalizes.
    pub fn poll(&mut self, now: Duration) -> Result<Option<ArtifactHandle>> {
        let Some(session) = &mut self.session else {
            return Ok(None);
        };

        if !session.stop_requested && session.stop_at.is_some_and(|at| now >= at) {
            session.stop_at = None;
            session.stop_requested = true;
            tracing::debug!(frames = session.frames, "capture duration elapsed, stopping encoder");
            session.encoder.stop()?;
        }

        if !session.queue.is_stopped()? {
            return Ok(None);
        }
        self.finalize().map(Some)
    }

    /// Stops the active session early without producing an artifact. The
    /// pending deferred stop is cancelled with it.
    pub fn cancel(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        self.status = CaptureStatus::Idle;
        let dropped = session.queue.drain_and_freeze()?.len();
        tracing::info!(frames = session.frames, dropped_bytes = dropped, "capture cancelled");
        if !session.stop_requested {
            session.encoder.stop()?;
        }
        Ok(())
    }

    /// Cancels any session and releases the current download handle.
    pub fn teardown(&mut self) -> Result<()> {
        let cancelled = self.cancel();
        self.release_artifact();
        self.status = CaptureStatus::Idle;
        cancelled
    }

    pub fn artifact_handle(&self) -> Option<&ArtifactHandle> {
        self.current.as_ref()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.current.as_ref().and_then(|handle| self.store.get(handle))
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn finalize(&mut self) -> Result<ArtifactHandle> {
        let session = self
            .session
            .take()
            .ok_or_else(|| LavaError::msg("no capture session to finalize"))?;
        let bytes = session.queue.drain_and_freeze()?;
        let artifact = Artifact::new(container_mime(session.encoder.mime_type()), bytes);
        if artifact.is_empty() {
            tracing::warn!("capture finished without any encoded data");
        }

        self.release_artifact();
        let handle = self.store.create(artifact);
        tracing::info!(frames = session.frames, url = handle.url(), "capture complete");

        self.current = Some(handle.clone());
        self.status = CaptureStatus::Complete;
        Ok(handle)
    }

    fn release_artifact(&mut self) {
        if let Some(handle) = self.current.take() {
            self.store.revoke(&handle);
        }
    }
}

impl fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureController")
            .field("settings", &self.settings)
            .field("recording", &self.session.is_some())
            .field("current", &self.current)
            .field("status", &self.status)
            .finish()
    }
}
