use std::sync::Arc;
use std::time::Duration;

use crate::{
    capture::{ArtifactHandle, CaptureController, CapturePlatform, CaptureStatus, RenderSurface, StartOutcome},
    scene::{Rig, SceneDescriptor},
    timeline::{FramePose, TimelineDriver},
    AppConfig, Result,
};

/// A finalized recording ready to be offered for download.
#[derive(Debug, Clone)]
pub struct Download {
    pub handle: ArtifactHandle,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl Download {
    /// Empty recordings are valid but hosts usually should not offer them.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Everything the page owns: the rig, its timeline, the capture controller and
/// the render surface once the host has created it.
#[derive(Debug)]
pub struct Studio {
    scene: SceneDescriptor,
    rig: Rig,
    timeline: TimelineDriver,
    capture: CaptureController,
    surface: Option<RenderSurface>,
    record_duration: Duration,
}

impl Studio {
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let scene = SceneDescriptor::lava_icecream();
        let rig = Rig::from_descriptor(&scene)?;

        Ok(Self {
            scene,
            rig,
            timeline: TimelineDriver::with_stop_after(config.playback.stop_after_seconds),
            capture: CaptureController::new(config.capture.clone()),
            surface: None,
            record_duration: Duration::from_millis(config.playback.record_duration_ms),
        })
    }

    pub fn scene(&self) -> &SceneDescriptor {
        &self.scene
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    pub fn timeline(&self) -> &TimelineDriver {
        &self.timeline
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    pub fn record_duration(&self) -> Duration {
        self.record_duration
    }

    /// Called by the host once its canvas exists.
    pub fn attach_surface(&mut self, surface: RenderSurface) {
        self.surface = Some(surface);
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_recording()
    }

    pub fn status_text(&self) -> String {
        self.capture.status().to_string()
    }

    pub fn status(&self) -> CaptureStatus {
        self.capture.status()
    }

    /// Plays the clip once from the start. Ignored while recording so the
    /// captured clip is not cut short. Returns whether playback restarted.
    pub fn play_once(&mut self) -> bool {
        if self.is_recording() {
            return false;
        }
        self.timeline.restart();
        true
    }

    /// Starts a recording of the configured duration; see [`Self::record_for`].
    pub fn record(&mut self, platform: &mut dyn CapturePlatform, now: Duration) -> Result<StartOutcome> {
        self.record_for(platform, self.record_duration, now)
    }

    /// Starts a recording and forces playback from `t = 0` so the clip
    /// contains the whole animation.
    pub fn record_for(
        &mut self,
        platform: &mut dyn CapturePlatform,
        duration: Duration,
        now: Duration,
    ) -> Result<StartOutcome> {
        let outcome = self
            .capture
            .start_capture(self.surface.as_ref(), platform, duration, now)?;
        if outcome == StartOutcome::Started {
            self.timeline.restart();
        }
        Ok(outcome)
    }

    /// One render-loop tick: advance and apply the timeline, hand the painted
    /// frame to an active capture and let the capture finish if it is due.
    /// A failing encoder ends the recording before the error is returned.
    pub fn frame(&mut self, delta: f32, now: Duration) -> Result<FramePose> {
        let pose = self
            .timeline
            .tick(delta, &mut self.rig)
            .or_else(|| self.timeline.pose())
            .unwrap_or_else(|| FramePose::sample(0.0));

        self.capture.capture_frame(&pose)?;
        self.capture.poll(now)?;
        Ok(pose)
    }

    /// The download affordance. Present only after a recording finalized.
    pub fn download(&self) -> Option<Download> {
        let handle = self.capture.artifact_handle()?;
        let artifact = self.capture.artifact()?;
        Some(Download {
            handle: handle.clone(),
            file_name: self.capture.settings().download_name(artifact),
            mime_type: artifact.mime_type().to_string(),
            bytes: artifact.shared_bytes(),
        })
    }

    /// Cancels a running recording and releases the download handle.
    pub fn teardown(&mut self) -> Result<()> {
        self.timeline.set_playing(false);
        self.capture.teardown()
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        if let Err(err) = self.capture.teardown() {
            tracing::warn!(error = %err, "failed to tear down capture");
        }
    }
}
