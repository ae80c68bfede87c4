use serde::{Deserialize, Serialize};

use super::{CapturePlatform, CaptureSettings, ChunkSink, MediaEncoder, RenderSurface};
use crate::{timeline::FramePose, LavaError, Result};

pub const TRACE_MIME_TYPE: &str = "application/x-ndjson";

/// First line of a trace artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHeader {
    pub surface: RenderSurface,
    pub fps: u32,
    pub video_bits_per_second: u32,
    pub requested_mime_type: String,
}

/// One captured frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub frame: u64,
    pub timestamp_seconds: f64,
    pub pose: FramePose,
}

/// Headless capture platform that encodes each frame as a JSON line. Useful
/// wherever no real media pipeline exists, and as a stand-in for one in tests.
#[derive(Debug, Clone)]
pub struct TraceCapturePlatform {
    supported: bool,
    frames_per_chunk: usize,
}

impl Default for TraceCapturePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceCapturePlatform {
    pub fn new() -> Self {
        Self {
            supported: true,
            frames_per_chunk: 30,
        }
    }

    /// A platform that refuses every capture request.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn with_frames_per_chunk(mut self, frames: usize) -> Self {
        self.frames_per_chunk = frames.max(1);
        self
    }
}

impl CapturePlatform for TraceCapturePlatform {
    fn open_encoder(
        &mut self,
        surface: &RenderSurface,
        settings: &CaptureSettings,
        sink: ChunkSink,
    ) -> Result<Box<dyn MediaEncoder>> {
        if !self.supported {
            return Err(LavaError::unsupported("trace capture disabled on this host"));
        }
        settings.validate()?;

        Ok(Box::new(TraceEncoder {
            sink,
            header: TraceHeader {
                surface: *surface,
                fps: settings.fps,
                video_bits_per_second: settings.video_bits_per_second,
                requested_mime_type: settings.mime_type.clone(),
            },
            frames_per_chunk: self.frames_per_chunk,
            pending: Vec::new(),
            pending_frames: 0,
            frame_index: 0,
            running: false,
        }))
    }
}

struct TraceEncoder {
    sink: ChunkSink,
    header: TraceHeader,
    frames_per_chunk: usize,
    pending: Vec<u8>,
    pending_frames: usize,
    frame_index: u64,
    running: bool,
}

impl TraceEncoder {
    fn write_line<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.pending, value)?;
        self.pending.push(b'\n');
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.pending_frames = 0;
        let chunk = std::mem::take(&mut self.pending);
        self.sink.data_available(chunk)?;
        Ok(())
    }
}

impl MediaEncoder for TraceEncoder {
    fn mime_type(&self) -> &str {
        TRACE_MIME_TYPE
    }

    fn start(&mut self) -> Result<()> {
        if self.running {
            return Err(LavaError::msg("trace encoder already started"));
        }
        self.running = true;
        let header = self.header.clone();
        self.write_line(&header)
    }

    fn encode_frame(&mut self, frame: &FramePose) -> Result<()> {
        if !self.running {
            return Ok(());
        }

        let record = TraceRecord {
            frame: self.frame_index,
            timestamp_seconds: self.frame_index as f64 / f64::from(self.header.fps),
            pose: *frame,
        };
        self.write_line(&record)?;
        self.frame_index += 1;
        self.pending_frames += 1;

        if self.pending_frames >= self.frames_per_chunk {
            self.flush()?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.flush()?;
        self.sink.stopped()
    }
}
