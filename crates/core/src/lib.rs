//! Core library for the Lava Ice-Cream animation.
//!
//! A character eats a glowing ice-cream scoop over six seconds. The
//! [`timeline`] module poses the animated parts as a pure function of elapsed
//! time, [`capture`] turns rendered frames into one downloadable artifact
//! through a pluggable media platform, and [`studio`] wires both to a host
//! render loop the way the page's controls do.

pub mod capture;
pub mod config;
pub mod error;
pub mod scene;
pub mod studio;
pub mod timeline;

pub use capture::{
    Artifact, ArtifactHandle, ArtifactStore, CaptureController, CapturePlatform, CaptureSettings,
    CaptureStatus, ChunkQueue, ChunkSink, MediaEncoder, RenderSurface, StartOutcome,
    TraceCapturePlatform,
};
pub use config::{AppConfig, PlaybackConfig};
pub use error::{LavaError, Result};
pub use scene::{AnimatedRig, EmissiveMaterial, Rig, SceneDescriptor, StandardMaterial, Transform, Vec3};
pub use studio::{Download, Studio};
pub use timeline::{AnimationClock, FramePose, PlaybackState, TimelineDriver};
