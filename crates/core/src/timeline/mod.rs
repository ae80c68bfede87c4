use serde::{Deserialize, Serialize};

use crate::scene::{AnimatedRig, Vec3};

/// Playback halts once elapsed time passes this point.
pub const STOP_AFTER_SECONDS: f32 = 6.0;

const CONE_TRAVEL_SECONDS: f32 = 1.5;
const CONE_START: Vec3 = Vec3::new(1.8, 1.1, 0.6);
const CONE_END: Vec3 = Vec3::new(0.0, 1.2, 0.5);
const CONE_TILT_START: f32 = -0.6;
const CONE_TILT_RANGE: f32 = 0.4;

const CHEW_START: f32 = 1.1;
const CHEW_RAMP: f32 = 1.7;
const CHEW_FREQUENCY: f32 = 5.2;
const MOUTH_REST_HEIGHT: f32 = 0.06;
const MOUTH_OPEN_HEIGHT: f32 = 0.12;
const MOUTH_MIN_SCALE: f32 = 0.05;

const SHRINK_START: f32 = 2.6;
const SHRINK_SECONDS: f32 = 0.9;
const SCOOP_EATEN_SCALE: f32 = 0.05;

const GLOW_BASE: f32 = 2.5;
const GLOW_DEPTH: f32 = 0.6;
const GLOW_FREQUENCY: f32 = 6.0;

pub fn ease_out_cubic(k: f32) -> f32 {
    1.0 - (1.0 - k).powi(3)
}

pub fn lerp(a: f32, b: f32, k: f32) -> f32 {
    a + (b - a) * k
}

pub fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Every animated attribute for a single instant of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePose {
    pub time_seconds: f32,
    pub cone_position: Vec3,
    pub cone_rotation_z: f32,
    pub mouth_scale_y: f32,
    pub scoop_scale: f32,
    pub scoop_emissive_intensity: f32,
}

impl FramePose {
    /// Evaluates the fixed schedule at `t` seconds after play start.
    ///
    /// * `0.0..=1.5` the cone travels to the mouth with a cubic ease-out and
    ///   tilts towards it.
    /// * `1.1..=2.8` the mouth chews, opening wider as the chew ramps in.
    /// * `2.6..=3.5` the scoop shrinks as it is eaten.
    ///
    /// The scoop glow pulses for the whole clip. Negative input is read as 0.
    pub fn sample(t: f32) -> Self {
        let t = t.max(0.0);

        let k = ease_out_cubic((t / CONE_TRAVEL_SECONDS).min(1.0));
        let cone_position = CONE_START.lerp(CONE_END, k);
        let cone_rotation_z = CONE_TILT_START + CONE_TILT_RANGE * k;

        let chew = clamp01((t - CHEW_START) / CHEW_RAMP);
        let phase = (t * CHEW_FREQUENCY).sin() * chew;
        let open = MOUTH_REST_HEIGHT + MOUTH_OPEN_HEIGHT * phase.max(0.0);
        let mouth_scale_y = (open / MOUTH_REST_HEIGHT).max(MOUTH_MIN_SCALE);

        let shrink = clamp01((t - SHRINK_START) / SHRINK_SECONDS);
        let scoop_scale = lerp(1.0, SCOOP_EATEN_SCALE, shrink);
        let scoop_emissive_intensity = GLOW_BASE * (1.0 + GLOW_DEPTH * (t * GLOW_FREQUENCY).sin());

        Self {
            time_seconds: t,
            cone_position,
            cone_rotation_z,
            mouth_scale_y,
            scoop_scale,
            scoop_emissive_intensity,
        }
    }

    /// Writes the pose into whichever parts the rig currently exposes.
    pub fn apply(&self, rig: &mut dyn AnimatedRig) {
        if let Some(cone) = rig.cone_holder() {
            cone.position = self.cone_position;
            cone.rotation.z = self.cone_rotation_z;
        }
        if let Some(mouth) = rig.mouth() {
            mouth.scale.y = self.mouth_scale_y;
        }
        if let Some((scoop, material)) = rig.scoop() {
            scoop.scale = Vec3::splat(self.scoop_scale);
            material.set_emissive_intensity(self.scoop_emissive_intensity);
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AnimationClock {
    elapsed_seconds: f32,
    running: bool,
}

impl AnimationClock {
    pub fn start(&mut self) {
        self.elapsed_seconds = 0.0;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Moves time forward while running. Negative deltas are ignored so the
    /// elapsed value never decreases.
    pub fn advance(&mut self, delta: f32) -> f32 {
        if self.running && delta > 0.0 {
            self.elapsed_seconds += delta;
        }
        self.elapsed_seconds
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn clamp_to(&mut self, limit: f32) {
        self.elapsed_seconds = self.elapsed_seconds.min(limit);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// Owns the clock and drives the rig from the fixed schedule once per frame.
#[derive(Debug, Clone)]
pub struct TimelineDriver {
    clock: AnimationClock,
    state: PlaybackState,
    stop_after: f32,
    last_pose: Option<FramePose>,
}

impl Default for TimelineDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineDriver {
    pub fn new() -> Self {
        Self::with_stop_after(STOP_AFTER_SECONDS)
    }

    pub fn with_stop_after(stop_after: f32) -> Self {
        Self {
            clock: AnimationClock::default(),
            state: PlaybackState::Stopped,
            stop_after,
            last_pose: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    /// Last pose written to the rig, if any frame has run yet.
    pub fn pose(&self) -> Option<FramePose> {
        self.last_pose
    }

    /// Follows an external "should play" flag. Only edges cause a transition.
    pub fn set_playing(&mut self, playing: bool) {
        match (self.state, playing) {
            (PlaybackState::Stopped, true) => self.enter_playing(),
            (PlaybackState::Playing, false) => self.exit_playing(),
            _ => {}
        }
    }

    /// Starts a fresh pass from `t = 0`, even if one is already running.
    pub fn restart(&mut self) {
        self.set_playing(false);
        self.set_playing(true);
    }

    /// Advances the clock and poses the rig. Returns the applied pose, or
    /// `None` when playback is stopped.
    pub fn tick(&mut self, delta: f32, rig: &mut dyn AnimatedRig) -> Option<FramePose> {
        if self.state != PlaybackState::Playing {
            return None;
        }

        let elapsed = self.clock.advance(delta);
        let finished = elapsed > self.stop_after;
        if finished {
            self.clock.clamp_to(self.stop_after);
        }

        let pose = FramePose::sample(self.clock.elapsed());
        pose.apply(rig);
        self.last_pose = Some(pose);

        if finished {
            tracing::debug!(elapsed = self.clock.elapsed(), "timeline reached its end");
            self.exit_playing();
        }
        Some(pose)
    }

    fn enter_playing(&mut self) {
        self.clock.start();
        self.state = PlaybackState::Playing;
        tracing::debug!("timeline playing");
    }

    fn exit_playing(&mut self) {
        self.clock.stop();
        self.state = PlaybackState::Stopped;
        tracing::debug!(elapsed = self.clock.elapsed(), "timeline stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Rig;

    fn rest_rig() -> Rig {
        Rig::lava_icecream().unwrap()
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn cone_starts_and_ends_on_the_literal_points() {
        let start = FramePose::sample(0.0);
        assert_eq!(start.cone_position, Vec3::new(1.8, 1.1, 0.6));
        assert!(close(start.cone_rotation_z, -0.6));

        let end = FramePose::sample(1.5);
        assert_eq!(end.cone_position, Vec3::new(0.0, 1.2, 0.5));
        assert!(close(end.cone_rotation_z, -0.2));
    }

    #[test]
    fn cone_midpoint_follows_ease_out() {
        assert!(close(ease_out_cubic(0.5), 0.875));

        let pose = FramePose::sample(0.75);
        assert!(close(pose.cone_position.x, 0.225));
        assert!(close(pose.cone_position.y, 1.1875));
        assert!(close(pose.cone_position.z, 0.5125));
    }

    #[test]
    fn cone_stays_between_endpoints() {
        for step in 0..=150 {
            let t = step as f32 / 100.0;
            let k = ease_out_cubic((t / 1.5).min(1.0));
            let pose = FramePose::sample(t);
            let expected = Vec3::new(1.8, 1.1, 0.6).lerp(Vec3::new(0.0, 1.2, 0.5), k);
            assert_eq!(pose.cone_position, expected, "t = {t}");
            assert!((0.0..=1.8).contains(&pose.cone_position.x));
        }
    }

    #[test]
    fn mouth_rests_until_chewing_begins() {
        for step in 0..=110 {
            let t = step as f32 / 100.0;
            assert_eq!(FramePose::sample(t).mouth_scale_y, 1.0, "t = {t}");
        }
    }

    #[test]
    fn mouth_opens_while_chewing() {
        let max = (110..=280)
            .map(|step| FramePose::sample(step as f32 / 100.0).mouth_scale_y)
            .fold(0.0_f32, f32::max);
        assert!(max > 1.5);
        assert!(max <= 3.0);
    }

    #[test]
    fn scoop_shrinks_between_two_six_and_three_five() {
        assert_eq!(FramePose::sample(2.0).scoop_scale, 1.0);
        assert!(close(FramePose::sample(3.05).scoop_scale, 0.525));
        assert!(close(FramePose::sample(3.5).scoop_scale, 0.05));
        assert!(close(FramePose::sample(5.0).scoop_scale, 0.05));
    }

    #[test]
    fn glow_pulses_around_base_intensity() {
        assert!(close(FramePose::sample(0.0).scoop_emissive_intensity, 2.5));
        let t = std::f32::consts::FRAC_PI_2 / 6.0;
        assert!(close(FramePose::sample(t).scoop_emissive_intensity, 4.0));
    }

    #[test]
    fn negative_time_reads_as_zero() {
        assert_eq!(FramePose::sample(-1.0), FramePose::sample(0.0));
    }

    #[test]
    fn sampling_is_deterministic() {
        for step in 0..60 {
            let t = step as f32 * 0.1;
            assert_eq!(FramePose::sample(t), FramePose::sample(t));
        }
    }

    #[test]
    fn apply_writes_into_rig() {
        let mut rig = rest_rig();
        let pose = FramePose::sample(3.0);
        pose.apply(&mut rig);

        assert_eq!(rig.cone_holder.position, pose.cone_position);
        assert_eq!(rig.cone_holder.rotation.z, pose.cone_rotation_z);
        assert_eq!(rig.mouth.scale.y, pose.mouth_scale_y);
        assert_eq!(rig.mouth.scale.x, 1.0);
        assert_eq!(rig.scoop.scale, Vec3::splat(pose.scoop_scale));
        assert_eq!(rig.scoop_material.emissive_intensity, pose.scoop_emissive_intensity);
    }

    #[test]
    fn tick_is_a_no_op_while_stopped() {
        let mut rig = rest_rig();
        let mut driver = TimelineDriver::new();

        assert!(driver.tick(0.5, &mut rig).is_none());
        assert_eq!(driver.elapsed(), 0.0);
        assert_eq!(rig, rest_rig());
    }

    #[test]
    fn rising_edge_resets_the_clock() {
        let mut rig = rest_rig();
        let mut driver = TimelineDriver::new();
        driver.set_playing(true);
        driver.tick(1.0, &mut rig);

        driver.set_playing(true);
        assert_eq!(driver.elapsed(), 1.0);

        driver.set_playing(false);
        assert_eq!(driver.state(), PlaybackState::Stopped);
        assert_eq!(driver.elapsed(), 1.0);

        driver.set_playing(true);
        assert_eq!(driver.elapsed(), 0.0);
        assert!(driver.is_playing());
    }

    #[test]
    fn restart_always_begins_at_zero() {
        let mut rig = rest_rig();
        let mut driver = TimelineDriver::new();
        driver.set_playing(true);
        driver.tick(2.0, &mut rig);

        driver.restart();
        assert!(driver.is_playing());
        assert_eq!(driver.elapsed(), 0.0);
    }

    #[test]
    fn elapsed_never_decreases() {
        let mut rig = rest_rig();
        let mut driver = TimelineDriver::new();
        driver.set_playing(true);
        driver.tick(0.5, &mut rig);
        driver.tick(-0.25, &mut rig);
        assert_eq!(driver.elapsed(), 0.5);
    }

    #[test]
    fn auto_stops_and_freezes_after_six_seconds() {
        let mut rig = rest_rig();
        let mut driver = TimelineDriver::new();
        driver.set_playing(true);

        for _ in 0..400 {
            driver.tick(1.0 / 60.0, &mut rig);
        }

        assert!(!driver.is_playing());
        assert_eq!(driver.elapsed(), STOP_AFTER_SECONDS);
        let frozen = driver.pose().unwrap();
        assert_eq!(frozen, FramePose::sample(STOP_AFTER_SECONDS));

        let snapshot = rig.clone();
        assert!(driver.tick(1.0 / 60.0, &mut rig).is_none());
        assert_eq!(rig, snapshot);
        assert_eq!(driver.pose(), Some(frozen));
    }

    #[test]
    fn repeated_application_of_the_same_time_is_idempotent() {
        let mut rig = rest_rig();
        let mut driver = TimelineDriver::new();
        driver.set_playing(true);
        let first = driver.tick(2.2, &mut rig).unwrap();
        let after_first = rig.clone();

        let second = driver.tick(0.0, &mut rig).unwrap();
        assert_eq!(first, second);
        assert_eq!(rig, after_first);
    }

    struct MouthOnly {
        mouth: crate::scene::Transform,
    }

    impl AnimatedRig for MouthOnly {
        fn cone_holder(&mut self) -> Option<&mut crate::scene::Transform> {
            None
        }

        fn mouth(&mut self) -> Option<&mut crate::scene::Transform> {
            Some(&mut self.mouth)
        }

        fn scoop(&mut self) -> Option<(&mut crate::scene::Transform, &mut dyn crate::scene::EmissiveMaterial)> {
            None
        }
    }

    #[test]
    fn missing_parts_are_skipped() {
        let mut rig = MouthOnly {
            mouth: Default::default(),
        };
        let pose = FramePose::sample(1.4);
        pose.apply(&mut rig);
        assert_eq!(rig.mouth.scale.y, pose.mouth_scale_y);
    }
}
