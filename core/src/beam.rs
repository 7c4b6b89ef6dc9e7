use beamsweep_shared::config::GameConfig;
use beamsweep_shared::geometry::{vec3, Pose, Quat, Sphere, Vec3};
use serde::{Deserialize, Serialize};

/// How the local player aims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Tracked 6-DOF pose each frame (hand gesture)
    Continuous,
    /// Drag or controller deltas applied to a fixed turret
    Discrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeamState {
    Idle,
    Emitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamTransition {
    Started,
    Stopped,
}

/// Output of one sweep tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamFrame {
    pub probe: Sphere,
    pub sweep_phase: f64,
    pub aim: Pose,
}

/// Rolling average of the last N rotations.
#[derive(Debug, Clone)]
pub struct RotationSmoother {
    samples: Vec<Quat>,
    capacity: usize,
    next: usize,
}

impl RotationSmoother {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            next: 0,
        }
    }

    /// Add a sample and return the normalized average of the window.
    pub fn push(&mut self, q: Quat) -> Quat {
        if self.samples.len() < self.capacity {
            self.samples.push(q);
        } else {
            self.samples[self.next] = q;
        }
        self.next = (self.next + 1) % self.capacity;
        self.average()
    }

    pub fn average(&self) -> Quat {
        let Some(reference) = self.samples.last().copied() else {
            return Quat::IDENTITY;
        };
        // q and -q are the same rotation; flip samples into one hemisphere first
        let mut sum = Quat::new(0.0, 0.0, 0.0, 0.0);
        for s in &self.samples {
            let s = if s.dot(reference) < 0.0 { s.neg() } else { *s };
            sum = Quat::new(sum.x + s.x, sum.y + s.y, sum.z + s.z, sum.w + s.w);
        }
        sum.normalize()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next = 0;
    }
}

/// Yaw/pitch accumulated from 2D deltas, each clamped independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscreteAim {
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    clamp_deg: f64,
}

impl DiscreteAim {
    pub fn new(clamp_deg: f64) -> Self {
        Self {
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            clamp_deg,
        }
    }

    pub fn apply_delta(&mut self, dx_deg: f64, dy_deg: f64) {
        self.yaw_deg = (self.yaw_deg + dx_deg).clamp(-self.clamp_deg, self.clamp_deg);
        self.pitch_deg = (self.pitch_deg + dy_deg).clamp(-self.clamp_deg, self.clamp_deg);
    }

    /// Yaw about +Y, then pitch about the yawed +X.
    pub fn rotation(&self) -> Quat {
        let yaw = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), self.yaw_deg.to_radians());
        let pitch = Quat::from_axis_angle(vec3(1.0, 0.0, 0.0), self.pitch_deg.to_radians());
        yaw.mul(pitch)
    }

    pub fn reset(&mut self) {
        self.yaw_deg = 0.0;
        self.pitch_deg = 0.0;
    }
}

/// Beam aim state and sweep simulation. Time is seconds on the game clock.
pub struct BeamSimulator {
    mode: InputMode,
    state: BeamState,
    suspended: bool,
    sweep_phase: f64,
    sweep_rate: f64,
    last_tick: Option<f64>,
    last_aim_seen: Option<f64>,
    last_controller_input: Option<f64>,
    smoother: RotationSmoother,
    discrete: DiscreteAim,
    aim: Pose,
    turret_position: Vec3,
    probe: Option<Sphere>,

    continuous_reach: f64,
    continuous_radius: f64,
    discrete_reach: f64,
    discrete_radius: f64,
    grace: f64,
    controller_speed: f64,
    controller_idle: f64,
}

impl BeamSimulator {
    pub fn new(config: &GameConfig, mode: InputMode) -> Self {
        let turret_position = Vec3::from_array(config.turret_position);
        let mut sim = Self {
            mode,
            state: BeamState::Idle,
            suspended: false,
            sweep_phase: 0.0,
            sweep_rate: config.sweep_rate,
            last_tick: None,
            last_aim_seen: None,
            last_controller_input: None,
            smoother: RotationSmoother::new(config.smoothing_window),
            discrete: DiscreteAim::new(config.discrete_clamp_deg),
            aim: Pose::new(turret_position, Quat::IDENTITY),
            turret_position,
            probe: None,
            continuous_reach: config.continuous_reach,
            continuous_radius: config.continuous_probe_radius,
            discrete_reach: config.discrete_reach,
            discrete_radius: config.discrete_probe_radius,
            grace: config.aim_grace,
            controller_speed: config.controller_speed,
            controller_idle: config.controller_idle,
        };
        sim.reset_aim();
        sim
    }

    // --- accessors ---

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn state(&self) -> BeamState {
        self.state
    }

    pub fn is_emitting(&self) -> bool {
        self.state == BeamState::Emitting
    }

    /// Emitting and not suspended: sweep ticks will produce frames.
    pub fn is_sweeping(&self) -> bool {
        self.is_emitting() && !self.suspended
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn sweep_phase(&self) -> f64 {
        self.sweep_phase
    }

    pub fn sweep_rate(&self) -> f64 {
        self.sweep_rate
    }

    pub fn probe(&self) -> Option<Sphere> {
        self.probe
    }

    pub fn aim(&self) -> Pose {
        self.aim
    }

    pub fn set_sweep_rate(&mut self, rate: f64) {
        self.sweep_rate = rate;
    }

    // --- mode & lifecycle ---

    pub fn set_mode(&mut self, mode: InputMode) -> Option<BeamTransition> {
        if mode == self.mode {
            return None;
        }
        let transition = self.stop();
        self.mode = mode;
        self.reset_aim();
        transition
    }

    fn start(&mut self, now: f64) -> Option<BeamTransition> {
        if self.is_emitting() {
            return None;
        }
        self.state = BeamState::Emitting;
        self.last_tick = Some(now);
        Some(BeamTransition::Started)
    }

    /// Go idle and drop the probe. The sweep phase is kept.
    pub fn stop(&mut self) -> Option<BeamTransition> {
        if !self.is_emitting() {
            return None;
        }
        self.state = BeamState::Idle;
        self.probe = None;
        self.last_tick = None;
        self.last_controller_input = None;
        Some(BeamTransition::Stopped)
    }

    /// Freeze for a pause. The phase survives, the probe does not.
    pub fn suspend(&mut self) {
        self.suspended = true;
        self.probe = None;
        self.last_tick = None;
    }

    /// Continue after a pause without replaying the paused time.
    pub fn resume(&mut self, now: f64) {
        if !self.suspended {
            return;
        }
        self.suspended = false;
        if self.is_emitting() {
            self.last_tick = Some(now);
        }
        if self.last_aim_seen.is_some() {
            self.last_aim_seen = Some(now);
        }
        if self.last_controller_input.is_some() {
            self.last_controller_input = Some(now);
        }
    }

    /// Drop a pause that will never be resumed (the round ended while paused).
    pub fn clear_suspension(&mut self) {
        self.suspended = false;
    }

    /// Back to aim-at-rest, keeping mode and phase.
    pub fn reset_aim(&mut self) {
        self.smoother.clear();
        self.discrete.reset();
        self.last_aim_seen = None;
        self.aim = match self.mode {
            InputMode::Continuous => Pose::default(),
            InputMode::Discrete => Pose::new(self.turret_position, Quat::IDENTITY),
        };
    }

    pub fn reset(&mut self) {
        self.stop();
        self.suspended = false;
        self.sweep_phase = 0.0;
        self.reset_aim();
    }

    // --- continuous input ---

    /// Feed this frame's tracked pose, or `None` when tracking is lost.
    /// `can_emit` gates Idle -> Emitting (session must be playing).
    pub fn update_continuous(
        &mut self,
        pose: Option<Pose>,
        now: f64,
        can_emit: bool,
    ) -> Option<BeamTransition> {
        if self.mode != InputMode::Continuous {
            return None;
        }
        match pose {
            Some(pose) => {
                self.aim.position = pose.position;
                self.aim.rotation = self.smoother.push(pose.rotation);
                self.last_aim_seen = Some(now);
                if can_emit {
                    self.start(now)
                } else {
                    None
                }
            }
            None => self.check_timeouts(now),
        }
    }

    // --- discrete input ---

    pub fn discrete_begin(&mut self, now: f64, can_emit: bool) -> Option<BeamTransition> {
        if self.mode != InputMode::Discrete || !can_emit {
            return None;
        }
        self.last_controller_input = None;
        self.start(now)
    }

    pub fn discrete_delta(&mut self, dx_deg: f64, dy_deg: f64) {
        if self.mode != InputMode::Discrete {
            return;
        }
        self.discrete.apply_delta(dx_deg, dy_deg);
        self.aim = Pose::new(self.turret_position, self.discrete.rotation());
    }

    pub fn discrete_end(&mut self) -> Option<BeamTransition> {
        if self.mode != InputMode::Discrete {
            return None;
        }
        self.stop()
    }

    /// Gamepad stick input. Each event moves the aim by `speed` degrees per
    /// unit axis and keeps the beam alive for the idle window.
    pub fn controller_axis(
        &mut self,
        x: f64,
        y: f64,
        now: f64,
        can_emit: bool,
    ) -> Option<BeamTransition> {
        if self.mode != InputMode::Discrete {
            return None;
        }
        self.discrete_delta(x * self.controller_speed, -y * self.controller_speed);
        if !can_emit {
            return None;
        }
        self.last_controller_input = Some(now);
        self.start(now)
    }

    pub fn discrete_aim(&self) -> DiscreteAim {
        self.discrete
    }

    /// Stop the beam if its input went quiet: the grace window for a lost
    /// continuous pose, the idle window for controller input.
    pub fn check_timeouts(&mut self, now: f64) -> Option<BeamTransition> {
        if !self.is_emitting() || self.suspended {
            return None;
        }
        match self.mode {
            InputMode::Continuous => match self.last_aim_seen {
                Some(seen) if now - seen > self.grace => self.stop(),
                None => self.stop(),
                _ => None,
            },
            InputMode::Discrete => match self.last_controller_input {
                Some(last) if now - last > self.controller_idle => self.stop(),
                _ => None,
            },
        }
    }

    // --- sweep ---

    /// Advance the sweep to `now` and place the probe. Returns `None` while
    /// idle or suspended.
    pub fn tick(&mut self, now: f64) -> Option<BeamFrame> {
        if !self.is_sweeping() {
            return None;
        }
        let elapsed = match self.last_tick {
            Some(last) => (now - last).max(0.0),
            None => 0.0,
        };
        self.last_tick = Some(now);
        self.sweep_phase = (self.sweep_phase + elapsed * self.sweep_rate).rem_euclid(1.0);

        let (reach, radius) = match self.mode {
            InputMode::Continuous => (self.continuous_reach, self.continuous_radius),
            InputMode::Discrete => (self.discrete_reach, self.discrete_radius),
        };
        let center = self
            .aim
            .transform_point(vec3(0.0, 0.0, -reach * self.sweep_phase));
        let probe = Sphere::new(center, radius);
        self.probe = Some(probe);

        Some(BeamFrame {
            probe,
            sweep_phase: self.sweep_phase,
            aim: self.aim,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn test_config() -> GameConfig {
        GameConfig::default()
    }

    fn pose_forward() -> Pose {
        Pose::new(vec3(0.0, 1.5, 0.0), Quat::IDENTITY)
    }

    fn continuous() -> BeamSimulator {
        BeamSimulator::new(&test_config(), InputMode::Continuous)
    }

    fn discrete() -> BeamSimulator {
        BeamSimulator::new(&test_config(), InputMode::Discrete)
    }

    // --- continuous mode ---

    #[test]
    fn continuous_pose_starts_emitting() {
        let mut beam = continuous();
        let t = beam.update_continuous(Some(pose_forward()), 0.0, true);
        assert_eq!(t, Some(BeamTransition::Started));
        assert!(beam.is_emitting());
    }

    #[test]
    fn continuous_pose_ignored_when_not_playing() {
        let mut beam = continuous();
        assert_eq!(beam.update_continuous(Some(pose_forward()), 0.0, false), None);
        assert_eq!(beam.state(), BeamState::Idle);
    }

    #[test]
    fn short_dropout_keeps_emitting() {
        let mut beam = continuous();
        beam.update_continuous(Some(pose_forward()), 1.0, true);
        assert_eq!(beam.update_continuous(None, 1.05, true), None);
        assert!(beam.is_emitting());
    }

    #[test]
    fn long_dropout_goes_idle() {
        let mut beam = continuous();
        beam.update_continuous(Some(pose_forward()), 1.0, true);
        assert_eq!(
            beam.update_continuous(None, 1.15, true),
            Some(BeamTransition::Stopped)
        );
        assert_eq!(beam.state(), BeamState::Idle);
        assert!(beam.probe().is_none());
    }

    #[test]
    fn timeout_check_without_input_stops_beam() {
        let mut beam = continuous();
        beam.update_continuous(Some(pose_forward()), 1.0, true);
        assert_eq!(beam.check_timeouts(1.05), None);
        assert_eq!(beam.check_timeouts(1.2), Some(BeamTransition::Stopped));
    }

    #[test]
    fn discrete_calls_ignored_in_continuous_mode() {
        let mut beam = continuous();
        assert_eq!(beam.discrete_begin(0.0, true), None);
        assert_eq!(beam.controller_axis(1.0, 0.0, 0.0, true), None);
        assert!(!beam.is_emitting());
    }

    // --- smoothing ---

    #[test]
    fn smoother_averages_window() {
        let mut s = RotationSmoother::new(2);
        let a = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), 0.2);
        let b = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), 0.4);
        s.push(a);
        let avg = s.push(b);
        let mid = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), 0.3);
        assert!(avg.dot(mid) > 0.9999);
    }

    #[test]
    fn smoother_evicts_oldest() {
        let mut s = RotationSmoother::new(3);
        let far = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), 1.0);
        s.push(far);
        for _ in 0..3 {
            s.push(Quat::IDENTITY);
        }
        assert_eq!(s.len(), 3);
        assert!((s.average().dot(Quat::IDENTITY) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn smoother_treats_negated_quat_as_same_rotation() {
        let mut s = RotationSmoother::new(4);
        let q = Quat::from_axis_angle(vec3(1.0, 0.0, 0.0), 0.5);
        s.push(q);
        let avg = s.push(q.neg());
        assert!(avg.dot(q).abs() > 1.0 - EPSILON);
    }

    // --- discrete mode ---

    #[test]
    fn discrete_release_is_immediate() {
        let mut beam = discrete();
        assert_eq!(beam.discrete_begin(0.0, true), Some(BeamTransition::Started));
        assert_eq!(beam.discrete_end(), Some(BeamTransition::Stopped));
        assert!(!beam.is_emitting());
    }

    #[test]
    fn discrete_deltas_clamp_per_axis() {
        let mut beam = discrete();
        beam.discrete_delta(60.0, -30.0);
        beam.discrete_delta(60.0, -100.0);
        let aim = beam.discrete_aim();
        assert_eq!(aim.yaw_deg, 90.0);
        assert_eq!(aim.pitch_deg, -90.0);
    }

    #[test]
    fn discrete_aim_rotates_turret_forward() {
        let mut beam = discrete();
        beam.discrete_delta(90.0, 0.0);
        let forward = beam.aim().rotation.rotate(vec3(0.0, 0.0, -1.0));
        assert!((forward.x + 1.0).abs() < EPSILON, "got {:?}", forward);
        assert_eq!(beam.aim().position, vec3(0.0, 0.8, -1.7));
    }

    #[test]
    fn controller_scales_and_dismisses_after_idle() {
        let mut beam = discrete();
        assert_eq!(
            beam.controller_axis(10.0, 10.0, 0.0, true),
            Some(BeamTransition::Started)
        );
        let aim = beam.discrete_aim();
        assert!((aim.yaw_deg - 7.0).abs() < EPSILON);
        assert!((aim.pitch_deg + 7.0).abs() < EPSILON);

        assert_eq!(beam.check_timeouts(2.9), None);
        assert_eq!(beam.check_timeouts(3.1), Some(BeamTransition::Stopped));
    }

    #[test]
    fn drag_beam_has_no_idle_dismissal() {
        let mut beam = discrete();
        beam.discrete_begin(0.0, true);
        assert_eq!(beam.check_timeouts(100.0), None);
        assert!(beam.is_emitting());
    }

    #[test]
    fn mode_switch_stops_beam() {
        let mut beam = discrete();
        beam.discrete_begin(0.0, true);
        assert_eq!(
            beam.set_mode(InputMode::Continuous),
            Some(BeamTransition::Stopped)
        );
        assert_eq!(beam.mode(), InputMode::Continuous);
    }

    // --- sweep ---

    #[test]
    fn tick_advances_phase_by_elapsed_times_rate() {
        let mut beam = discrete();
        beam.discrete_begin(0.0, true);
        let frame = beam.tick(0.1).unwrap();
        assert!((frame.sweep_phase - 0.15).abs() < EPSILON);
        let frame = beam.tick(0.5).unwrap();
        assert!((frame.sweep_phase - 0.75).abs() < EPSILON);
    }

    #[test]
    fn phase_wraps_into_unit_interval() {
        let mut beam = discrete();
        beam.discrete_begin(0.0, true);
        beam.tick(0.6);
        let frame = beam.tick(1.0).unwrap();
        assert!(frame.sweep_phase >= 0.0 && frame.sweep_phase < 1.0);
        assert!((frame.sweep_phase - 0.5).abs() < EPSILON);
    }

    #[test]
    fn probe_travels_forward_from_aim() {
        let mut beam = discrete();
        beam.discrete_begin(0.0, true);
        let frame = beam.tick(0.2).unwrap();
        // phase 0.3 of a 23 m reach, straight down -Z from the turret
        let expected = vec3(0.0, 0.8, -1.7 - 23.0 * 0.3);
        assert!((frame.probe.center.z - expected.z).abs() < 1e-6);
        assert!((frame.probe.center.y - expected.y).abs() < 1e-6);
        assert_eq!(frame.probe.radius, 0.1);
    }

    #[test]
    fn continuous_probe_is_wider() {
        let mut beam = continuous();
        beam.update_continuous(Some(pose_forward()), 0.0, true);
        let frame = beam.tick(0.01).unwrap();
        assert_eq!(frame.probe.radius, 0.5);
    }

    #[test]
    fn idle_tick_produces_nothing() {
        let mut beam = discrete();
        assert!(beam.tick(1.0).is_none());
        assert_eq!(beam.sweep_phase(), 0.0);
    }

    #[test]
    fn pause_preserves_phase_and_skips_paused_time() {
        let mut beam = discrete();
        beam.discrete_begin(0.0, true);
        beam.tick(0.2);
        let before = beam.sweep_phase();

        beam.suspend();
        assert!(beam.probe().is_none());
        assert!(beam.tick(3.0).is_none());

        beam.resume(10.0);
        assert_eq!(beam.sweep_phase(), before);
        assert!(beam.is_emitting());

        let frame = beam.tick(10.1).unwrap();
        assert!((frame.sweep_phase - (before + 0.15)).abs() < EPSILON);
    }

    #[test]
    fn resume_restarts_grace_window() {
        let mut beam = continuous();
        beam.update_continuous(Some(pose_forward()), 1.0, true);
        beam.suspend();
        beam.resume(20.0);
        assert_eq!(beam.check_timeouts(20.05), None);
        assert!(beam.is_emitting());
    }

    #[test]
    fn cleared_suspension_sweeps_again() {
        let mut beam = discrete();
        beam.discrete_begin(0.0, true);
        beam.suspend();
        beam.stop();
        beam.clear_suspension();
        assert!(!beam.is_suspended());

        beam.discrete_begin(5.0, true);
        assert!(beam.is_sweeping());
        assert!(beam.tick(5.2).is_some());
    }

    #[test]
    fn reset_clears_everything() {
        let mut beam = discrete();
        beam.discrete_begin(0.0, true);
        beam.discrete_delta(30.0, 10.0);
        beam.tick(0.3);
        beam.reset();
        assert!(!beam.is_emitting());
        assert_eq!(beam.sweep_phase(), 0.0);
        assert_eq!(beam.discrete_aim().yaw_deg, 0.0);
    }
}
