use beamsweep_shared::config::GameConfig;
use beamsweep_shared::geometry::{Pose, Sphere};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::beam::{BeamSimulator, BeamTransition, InputMode};
use crate::collision::CollisionResolver;
use crate::error::{SpawnError, StartupError};
use crate::events::{AudioCue, GameEvent, RemovalReason};
use crate::hit_registry::HitRegistry;
use crate::session::{HitOrigin, Phase, PhaseChange, SessionState};
use crate::sync::{RemoteEvent, SyncLayer};
use crate::target_pool::{TargetId, TargetPool};

/// Number of hit sound variants the audio side provides
const HIT_SOUND_VARIANTS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingRemoval {
    id: TargetId,
    due: f64,
}

/// All gameplay state for one local player, mutated on a single timeline.
///
/// Every operation takes `now` in seconds on the game clock and queues
/// [`GameEvent`]s, drained with [`Game::take_events`].
pub struct Game {
    config: GameConfig,
    session: SessionState,
    pool: TargetPool,
    hits: HitRegistry,
    beam: BeamSimulator,
    collision: CollisionResolver,
    sync: SyncLayer,
    /// Spawn randomness, identical across peers with the same seed
    rng: ChaCha8Rng,
    /// Cosmetic randomness, kept apart so it never shifts spawns
    cue_rng: ChaCha8Rng,
    removals: Vec<PendingRemoval>,
    next_spawn_at: Option<f64>,
    next_second_at: Option<f64>,
    last_update: Option<f64>,
    paused_at: Option<f64>,
    events: Vec<GameEvent>,
}

impl Game {
    pub fn new(
        config: GameConfig,
        session: SessionState,
        sync: SyncLayer,
    ) -> Result<Self, StartupError> {
        config.validate().map_err(StartupError::InvalidConfig)?;
        let pool = TargetPool::new(&config)?;
        Self::with_pool(config, session, sync, pool)
    }

    /// Build around a prepared pool (custom spawn paths).
    pub fn with_pool(
        config: GameConfig,
        session: SessionState,
        sync: SyncLayer,
        pool: TargetPool,
    ) -> Result<Self, StartupError> {
        config.validate().map_err(StartupError::InvalidConfig)?;
        let beam = BeamSimulator::new(&config, session.input_mode);
        let collision = CollisionResolver::new(config.min_hits);
        let seed = config.rng_seed;
        Ok(Self {
            config,
            session,
            pool,
            hits: HitRegistry::new(),
            beam,
            collision,
            sync,
            rng: ChaCha8Rng::seed_from_u64(seed),
            cue_rng: ChaCha8Rng::seed_from_u64(seed.rotate_left(17)),
            removals: Vec::new(),
            next_spawn_at: None,
            next_second_at: None,
            last_update: None,
            paused_at: None,
            events: Vec::new(),
        })
    }

    // --- accessors ---

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn pool(&self) -> &TargetPool {
        &self.pool
    }

    pub fn hits(&self) -> &HitRegistry {
        &self.hits
    }

    pub fn beam(&self) -> &BeamSimulator {
        &self.beam
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// True while sweep ticks would do work.
    pub fn is_sweeping(&self) -> bool {
        self.session.phase == Phase::Playing && self.beam.is_sweeping()
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    fn emit_beam(&mut self, transition: Option<BeamTransition>) {
        match transition {
            Some(BeamTransition::Started) => self.emit(GameEvent::BeamStarted {
                mode: self.beam.mode(),
            }),
            Some(BeamTransition::Stopped) => {
                self.emit(GameEvent::BeamStopped);
                self.emit(GameEvent::ProbeCleared);
            }
            None => {}
        }
    }

    // --- configuration ---

    /// Adopt a session-wide seed (from the relay) so spawns match other peers.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.cue_rng = ChaCha8Rng::seed_from_u64(seed.rotate_left(17));
    }

    pub fn set_sharing(&mut self, shared: bool, spatial: bool) {
        self.session.shared = shared;
        self.session.spatial = spatial;
    }

    pub fn set_roster(&mut self, names: Vec<String>) {
        self.session.set_roster(names);
    }

    pub fn add_static_shape(&mut self, shape: Sphere) {
        self.collision.add_static_shape(shape);
    }

    pub fn set_muted(&mut self, muted: bool) {
        if self.session.set_muted(muted) {
            self.emit(GameEvent::Audio(AudioCue::Muted { muted }));
        }
    }

    fn apply_difficulty(&mut self) {
        let level = self.session.level;
        self.beam.set_sweep_rate(self.config.sweep_rate_for(level));
        self.pool
            .set_traversal_secs(self.config.traversal_secs_for(level));
    }

    // --- session transitions ---

    pub fn start(&mut self, mode: InputMode, now: f64) {
        if self.session.phase != Phase::MainMenu {
            return;
        }
        let transition = self.beam.set_mode(mode);
        self.emit_beam(transition);
        if let Some(change) = self.session.start(mode) {
            self.apply_difficulty();
            self.apply_phase(change, now);
        }
    }

    pub fn pause(&mut self, now: f64) {
        let Some(change) = self.session.pause() else {
            return;
        };
        self.paused_at = Some(now);
        let had_probe = self.beam.probe().is_some();
        self.beam.suspend();
        if had_probe {
            self.emit(GameEvent::ProbeCleared);
        }
        self.apply_phase(change, now);
        self.emit(GameEvent::Audio(AudioCue::Paused));
    }

    /// Continue where the pause left off. Every pending deadline moves by
    /// the paused duration.
    pub fn resume(&mut self, now: f64) {
        let Some(change) = self.session.resume() else {
            return;
        };
        let paused_for = (now - self.paused_at.take().unwrap_or(now)).max(0.0);
        for removal in &mut self.removals {
            removal.due += paused_for;
        }
        if let Some(t) = self.next_spawn_at.as_mut() {
            *t += paused_for;
        }
        if let Some(t) = self.next_second_at.as_mut() {
            *t += paused_for;
        }
        self.last_update = Some(now);
        self.beam.resume(now);
        self.apply_phase(change, now);
        self.emit(GameEvent::Audio(AudioCue::Resumed));
    }

    /// Advance a level from any phase while below the last level.
    pub fn next_level(&mut self, now: f64) -> bool {
        let Some(change) = self.session.next_level() else {
            return false;
        };
        self.clear_round();
        self.session.reset_for_next_level();
        self.apply_difficulty();
        self.emit(GameEvent::LevelAdvanced {
            level: self.session.level,
        });
        self.apply_phase(change, now);
        true
    }

    /// End the session now (game over).
    pub fn finish(&mut self, now: f64) {
        if let Some(change) = self.session.finish() {
            self.apply_phase(change, now);
        }
    }

    /// Clear round-scoped state, keeping score and level.
    pub fn reset_for_next_level(&mut self) {
        self.clear_round();
        self.session.reset_for_next_level();
    }

    /// Full reset to the main menu. Target ids start over.
    pub fn reset(&mut self, now: f64) {
        self.clear_round();
        self.pool.reset();
        self.beam.reset();
        let change = self.session.reset();
        self.apply_difficulty();
        if let Some(change) = change {
            self.apply_phase(change, now);
        }
    }

    /// Reset, keep the chosen input mode, and count down again.
    pub fn play_again(&mut self, now: f64) {
        let mode = self.session.input_mode;
        self.reset(now);
        self.start(mode, now);
    }

    fn apply_phase(&mut self, change: PhaseChange, now: f64) {
        let PhaseChange { from, to } = change;
        if let (Phase::CountingDown { .. }, Phase::CountingDown { remaining }) = (from, to) {
            self.emit(GameEvent::CountdownTick { remaining });
            return;
        }
        self.emit(GameEvent::phase(from, to));
        tracing::debug!("Phase {:?} -> {:?}", from, to);

        match to {
            Phase::CountingDown { remaining } => {
                self.next_second_at = Some(now + 1.0);
                self.emit(GameEvent::Audio(AudioCue::Countdown {
                    fade_secs: self.config.countdown_secs as f64,
                }));
                self.emit(GameEvent::CountdownTick { remaining });
            }
            Phase::Playing => {
                if from != Phase::Paused {
                    self.begin_round(now);
                }
            }
            Phase::LevelComplete => self.clear_round(),
            Phase::Finished => {
                self.clear_round();
                self.emit(GameEvent::Audio(AudioCue::Victory));
                self.emit(GameEvent::SessionFinished {
                    identity: self.session.local_name.clone(),
                    score: self.session.score,
                });
            }
            Phase::MainMenu | Phase::Paused => {}
        }
    }

    fn begin_round(&mut self, now: f64) {
        self.last_update = Some(now);
        self.next_second_at = Some(now + 1.0);
        self.next_spawn_at = Some(now);
    }

    fn clear_round(&mut self) {
        let transition = self.beam.stop();
        self.emit_beam(transition);
        self.beam.clear_suspension();
        self.beam.reset_aim();
        self.hits.clear();
        self.removals.clear();
        for id in self.pool.remove_all() {
            self.emit(GameEvent::removed(id, RemovalReason::Cleared));
        }
        self.next_spawn_at = None;
        self.next_second_at = None;
        self.last_update = None;
        self.paused_at = None;
    }

    // --- time ---

    /// Frame update: countdown and clock seconds, target motion, removals,
    /// spawns and input timeouts.
    pub fn update(&mut self, now: f64) {
        if matches!(self.session.phase, Phase::CountingDown { .. }) {
            self.run_countdown(now);
        }
        if self.session.phase == Phase::Playing {
            self.run_round(now);
        }
    }

    fn run_countdown(&mut self, now: f64) {
        loop {
            let due = match self.next_second_at {
                Some(due) if due <= now => due,
                _ => break,
            };
            if !matches!(self.session.phase, Phase::CountingDown { .. }) {
                break;
            }
            self.next_second_at = Some(due + 1.0);
            if let Some(change) = self.session.countdown_tick() {
                self.apply_phase(change, due);
            }
        }
    }

    fn run_round(&mut self, now: f64) {
        let dt = now - self.last_update.unwrap_or(now);
        self.last_update = Some(now);
        if dt > 0.0 {
            for target in self.pool.advance(dt) {
                self.emit(GameEvent::removed(target.id, RemovalReason::Expired));
            }
        }

        self.process_removals(now);

        if let Some(due) = self.next_spawn_at {
            if due <= now {
                let interval = self.config.spawn_interval_for(self.session.level);
                let next = due + interval;
                self.next_spawn_at = Some(if next > now { next } else { now + interval });
                self.spawn_one();
            }
        }

        let transition = self.beam.check_timeouts(now);
        self.emit_beam(transition);

        loop {
            if self.session.phase != Phase::Playing {
                break;
            }
            let due = match self.next_second_at {
                Some(due) if due <= now => due,
                _ => break,
            };
            self.next_second_at = Some(due + 1.0);
            let changes = self.session.clock_tick();
            self.emit(GameEvent::ClockTick {
                time_left: self.session.time_left,
            });
            for change in changes {
                self.apply_phase(change, due);
            }
        }
    }

    fn process_removals(&mut self, now: f64) {
        let (due, pending): (Vec<PendingRemoval>, Vec<PendingRemoval>) =
            self.removals.iter().partition(|r| r.due <= now);
        self.removals = pending;
        for removal in due {
            if self.pool.remove(removal.id).is_some() {
                self.emit(GameEvent::removed(removal.id, RemovalReason::Scored));
            }
        }
    }

    fn spawn_one(&mut self) {
        match self.pool.spawn_next(&mut self.rng) {
            Ok(target) => {
                let velocity = self.pool.velocity();
                self.emit(GameEvent::TargetSpawned {
                    id: target.id,
                    kind: target.kind,
                    position: target.position,
                    velocity,
                });
            }
            Err(e) => {
                match e {
                    SpawnError::PlacementExhausted { .. } => {
                        tracing::warn!("Spawn skipped: {}", e)
                    }
                    SpawnError::PoolFull { .. } => tracing::debug!("Spawn skipped: {}", e),
                }
                self.emit(GameEvent::SpawnSkipped {
                    reason: e.to_string(),
                });
            }
        }
    }

    // --- sweep & scoring ---

    /// One beam sweep tick: move the probe and resolve its contacts.
    pub fn sweep_tick(&mut self, now: f64) {
        if self.session.phase != Phase::Playing {
            return;
        }
        let Some(frame) = self.beam.tick(now) else {
            return;
        };
        self.emit(GameEvent::ProbeMoved {
            center: frame.probe.center,
            radius: frame.probe.radius,
            sweep_phase: frame.sweep_phase,
        });
        let to_score = self
            .collision
            .resolve(&frame.probe, &self.pool, &mut self.hits);
        for id in to_score {
            self.score_hit(id, HitOrigin::Local, now);
        }
    }

    /// Credit a target exactly once per round. Returns true if this call
    /// scored it. Local hits are broadcast in shared sessions; remote hits
    /// never are.
    pub fn score_hit(&mut self, id: TargetId, origin: HitOrigin, now: f64) -> bool {
        let allowed = match origin {
            HitOrigin::Local => self.session.phase == Phase::Playing,
            HitOrigin::Remote => self.session.phase.is_round_active(),
        };
        if !allowed {
            tracing::debug!(
                "Ignoring {:?} hit on target {} in {:?}",
                origin,
                id,
                self.session.phase
            );
            return false;
        }
        if !self.hits.mark_scored(id) {
            return false;
        }

        let score = self.session.score_hit();
        let position = self.pool.get(id).map(|t| t.position);
        if self.pool.mark_scored(id) {
            let base = self.paused_at.unwrap_or(now);
            self.removals.push(PendingRemoval {
                id,
                due: base + self.config.removal_delay,
            });
        }

        self.emit(GameEvent::TargetScored {
            id,
            position,
            remote: origin == HitOrigin::Remote,
            score,
        });
        let variant = self.cue_rng.gen_range(0..HIT_SOUND_VARIANTS);
        self.emit(GameEvent::Audio(AudioCue::Hit { variant }));

        if origin == HitOrigin::Local && self.session.shared {
            self.sync.broadcast_score(id);
        }
        true
    }

    /// Direct activation of a live target (accessibility action).
    pub fn activate_target(&mut self, id: TargetId, now: f64) -> bool {
        match self.pool.get(id) {
            Some(t) if !t.is_scored => self.score_hit(id, HitOrigin::Local, now),
            _ => false,
        }
    }

    pub fn apply_remote(&mut self, event: RemoteEvent, now: f64) {
        match event {
            RemoteEvent::Score { from, target_id } => {
                if self.score_hit(target_id, HitOrigin::Remote, now) {
                    tracing::debug!("Peer {} scored target {}", from, target_id);
                }
            }
            RemoteEvent::AimPose { from, pose } => {
                self.emit(GameEvent::RemoteAimPose {
                    peer_id: from,
                    pose,
                });
            }
        }
    }

    // --- aim input ---

    fn can_emit(&self) -> bool {
        self.session.phase == Phase::Playing
    }

    fn publish_pose(&self) {
        if self.beam.is_emitting() && self.session.shared && self.session.spatial {
            self.sync.broadcast_pose(self.beam.aim());
        }
    }

    /// This frame's tracked aim, `None` when tracking is lost.
    pub fn continuous_aim(&mut self, pose: Option<Pose>, now: f64) {
        let can_emit = self.can_emit();
        let transition = self.beam.update_continuous(pose, now, can_emit);
        self.emit_beam(transition);
        if pose.is_some() {
            self.publish_pose();
        }
    }

    pub fn drag_begin(&mut self, now: f64) {
        let can_emit = self.can_emit();
        let transition = self.beam.discrete_begin(now, can_emit);
        self.emit_beam(transition);
        self.publish_pose();
    }

    pub fn drag_delta(&mut self, dx_deg: f64, dy_deg: f64) {
        self.beam.discrete_delta(dx_deg, dy_deg);
        self.publish_pose();
    }

    pub fn drag_end(&mut self) {
        let transition = self.beam.discrete_end();
        self.emit_beam(transition);
    }

    pub fn controller_axis(&mut self, x: f64, y: f64, now: f64) {
        let can_emit = self.can_emit();
        let transition = self.beam.controller_axis(x, y, now, can_emit);
        self.emit_beam(transition);
        self.publish_pose();
    }
}
