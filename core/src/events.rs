//! Events published by the game for presentation and audio collaborators.

use beamsweep_shared::config::TargetKind;
use beamsweep_shared::geometry::{Pose, Vec3};
use serde::Serialize;

use crate::beam::InputMode;
use crate::session::Phase;
use crate::target_pool::TargetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Removal delay after scoring elapsed
    Scored,
    /// Reached the end of its path unscored
    Expired,
    /// Round, level or session reset
    Cleared,
}

/// Cues for the audio collaborator. Playback itself lives outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum AudioCue {
    /// Countdown music, faded in over `fade_secs`
    Countdown { fade_secs: f64 },
    /// One of the hit sound variants
    Hit { variant: u8 },
    Paused,
    Resumed,
    Muted { muted: bool },
    Victory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    CountdownTick {
        remaining: u32,
    },
    ClockTick {
        time_left: u32,
    },
    LevelAdvanced {
        level: u32,
    },
    TargetSpawned {
        id: TargetId,
        kind: TargetKind,
        position: Vec3,
        velocity: Vec3,
    },
    SpawnSkipped {
        reason: String,
    },
    TargetScored {
        id: TargetId,
        position: Option<Vec3>,
        remote: bool,
        score: u32,
    },
    TargetRemoved {
        id: TargetId,
        reason: RemovalReason,
    },
    BeamStarted {
        mode: InputMode,
    },
    BeamStopped,
    /// Probe placement and sweep phase (texture offset) for this tick
    ProbeMoved {
        center: Vec3,
        radius: f64,
        sweep_phase: f64,
    },
    ProbeCleared,
    RemoteAimPose {
        peer_id: u32,
        pose: Pose,
    },
    Audio(AudioCue),
    /// Final score, submitted to the leaderboard once
    SessionFinished {
        identity: String,
        score: u32,
    },
}

impl GameEvent {
    pub fn removed(id: TargetId, reason: RemovalReason) -> Self {
        GameEvent::TargetRemoved { id, reason }
    }

    pub fn phase(from: Phase, to: Phase) -> Self {
        GameEvent::PhaseChanged { from, to }
    }
}
