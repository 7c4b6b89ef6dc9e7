//! Outbound score/pose channels and inbound remote events.
//!
//! Scores travel on an ordered queue and must not be dropped by the core;
//! poses go through a single slot where the newest value replaces the old.

use beamsweep_shared::geometry::Pose;
use beamsweep_shared::protocol::RelayMsg;
use tokio::sync::{mpsc, watch};

use crate::error::SyncError;
use crate::target_pool::TargetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEvent {
    pub target_id: TargetId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimPoseEvent {
    pub pose: Pose,
}

/// An event received from another peer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteEvent {
    Score { from: u32, target_id: TargetId },
    AimPose { from: u32, pose: Pose },
}

impl RemoteEvent {
    /// Relay messages that are not peer events map to `None`.
    pub fn from_relay(msg: &RelayMsg) -> Option<Self> {
        match msg {
            RelayMsg::Score(s) => Some(RemoteEvent::Score {
                from: s.from,
                target_id: s.target_id,
            }),
            RelayMsg::AimPose(p) => Some(RemoteEvent::AimPose {
                from: p.from,
                pose: p.pose.to_pose(),
            }),
            RelayMsg::Welcome(_) | RelayMsg::PeersState(_) => None,
        }
    }
}

/// Reliable, ordered delivery of score events. Must not block.
pub trait ScoreSink: Send {
    fn send_score(&self, event: ScoreEvent) -> Result<(), SyncError>;
}

/// Best-effort delivery of beam poses. Must not block.
pub trait PoseSink: Send {
    fn send_pose(&self, event: AimPoseEvent) -> Result<(), SyncError>;
}

impl ScoreSink for mpsc::Sender<ScoreEvent> {
    fn send_score(&self, event: ScoreEvent) -> Result<(), SyncError> {
        self.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SyncError::ScoreQueueFull,
            mpsc::error::TrySendError::Closed(_) => SyncError::ChannelClosed,
        })
    }
}

impl PoseSink for watch::Sender<Option<AimPoseEvent>> {
    fn send_pose(&self, event: AimPoseEvent) -> Result<(), SyncError> {
        self.send(Some(event)).map_err(|_| SyncError::ChannelClosed)
    }
}

/// The game's handle for publishing to peers. Failures are logged and
/// swallowed; nothing here retries.
pub struct SyncLayer {
    score: Option<Box<dyn ScoreSink>>,
    pose: Option<Box<dyn PoseSink>>,
}

impl SyncLayer {
    /// No peers: every broadcast is a no-op.
    pub fn detached() -> Self {
        Self {
            score: None,
            pose: None,
        }
    }

    pub fn new(score: impl ScoreSink + 'static, pose: impl PoseSink + 'static) -> Self {
        Self {
            score: Some(Box::new(score)),
            pose: Some(Box::new(pose)),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.score.is_some() || self.pose.is_some()
    }

    pub fn broadcast_score(&self, target_id: TargetId) {
        let Some(sink) = &self.score else {
            return;
        };
        if let Err(e) = sink.send_score(ScoreEvent { target_id }) {
            tracing::warn!("Failed to send score for target {}: {}", target_id, e);
        }
    }

    pub fn broadcast_pose(&self, pose: Pose) {
        let Some(sink) = &self.pose else {
            return;
        };
        if let Err(e) = sink.send_pose(AimPoseEvent { pose }) {
            tracing::debug!("Dropped aim pose: {}", e);
        }
    }
}

/// Receiving ends drained by the peer link
pub struct SyncEndpoints {
    pub scores: mpsc::Receiver<ScoreEvent>,
    pub poses: watch::Receiver<Option<AimPoseEvent>>,
}

/// Build an in-process sync layer with a bounded score queue.
pub fn channel(score_capacity: usize) -> (SyncLayer, SyncEndpoints) {
    let (score_tx, score_rx) = mpsc::channel(score_capacity);
    let (pose_tx, pose_rx) = watch::channel(None);
    (
        SyncLayer::new(score_tx, pose_tx),
        SyncEndpoints {
            scores: score_rx,
            poses: pose_rx,
        },
    )
}
