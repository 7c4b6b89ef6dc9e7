use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::{Pose, Quat, Vec3};

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Relay -> Peer ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
#[serde(tag = "type")]
pub enum RelayMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "peers_state")]
    PeersState(PeersStateMsg),
    #[serde(rename = "score")]
    Score(RemoteScoreMsg),
    #[serde(rename = "aim_pose")]
    AimPose(RemoteAimPoseMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: u32,
    pub peers: Vec<PeerWire>,
    /// Shared by every peer so spawn sequences line up
    #[ts(type = "number")]
    pub rng_seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
pub struct PeersStateMsg {
    pub peers: Vec<PeerWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
#[serde(rename_all = "camelCase")]
pub struct PeerWire {
    pub id: u32,
    pub name: String,
    pub color: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
#[serde(rename_all = "camelCase")]
pub struct RemoteScoreMsg {
    pub from: u32,
    pub target_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
#[serde(rename_all = "camelCase")]
pub struct RemoteAimPoseMsg {
    pub from: u32,
    pub pose: PoseWire,
}

// === Peer -> Relay ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
#[serde(tag = "type")]
pub enum PeerMsg {
    /// Reliable: a locally scored target
    #[serde(rename = "score")]
    Score {
        #[serde(rename = "targetId")]
        target_id: u32,
    },
    /// Best-effort: latest local beam pose
    #[serde(rename = "aim_pose")]
    AimPose { pose: PoseWire },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
pub struct PoseWire {
    pub position: [f64; 3],
    pub rotation: [f64; 4],
}

// === Conversion helpers ===

/// Round to 4 decimal places (plenty for poses, keeps JSON small)
#[inline]
fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

impl PoseWire {
    pub fn from_pose(pose: &Pose) -> Self {
        let p = pose.position;
        let r = pose.rotation;
        Self {
            position: [round4(p.x), round4(p.y), round4(p.z)],
            rotation: [round4(r.x), round4(r.y), round4(r.z), round4(r.w)],
        }
    }

    /// Rotation is renormalized on the way in.
    pub fn to_pose(&self) -> Pose {
        Pose::new(
            Vec3::from_array(self.position),
            Quat::from_array(self.rotation).normalize(),
        )
    }
}
