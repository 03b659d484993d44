//! Hand joint data structures and the joint source contract.
//!
//! Models 26 joints per hand per the XR_EXT_hand_tracking layout.  A
//! `JointSource` is anything that can hand out per-joint transforms with
//! tracking flags for one hand; `HandSkeleton` is the in-memory one.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::debug;

// ── Joint definitions ──────────────────────────────────────

/// The 26 hand joints defined by XR_EXT_hand_tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandJoint {
    Palm,
    Wrist,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    LittleMetacarpal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
    LittleTip,
}

/// Total number of joints per hand.
pub const JOINT_COUNT: usize = 26;

impl HandJoint {
    /// All joints in index order.
    pub const ALL: [HandJoint; JOINT_COUNT] = [
        Self::Palm,
        Self::Wrist,
        Self::ThumbMetacarpal,
        Self::ThumbProximal,
        Self::ThumbDistal,
        Self::ThumbTip,
        Self::IndexMetacarpal,
        Self::IndexProximal,
        Self::IndexIntermediate,
        Self::IndexDistal,
        Self::IndexTip,
        Self::MiddleMetacarpal,
        Self::MiddleProximal,
        Self::MiddleIntermediate,
        Self::MiddleDistal,
        Self::MiddleTip,
        Self::RingMetacarpal,
        Self::RingProximal,
        Self::RingIntermediate,
        Self::RingDistal,
        Self::RingTip,
        Self::LittleMetacarpal,
        Self::LittleProximal,
        Self::LittleIntermediate,
        Self::LittleDistal,
        Self::LittleTip,
    ];

    /// Convert joint enum to array index (0-25).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Palm => "palm",
            Self::Wrist => "wrist",
            Self::ThumbMetacarpal => "thumb-metacarpal",
            Self::ThumbProximal => "thumb-proximal",
            Self::ThumbDistal => "thumb-distal",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMetacarpal => "index-metacarpal",
            Self::IndexProximal => "index-proximal",
            Self::IndexIntermediate => "index-intermediate",
            Self::IndexDistal => "index-distal",
            Self::IndexTip => "index-tip",
            Self::MiddleMetacarpal => "middle-metacarpal",
            Self::MiddleProximal => "middle-proximal",
            Self::MiddleIntermediate => "middle-intermediate",
            Self::MiddleDistal => "middle-distal",
            Self::MiddleTip => "middle-tip",
            Self::RingMetacarpal => "ring-metacarpal",
            Self::RingProximal => "ring-proximal",
            Self::RingIntermediate => "ring-intermediate",
            Self::RingDistal => "ring-distal",
            Self::RingTip => "ring-tip",
            Self::LittleMetacarpal => "little-metacarpal",
            Self::LittleProximal => "little-proximal",
            Self::LittleIntermediate => "little-intermediate",
            Self::LittleDistal => "little-distal",
            Self::LittleTip => "little-tip",
        }
    }

    /// Parse a joint name as produced by [`HandJoint::as_str`].
    pub fn parse(s: &str) -> Option<HandJoint> {
        Self::ALL.iter().copied().find(|j| j.as_str() == s)
    }
}

// ── Fingers ────────────────────────────────────────────────

/// The five digits, in feature order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Self::Thumb,
        Self::Index,
        Self::Middle,
        Self::Ring,
        Self::Pinky,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumb => "thumb",
            Self::Index => "index",
            Self::Middle => "middle",
            Self::Ring => "ring",
            Self::Pinky => "pinky",
        }
    }

    /// Base joint of the finger chain.
    pub fn metacarpal(&self) -> HandJoint {
        match self {
            Self::Thumb => HandJoint::ThumbMetacarpal,
            Self::Index => HandJoint::IndexMetacarpal,
            Self::Middle => HandJoint::MiddleMetacarpal,
            Self::Ring => HandJoint::RingMetacarpal,
            Self::Pinky => HandJoint::LittleMetacarpal,
        }
    }

    /// Proximal phalanx joint.
    pub fn proximal(&self) -> HandJoint {
        match self {
            Self::Thumb => HandJoint::ThumbProximal,
            Self::Index => HandJoint::IndexProximal,
            Self::Middle => HandJoint::MiddleProximal,
            Self::Ring => HandJoint::RingProximal,
            Self::Pinky => HandJoint::LittleProximal,
        }
    }

    /// Intermediate phalanx joint.  The thumb has none.
    pub fn intermediate(&self) -> Option<HandJoint> {
        match self {
            Self::Thumb => None,
            Self::Index => Some(HandJoint::IndexIntermediate),
            Self::Middle => Some(HandJoint::MiddleIntermediate),
            Self::Ring => Some(HandJoint::RingIntermediate),
            Self::Pinky => Some(HandJoint::LittleIntermediate),
        }
    }

    /// Distal phalanx joint.
    pub fn distal(&self) -> HandJoint {
        match self {
            Self::Thumb => HandJoint::ThumbDistal,
            Self::Index => HandJoint::IndexDistal,
            Self::Middle => HandJoint::MiddleDistal,
            Self::Ring => HandJoint::RingDistal,
            Self::Pinky => HandJoint::LittleDistal,
        }
    }

    /// Fingertip joint.
    pub fn tip(&self) -> HandJoint {
        match self {
            Self::Thumb => HandJoint::ThumbTip,
            Self::Index => HandJoint::IndexTip,
            Self::Middle => HandJoint::MiddleTip,
            Self::Ring => HandJoint::RingTip,
            Self::Pinky => HandJoint::LittleTip,
        }
    }
}

// ── Hand enum ──────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse hand string ("left" or "right").
    pub fn parse(s: &str) -> Option<Hand> {
        match s {
            "left" => Some(Hand::Left),
            "right" => Some(Hand::Right),
            _ => None,
        }
    }
}

// ── Joint pose ─────────────────────────────────────────────

/// Pose data for a single joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    /// Position in meters (x, y, z).
    pub position: [f32; 3],
    /// Orientation quaternion (x, y, z, w).
    pub orientation: [f32; 4],
    /// Joint radius in meters.
    pub radius: f32,
    /// Whether the position is currently tracked.
    pub position_tracked: bool,
    /// Whether the orientation is currently tracked.
    pub orientation_tracked: bool,
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
            radius: 0.01,
            position_tracked: false,
            orientation_tracked: false,
        }
    }
}

impl JointPose {
    /// A fully tracked joint at `position` with `rotation`.
    pub fn tracked(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        let q = rotation.into_inner().coords;
        Self {
            position: [position.x, position.y, position.z],
            orientation: [q.x, q.y, q.z, q.w],
            radius: 0.01,
            position_tracked: true,
            orientation_tracked: true,
        }
    }

    /// Both position and orientation are tracked.
    pub fn is_tracked(&self) -> bool {
        self.position_tracked && self.orientation_tracked
    }

    pub fn position_vec(&self) -> Vector3<f32> {
        Vector3::new(self.position[0], self.position[1], self.position[2])
    }

    /// Orientation as a unit quaternion.  A degenerate (zero) quaternion
    /// reads as identity.
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        let [x, y, z, w] = self.orientation;
        UnitQuaternion::try_new(Quaternion::new(w, x, y, z), f32::EPSILON)
            .unwrap_or_else(UnitQuaternion::identity)
    }

    /// Lateral axis of the joint basis.
    pub fn basis_x(&self) -> Vector3<f32> {
        self.rotation() * Vector3::x()
    }

    /// Long axis of the joint basis (points along the bone).
    pub fn basis_y(&self) -> Vector3<f32> {
        self.rotation() * Vector3::y()
    }

    /// Normal axis of the joint basis.
    pub fn basis_z(&self) -> Vector3<f32> {
        self.rotation() * Vector3::z()
    }
}

// ── Joint source ───────────────────────────────────────────

/// Per-frame access to one hand's joints.  Read-only to the detector.
pub trait JointSource {
    /// Which hand the joints belong to.
    fn hand(&self) -> Hand;

    /// Transform and tracking flags of `joint`, or `None` if the source has
    /// no data for it this frame.
    fn try_get_joint(&self, joint: HandJoint) -> Option<JointPose>;
}

// ── Hand skeleton ──────────────────────────────────────────

/// Complete skeleton data for one hand.
#[derive(Debug, Clone)]
pub struct HandSkeleton {
    /// Which hand this skeleton represents.
    pub hand: Hand,
    /// 26 joint poses indexed by HandJoint.
    pub joints: Vec<JointPose>,
    /// Timestamp of last update in nanoseconds.
    pub timestamp_ns: u64,
}

impl HandSkeleton {
    /// Create a new skeleton with default (untracked) joint poses.
    pub fn new(hand: Hand) -> Self {
        Self {
            hand,
            joints: vec![JointPose::default(); JOINT_COUNT],
            timestamp_ns: 0,
        }
    }

    /// Replace all joints.  `joints` must contain exactly 26 entries.
    pub fn set_joints(&mut self, joints: Vec<JointPose>, timestamp_ns: u64) {
        assert_eq!(
            joints.len(),
            JOINT_COUNT,
            "hand skeleton needs {} joints, got {}",
            JOINT_COUNT,
            joints.len()
        );
        self.joints = joints;
        self.timestamp_ns = timestamp_ns;
    }

    pub fn joint(&self, joint: HandJoint) -> &JointPose {
        &self.joints[joint.index()]
    }

    pub fn joint_mut(&mut self, joint: HandJoint) -> &mut JointPose {
        &mut self.joints[joint.index()]
    }

    /// Euclidean distance between two joints (in meters).
    pub fn joint_distance(&self, j1: HandJoint, j2: HandJoint) -> f32 {
        (self.joint(j2).position_vec() - self.joint(j1).position_vec()).norm()
    }

    /// Mark every joint untracked, keeping the last transforms.
    pub fn lose_tracking(&mut self) {
        debug!("Hand tracking lost for {:?}", self.hand);
        for joint in &mut self.joints {
            joint.position_tracked = false;
            joint.orientation_tracked = false;
        }
    }

    /// Reset all joint data to defaults.
    pub fn reset(&mut self) {
        for joint in &mut self.joints {
            *joint = JointPose::default();
        }
        self.timestamp_ns = 0;
    }

    /// Generate s-expression for status queries.
    pub fn status_sexp(&self) -> String {
        let palm = self.joint(HandJoint::Palm);
        let tracked = self.joints.iter().filter(|j| j.is_tracked()).count();
        format!(
            "(:hand {} :palm-tracked {} :tracked-joints {} :timestamp {})",
            self.hand.as_str(),
            if palm.is_tracked() { "t" } else { "nil" },
            tracked,
            self.timestamp_ns,
        )
    }
}

impl JointSource for HandSkeleton {
    fn hand(&self) -> Hand {
        self.hand
    }

    fn try_get_joint(&self, joint: HandJoint) -> Option<JointPose> {
        self.joints.get(joint.index()).copied()
    }
}

/// Create a tracked test joint at a given position with identity orientation.
#[cfg(test)]
fn test_joint(x: f32, y: f32, z: f32) -> JointPose {
    JointPose::tracked(Vector3::new(x, y, z), UnitQuaternion::identity())
}

// ── Tests ──────────────────────────────────────────────────
