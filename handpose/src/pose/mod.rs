//! Pose subsystem: hand skeleton in, pose transitions out.
//!
//! Provides:
//! - `hand_tracking`: joint enumeration, `JointPose`, `HandSkeleton` and the
//!   `JointSource` trait
//! - `features`: the 18-value feature vector measured from a skeleton
//! - `fitness`: smoothstep and range response curves
//! - `profile` / `pose_set`: named poses and best-match selection
//! - `detector`: per-hand hold/release state machine emitting events
//! - `smoothing`: One Euro filtering of joint positions
//! - `action_map`: pose-to-action bindings driven by detector events
//! - `synthetic`: skeletons generated from finger angles

pub mod action_map;
pub mod detector;
pub mod features;
pub mod fitness;
pub mod hand_tracking;
pub mod pose_set;
pub mod profile;
pub mod smoothing;
pub mod synthetic;

pub use action_map::{ActionKind, ActionMap, ActionValue, PoseAction};
pub use detector::{DetectorConfig, DetectorState, PoseDetector, PoseEvent, PoseObserver};
pub use features::{Feature, FeatureVector, FEATURE_COUNT};
pub use fitness::{FitnessFunction, FitnessWarning};
pub use hand_tracking::{Finger, Hand, HandJoint, HandSkeleton, JointPose, JointSource, JOINT_COUNT};
pub use pose_set::PoseSet;
pub use profile::PoseProfile;
pub use smoothing::{OneEuroFilter, SkeletonSmoother, SmoothingConfig};
pub use synthetic::{FingerShape, HandShape, ShapeScript};
