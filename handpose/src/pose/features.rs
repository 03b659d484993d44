//! Feature extraction: joint transforms to an 18-value feature vector.
//!
//! Per finger flexion and curl, abduction between adjacent fingers, and
//! thumb-to-fingertip distances.  Angles are in degrees, distances in
//! millimeters.  Nothing is carried between frames.

use std::fmt;
use std::ops::Index;

use nalgebra::Vector3;

use super::hand_tracking::{Finger, Hand, HandJoint, JointPose, JointSource};

/// Number of features in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 18;

/// Meters to millimeters.
const MM_PER_M: f32 = 1000.0;

// ── Feature slots ──────────────────────────────────────────

/// One slot of the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    FlexionThumb,
    FlexionIndex,
    FlexionMiddle,
    FlexionRing,
    FlexionPinky,
    CurlThumb,
    CurlIndex,
    CurlMiddle,
    CurlRing,
    CurlPinky,
    AbductionThumbIndex,
    AbductionIndexMiddle,
    AbductionMiddleRing,
    AbductionRingPinky,
    DistanceThumbIndex,
    DistanceThumbMiddle,
    DistanceThumbRing,
    DistanceThumbPinky,
}

impl Feature {
    /// All features in slot order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Self::FlexionThumb,
        Self::FlexionIndex,
        Self::FlexionMiddle,
        Self::FlexionRing,
        Self::FlexionPinky,
        Self::CurlThumb,
        Self::CurlIndex,
        Self::CurlMiddle,
        Self::CurlRing,
        Self::CurlPinky,
        Self::AbductionThumbIndex,
        Self::AbductionIndexMiddle,
        Self::AbductionMiddleRing,
        Self::AbductionRingPinky,
        Self::DistanceThumbIndex,
        Self::DistanceThumbMiddle,
        Self::DistanceThumbRing,
        Self::DistanceThumbPinky,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlexionThumb => "flexion-thumb",
            Self::FlexionIndex => "flexion-index",
            Self::FlexionMiddle => "flexion-middle",
            Self::FlexionRing => "flexion-ring",
            Self::FlexionPinky => "flexion-pinky",
            Self::CurlThumb => "curl-thumb",
            Self::CurlIndex => "curl-index",
            Self::CurlMiddle => "curl-middle",
            Self::CurlRing => "curl-ring",
            Self::CurlPinky => "curl-pinky",
            Self::AbductionThumbIndex => "abduction-thumb-index",
            Self::AbductionIndexMiddle => "abduction-index-middle",
            Self::AbductionMiddleRing => "abduction-middle-ring",
            Self::AbductionRingPinky => "abduction-ring-pinky",
            Self::DistanceThumbIndex => "distance-thumb-index",
            Self::DistanceThumbMiddle => "distance-thumb-middle",
            Self::DistanceThumbRing => "distance-thumb-ring",
            Self::DistanceThumbPinky => "distance-thumb-pinky",
        }
    }

    pub fn parse(s: &str) -> Option<Feature> {
        Self::ALL.iter().copied().find(|f| f.as_str() == s)
    }

    /// Flexion slot of a finger.
    pub fn flexion(finger: Finger) -> Feature {
        Self::ALL[finger as usize]
    }

    /// Curl slot of a finger.
    pub fn curl(finger: Finger) -> Feature {
        Self::ALL[5 + finger as usize]
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adjacent finger pairs measured for abduction, in slot order.
const ABDUCTION_PAIRS: [(Finger, Finger); 4] = [
    (Finger::Thumb, Finger::Index),
    (Finger::Index, Finger::Middle),
    (Finger::Middle, Finger::Ring),
    (Finger::Ring, Finger::Pinky),
];

/// Fingertips the thumb tip is measured against, in slot order.
const DISTANCE_TIPS: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

// ── Feature vector ─────────────────────────────────────────

/// Hand measurements for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, feature: Feature) -> f32 {
        self.values[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: f32) {
        self.values[feature.index()] = value;
    }

    /// Builder-style [`FeatureVector::set`].
    pub fn with(mut self, feature: Feature, value: f32) -> Self {
        self.set(feature, value);
        self
    }

    /// Measure the hand held by `source`.
    ///
    /// Returns `None` when the palm lacks position or orientation tracking,
    /// or when the source has no data for a joint the measurements need.
    /// Callers treat `None` as "skip this frame".
    pub fn extract<S: JointSource + ?Sized>(source: &S) -> Option<Self> {
        let palm = source.try_get_joint(HandJoint::Palm)?;
        if !palm.is_tracked() {
            return None;
        }
        let hand = source.hand();

        let mut proximal = [JointPose::default(); 5];
        let mut distal = [JointPose::default(); 5];
        let mut tips = [Vector3::zeros(); 5];
        for finger in Finger::ALL {
            let i = finger as usize;
            proximal[i] = source.try_get_joint(finger.proximal())?;
            distal[i] = source.try_get_joint(finger.distal())?;
            tips[i] = source.try_get_joint(finger.tip())?.position_vec();
        }

        let mut features = Self::default();
        for finger in Finger::ALL {
            let i = finger as usize;
            features.set(
                Feature::flexion(finger),
                flexion(hand, finger, &palm, &proximal[i]),
            );
            features.set(Feature::curl(finger), curl(&proximal[i], &distal[i]));
        }
        for (slot, (a, b)) in ABDUCTION_PAIRS.iter().enumerate() {
            features.values[Feature::AbductionThumbIndex.index() + slot] =
                abduction(hand, &proximal[*a as usize], &proximal[*b as usize]);
        }
        let thumb_tip = tips[Finger::Thumb as usize];
        for (slot, finger) in DISTANCE_TIPS.iter().enumerate() {
            features.values[Feature::DistanceThumbIndex.index() + slot] =
                (tips[*finger as usize] - thumb_tip).norm() * MM_PER_M;
        }
        Some(features)
    }

    /// Generate s-expression plist of all features.
    pub fn to_sexp(&self) -> String {
        let body: Vec<String> = Feature::ALL
            .iter()
            .map(|f| format!(":{} {:.1}", f.as_str(), self.get(*f)))
            .collect();
        format!("({})", body.join(" "))
    }
}

impl Index<Feature> for FeatureVector {
    type Output = f32;

    fn index(&self, feature: Feature) -> &f32 {
        &self.values[feature.index()]
    }
}

/// Whether `source` has a fully tracked palm this frame.
pub fn palm_tracked<S: JointSource + ?Sized>(source: &S) -> bool {
    source
        .try_get_joint(HandJoint::Palm)
        .map(|palm| palm.is_tracked())
        .unwrap_or(false)
}

// ── Measurements ───────────────────────────────────────────

/// Flexion of a finger's proximal segment relative to the palm.
///
/// The thumb is measured in the palm's X/Y plane with axis signs that
/// mirror between hands.
fn flexion(hand: Hand, finger: Finger, palm: &JointPose, proximal: &JointPose) -> f32 {
    let palm_x = palm.basis_x();
    let palm_y = palm.basis_y();
    if finger == Finger::Thumb {
        return match hand {
            Hand::Left => signed_angle(&proximal.basis_y(), &-palm_x, &-palm_y),
            Hand::Right => signed_angle(&proximal.basis_y(), &palm_x, &palm_y),
        };
    }
    signed_angle(&proximal.basis_y(), &palm_y, &-palm_x)
}

/// Bend between the proximal and distal segments.
fn curl(proximal: &JointPose, distal: &JointPose) -> f32 {
    signed_angle(&proximal.basis_y(), &distal.basis_y(), &proximal.basis_x())
}

/// Spread between two fingers' proximal segments.
fn abduction(hand: Hand, a: &JointPose, b: &JointPose) -> f32 {
    let axis = a.basis_z() + b.basis_z();
    let axis = match hand {
        Hand::Left => -axis,
        Hand::Right => axis,
    };
    signed_angle(&a.basis_y(), &b.basis_y(), &axis)
}

/// Signed angle in degrees from `from` to `to` as seen along `axis`.
///
/// Both vectors are projected onto the plane perpendicular to `axis`
/// first.  Degenerate projections give 0.
pub fn signed_angle(from: &Vector3<f32>, to: &Vector3<f32>, axis: &Vector3<f32>) -> f32 {
    let axis = normalize_or_zero(axis);
    let from = normalize_or_zero(&(from - axis * from.dot(&axis)));
    let to = normalize_or_zero(&(to - axis * to.dot(&axis)));

    let cross = from.cross(&to);
    let unsigned = cross.norm().atan2(from.dot(&to));
    let angle = if cross.dot(&axis) < 0.0 { -unsigned } else { unsigned };
    angle.to_degrees()
}

fn normalize_or_zero(v: &Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::hand_tracking::HandSkeleton;
    use crate::pose::synthetic::{FingerShape, HandShape};

    fn assert_close(actual: f32, expected: f32, what: &str) {
        assert!(
            (actual - expected).abs() < 0.05,
            "{}: expected {}, got {}",
            what,
            expected,
            actual
        );
    }

    #[test]
    fn test_feature_slots() {
        assert_eq!(Feature::ALL.len(), FEATURE_COUNT);
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
            assert_eq!(Feature::parse(f.as_str()), Some(*f));
        }
        assert_eq!(Feature::flexion(Finger::Pinky), Feature::FlexionPinky);
        assert_eq!(Feature::curl(Finger::Thumb), Feature::CurlThumb);
        assert_eq!(Feature::parse("flexion-elbow"), None);
    }

    #[test]
    fn test_signed_angle_quarter_turns() {
        let x = Vector3::x();
        let y = Vector3::y();
        let z = Vector3::z();
        assert_close(signed_angle(&x, &y, &z), 90.0, "x->y about z");
        assert_close(signed_angle(&y, &x, &z), -90.0, "y->x about z");
        assert_close(signed_angle(&x, &y, &-z), -90.0, "x->y about -z");
        assert_close(signed_angle(&x, &-x, &z), 180.0, "x->-x about z");
    }

    #[test]
    fn test_signed_angle_projects_out_axis() {
        // Axis components do not change the measured angle.
        let from = Vector3::new(1.0, 0.0, 5.0);
        let to = Vector3::new(0.0, 2.0, -3.0);
        assert_close(signed_angle(&from, &to, &Vector3::z()), 90.0, "projected");
        // Axis need not be unit length.
        assert_close(
            signed_angle(&Vector3::x(), &Vector3::y(), &Vector3::new(0.0, 0.0, 7.0)),
            90.0,
            "scaled axis",
        );
    }

    #[test]
    fn test_signed_angle_degenerate_is_zero() {
        let z = Vector3::z();
        assert_eq!(signed_angle(&z, &Vector3::x(), &z), 0.0);
        assert_eq!(signed_angle(&Vector3::x(), &Vector3::y(), &Vector3::zeros()), 90.0);
    }

    #[test]
    fn test_extract_requires_tracked_palm() {
        let mut skel = HandShape::open().skeleton(Hand::Right);
        assert!(palm_tracked(&skel));
        assert!(FeatureVector::extract(&skel).is_some());

        skel.joint_mut(HandJoint::Palm).orientation_tracked = false;
        assert!(!palm_tracked(&skel));
        assert!(FeatureVector::extract(&skel).is_none());

        skel.joint_mut(HandJoint::Palm).orientation_tracked = true;
        skel.joint_mut(HandJoint::Palm).position_tracked = false;
        assert!(FeatureVector::extract(&skel).is_none());
    }

    #[test]
    fn test_extract_untracked_fingers_still_measured() {
        // Only the palm gates extraction; finger flags are not consulted.
        let mut skel = HandShape::open().skeleton(Hand::Right);
        skel.joint_mut(HandJoint::IndexTip).position_tracked = false;
        assert!(FeatureVector::extract(&skel).is_some());
    }

    #[test]
    fn test_extract_missing_joint_skips() {
        struct PalmOnly(HandSkeleton);
        impl JointSource for PalmOnly {
            fn hand(&self) -> Hand {
                self.0.hand
            }
            fn try_get_joint(&self, joint: HandJoint) -> Option<JointPose> {
                (joint == HandJoint::Palm).then(|| *self.0.joint(joint))
            }
        }
        let source = PalmOnly(HandShape::open().skeleton(Hand::Left));
        assert!(palm_tracked(&source));
        assert!(FeatureVector::extract(&source).is_none());
    }

    #[test]
    fn test_extract_recovers_finger_angles() {
        let shape = HandShape::open()
            .with_finger(Finger::Index, FingerShape::new(0.0, 30.0, 45.0))
            .with_finger(Finger::Middle, FingerShape::new(0.0, 60.0, 20.0))
            .with_finger(Finger::Ring, FingerShape::new(0.0, 0.0, 90.0));
        let features = FeatureVector::extract(&shape.skeleton(Hand::Right)).unwrap();

        assert_close(features[Feature::FlexionIndex], 30.0, "index flexion");
        assert_close(features[Feature::CurlIndex], 45.0, "index curl");
        assert_close(features[Feature::FlexionMiddle], 60.0, "middle flexion");
        assert_close(features[Feature::CurlMiddle], 20.0, "middle curl");
        assert_close(features[Feature::FlexionRing], 0.0, "ring flexion");
        assert_close(features[Feature::CurlRing], 90.0, "ring curl");
    }

    #[test]
    fn test_extract_recovers_abduction() {
        let shape = HandShape::open()
            .with_finger(Finger::Index, FingerShape::new(10.0, 0.0, 0.0))
            .with_finger(Finger::Middle, FingerShape::new(0.0, 0.0, 0.0))
            .with_finger(Finger::Ring, FingerShape::new(-8.0, 0.0, 0.0))
            .with_finger(Finger::Pinky, FingerShape::new(-20.0, 0.0, 0.0));
        let features = FeatureVector::extract(&shape.skeleton(Hand::Right)).unwrap();

        assert_close(features[Feature::AbductionIndexMiddle], -10.0, "index-middle");
        assert_close(features[Feature::AbductionMiddleRing], -8.0, "middle-ring");
        assert_close(features[Feature::AbductionRingPinky], -12.0, "ring-pinky");
    }

    #[test]
    fn test_tip_distance_in_millimeters() {
        let skel = HandShape::pinch().skeleton(Hand::Right);
        let features = FeatureVector::extract(&skel).unwrap();
        let meters = skel.joint_distance(HandJoint::ThumbTip, HandJoint::IndexTip);
        assert_close(features[Feature::DistanceThumbIndex], meters * 1000.0, "thumb-index");
        assert!(features[Feature::DistanceThumbIndex] < features[Feature::DistanceThumbPinky]);
    }

    #[test]
    fn test_mirrored_hands_match() {
        for shape in [HandShape::open(), HandShape::fist(), HandShape::pinch(), HandShape::point()] {
            let right = FeatureVector::extract(&shape.skeleton(Hand::Right)).unwrap();
            let left = FeatureVector::extract(&shape.skeleton(Hand::Left)).unwrap();
            for f in Feature::ALL {
                assert_close(left[f], right[f], f.as_str());
            }
        }
    }

    #[test]
    fn test_extract_is_stateless() {
        let skel = HandShape::fist().skeleton(Hand::Left);
        let a = FeatureVector::extract(&skel).unwrap();
        let _ = FeatureVector::extract(&HandShape::open().skeleton(Hand::Left));
        let b = FeatureVector::extract(&skel).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_to_sexp() {
        let features = FeatureVector::default().with(Feature::CurlIndex, 42.0);
        let sexp = features.to_sexp();
        assert!(sexp.starts_with("(:flexion-thumb 0.0"));
        assert!(sexp.contains(":curl-index 42.0"));
        assert!(sexp.ends_with(":distance-thumb-pinky 0.0)"));
    }
}
