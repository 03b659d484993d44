//! Synthetic hand skeletons built from per-finger angles.
//!
//! Stands in for a live tracking runtime: the CLI replays scripted shapes
//! through it and the tests use it to produce joints with known angles.
//! Hands are built as a right hand in palm space and mirrored across the
//! palm's X axis for the left hand.

use nalgebra::{UnitQuaternion, Vector3};

use super::hand_tracking::{Finger, Hand, HandJoint, HandSkeleton, JointPose, JOINT_COUNT};

/// Angles of one finger in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerShape {
    /// Rotation of the whole finger about the palm normal.
    pub spread: f32,
    /// Bend of the proximal segment toward the palm.
    pub flexion: f32,
    /// Bend between proximal and distal segments, split evenly across the
    /// finger's joints.
    pub curl: f32,
}

impl FingerShape {
    pub const fn new(spread: f32, flexion: f32, curl: f32) -> Self {
        Self {
            spread,
            flexion,
            curl,
        }
    }

    fn lerp(&self, other: &FingerShape, t: f32) -> FingerShape {
        FingerShape {
            spread: lerp(self.spread, other.spread, t),
            flexion: lerp(self.flexion, other.flexion, t),
            curl: lerp(self.curl, other.curl, t),
        }
    }
}

/// Proximal joint position (palm space, meters) and segment lengths of
/// each finger.  The thumb has two segments, the others three.
struct FingerGeometry {
    base: [f32; 3],
    segments: &'static [f32],
}

const GEOMETRY: [FingerGeometry; 5] = [
    FingerGeometry { base: [0.030, 0.000, 0.020], segments: &[0.040, 0.035] },
    FingerGeometry { base: [0.020, 0.040, 0.000], segments: &[0.045, 0.025, 0.020] },
    FingerGeometry { base: [0.000, 0.042, 0.000], segments: &[0.048, 0.028, 0.020] },
    FingerGeometry { base: [-0.020, 0.040, 0.000], segments: &[0.045, 0.026, 0.020] },
    FingerGeometry { base: [-0.038, 0.035, 0.000], segments: &[0.035, 0.020, 0.018] },
];

/// Metacarpal bone length.
const METACARPAL_M: f32 = 0.030;
/// Wrist offset below the palm center.
const WRIST_OFFSET_M: f32 = 0.040;

/// A full hand configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HandShape {
    fingers: [FingerShape; 5],
    /// Palm center in world space.
    pub palm_position: Vector3<f32>,
    /// Palm orientation in world space.
    pub palm_rotation: UnitQuaternion<f32>,
}

impl HandShape {
    pub fn new(fingers: [FingerShape; 5]) -> Self {
        Self {
            fingers,
            palm_position: Vector3::zeros(),
            palm_rotation: UnitQuaternion::identity(),
        }
    }

    /// Flat hand, fingers spread.
    pub fn open() -> Self {
        Self::new([
            FingerShape::new(-30.0, 0.0, 0.0),
            FingerShape::new(8.0, 0.0, 0.0),
            FingerShape::new(0.0, 0.0, 0.0),
            FingerShape::new(-8.0, 0.0, 0.0),
            FingerShape::new(-16.0, 0.0, 0.0),
        ])
    }

    /// All fingers curled, thumb folded over.
    pub fn fist() -> Self {
        let curled = FingerShape::new(0.0, 80.0, 100.0);
        Self::new([FingerShape::new(10.0, 40.0, 40.0), curled, curled, curled, curled])
    }

    /// Index extended, others curled.
    pub fn point() -> Self {
        Self::fist().with_finger(Finger::Index, FingerShape::new(0.0, 0.0, 0.0))
    }

    /// Thumb and index tips touching, others extended.
    pub fn pinch() -> Self {
        Self::open()
            .with_finger(Finger::Thumb, FingerShape::new(10.0, 40.0, 10.0))
            .with_finger(Finger::Index, FingerShape::new(0.0, 50.0, 90.0))
            .with_finger(Finger::Middle, FingerShape::new(0.0, 0.0, 0.0))
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "open" => Some(Self::open()),
            "fist" => Some(Self::fist()),
            "point" => Some(Self::point()),
            "pinch" => Some(Self::pinch()),
            _ => None,
        }
    }

    pub fn with_finger(mut self, finger: Finger, shape: FingerShape) -> Self {
        self.fingers[finger as usize] = shape;
        self
    }

    pub fn with_palm(mut self, position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        self.palm_position = position;
        self.palm_rotation = rotation;
        self
    }

    pub fn finger(&self, finger: Finger) -> FingerShape {
        self.fingers[finger as usize]
    }

    /// Blend finger angles and palm pose toward `other` (`t` in 0..1).
    pub fn lerp(&self, other: &HandShape, t: f32) -> HandShape {
        let mut fingers = self.fingers;
        for (i, f) in fingers.iter_mut().enumerate() {
            *f = self.fingers[i].lerp(&other.fingers[i], t);
        }
        HandShape {
            fingers,
            palm_position: self.palm_position.lerp(&other.palm_position, t),
            palm_rotation: self.palm_rotation.nlerp(&other.palm_rotation, t),
        }
    }

    /// Fully tracked joints for `hand`, indexed by [`HandJoint`].
    pub fn joints(&self, hand: Hand) -> Vec<JointPose> {
        let mut local: Vec<(Vector3<f32>, UnitQuaternion<f32>)> =
            vec![(Vector3::zeros(), UnitQuaternion::identity()); JOINT_COUNT];
        local[HandJoint::Wrist.index()].0 = Vector3::new(0.0, -WRIST_OFFSET_M, 0.0);

        for finger in Finger::ALL {
            let shape = self.fingers[finger as usize];
            let geometry = &GEOMETRY[finger as usize];
            let spread = rot_z(shape.spread);
            let base = Vector3::from(geometry.base);

            local[finger.metacarpal().index()] =
                (base - spread * Vector3::y() * METACARPAL_M, spread);

            // Chain: proximal, [intermediate], distal, tip.
            let mut chain = vec![finger.proximal()];
            chain.extend(finger.intermediate());
            chain.push(finger.distal());
            chain.push(finger.tip());

            let proximal = spread * rot_x(shape.flexion);
            let bends = (chain.len() - 2) as f32;
            let mut position = base;
            for (step, joint) in chain.iter().enumerate() {
                let bend = (step.min(chain.len() - 2) as f32 / bends) * shape.curl;
                let rotation = proximal * rot_x(bend);
                local[joint.index()] = (position, rotation);
                if let Some(length) = geometry.segments.get(step) {
                    position += rotation * Vector3::y() * *length;
                }
            }
        }

        local
            .into_iter()
            .map(|(position, rotation)| {
                let world_pos = self.palm_position + self.palm_rotation * position;
                let world_rot = self.palm_rotation * rotation;
                let joint = JointPose::tracked(world_pos, world_rot);
                match hand {
                    Hand::Right => joint,
                    Hand::Left => mirror(joint),
                }
            })
            .collect()
    }

    /// Skeleton for `hand` with all joints tracked.
    pub fn skeleton(&self, hand: Hand) -> HandSkeleton {
        let mut skel = HandSkeleton::new(hand);
        skel.set_joints(self.joints(hand), 0);
        skel
    }
}

/// A timed sequence of hand shapes, blended at the seams.
#[derive(Debug, Clone, Default)]
pub struct ShapeScript {
    steps: Vec<(String, HandShape, f32)>,
    blend: f32,
}

impl ShapeScript {
    /// Empty script blending over `blend` seconds into each new shape.
    pub fn new(blend: f32) -> Self {
        Self {
            steps: Vec::new(),
            blend: blend.max(0.0),
        }
    }

    /// Append `shape`, held for `seconds` (blend included).
    pub fn push(&mut self, label: impl Into<String>, shape: HandShape, seconds: f32) {
        assert!(seconds > 0.0, "script step must last a positive time");
        self.steps.push((label.into(), shape, seconds));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total length in seconds.
    pub fn duration(&self) -> f32 {
        self.steps.iter().map(|(_, _, d)| d).sum()
    }

    /// Label of the step playing at `t`.
    pub fn label_at(&self, t: f32) -> Option<&str> {
        self.step_at(t).map(|(i, _)| self.steps[i].0.as_str())
    }

    /// Shape at `t` seconds, or `None` past the end.
    pub fn shape_at(&self, t: f32) -> Option<HandShape> {
        let (i, into) = self.step_at(t)?;
        let shape = &self.steps[i].1;
        if i == 0 || self.blend <= 0.0 || into >= self.blend {
            return Some(shape.clone());
        }
        Some(self.steps[i - 1].1.lerp(shape, into / self.blend))
    }

    /// Index of the step playing at `t` and the time spent in it.
    fn step_at(&self, t: f32) -> Option<(usize, f32)> {
        if t < 0.0 {
            return None;
        }
        let mut start = 0.0;
        for (i, (_, _, seconds)) in self.steps.iter().enumerate() {
            if t < start + seconds {
                return Some((i, t - start));
            }
            start += seconds;
        }
        None
    }
}

/// Reflect a joint across the X = 0 plane.
fn mirror(mut joint: JointPose) -> JointPose {
    joint.position[0] = -joint.position[0];
    joint.orientation[1] = -joint.orientation[1];
    joint.orientation[2] = -joint.orientation[2];
    joint
}

fn rot_x(deg: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), deg.to_radians())
}

fn rot_z(deg: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), deg.to_radians())
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
