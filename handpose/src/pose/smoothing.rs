//! Joint position smoothing with One Euro filters.
//!
//! Tracking runtimes jitter by a few millimeters at rest.  A One Euro filter
//! smooths heavily when a joint is still and backs off as it speeds up, so
//! fast motions keep their timing.  Only positions are filtered; joint
//! orientations (and therefore every angle feature) pass through untouched.

use std::f32::consts::PI;

use tracing::trace;

use super::hand_tracking::{Hand, HandJoint, HandSkeleton, JointPose, JointSource, JOINT_COUNT};

/// Configuration for skeleton smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingConfig {
    /// Enable smoothing.
    pub enabled: bool,
    /// Cutoff frequency at rest (Hz); lower is smoother.
    pub min_cutoff: f32,
    /// Speed coefficient; higher trades smoothing for less lag in motion.
    pub beta: f32,
    /// Cutoff frequency of the speed estimate (Hz).
    pub d_cutoff: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_cutoff: 1.0,
            beta: 5.0,
            d_cutoff: 1.0,
        }
    }
}

/// Adaptive low-pass filter for one scalar channel.
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    x_prev: f32,
    dx_prev: f32,
    initialized: bool,
}

impl OneEuroFilter {
    pub fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        assert!(
            min_cutoff > 0.0 && d_cutoff > 0.0,
            "cutoff frequencies must be positive"
        );
        Self {
            min_cutoff,
            beta,
            d_cutoff,
            x_prev: 0.0,
            dx_prev: 0.0,
            initialized: false,
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(config.min_cutoff, config.beta, config.d_cutoff)
    }

    fn alpha(delta_time: f32, cutoff: f32) -> f32 {
        let r = 2.0 * PI * cutoff * delta_time;
        r / (r + 1.0)
    }

    /// Filter `x` sampled `delta_time` seconds after the previous sample.
    /// The first sample passes through unchanged.
    pub fn filter(&mut self, x: f32, delta_time: f32) -> f32 {
        if !self.initialized {
            self.x_prev = x;
            self.dx_prev = 0.0;
            self.initialized = true;
            return x;
        }
        if delta_time <= 0.0 {
            return self.x_prev;
        }

        let dx = (x - self.x_prev) / delta_time;
        let a_d = Self::alpha(delta_time, self.d_cutoff);
        let dx_hat = a_d * dx + (1.0 - a_d) * self.dx_prev;

        let cutoff = self.min_cutoff + self.beta * dx_hat.abs();
        let a = Self::alpha(delta_time, cutoff);
        let x_hat = a * x + (1.0 - a) * self.x_prev;

        self.x_prev = x_hat;
        self.dx_prev = dx_hat;
        x_hat
    }

    /// Forget history; the next sample passes through.
    pub fn reset(&mut self) {
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Smooths every joint position of one hand.
///
/// Joints whose position is untracked are copied as-is and their filters
/// reset, so reacquired joints don't glide in from a stale position.
#[derive(Debug, Clone)]
pub struct SkeletonSmoother {
    filters: Vec<[OneEuroFilter; 3]>,
    output: HandSkeleton,
}

impl SkeletonSmoother {
    pub fn new(hand: Hand, config: SmoothingConfig) -> Self {
        let filter = OneEuroFilter::from_config(&config);
        Self {
            filters: vec![[filter.clone(), filter.clone(), filter]; JOINT_COUNT],
            output: HandSkeleton::new(hand),
        }
    }

    /// Sample `source`, filter positions, and return the smoothed skeleton.
    ///
    /// Joints the source cannot report come out untracked.
    pub fn smooth<S: JointSource + ?Sized>(&mut self, source: &S, delta_time: f32) -> &HandSkeleton {
        self.output.hand = source.hand();
        for (i, joint) in HandJoint::ALL.iter().enumerate() {
            let filters = &mut self.filters[i];
            let Some(mut pose) = source.try_get_joint(*joint) else {
                filters.iter_mut().for_each(OneEuroFilter::reset);
                self.output.joints[i] = JointPose::default();
                continue;
            };
            if pose.position_tracked {
                for (axis, filter) in filters.iter_mut().enumerate() {
                    pose.position[axis] = filter.filter(pose.position[axis], delta_time);
                }
            } else if filters[0].is_initialized() {
                trace!("Joint {} lost, smoothing reset", joint.as_str());
                filters.iter_mut().for_each(OneEuroFilter::reset);
            }
            self.output.joints[i] = pose;
        }
        &self.output
    }

    /// Forget all filter history.
    pub fn reset(&mut self) {
        for filters in &mut self.filters {
            filters.iter_mut().for_each(OneEuroFilter::reset);
        }
        self.output.reset();
    }
}
