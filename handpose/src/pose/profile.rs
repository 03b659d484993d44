//! Pose profiles: named sets of per-feature fitness constraints.

use super::features::{Feature, FeatureVector, FEATURE_COUNT};
use super::fitness::{FitnessFunction, FitnessWarning};

/// Default minimum combined fitness.
pub const DEFAULT_THRESHOLD: f32 = 0.5;
/// Default seconds of continuous match before a pose activates.
pub const DEFAULT_HOLD_TIME: f32 = 0.2;
/// Default seconds for an unmatched active pose to release.
pub const DEFAULT_RELEASE_TIME: f32 = 0.2;

/// A named hand pose.
///
/// Every assigned feature function must be satisfied at once: the combined
/// fitness is the product of all assigned slots, so adding a constraint can
/// only lower it.  Unassigned slots match anything.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseProfile {
    name: String,
    threshold: f32,
    hold_time: f32,
    release_time: f32,
    functions: [Option<FitnessFunction>; FEATURE_COUNT],
}

impl PoseProfile {
    /// Profile with default threshold and timing and no constraints.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            threshold: DEFAULT_THRESHOLD,
            hold_time: DEFAULT_HOLD_TIME,
            release_time: DEFAULT_RELEASE_TIME,
            functions: [None; FEATURE_COUNT],
        }
    }

    /// Set the minimum combined fitness.  Panics outside `[0, 1]`.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&threshold),
            "pose {:?}: threshold must be in [0, 1], got {}",
            self.name,
            threshold
        );
        self.threshold = threshold;
        self
    }

    /// Set hold and release times in seconds.  Both must be positive.
    pub fn with_timing(mut self, hold_time: f32, release_time: f32) -> Self {
        assert!(
            hold_time > 0.0,
            "pose {:?}: hold time must be positive, got {}",
            self.name,
            hold_time
        );
        assert!(
            release_time > 0.0,
            "pose {:?}: release time must be positive, got {}",
            self.name,
            release_time
        );
        self.hold_time = hold_time;
        self.release_time = release_time;
        self
    }

    /// Constrain `feature` with `function`, replacing any previous one.
    pub fn with_feature(mut self, feature: Feature, function: FitnessFunction) -> Self {
        self.functions[feature.index()] = Some(function);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn hold_time(&self) -> f32 {
        self.hold_time
    }

    pub fn release_time(&self) -> f32 {
        self.release_time
    }

    pub fn function(&self, feature: Feature) -> Option<&FitnessFunction> {
        self.functions[feature.index()].as_ref()
    }

    /// Assigned `(feature, function)` pairs in slot order.
    pub fn constraints(&self) -> impl Iterator<Item = (Feature, &FitnessFunction)> + '_ {
        Feature::ALL
            .iter()
            .zip(self.functions.iter())
            .filter_map(|(f, func)| func.as_ref().map(|func| (*f, func)))
    }

    /// Combined fitness of `features`, or 0 below the threshold.
    pub fn fitness(&self, features: &FeatureVector) -> f32 {
        let product: f32 = Feature::ALL
            .iter()
            .zip(self.functions.iter())
            .map(|(f, func)| match func {
                Some(func) => func.calculate(features.get(*f)),
                None => 1.0,
            })
            .product();
        // NaN from bad tracking data scores zero.
        if !(product >= self.threshold) {
            0.0
        } else {
            product
        }
    }

    /// Warnings from every assigned function, tagged with its feature.
    pub fn warnings(&self) -> Vec<(Feature, FitnessWarning)> {
        self.constraints()
            .flat_map(|(f, func)| func.warnings().into_iter().map(move |w| (f, w)))
            .collect()
    }

    /// Generate s-expression in the pose set config syntax.
    pub fn to_sexp(&self) -> String {
        let mut s = format!(
            "(:name {:?} :threshold {} :hold-time {} :release-time {}",
            self.name, self.threshold, self.hold_time, self.release_time
        );
        for (feature, func) in self.constraints() {
            s.push_str(&format!(" :{} {}", feature.as_str(), func.to_sexp()));
        }
        s.push(')');
        s
    }
}
