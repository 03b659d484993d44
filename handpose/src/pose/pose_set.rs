//! Ordered collections of pose profiles.

use std::sync::Arc;

use super::features::{Feature, FeatureVector};
use super::fitness::FitnessWarning;
use super::profile::PoseProfile;

/// The poses a detector searches for, in declaration order.
///
/// Profiles are shared as `Arc`s so a detector can keep referring to its
/// active pose after the set is replaced.
#[derive(Debug, Clone, Default)]
pub struct PoseSet {
    poses: Vec<Arc<PoseProfile>>,
}

impl PoseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a profile.  Names are expected to be unique but this is not
    /// checked.
    pub fn push(&mut self, pose: PoseProfile) -> Arc<PoseProfile> {
        let pose = Arc::new(pose);
        self.poses.push(Arc::clone(&pose));
        pose
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PoseProfile>> {
        self.poses.iter()
    }

    /// First profile named `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<PoseProfile>> {
        self.poses.iter().find(|p| p.name() == name)
    }

    /// Whether this exact profile (not just one with the same name) is in
    /// the set.
    pub fn contains(&self, pose: &Arc<PoseProfile>) -> bool {
        self.poses.iter().any(|p| Arc::ptr_eq(p, pose))
    }

    /// The best-fitting profile for `features`.
    ///
    /// Only profiles with fitness above 0 qualify.  Ties go to the profile
    /// declared first.
    pub fn find_best_pose(&self, features: &FeatureVector) -> Option<&Arc<PoseProfile>> {
        let mut best: Option<(&Arc<PoseProfile>, f32)> = None;
        for pose in &self.poses {
            let fitness = pose.fitness(features);
            if !(fitness > 0.0) {
                continue;
            }
            match best {
                Some((_, best_fitness)) if fitness <= best_fitness => {}
                _ => best = Some((pose, fitness)),
            }
        }
        best.map(|(pose, _)| pose)
    }

    /// Warnings from every profile, tagged with pose name and feature.
    pub fn warnings(&self) -> Vec<(String, Feature, FitnessWarning)> {
        self.poses
            .iter()
            .flat_map(|p| {
                p.warnings()
                    .into_iter()
                    .map(move |(f, w)| (p.name().to_string(), f, w))
            })
            .collect()
    }

    /// Generate s-expression in the pose set config syntax.
    pub fn to_sexp(&self) -> String {
        let body: Vec<String> = self.poses.iter().map(|p| p.to_sexp()).collect();
        format!("(:poses ({}))", body.join(" "))
    }
}

impl FromIterator<PoseProfile> for PoseSet {
    fn from_iter<I: IntoIterator<Item = PoseProfile>>(iter: I) -> Self {
        Self {
            poses: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

impl FromIterator<Arc<PoseProfile>> for PoseSet {
    fn from_iter<I: IntoIterator<Item = Arc<PoseProfile>>>(iter: I) -> Self {
        Self {
            poses: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::fitness::FitnessFunction;

    /// Profile scoring smoothstep(from, to) of the index curl, no threshold.
    fn curl_pose(name: &str, from: f32, to: f32) -> PoseProfile {
        PoseProfile::new(name)
            .with_threshold(0.0)
            .with_feature(Feature::CurlIndex, FitnessFunction::smoothstep(from, to))
    }

    fn curl(value: f32) -> FeatureVector {
        FeatureVector::default().with(Feature::CurlIndex, value)
    }

    #[test]
    fn test_empty_set_finds_nothing() {
        let set = PoseSet::new();
        assert!(set.is_empty());
        assert!(set.find_best_pose(&curl(10.0)).is_none());
    }

    #[test]
    fn test_all_zero_finds_nothing() {
        let set: PoseSet = vec![curl_pose("A", 50.0, 60.0), curl_pose("B", 70.0, 80.0)]
            .into_iter()
            .collect();
        assert!(set.find_best_pose(&curl(10.0)).is_none());
    }

    #[test]
    fn test_highest_fitness_wins() {
        let set: PoseSet = vec![curl_pose("Loose", 0.0, 100.0), curl_pose("Tight", 0.0, 20.0)]
            .into_iter()
            .collect();
        let best = set.find_best_pose(&curl(15.0)).unwrap();
        assert_eq!(best.name(), "Tight");
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        let set: PoseSet = vec![
            curl_pose("First", 0.0, 10.0),
            curl_pose("Second", 0.0, 10.0),
            curl_pose("Third", 0.0, 20.0),
        ]
        .into_iter()
        .collect();
        let best = set.find_best_pose(&curl(50.0)).unwrap();
        assert_eq!(best.name(), "First");
    }

    #[test]
    fn test_threshold_excludes_pose() {
        let mut set = PoseSet::new();
        set.push(curl_pose("Strict", 0.0, 100.0).with_threshold(0.9));
        set.push(curl_pose("Lenient", 0.0, 200.0));
        // Strict scores 0.5 (< 0.9) so it drops out despite beating Lenient.
        let best = set.find_best_pose(&curl(50.0)).unwrap();
        assert_eq!(best.name(), "Lenient");
    }

    #[test]
    fn test_get_and_contains() {
        let mut set = PoseSet::new();
        let a = set.push(curl_pose("A", 0.0, 10.0));
        let other_a = Arc::new(curl_pose("A", 0.0, 10.0));
        assert!(set.contains(&a));
        assert!(!set.contains(&other_a));
        assert!(Arc::ptr_eq(set.get("A").unwrap(), &a));
        assert!(set.get("B").is_none());
    }

    #[test]
    fn test_warnings_carry_pose_name() {
        let mut set = PoseSet::new();
        set.push(curl_pose("Fine", 0.0, 10.0));
        set.push(curl_pose("Flat", 5.0, 5.0));
        let warnings = set.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].0, "Flat");
        assert_eq!(warnings[0].1, Feature::CurlIndex);
        assert_eq!(warnings[0].2, FitnessWarning::SmoothstepFromEqualsTo);
    }

    #[test]
    fn test_to_sexp_lists_poses() {
        let set: PoseSet = vec![PoseProfile::new("A"), PoseProfile::new("B")]
            .into_iter()
            .collect();
        let sexp = set.to_sexp();
        assert!(sexp.starts_with("(:poses ((:name \"A\""));
        assert!(sexp.contains("(:name \"B\""));
    }
}
