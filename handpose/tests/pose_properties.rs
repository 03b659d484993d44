use std::sync::Arc;

use handpose::pose::fitness::smoothstep;
use handpose::pose::{
    Feature, FeatureVector, FingerShape, Finger, FitnessFunction, Hand, HandShape, PoseDetector,
    PoseProfile, PoseSet, FEATURE_COUNT,
};
use proptest::prelude::*;

fn arbitrary_function() -> impl Strategy<Value = FitnessFunction> {
    prop_oneof![
        (-200.0f32..200.0, -200.0f32..200.0).prop_map(|(a, b)| FitnessFunction::smoothstep(a, b)),
        prop::collection::vec(-200.0f32..200.0, 4).prop_map(|mut v| {
            v.sort_by(|a, b| a.partial_cmp(b).unwrap());
            FitnessFunction::range(v[0], v[1], v[2], v[3])
        }),
    ]
}

fn arbitrary_features() -> impl Strategy<Value = FeatureVector> {
    prop::collection::vec(-180.0f32..180.0, FEATURE_COUNT).prop_map(|v| {
        let mut values = [0.0; FEATURE_COUNT];
        values.copy_from_slice(&v);
        FeatureVector::from_values(values)
    })
}

#[test]
fn fitness_is_bounded() {
    proptest!(|(f in arbitrary_function(), x in -1000.0f32..1000.0)| {
        let y = f.calculate(x);
        prop_assert!((0.0..=1.0).contains(&y), "{:?}({}) = {}", f, x, y);
    });
}

#[test]
fn smoothstep_is_monotonic() {
    proptest!(|(from in -100.0f32..100.0, width in 0.1f32..100.0, a in -300.0f32..300.0, b in -300.0f32..300.0)| {
        let to = from + width;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(smoothstep(from, to, lo) <= smoothstep(from, to, hi));
        // Inverted curves fall instead.
        prop_assert!(smoothstep(to, from, lo) >= smoothstep(to, from, hi));
    });
}

#[test]
fn adding_a_constraint_never_raises_fitness() {
    proptest!(|(features in arbitrary_features(),
                base in prop::collection::vec((0usize..FEATURE_COUNT, arbitrary_function()), 0..6),
                extra_slot in 0usize..FEATURE_COUNT,
                extra in arbitrary_function())| {
        let mut pose = PoseProfile::new("P").with_threshold(0.0);
        for (slot, f) in base {
            if slot != extra_slot {
                pose = pose.with_feature(Feature::ALL[slot], f);
            }
        }
        let stricter = pose.clone().with_feature(Feature::ALL[extra_slot], extra);
        prop_assert!(stricter.fitness(&features) <= pose.fitness(&features));
    });
}

#[test]
fn best_pose_has_maximal_fitness() {
    proptest!(|(features in arbitrary_features(),
                poses in prop::collection::vec((0usize..FEATURE_COUNT, arbitrary_function(), 0.0f32..1.0), 1..6))| {
        let set: PoseSet = poses
            .into_iter()
            .enumerate()
            .map(|(i, (slot, f, threshold))| {
                PoseProfile::new(format!("P{}", i))
                    .with_threshold(threshold)
                    .with_feature(Feature::ALL[slot], f)
            })
            .collect();
        match set.find_best_pose(&features) {
            None => prop_assert!(set.iter().all(|p| p.fitness(&features) == 0.0)),
            Some(best) => {
                let fitness = best.fitness(&features);
                prop_assert!(fitness > 0.0);
                prop_assert!(set.iter().all(|p| p.fitness(&features) <= fitness));
                // Ties go to the first declared.
                let first = set.iter().find(|p| p.fitness(&features) == fitness).unwrap();
                prop_assert!(Arc::ptr_eq(first, best));
            }
        }
    });
}

#[test]
fn debounce_never_starts_short_matches() {
    proptest!(|(ticks in 1usize..12, after in 0usize..60)| {
        let mut set = PoseSet::new();
        let a = set.push(PoseProfile::new("A").with_timing(0.2, 0.2));
        let mut detector = PoseDetector::new(Hand::Right, set);
        let dt = 1.0 / 60.0;
        // The first matching tick only picks the candidate, so `ticks`
        // ticks accumulate (ticks - 1) * dt < 0.2 s of hold.
        for _ in 0..ticks {
            prop_assert!(detector.update_matched(dt, Some(&a)).is_empty());
        }
        for _ in 0..after {
            prop_assert!(detector.update_matched(dt, None).is_empty());
        }
    });
}

#[test]
fn short_dropouts_never_end_pose() {
    proptest!(|(gaps in prop::collection::vec(1usize..11, 1..8))| {
        let mut set = PoseSet::new();
        let a = set.push(PoseProfile::new("A").with_timing(0.2, 0.2));
        let mut detector = PoseDetector::new(Hand::Right, set);
        let dt = 1.0 / 60.0;
        for _ in 0..20 {
            detector.update_matched(dt, Some(&a));
        }
        prop_assert_eq!(detector.current_pose(), Some("A"));
        for gap in gaps {
            for _ in 0..gap {
                prop_assert!(detector.update_matched(dt, None).is_empty());
            }
            prop_assert!(detector.update_matched(dt, Some(&a)).is_empty());
        }
        prop_assert_eq!(detector.current_pose(), Some("A"));
    });
}

#[test]
fn detection_is_deterministic() {
    proptest!(|(matches in prop::collection::vec(prop::option::of(0usize..3), 0..200))| {
        let run = || {
            let mut set = PoseSet::new();
            let poses = [
                set.push(PoseProfile::new("A").with_timing(0.1, 0.2)),
                set.push(PoseProfile::new("B").with_timing(0.2, 0.1)),
                set.push(PoseProfile::new("C").with_timing(0.05, 0.05)),
            ];
            let mut detector = PoseDetector::new(Hand::Left, set);
            matches
                .iter()
                .flat_map(|m| detector.update_matched(1.0 / 60.0, m.map(|i| &poses[i])))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(run(), run());
    });
}

#[test]
fn mirrored_hands_measure_alike() {
    proptest!(|(spread in -20.0f32..20.0, flexion in 0.0f32..80.0, curl in 0.0f32..100.0)| {
        let shape = HandShape::open()
            .with_finger(Finger::Middle, FingerShape::new(spread, flexion, curl))
            .with_finger(Finger::Thumb, FingerShape::new(-spread, flexion / 2.0, curl / 2.0));
        let left = FeatureVector::extract(&shape.skeleton(Hand::Left)).unwrap();
        let right = FeatureVector::extract(&shape.skeleton(Hand::Right)).unwrap();
        for feature in Feature::ALL {
            prop_assert!((left[feature] - right[feature]).abs() < 1e-2,
                "{}: {} vs {}", feature, left[feature], right[feature]);
        }
    });
}
