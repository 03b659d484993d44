//! Fitness functions: map a single measurement to a 0..1 score.

use std::fmt;

/// Response curve for one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitnessFunction {
    /// Eases from 0 at `from` to 1 at `to`.  Inverted when `from > to`.
    Smoothstep { from: f32, to: f32 },
    /// 1 on `[from, to)`, easing in from `min` and out toward `max`,
    /// 0 outside `[min, max)`.
    Range { min: f32, from: f32, to: f32, max: f32 },
}

/// Likely misconfiguration of a fitness function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitnessWarning {
    SmoothstepFromEqualsTo,
    RangeMinNotBelowFrom,
    RangeFromNotBelowTo,
    RangeToNotBelowMax,
}

impl FitnessWarning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmoothstepFromEqualsTo => "smoothstep function: from == to",
            Self::RangeMinNotBelowFrom => "range function: min >= from",
            Self::RangeFromNotBelowTo => "range function: from >= to",
            Self::RangeToNotBelowMax => "range function: to >= max",
        }
    }
}

impl fmt::Display for FitnessWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FitnessFunction {
    pub fn smoothstep(from: f32, to: f32) -> Self {
        Self::Smoothstep { from, to }
    }

    pub fn range(min: f32, from: f32, to: f32, max: f32) -> Self {
        Self::Range { min, from, to, max }
    }

    /// Fitness of `x`, always in `[0, 1]`.
    pub fn calculate(&self, x: f32) -> f32 {
        match *self {
            Self::Smoothstep { from, to } => smoothstep(from, to, x),
            Self::Range { min, from, to, max } => {
                if x < min {
                    0.0
                } else if x < from {
                    smoothstep(min, from, x)
                } else if x < to {
                    1.0
                } else if x < max {
                    smoothstep(max, to, x)
                } else {
                    0.0
                }
            }
        }
    }

    /// Configuration diagnostics.  These never change [`calculate`].
    ///
    /// [`calculate`]: FitnessFunction::calculate
    pub fn warnings(&self) -> Vec<FitnessWarning> {
        let mut warnings = Vec::new();
        match *self {
            Self::Smoothstep { from, to } => {
                if from == to {
                    warnings.push(FitnessWarning::SmoothstepFromEqualsTo);
                }
            }
            Self::Range { min, from, to, max } => {
                if min >= from {
                    warnings.push(FitnessWarning::RangeMinNotBelowFrom);
                }
                if from >= to {
                    warnings.push(FitnessWarning::RangeFromNotBelowTo);
                }
                if to >= max {
                    warnings.push(FitnessWarning::RangeToNotBelowMax);
                }
            }
        }
        warnings
    }

    /// Generate s-expression in the pose set config syntax.
    pub fn to_sexp(&self) -> String {
        match *self {
            Self::Smoothstep { from, to } => format!("(:smoothstep {} {})", from, to),
            Self::Range { min, from, to, max } => {
                format!("(:range {} {} {} {})", min, from, to, max)
            }
        }
    }
}

/// Cubic ease of `x` between `from` (0) and `to` (1), clamped.
///
/// With `from == to` this degenerates to a hard step at `from`.
pub fn smoothstep(from: f32, to: f32, x: f32) -> f32 {
    if from == to {
        return if x < from { 0.0 } else { 1.0 };
    }
    let t = ((x - from) / (to - from)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_smoothstep_endpoints() {
        let f = FitnessFunction::smoothstep(0.0, 10.0);
        assert_eq!(f.calculate(0.0), 0.0);
        assert_eq!(f.calculate(10.0), 1.0);
        assert!(approx(f.calculate(5.0), 0.5));
        assert_eq!(f.calculate(-50.0), 0.0);
        assert_eq!(f.calculate(50.0), 1.0);
    }

    #[test]
    fn test_smoothstep_monotonic() {
        let f = FitnessFunction::smoothstep(0.0, 10.0);
        let mut prev = f.calculate(0.0);
        for i in 1..=100 {
            let next = f.calculate(i as f32 * 0.1);
            assert!(next >= prev, "dropped at {}", i);
            prev = next;
        }
    }

    #[test]
    fn test_smoothstep_inverted() {
        let f = FitnessFunction::smoothstep(30.0, 10.0);
        assert_eq!(f.calculate(5.0), 1.0);
        assert_eq!(f.calculate(40.0), 0.0);
        assert!(approx(f.calculate(20.0), 0.5));
        assert!(f.calculate(12.0) > f.calculate(28.0));
    }

    #[test]
    fn test_smoothstep_cubic_shape() {
        // 3t^2 - 2t^3 at t = 0.25
        let f = FitnessFunction::smoothstep(0.0, 4.0);
        assert!(approx(f.calculate(1.0), 0.15625));
    }

    #[test]
    fn test_range_values() {
        let f = FitnessFunction::range(0.0, 10.0, 20.0, 30.0);
        assert_eq!(f.calculate(-1.0), 0.0);
        assert!(approx(f.calculate(5.0), 0.5));
        assert_eq!(f.calculate(15.0), 1.0);
        assert!(approx(f.calculate(25.0), 0.5));
        assert_eq!(f.calculate(35.0), 0.0);
    }

    #[test]
    fn test_range_boundaries() {
        let f = FitnessFunction::range(0.0, 10.0, 20.0, 30.0);
        assert_eq!(f.calculate(0.0), 0.0);
        assert_eq!(f.calculate(10.0), 1.0);
        // `to` starts the falling edge, which is still 1 there.
        assert_eq!(f.calculate(20.0), 1.0);
        assert_eq!(f.calculate(30.0), 0.0);
        assert!(f.calculate(22.0) > f.calculate(28.0));
    }

    #[test]
    fn test_smoothstep_degenerate_is_step() {
        let f = FitnessFunction::smoothstep(5.0, 5.0);
        assert_eq!(f.calculate(4.9), 0.0);
        assert_eq!(f.calculate(5.0), 1.0);
        assert_eq!(f.calculate(6.0), 1.0);
    }

    #[test]
    fn test_warnings_smoothstep() {
        assert!(FitnessFunction::smoothstep(0.0, 10.0).warnings().is_empty());
        assert_eq!(
            FitnessFunction::smoothstep(3.0, 3.0).warnings(),
            vec![FitnessWarning::SmoothstepFromEqualsTo]
        );
    }

    #[test]
    fn test_warnings_range() {
        assert!(FitnessFunction::range(0.0, 10.0, 20.0, 30.0).warnings().is_empty());
        assert_eq!(
            FitnessFunction::range(10.0, 10.0, 20.0, 30.0).warnings(),
            vec![FitnessWarning::RangeMinNotBelowFrom]
        );
        assert_eq!(
            FitnessFunction::range(40.0, 30.0, 20.0, 10.0).warnings(),
            vec![
                FitnessWarning::RangeMinNotBelowFrom,
                FitnessWarning::RangeFromNotBelowTo,
                FitnessWarning::RangeToNotBelowMax,
            ]
        );
    }

    #[test]
    fn test_warnings_do_not_change_output() {
        let f = FitnessFunction::range(0.0, 20.0, 10.0, 30.0);
        assert!(!f.warnings().is_empty());
        // from >= to: no plateau, the rising edge runs into the falling one.
        assert!(approx(f.calculate(10.0), 0.5));
        assert!(approx(f.calculate(15.0), 0.84375));
        assert!(approx(f.calculate(20.0), 0.5));
        assert!(approx(f.calculate(25.0), 0.15625));
    }

    #[test]
    fn test_warning_display() {
        assert_eq!(
            FitnessWarning::RangeToNotBelowMax.to_string(),
            "range function: to >= max"
        );
    }

    #[test]
    fn test_to_sexp() {
        assert_eq!(FitnessFunction::smoothstep(30.0, 10.0).to_sexp(), "(:smoothstep 30 10)");
        assert_eq!(
            FitnessFunction::range(0.0, 2.5, 20.0, 30.0).to_sexp(),
            "(:range 0 2.5 20 30)"
        );
    }
}
