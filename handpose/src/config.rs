//! Pose set and action map configuration.
//!
//! Configuration is an s-expression plist:
//!
//! ```text
//! (:poses ((:name "Pinch" :threshold 0.5 :hold-time 0.2 :release-time 0.2
//!           :distance-thumb-index (:smoothstep 25 10)
//!           :curl-middle (:smoothstep 60 30))
//!          (:name "Fist" :curl-index (:range 40 60 120 140)))
//!  :actions ((:pose "Pinch" :action "trigger" :type bool)))
//! ```
//!
//! Every key of a pose other than `:name`, `:threshold`, `:hold-time` and
//! `:release-time` names a feature.  Keys may be written as `:key` symbols
//! or keywords.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lexpr::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::pose::action_map::{ActionKind, ActionMap};
use crate::pose::features::Feature;
use crate::pose::fitness::{FitnessFunction, FitnessWarning};
use crate::pose::pose_set::PoseSet;
use crate::pose::profile::PoseProfile;

/// Poses recognised out of the box: pinch, fist, point and open hand.
pub const DEFAULT_POSES: &str = r#"
(:poses
 ((:name "Pinch"
   :distance-thumb-index (:smoothstep 25 10)
   :curl-middle (:smoothstep 60 30))
  (:name "Fist"
   :curl-index (:smoothstep 50 80)
   :curl-middle (:smoothstep 50 80)
   :curl-ring (:smoothstep 50 80)
   :curl-pinky (:smoothstep 50 80))
  (:name "Point" :hold-time 0.3
   :curl-index (:smoothstep 40 15)
   :curl-middle (:smoothstep 50 80)
   :curl-ring (:smoothstep 50 80))
  (:name "Open"
   :flexion-index (:range -40 -15 15 40)
   :curl-index (:range -40 -15 15 40)
   :curl-middle (:range -40 -15 15 40)
   :curl-ring (:range -40 -15 15 40)
   :curl-pinky (:range -40 -15 15 40)
   :distance-thumb-index (:smoothstep 40 70)))
 :actions
 ((:pose "Pinch" :action "trigger" :type bool)
  (:pose "Fist" :action "grip" :type float)))
"#;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed s-expression: {0}")]
    Parse(#[from] lexpr::parse::Error),
    #[error("{context}: expected {expected}")]
    Expected {
        context: String,
        expected: &'static str,
    },
    #[error("{context}: missing :{key}")]
    MissingKey { context: String, key: &'static str },
    #[error("pose {pose:?}: unknown key :{key}")]
    UnknownKey { pose: String, key: String },
    #[error("{context}: unknown curve {kind:?}, expected smoothstep or range")]
    UnknownCurve { context: String, kind: String },
    #[error("{context}: {reason}")]
    OutOfRange { context: String, reason: String },
    #[error("duplicate pose name {0:?}")]
    DuplicatePose(String),
    #[error("action {action:?}: unknown pose {pose:?}")]
    UnknownPose { action: String, pose: String },
    #[error("action {action:?}: unknown type {kind:?}, expected bool or float")]
    UnknownActionType { action: String, kind: String },
}

type Result<T> = std::result::Result<T, ConfigError>;

// ── Loaded configuration ───────────────────────────────────

/// A pose set with its action bindings.
#[derive(Debug, Clone, Default)]
pub struct PoseConfig {
    pub poses: PoseSet,
    pub actions: ActionMap,
}

impl PoseConfig {
    /// Parse configuration text.
    pub fn parse(src: &str) -> Result<Self> {
        let value = lexpr::from_str(src)?;
        let poses_value = plist_get(&value, "poses").ok_or(ConfigError::MissingKey {
            context: "configuration".to_string(),
            key: "poses",
        })?;

        let mut poses = PoseSet::new();
        for (i, item) in list_items(poses_value, ":poses")?.into_iter().enumerate() {
            let pose = parse_pose(item, i)?;
            if poses.get(pose.name()).is_some() {
                return Err(ConfigError::DuplicatePose(pose.name().to_string()));
            }
            poses.push(pose);
        }

        let mut actions = ActionMap::new();
        if let Some(actions_value) = plist_get(&value, "actions").filter(|v| !is_nil(v)) {
            for (i, item) in list_items(actions_value, ":actions")?.into_iter().enumerate() {
                parse_action(item, i, &poses, &mut actions)?;
            }
        }

        debug!(
            "Loaded {} poses, {} action bindings",
            poses.len(),
            actions.len()
        );
        Ok(Self { poses, actions })
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&src)
    }

    /// The built-in pose set.
    pub fn builtin() -> Result<Self> {
        Self::parse(DEFAULT_POSES)
    }

    /// Fitness function diagnostics across all poses.
    pub fn warnings(&self) -> Vec<(String, Feature, FitnessWarning)> {
        self.poses.warnings()
    }

    /// Log every configuration warning.  Returns how many there were.
    pub fn log_warnings(&self) -> usize {
        let warnings = self.warnings();
        for (pose, feature, warning) in &warnings {
            warn!("pose {:?} {}: {}", pose, feature, warning);
        }
        warnings.len()
    }

    /// Generate s-expression that parses back to this configuration.
    pub fn to_sexp(&self) -> String {
        let poses: Vec<String> = self.poses.iter().map(|p| p.to_sexp()).collect();
        format!(
            "(:poses ({}) :actions {})",
            poses.join(" "),
            self.actions.bindings_sexp()
        )
    }
}

// ── Entries ────────────────────────────────────────────────

fn parse_pose(value: &Value, index: usize) -> Result<PoseProfile> {
    let entry = format!("pose #{}", index);
    let name = plist_get(value, "name")
        .ok_or(ConfigError::MissingKey {
            context: entry.clone(),
            key: "name",
        })
        .and_then(|v| {
            as_string(v).ok_or(ConfigError::Expected {
                context: format!("{} :name", entry),
                expected: "a string",
            })
        })?;
    let context = format!("pose {:?}", name);

    let mut pose = PoseProfile::new(name.clone());
    let mut hold_time = pose.hold_time();
    let mut release_time = pose.release_time();

    for (key, value) in plist_pairs(value, &context)? {
        match key.as_str() {
            "name" => {}
            "threshold" => {
                let threshold = number(value, &context, "threshold")?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(ConfigError::OutOfRange {
                        context,
                        reason: format!("threshold must be in [0, 1], got {}", threshold),
                    });
                }
                pose = pose.with_threshold(threshold);
            }
            "hold-time" => hold_time = positive(value, &context, "hold-time")?,
            "release-time" => release_time = positive(value, &context, "release-time")?,
            other => {
                let feature = Feature::parse(other).ok_or_else(|| ConfigError::UnknownKey {
                    pose: name.clone(),
                    key: other.to_string(),
                })?;
                let function = parse_curve(value, &format!("{} :{}", context, other))?;
                pose = pose.with_feature(feature, function);
            }
        }
    }
    Ok(pose.with_timing(hold_time, release_time))
}

fn parse_curve(value: &Value, context: &str) -> Result<FitnessFunction> {
    let items = list_items(value, context)?;
    let Some((head, args)) = items.split_first() else {
        return Err(ConfigError::Expected {
            context: context.to_string(),
            expected: "(:smoothstep from to) or (:range min from to max)",
        });
    };
    let kind = key_name(head).unwrap_or_default();
    let args = args
        .iter()
        .map(|v| {
            as_number(v).ok_or(ConfigError::Expected {
                context: context.to_string(),
                expected: "numeric curve parameters",
            })
        })
        .collect::<Result<Vec<f32>>>()?;

    match (kind.as_str(), args.as_slice()) {
        ("smoothstep", &[from, to]) => Ok(FitnessFunction::smoothstep(from, to)),
        ("range", &[min, from, to, max]) => Ok(FitnessFunction::range(min, from, to, max)),
        ("smoothstep", _) => Err(ConfigError::Expected {
            context: context.to_string(),
            expected: "2 smoothstep parameters",
        }),
        ("range", _) => Err(ConfigError::Expected {
            context: context.to_string(),
            expected: "4 range parameters",
        }),
        _ => Err(ConfigError::UnknownCurve {
            context: context.to_string(),
            kind: kind.clone(),
        }),
    }
}

fn parse_action(value: &Value, index: usize, poses: &PoseSet, actions: &mut ActionMap) -> Result<()> {
    let entry = format!("action #{}", index);
    let string_key = |key: &'static str| -> Result<String> {
        let v = plist_get(value, key).ok_or(ConfigError::MissingKey {
            context: entry.clone(),
            key,
        })?;
        as_string(v).ok_or(ConfigError::Expected {
            context: format!("{} :{}", entry, key),
            expected: "a string",
        })
    };
    let action = string_key("action")?;
    let pose_name = string_key("pose")?;

    let kind = match plist_get(value, "type") {
        None => ActionKind::Bool,
        Some(v) => {
            let kind = key_name(v).or_else(|| as_string(v)).unwrap_or_default();
            ActionKind::parse(&kind).ok_or(ConfigError::UnknownActionType {
                action: action.clone(),
                kind,
            })?
        }
    };
    let pose = poses.get(&pose_name).ok_or_else(|| ConfigError::UnknownPose {
        action: action.clone(),
        pose: pose_name.clone(),
    })?;
    actions.bind(Arc::clone(pose), kind, action);
    Ok(())
}

// ── Plist helpers ──────────────────────────────────────────

/// Value following `:key` in a plist.
fn plist_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = value;
    while let Value::Cons(pair) = current {
        let next = match pair.cdr() {
            Value::Cons(next) => next,
            _ => return None,
        };
        if key_name(pair.car()).as_deref() == Some(key) {
            return Some(next.car());
        }
        current = next.cdr();
    }
    None
}

/// All `(key, value)` pairs of a plist, keys without the leading colon.
fn plist_pairs<'a>(value: &'a Value, context: &str) -> Result<Vec<(String, &'a Value)>> {
    let items = list_items(value, context)?;
    if items.len() % 2 != 0 {
        return Err(ConfigError::Expected {
            context: context.to_string(),
            expected: "a plist of :key value pairs",
        });
    }
    items
        .chunks(2)
        .map(|pair| {
            let key = key_name(pair[0]).ok_or(ConfigError::Expected {
                context: context.to_string(),
                expected: ":key at every even position",
            })?;
            Ok((key, pair[1]))
        })
        .collect()
}

/// Elements of a proper list.
fn list_items<'a>(value: &'a Value, context: &str) -> Result<Vec<&'a Value>> {
    let mut items = Vec::new();
    let mut current = value;
    loop {
        match current {
            Value::Cons(pair) => {
                items.push(pair.car());
                current = pair.cdr();
            }
            Value::Null => return Ok(items),
            _ => {
                return Err(ConfigError::Expected {
                    context: context.to_string(),
                    expected: "a list",
                })
            }
        }
    }
}

/// Name of a keyword, or of a symbol with the colon stripped.
fn key_name(value: &Value) -> Option<String> {
    match value {
        Value::Keyword(k) => Some(k.to_string()),
        Value::Symbol(s) => {
            let s: &str = s;
            Some(s.strip_prefix(':').unwrap_or(s).to_string())
        }
        _ => None,
    }
}

fn is_nil(value: &Value) -> bool {
    match value {
        Value::Nil | Value::Null => true,
        Value::Symbol(s) => s.as_ref() == "nil",
        _ => false,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    }
}

fn number(value: &Value, context: &str, key: &'static str) -> Result<f32> {
    as_number(value).ok_or_else(|| ConfigError::Expected {
        context: format!("{} :{}", context, key),
        expected: "a number",
    })
}

fn positive(value: &Value, context: &str, key: &'static str) -> Result<f32> {
    let n = number(value, context, key)?;
    if n > 0.0 {
        Ok(n)
    } else {
        Err(ConfigError::OutOfRange {
            context: context.to_string(),
            reason: format!("{} must be positive, got {}", key, n),
        })
    }
}
