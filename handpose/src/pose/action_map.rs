//! Pose-to-action bindings.
//!
//! An [`ActionMap`] turns pose transitions into named input actions: a bool
//! action reads `true` while its pose is active, a float action `1.0`.  It
//! is an ordinary [`PoseObserver`], so action state lives in the map value
//! itself rather than anywhere global.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::detector::{PoseEvent, PoseObserver};
use super::pose_set::PoseSet;
use super::profile::PoseProfile;

/// Value type of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Bool,
    Float,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Float => "float",
        }
    }

    pub fn parse(s: &str) -> Option<ActionKind> {
        match s {
            "bool" => Some(Self::Bool),
            "float" => Some(Self::Float),
            _ => None,
        }
    }

    /// Value while the bound pose is active (`true`) or not.
    pub fn value(&self, active: bool) -> ActionValue {
        match self {
            Self::Bool => ActionValue::Bool(active),
            Self::Float => ActionValue::Float(if active { 1.0 } else { 0.0 }),
        }
    }
}

/// Current value of an action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionValue {
    Bool(bool),
    Float(f32),
}

impl ActionValue {
    pub fn is_active(&self) -> bool {
        match *self {
            Self::Bool(b) => b,
            Self::Float(f) => f > 0.0,
        }
    }
}

impl fmt::Display for ActionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("t"),
            Self::Bool(false) => f.write_str("nil"),
            Self::Float(v) => write!(f, "{:.1}", v),
        }
    }
}

/// A pose-to-action binding.
#[derive(Debug, Clone)]
pub struct PoseAction {
    /// Pose that drives the action.
    pub pose: Arc<PoseProfile>,
    /// Value type.
    pub kind: ActionKind,
    /// Action identifier (e.g. "trigger", "grip").
    pub action: String,
}

/// Ordered pose-to-action bindings plus the current action values.
#[derive(Debug, Clone, Default)]
pub struct ActionMap {
    bindings: Vec<PoseAction>,
    values: HashMap<String, ActionValue>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `pose` to `action`, replacing any binding for a pose of the same
    /// name.
    pub fn bind(&mut self, pose: Arc<PoseProfile>, kind: ActionKind, action: impl Into<String>) {
        let action = action.into();
        self.unbind(pose.name());
        self.values.entry(action.clone()).or_insert(kind.value(false));
        self.bindings.push(PoseAction { pose, kind, action });
    }

    /// Remove the binding for `pose_name`. Returns true if a binding was
    /// removed.
    pub fn unbind(&mut self, pose_name: &str) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.pose.name() != pose_name);
        let removed = self.bindings.len() < before;
        if removed {
            let live: Vec<&str> = self.bindings.iter().map(|b| b.action.as_str()).collect();
            self.values.retain(|action, _| live.contains(&action.as_str()));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoseAction> {
        self.bindings.iter()
    }

    /// First binding whose pose is named `pose_name`.
    pub fn get_action(&self, pose_name: &str) -> Option<&PoseAction> {
        self.bindings.iter().find(|b| b.pose.name() == pose_name)
    }

    /// Pose set made of every bound pose, in binding order.
    ///
    /// Lets a detector run directly off an action map when no separate pose
    /// set is configured.
    pub fn pose_set(&self) -> PoseSet {
        self.bindings.iter().map(|b| Arc::clone(&b.pose)).collect()
    }

    /// Current value of `action`.
    pub fn value(&self, action: &str) -> Option<ActionValue> {
        self.values.get(action).copied()
    }

    /// Apply a pose event.  Returns the action and its new value, or `None`
    /// if no binding matches the pose.
    pub fn apply(&mut self, event: &PoseEvent) -> Option<(&str, ActionValue)> {
        let binding = self.bindings.iter().find(|b| b.pose.name() == event.pose())?;
        let value = binding.kind.value(event.is_started());
        debug!(
            "Action {} = {} ({} {})",
            binding.action,
            value,
            event.pose(),
            if event.is_started() { "started" } else { "ended" }
        );
        self.values.insert(binding.action.clone(), value);
        Some((binding.action.as_str(), value))
    }

    /// Return every action to its inactive value.
    pub fn reset(&mut self) {
        for binding in &self.bindings {
            self.values.insert(binding.action.clone(), binding.kind.value(false));
        }
    }

    /// Generate s-expression listing all bindings.
    pub fn bindings_sexp(&self) -> String {
        if self.bindings.is_empty() {
            return "nil".to_string();
        }
        let items: Vec<String> = self
            .bindings
            .iter()
            .map(|b| {
                format!(
                    "(:pose {:?} :action {:?} :type {})",
                    b.pose.name(),
                    b.action,
                    b.kind.as_str()
                )
            })
            .collect();
        format!("({})", items.join(" "))
    }

    /// Generate s-expression of current action values.
    pub fn values_sexp(&self) -> String {
        let items: Vec<String> = self
            .bindings
            .iter()
            .filter_map(|b| {
                self.value(&b.action)
                    .map(|v| format!("(:action {:?} :value {})", b.action, v))
            })
            .collect();
        if items.is_empty() {
            "nil".to_string()
        } else {
            format!("({})", items.join(" "))
        }
    }
}

impl PoseObserver for ActionMap {
    fn on_pose_event(&mut self, event: &PoseEvent) {
        self.apply(event);
    }
}
