//! Pose detection with hold/release hysteresis.
//!
//! Each tick the best-matching pose from the pose set becomes a candidate.
//! A candidate that stays matched for its hold time is promoted to active
//! (only when nothing else is active); an active pose that stops matching
//! decays over its release time.  Transitions of the active pose are
//! reported as `Started`/`Ended` events, synchronously, to registered
//! observers and as the return value of the update call.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use tracing::{debug, trace};

use super::features::{palm_tracked, FeatureVector};
use super::hand_tracking::{Hand, JointSource};
use super::pose_set::PoseSet;
use super::profile::PoseProfile;
use super::smoothing::{SkeletonSmoother, SmoothingConfig};

// ── Events ─────────────────────────────────────────────────

/// Transitions of the active pose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoseEvent {
    /// A pose became active.
    Started { hand: Hand, pose: String },
    /// The active pose was released.
    Ended { hand: Hand, pose: String },
}

impl PoseEvent {
    pub fn hand(&self) -> Hand {
        match self {
            Self::Started { hand, .. } | Self::Ended { hand, .. } => *hand,
        }
    }

    pub fn pose(&self) -> &str {
        match self {
            Self::Started { pose, .. } | Self::Ended { pose, .. } => pose,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }

    /// Generate s-expression for event notifications.
    pub fn to_sexp(&self) -> String {
        let kind = if self.is_started() { "pose-started" } else { "pose-ended" };
        format!(
            "(:type :{} :hand {} :pose {:?})",
            kind,
            self.hand().as_str(),
            self.pose()
        )
    }
}

/// Receives pose events synchronously, inside the detector's update.
///
/// Observers run on the caller's tick and should return quickly.
pub trait PoseObserver {
    fn on_pose_event(&mut self, event: &PoseEvent);
}

impl<F: FnMut(&PoseEvent)> PoseObserver for F {
    fn on_pose_event(&mut self, event: &PoseEvent) {
        self(event)
    }
}

// ── Config ─────────────────────────────────────────────────

/// Configuration for pose detection.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Enable detection.  A disabled detector ignores ticks and keeps its
    /// state.
    pub enabled: bool,
    /// Joint position smoothing applied before feature extraction.
    pub smoothing: SmoothingConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smoothing: SmoothingConfig::default(),
        }
    }
}

// ── State ──────────────────────────────────────────────────

/// Hysteresis state of one detector.
#[derive(Debug, Clone, Default)]
pub struct DetectorState {
    /// Confirmed pose, if any.
    pub active: Option<Arc<PoseProfile>>,
    /// Confidence of the active pose (0.0-1.0); 1 while matched.
    pub active_hold: f32,
    /// Best-matching pose not yet confirmed.
    pub candidate: Option<Arc<PoseProfile>>,
    /// Accumulated hold of the candidate (0.0-1.0).
    pub candidate_hold: f32,
}

/// Pose identity is profile identity, not name equality.
fn same_pose(a: Option<&Arc<PoseProfile>>, b: Option<&Arc<PoseProfile>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Per-hand pose detector.
pub struct PoseDetector {
    config: DetectorConfig,
    hand: Hand,
    pose_set: PoseSet,
    state: DetectorState,
    observers: Vec<Box<dyn PoseObserver>>,
    smoother: SkeletonSmoother,
    last_features: Option<FeatureVector>,
}

impl PoseDetector {
    /// Create a detector for `hand` searching `pose_set`.
    pub fn new(hand: Hand, pose_set: PoseSet) -> Self {
        Self::with_config(hand, pose_set, DetectorConfig::default())
    }

    pub fn with_config(hand: Hand, pose_set: PoseSet, config: DetectorConfig) -> Self {
        Self {
            smoother: SkeletonSmoother::new(hand, config.smoothing),
            config,
            hand,
            pose_set,
            state: DetectorState::default(),
            observers: Vec::new(),
            last_features: None,
        }
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    /// Pause or resume detection.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled != enabled {
            debug!("Pose detection on {:?} {}", self.hand, if enabled { "enabled" } else { "disabled" });
        }
        self.config.enabled = enabled;
    }

    pub fn pose_set(&self) -> &PoseSet {
        &self.pose_set
    }

    /// Replace the pose set between ticks.
    ///
    /// Active and candidate poses from the old set no longer match anything
    /// and run out through the normal release path.
    pub fn set_pose_set(&mut self, pose_set: PoseSet) {
        debug!(
            "Pose set replaced on {:?}: {} -> {} poses",
            self.hand,
            self.pose_set.len(),
            pose_set.len()
        );
        self.pose_set = pose_set;
    }

    /// Register an observer.  Observers are called in registration order.
    pub fn add_observer(&mut self, observer: impl PoseObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Register a channel observer and return its receiving end.
    pub fn subscribe(&mut self) -> Receiver<PoseEvent> {
        let (tx, rx) = mpsc::channel();
        self.add_observer(move |event: &PoseEvent| {
            // A dropped receiver just stops listening.
            let _ = tx.send(event.clone());
        });
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Run one tick against live joint data.
    ///
    /// When the palm is not fully tracked the tick is skipped and all state
    /// is left as it was.
    pub fn update<S: JointSource + ?Sized>(&mut self, delta_time: f32, source: &S) -> Vec<PoseEvent> {
        if !self.config.enabled {
            return Vec::new();
        }
        assert_eq!(
            source.hand(),
            self.hand,
            "joint source hand does not match detector hand"
        );
        assert!(
            delta_time > 0.0,
            "delta time must be positive, got {}",
            delta_time
        );
        if !palm_tracked(source) {
            trace!("Palm not tracked on {:?}, tick skipped", self.hand);
            return Vec::new();
        }
        let features = if self.config.smoothing.enabled {
            FeatureVector::extract(self.smoother.smooth(source, delta_time))
        } else {
            FeatureVector::extract(source)
        };
        self.update_features(delta_time, features.as_ref())
    }

    /// Run one tick on an already measured feature vector.  `None` means
    /// tracking was unavailable and skips the tick.
    pub fn update_features(
        &mut self,
        delta_time: f32,
        features: Option<&FeatureVector>,
    ) -> Vec<PoseEvent> {
        if !self.config.enabled {
            return Vec::new();
        }
        let Some(features) = features else {
            trace!("Tracking unavailable on {:?}, tick skipped", self.hand);
            return Vec::new();
        };
        self.last_features = Some(*features);
        let matched = self.pose_set.find_best_pose(features).cloned();
        self.step(delta_time, matched)
    }

    /// Run one tick with the matched pose supplied by the caller.
    pub fn update_matched(
        &mut self,
        delta_time: f32,
        matched: Option<&Arc<PoseProfile>>,
    ) -> Vec<PoseEvent> {
        if !self.config.enabled {
            return Vec::new();
        }
        self.step(delta_time, matched.cloned())
    }

    fn step(&mut self, delta_time: f32, matched: Option<Arc<PoseProfile>>) -> Vec<PoseEvent> {
        assert!(
            delta_time > 0.0,
            "delta time must be positive, got {}",
            delta_time
        );
        let previous = self.state.active.clone();
        let state = &mut self.state;

        // Active pose: sustain while matched, otherwise decay.
        if let Some(release_time) = state.active.as_ref().map(|p| p.release_time()) {
            if same_pose(matched.as_ref(), state.active.as_ref()) {
                state.active_hold = 1.0;
            } else {
                state.active_hold -= delta_time / release_time;
                if state.active_hold <= 0.0 {
                    state.active_hold = 0.0;
                    state.active = None;
                }
            }
        }

        // Candidate: restart on change, otherwise accumulate and promote.
        if !same_pose(matched.as_ref(), state.candidate.as_ref()) {
            state.candidate = matched;
            state.candidate_hold = 0.0;
        } else if let Some(hold_time) = state.candidate.as_ref().map(|p| p.hold_time()) {
            state.candidate_hold += delta_time / hold_time;
            if state.candidate_hold >= 1.0 {
                state.candidate_hold = 1.0;
                // A pose released this tick hands over on the next one.
                if previous.is_none() {
                    state.active = state.candidate.clone();
                    state.active_hold = 1.0;
                }
            }
        }

        let mut events = Vec::new();
        if !same_pose(previous.as_ref(), self.state.active.as_ref()) {
            if let Some(old) = previous {
                debug!("Pose ended: {} on {:?}", old.name(), self.hand);
                events.push(PoseEvent::Ended {
                    hand: self.hand,
                    pose: old.name().to_string(),
                });
            }
            if let Some(new) = &self.state.active {
                debug!("Pose started: {} on {:?}", new.name(), self.hand);
                events.push(PoseEvent::Started {
                    hand: self.hand,
                    pose: new.name().to_string(),
                });
            }
        }
        self.dispatch(&events);
        events
    }

    fn dispatch(&mut self, events: &[PoseEvent]) {
        for event in events {
            for observer in &mut self.observers {
                observer.on_pose_event(event);
            }
        }
    }

    /// Name of the active pose.
    pub fn current_pose(&self) -> Option<&str> {
        self.state.active.as_ref().map(|p| p.name())
    }

    pub fn active_pose(&self) -> Option<&Arc<PoseProfile>> {
        self.state.active.as_ref()
    }

    pub fn active_hold(&self) -> f32 {
        self.state.active_hold
    }

    pub fn candidate_pose(&self) -> Option<&Arc<PoseProfile>> {
        self.state.candidate.as_ref()
    }

    pub fn candidate_hold(&self) -> f32 {
        self.state.candidate_hold
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// Features measured on the last non-skipped tick.
    pub fn last_features(&self) -> Option<&FeatureVector> {
        self.last_features.as_ref()
    }

    /// Clear all state.  An active pose is ended (and observers told).
    pub fn reset(&mut self) -> Vec<PoseEvent> {
        let mut events = Vec::new();
        if let Some(old) = self.state.active.take() {
            debug!("Pose ended by reset: {} on {:?}", old.name(), self.hand);
            events.push(PoseEvent::Ended {
                hand: self.hand,
                pose: old.name().to_string(),
            });
        }
        self.state = DetectorState::default();
        self.smoother.reset();
        self.last_features = None;
        self.dispatch(&events);
        events
    }

    /// Generate s-expression for status queries.
    pub fn status_sexp(&self) -> String {
        let name = |p: Option<&Arc<PoseProfile>>| match p {
            Some(p) => format!("{:?}", p.name()),
            None => "nil".to_string(),
        };
        format!(
            "(:hand {} :enabled {} :poses {} :active {} :active-hold {:.2} :candidate {} :candidate-hold {:.2})",
            self.hand.as_str(),
            if self.config.enabled { "t" } else { "nil" },
            self.pose_set.len(),
            name(self.state.active.as_ref()),
            self.state.active_hold,
            name(self.state.candidate.as_ref()),
            self.state.candidate_hold,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
