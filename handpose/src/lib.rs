//! Hand pose detection from skeletal hand tracking.
//!
//! Joint transforms are reduced to a feature vector of finger angles and
//! tip distances, scored against configured pose profiles, and debounced
//! into pose start/end events per hand.

pub mod config;
pub mod pose;
