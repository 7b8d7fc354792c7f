//! State management for pipeline stages.
//!
//! This module provides the stage state machine transitions and the
//! human-readable messages broadcast for each of them.

pub mod stage;
