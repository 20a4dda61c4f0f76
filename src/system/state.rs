//! Navigation State
//!
//! Owned exclusively by the navigator task and mutated only when an event
//! arrives. Fix and proximity events touch separate slices of the state, so
//! the relative order of the two queues does not matter.

use super::position::{PositionFix, Waypoint};
use super::proximity::{Direction, ProximityTriple};

/// Controller mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// No valid fix received yet
    Idle,
    /// Moving toward the target
    Seeking(Waypoint),
    /// Turning away from an obstruction in the given direction
    Avoiding(Direction),
    /// Within tolerance of the target; terminal
    Arrived,
}

/// Navigator state
#[derive(Debug, Clone, PartialEq)]
pub struct NavState {
    pub mode: Mode,
    pub last_fix: Option<PositionFix>,
    pub proximity: ProximityTriple,
}

impl NavState {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            last_fix: None,
            proximity: ProximityTriple::CLEAR,
        }
    }
}

impl Default for NavState {
    fn default() -> Self {
        Self::new()
    }
}
