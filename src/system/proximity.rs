//! Proximity Classification
//!
//! Maps raw IR sensor bytes onto discrete proximity categories.
//!
//! # Banding
//! The IR sensors report a larger value the closer an obstacle is. Each sensor
//! carries two calibration bounds, `clear_upper_bound < far_upper_bound`, which
//! split the raw range into three bands:
//!
//! - `raw <= clear_upper_bound` → `Clear` (nothing in range)
//! - `clear_upper_bound < raw <= far_upper_bound` → `Far` (obstacle seen, not close)
//! - `raw > far_upper_bound` → `Near` (obstacle close)
//!
//! Boundary values belong to the lower band. The ordering
//! `Clear < Far < Near` reads as "how close", so classification is monotonic
//! in the raw value.

use crate::error::{Error, Result};

/// One of the three fixed sensor directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Forward,
    Right,
}

impl Direction {
    /// All directions in sensor order
    pub const ALL: [Direction; 3] = [Direction::Left, Direction::Forward, Direction::Right];

    /// Index into a proximity triple
    pub const fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Forward => 1,
            Direction::Right => 2,
        }
    }
}

/// Discretized obstacle distance, ordered by closeness
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ProximityState {
    #[default]
    Clear,
    Far,
    Near,
}

/// Per-sensor threshold pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCalibration {
    clear_upper_bound: u8,
    far_upper_bound: u8,
}

impl SensorCalibration {
    /// Creates a calibration, rejecting bounds that are not strictly increasing
    pub fn new(clear_upper_bound: u8, far_upper_bound: u8) -> Result<Self> {
        if clear_upper_bound >= far_upper_bound {
            return Err(Error::InvalidConfig(format!(
                "clear upper bound {clear_upper_bound:#04x} must be below far upper bound {far_upper_bound:#04x}"
            )));
        }
        Ok(Self {
            clear_upper_bound,
            far_upper_bound,
        })
    }
}

/// Classifies one raw sensor byte
pub fn classify(raw: u8, calib: &SensorCalibration) -> ProximityState {
    if raw <= calib.clear_upper_bound {
        ProximityState::Clear
    } else if raw <= calib.far_upper_bound {
        ProximityState::Far
    } else {
        ProximityState::Near
    }
}

/// Proximity categories for left, forward and right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProximityTriple([ProximityState; 3]);

impl ProximityTriple {
    pub const CLEAR: ProximityTriple = ProximityTriple([ProximityState::Clear; 3]);

    pub const fn new(left: ProximityState, forward: ProximityState, right: ProximityState) -> Self {
        Self([left, forward, right])
    }

    pub fn get(&self, direction: Direction) -> ProximityState {
        self.0[direction.index()]
    }

    pub fn set(&mut self, direction: Direction, state: ProximityState) {
        self.0[direction.index()] = state;
    }

    /// Directions whose category differs from `previous`, in sensor order
    pub fn changes_since(&self, previous: &ProximityTriple) -> Vec<ProximityChange> {
        Direction::ALL
            .into_iter()
            .filter(|d| self.get(*d) != previous.get(*d))
            .map(|direction| ProximityChange {
                direction,
                state: self.get(direction),
            })
            .collect()
    }
}

/// A single direction's category after it changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityChange {
    pub direction: Direction,
    pub state: ProximityState,
}

/// Calibrations for the three IR sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorArray {
    pub left: SensorCalibration,
    pub forward: SensorCalibration,
    pub right: SensorCalibration,
}

impl SensorArray {
    pub fn calibration(&self, direction: Direction) -> &SensorCalibration {
        match direction {
            Direction::Left => &self.left,
            Direction::Forward => &self.forward,
            Direction::Right => &self.right,
        }
    }

    /// Classifies a raw `[left, forward, right]` reading
    pub fn classify(&self, raw: [u8; 3]) -> ProximityTriple {
        let mut triple = ProximityTriple::CLEAR;
        for direction in Direction::ALL {
            triple.set(
                direction,
                classify(raw[direction.index()], self.calibration(direction)),
            );
        }
        triple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calib() -> SensorCalibration {
        SensorCalibration::new(0x10, 0x50).unwrap()
    }

    #[test]
    fn boundaries_fall_to_lower_band() {
        let c = calib();
        assert_eq!(classify(0x00, &c), ProximityState::Clear);
        assert_eq!(classify(0x10, &c), ProximityState::Clear);
        assert_eq!(classify(0x11, &c), ProximityState::Far);
        assert_eq!(classify(0x50, &c), ProximityState::Far);
        assert_eq!(classify(0x51, &c), ProximityState::Near);
        assert_eq!(classify(0xFF, &c), ProximityState::Near);
    }

    #[test]
    fn classification_is_monotonic() {
        let c = calib();
        let states: Vec<_> = (0..=u8::MAX).map(|r| classify(r, &c)).collect();
        assert!(states.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(SensorCalibration::new(0x50, 0x10).is_err());
        assert!(SensorCalibration::new(0x20, 0x20).is_err());
    }

    #[test]
    fn changes_report_only_differing_directions() {
        let before = ProximityTriple::CLEAR;
        let after = ProximityTriple::new(
            ProximityState::Clear,
            ProximityState::Near,
            ProximityState::Clear,
        );
        assert_eq!(
            after.changes_since(&before),
            vec![ProximityChange {
                direction: Direction::Forward,
                state: ProximityState::Near,
            }]
        );
        assert!(after.changes_since(&after).is_empty());
    }

    #[test]
    fn array_uses_per_direction_calibration() {
        let array = SensorArray {
            left: calib(),
            forward: SensorCalibration::new(0x30, 0x60).unwrap(),
            right: calib(),
        };
        let triple = array.classify([0x20, 0x20, 0x60]);
        assert_eq!(triple.get(Direction::Left), ProximityState::Far);
        assert_eq!(triple.get(Direction::Forward), ProximityState::Clear);
        assert_eq!(triple.get(Direction::Right), ProximityState::Near);
    }
}
