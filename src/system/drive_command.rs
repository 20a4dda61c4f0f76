//! Drive Command Module
//!
//! Motor actions requested by the navigator or by the shutdown protocol.
//! Each command is consumed exactly once by the bus actor, which turns it
//! into one write per motor.

use super::proximity::Direction;

/// Pre-calibrated motor drive strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PowerTier {
    /// Zero output
    Park,
    Slow,
    Medium,
}

/// Requested motor action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Both motors forward
    Forward,
    /// Pivot left: left motor parked, right motor driven
    Left,
    /// Pivot right: right motor parked, left motor driven
    Right,
    /// All outputs to zero
    Park,
}

/// A requested motor action with an optional power tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriveCommand {
    pub action: Action,
    pub magnitude: Option<PowerTier>,
}

impl DriveCommand {
    pub const PARK: DriveCommand = DriveCommand {
        action: Action::Park,
        magnitude: None,
    };

    pub const fn forward(tier: PowerTier) -> Self {
        Self {
            action: Action::Forward,
            magnitude: Some(tier),
        }
    }

    pub const fn left(tier: PowerTier) -> Self {
        Self {
            action: Action::Left,
            magnitude: Some(tier),
        }
    }

    pub const fn right(tier: PowerTier) -> Self {
        Self {
            action: Action::Right,
            magnitude: Some(tier),
        }
    }

    /// Turn in place toward the `direction` flank
    pub const fn turn_toward(direction: Direction, tier: PowerTier) -> Self {
        match direction {
            Direction::Left => Self::left(tier),
            // Forward is not a turn; callers pick a flank first
            Direction::Forward | Direction::Right => Self::right(tier),
        }
    }

    pub fn is_park(&self) -> bool {
        self.action == Action::Park
    }

    /// Sensor direction the vehicle moves toward while executing this command
    pub fn heading(&self) -> Option<Direction> {
        match self.action {
            Action::Forward => Some(Direction::Forward),
            Action::Left => Some(Direction::Left),
            Action::Right => Some(Direction::Right),
            Action::Park => None,
        }
    }

    /// Tier applied to the `(left, right)` motors
    pub fn motor_tiers(&self) -> (PowerTier, PowerTier) {
        match self.action {
            Action::Forward => {
                let tier = self.magnitude.unwrap_or(PowerTier::Medium);
                (tier, tier)
            }
            Action::Left => (PowerTier::Park, self.magnitude.unwrap_or(PowerTier::Slow)),
            Action::Right => (self.magnitude.unwrap_or(PowerTier::Slow), PowerTier::Park),
            Action::Park => (PowerTier::Park, PowerTier::Park),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn park_zeroes_both_motors() {
        assert_eq!(
            DriveCommand::PARK.motor_tiers(),
            (PowerTier::Park, PowerTier::Park)
        );
        assert!(DriveCommand::PARK.is_park());
        assert_eq!(DriveCommand::PARK.heading(), None);
    }

    #[test]
    fn turns_drive_the_outer_motor() {
        assert_eq!(
            DriveCommand::left(PowerTier::Slow).motor_tiers(),
            (PowerTier::Park, PowerTier::Slow)
        );
        assert_eq!(
            DriveCommand::right(PowerTier::Medium).motor_tiers(),
            (PowerTier::Medium, PowerTier::Park)
        );
    }

    #[test]
    fn missing_magnitude_uses_default_tier() {
        let cmd = DriveCommand {
            action: Action::Forward,
            magnitude: None,
        };
        assert_eq!(cmd.motor_tiers(), (PowerTier::Medium, PowerTier::Medium));
    }
}
