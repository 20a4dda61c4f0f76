//! Navigation Task
//!
//! Turns fixes and proximity changes into drive commands.
//!
//! # Modes
//! - `Idle` until the first valid fix
//! - `Seeking` the target: steer toward it, re-steering only when the
//!   steering decision changes
//! - `Avoiding` an obstruction: turn away until that direction reads `Clear`.
//!   A blocked flank escapes toward the other flank, a blocked front toward
//!   the clearer flank. When the escape side is also `Near` the vehicle
//!   parks in place until the blocked direction clears.
//! - `Arrived` within tolerance: Park once, then ignore everything
//!
//! Every handler returns at most one command. Commands go onto the command
//! queue; the navigator never touches the bus.

use embassy_futures::select::{select, Either};
use log::{debug, info};

use crate::config::NavigationConfig;
use crate::system::drive_command::{DriveCommand, PowerTier};
use crate::system::event::{
    send_or_stop, CommandSender, Delivery, FixReceiver, ProximityReceiver,
};
use crate::system::fair_select::RoundRobin;
use crate::system::position::{heading_error, PositionFix, Waypoint};
use crate::system::proximity::{Direction, ProximityChange, ProximityState};
use crate::system::shutdown::Shutdown;
use crate::system::state::{Mode, NavState};

/// Tier used when driving straight at the target
const CRUISE_TIER: PowerTier = PowerTier::Medium;

/// Tier used for steering and evasive turns
const TURN_TIER: PowerTier = PowerTier::Slow;

/// Navigation state machine
#[derive(Debug, Clone)]
pub struct Navigator {
    target: Waypoint,
    tolerance_m: f64,
    deadband_deg: f64,
    state: NavState,
    last_command: Option<DriveCommand>,
}

impl Navigator {
    pub fn new(target: Waypoint, tolerance_m: f64, deadband_deg: f64) -> Self {
        Self {
            target,
            tolerance_m,
            deadband_deg,
            state: NavState::new(),
            last_command: None,
        }
    }

    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(
            config.target(),
            config.arrival_tolerance_m,
            config.heading_deadband_deg,
        )
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Handles one fix; invalid fixes are ignored
    pub fn on_fix(&mut self, fix: PositionFix) -> Option<DriveCommand> {
        if !fix.valid {
            debug!("Ignoring fix without position lock");
            return None;
        }
        match self.state.mode {
            Mode::Arrived => None,
            Mode::Avoiding(_) => {
                self.state.last_fix = Some(fix);
                None
            }
            Mode::Idle => {
                info!("First fix at ({:.6}, {:.6})", fix.latitude, fix.longitude);
                self.state.last_fix = Some(fix);
                self.set_mode(Mode::Seeking(self.target));
                self.steer()
            }
            Mode::Seeking(_) => {
                self.state.last_fix = Some(fix);
                self.steer()
            }
        }
    }

    /// Handles one proximity change
    pub fn on_proximity(&mut self, change: ProximityChange) -> Option<DriveCommand> {
        self.state.proximity.set(change.direction, change.state);

        match self.state.mode {
            Mode::Idle | Mode::Arrived => None,
            Mode::Seeking(_) => {
                let heading = self.last_command.and_then(|c| c.heading())?;
                if change.direction == heading && change.state == ProximityState::Near {
                    self.avoid(heading)
                } else {
                    None
                }
            }
            Mode::Avoiding(blocked) => {
                if change.direction == blocked && change.state == ProximityState::Clear {
                    info!("{:?} clear, resuming", blocked);
                    self.set_mode(Mode::Seeking(self.target));
                    self.steer()
                } else if change.state == ProximityState::Near
                    && self.last_command.and_then(|c| c.heading()) == Some(change.direction)
                {
                    // Turned into another obstruction
                    self.avoid(change.direction)
                } else {
                    None
                }
            }
        }
    }

    /// Enters `Avoiding(blocked)` and turns away from it, or holds in place
    /// when the escape flank is itself near
    fn avoid(&mut self, blocked: Direction) -> Option<DriveCommand> {
        let turn = match blocked {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Forward => self.clearer_flank(),
        };
        self.set_mode(Mode::Avoiding(blocked));
        if self.state.proximity.get(turn) == ProximityState::Near {
            info!("Obstruction {:?} with {:?} also near, holding", blocked, turn);
            return self.emit(DriveCommand::PARK);
        }
        info!("Obstruction {:?}, turning {:?}", blocked, turn);
        self.emit(DriveCommand::turn_toward(turn, TURN_TIER))
    }

    /// Flank with the lower proximity; right on a tie
    fn clearer_flank(&self) -> Direction {
        let proximity = &self.state.proximity;
        if proximity.get(Direction::Left) < proximity.get(Direction::Right) {
            Direction::Left
        } else {
            Direction::Right
        }
    }

    /// Steering decision from the last fix, or Park on arrival
    fn steer(&mut self) -> Option<DriveCommand> {
        let fix = self.state.last_fix?;
        let here = fix.waypoint();
        let distance = here.distance_to(&self.target);
        if distance <= self.tolerance_m {
            info!("Arrived ({:.1} m from target)", distance);
            self.set_mode(Mode::Arrived);
            return self.emit(DriveCommand::PARK);
        }

        let error = heading_error(fix.track_deg, here.bearing_to(&self.target));
        let command = if error.abs() <= self.deadband_deg {
            DriveCommand::forward(CRUISE_TIER)
        } else if error > 0.0 {
            DriveCommand::right(TURN_TIER)
        } else {
            DriveCommand::left(TURN_TIER)
        };

        // Steering into a known obstruction is avoidance instead
        if let Some(heading) = command.heading() {
            if self.state.proximity.get(heading) == ProximityState::Near {
                return self.avoid(heading);
            }
        }
        self.emit(command)
    }

    /// Records and returns `command` unless it repeats the last one
    fn emit(&mut self, command: DriveCommand) -> Option<DriveCommand> {
        if self.last_command == Some(command) {
            return None;
        }
        self.last_command = Some(command);
        Some(command)
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.state.mode != mode {
            debug!("Mode {:?} -> {:?}", self.state.mode, mode);
            self.state.mode = mode;
        }
    }
}

/// Queues the navigator reads from and writes to
pub struct NavigateQueues<'a> {
    pub fixes: FixReceiver<'a>,
    pub proximity: ProximityReceiver<'a>,
    pub commands: CommandSender<'a>,
}

/// Navigation task loop; returns the final navigator state
pub async fn navigate(
    mut navigator: Navigator,
    queues: NavigateQueues<'_>,
    shutdown: &Shutdown,
) -> Navigator {
    info!(
        "Navigator started, target ({:.6}, {:.6})",
        navigator.target.latitude, navigator.target.longitude
    );
    let mut sources = RoundRobin::new();

    loop {
        let command = match select(
            shutdown.wait(),
            sources.select(queues.fixes.receive(), queues.proximity.receive()),
        )
        .await
        {
            Either::First(_) => break,
            Either::Second(Either::First(fix)) => navigator.on_fix(fix),
            Either::Second(Either::Second(change)) => navigator.on_proximity(change),
        };

        if let Some(command) = command {
            info!("Command {:?}", command);
            if send_or_stop(&queues.commands, command, shutdown).await == Delivery::Stopped {
                break;
            }
        }
    }

    info!("Navigator stopped in {:?}", navigator.mode());
    navigator
}
