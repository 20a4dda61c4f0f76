//! Peripheral controller wire format
//!
//! The peripheral sits at one I2C address and exposes three endpoints, each
//! selected by a register byte at the start of a transaction:
//!
//! - **Status** (`write [reg]`, `read [left, forward, right, ...]`): raw IR
//!   readings followed by optional further sensor bytes
//! - **Left motor** / **Right motor** (`write [reg, tier]`): one power tier
//!   byte per motor
//!
//! Power tiers are a small closed set of calibrated bytes rather than a
//! continuous PWM value. The park tier commands zero output.

use crate::error::{Error, Result};
use crate::system::drive_command::{DriveCommand, PowerTier};

/// Raw proximity bytes at the start of every status payload
pub const PROXIMITY_BYTES: usize = 3;

/// Longest status payload a single read may request
pub const MAX_STATUS_LEN: usize = 32;

/// One of the two motor endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motor {
    Left,
    Right,
}

/// Calibrated byte for each power tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerTiers {
    park: u8,
    slow: u8,
    medium: u8,
}

impl PowerTiers {
    /// Creates a tier table; tiers must be strictly increasing
    pub fn new(park: u8, slow: u8, medium: u8) -> Result<Self> {
        if !(park < slow && slow < medium) {
            return Err(Error::InvalidConfig(format!(
                "power tiers must increase: park {park:#04x}, slow {slow:#04x}, medium {medium:#04x}"
            )));
        }
        Ok(Self { park, slow, medium })
    }

    pub fn byte(&self, tier: PowerTier) -> u8 {
        match tier {
            PowerTier::Park => self.park,
            PowerTier::Slow => self.slow,
            PowerTier::Medium => self.medium,
        }
    }
}

/// Register bytes selecting each endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub status: u8,
    pub left_motor: u8,
    pub right_motor: u8,
}

impl Endpoints {
    pub fn motor(&self, motor: Motor) -> u8 {
        match motor {
            Motor::Left => self.left_motor,
            Motor::Right => self.right_motor,
        }
    }
}

/// One polled snapshot of device state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusStatus {
    /// Raw IR readings, `[left, forward, right]`
    pub proximity: [u8; PROXIMITY_BYTES],
    /// Any further sensor bytes, uninterpreted
    pub extra: Vec<u8>,
}

/// Stateless encoder/decoder for peripheral transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusCodec {
    endpoints: Endpoints,
    tiers: PowerTiers,
    status_length: usize,
}

impl BusCodec {
    pub fn new(endpoints: Endpoints, tiers: PowerTiers, status_length: usize) -> Result<Self> {
        if status_length < PROXIMITY_BYTES {
            return Err(Error::InvalidConfig(format!(
                "status length {status_length} is shorter than the proximity triple"
            )));
        }
        if status_length > MAX_STATUS_LEN {
            return Err(Error::InvalidConfig(format!(
                "status length {status_length} exceeds {MAX_STATUS_LEN} bytes"
            )));
        }
        Ok(Self {
            endpoints,
            tiers,
            status_length,
        })
    }

    /// Bytes the status read expects back
    pub fn status_length(&self) -> usize {
        self.status_length
    }

    /// Write half of the status transaction
    pub fn status_request(&self) -> [u8; 1] {
        [self.endpoints.status]
    }

    /// Write payload driving `motor` as `command` requires
    pub fn encode_motor(&self, command: &DriveCommand, motor: Motor) -> [u8; 2] {
        let (left, right) = command.motor_tiers();
        let tier = match motor {
            Motor::Left => left,
            Motor::Right => right,
        };
        [self.endpoints.motor(motor), self.tiers.byte(tier)]
    }

    /// Both motor writes for `command`, left first
    pub fn encode_drive(&self, command: &DriveCommand) -> [[u8; 2]; 2] {
        [
            self.encode_motor(command, Motor::Left),
            self.encode_motor(command, Motor::Right),
        ]
    }

    /// Decodes a status response, ignoring bytes past the configured length
    pub fn decode_status(&self, response: &[u8]) -> Result<BusStatus> {
        if response.len() < self.status_length {
            return Err(Error::DecodeLength {
                expected: self.status_length,
                actual: response.len(),
            });
        }
        let mut proximity = [0u8; PROXIMITY_BYTES];
        proximity.copy_from_slice(&response[..PROXIMITY_BYTES]);
        Ok(BusStatus {
            proximity,
            extra: response[PROXIMITY_BYTES..self.status_length].to_vec(),
        })
    }
}
