//! Controller configuration
//!
//! Loaded from a TOML file. Every section and field has a default equal to the
//! reference vehicle's wiring, so an empty file is a valid configuration.
//!
//! ```toml
//! [serial]
//! path = "/dev/ttyS0"
//!
//! [bus]
//! device_address = 0x1A
//! poll_interval_ms = 100
//!
//! [calibration.forward]
//! clear_upper_bound = 0x10
//! far_upper_bound = 0x50
//!
//! [navigation]
//! target_latitude = 37.7749
//! target_longitude = -122.4194
//! ```

use std::path::Path;

use embassy_time::Duration;
use serde::Deserialize;

use crate::codec::bus::{BusCodec, Endpoints, PowerTiers};
use crate::error::{Error, Result};
use crate::system::position::Waypoint;
use crate::system::proximity::{SensorArray, SensorCalibration};

/// Top-level configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub bus: BusConfig,
    pub tiers: TierConfig,
    pub calibration: CalibrationConfig,
    pub navigation: NavigationConfig,
}

/// GPS serial line settings (8N1)
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub path: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: "/dev/ttyS0".to_string(),
            baud_rate: 9600,
        }
    }
}

/// Peripheral bus addressing and timing
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    /// I2C character device
    pub path: String,
    /// 7-bit address of the peripheral controller
    pub device_address: u8,
    pub status_register: u8,
    pub left_motor_register: u8,
    pub right_motor_register: u8,
    /// Bytes returned by a status read, at least 3
    pub status_length: usize,
    pub poll_interval_ms: u64,
    /// Hard limit on a single transaction
    pub transaction_timeout_ms: u64,
    /// Attempts at the final park write before giving up
    pub park_attempts: u8,
    /// Start delta detection from an all-clear snapshot instead of no prior
    pub seed_clear_proximity: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            path: "/dev/i2c-1".to_string(),
            device_address: 0x1A,
            status_register: 0x10,
            left_motor_register: 0x01,
            right_motor_register: 0x02,
            status_length: 3,
            poll_interval_ms: 100,
            transaction_timeout_ms: 50,
            park_attempts: 3,
            seed_clear_proximity: true,
        }
    }
}

impl BusConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }
}

/// Motor power tier bytes
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TierConfig {
    pub park: u8,
    pub slow: u8,
    pub medium: u8,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            park: 0x00,
            slow: 0x50,
            medium: 0xA0,
        }
    }
}

/// One IR sensor's thresholds
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    pub clear_upper_bound: u8,
    pub far_upper_bound: u8,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            clear_upper_bound: 0x10,
            far_upper_bound: 0x50,
        }
    }
}

impl ThresholdConfig {
    fn calibration(&self) -> Result<SensorCalibration> {
        SensorCalibration::new(self.clear_upper_bound, self.far_upper_bound)
    }
}

/// IR sensor thresholds per direction
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    pub left: ThresholdConfig,
    pub forward: ThresholdConfig,
    pub right: ThresholdConfig,
}

/// Goal and steering parameters
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct NavigationConfig {
    pub target_latitude: f64,
    pub target_longitude: f64,
    /// Distance under which the target counts as reached (m)
    pub arrival_tolerance_m: f64,
    /// Heading error tolerated before steering (deg)
    pub heading_deadband_deg: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            target_latitude: 0.0,
            target_longitude: 0.0,
            arrival_tolerance_m: 3.0,
            heading_deadband_deg: 15.0,
        }
    }
}

impl NavigationConfig {
    pub fn target(&self) -> Waypoint {
        Waypoint::new(self.target_latitude, self.target_longitude)
    }
}

impl Config {
    /// Loads and validates a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every invariant the controller relies on
    pub fn validate(&self) -> Result<()> {
        self.sensor_array()?;
        self.codec()?;
        if self.bus.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig("poll interval must be non-zero".into()));
        }
        if self.bus.transaction_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "transaction timeout must be non-zero".into(),
            ));
        }
        if self.bus.park_attempts == 0 {
            return Err(Error::InvalidConfig("park attempts must be at least 1".into()));
        }
        let nav = &self.navigation;
        if !(-90.0..=90.0).contains(&nav.target_latitude)
            || !(-180.0..=180.0).contains(&nav.target_longitude)
        {
            return Err(Error::InvalidConfig(format!(
                "target ({}, {}) is not a valid coordinate",
                nav.target_latitude, nav.target_longitude
            )));
        }
        if !(nav.arrival_tolerance_m > 0.0) {
            return Err(Error::InvalidConfig("arrival tolerance must be positive".into()));
        }
        if !(0.0..180.0).contains(&nav.heading_deadband_deg) {
            return Err(Error::InvalidConfig(
                "heading deadband must be within [0, 180)".into(),
            ));
        }
        Ok(())
    }

    pub fn sensor_array(&self) -> Result<SensorArray> {
        Ok(SensorArray {
            left: self.calibration.left.calibration()?,
            forward: self.calibration.forward.calibration()?,
            right: self.calibration.right.calibration()?,
        })
    }

    pub fn codec(&self) -> Result<BusCodec> {
        let tiers = PowerTiers::new(self.tiers.park, self.tiers.slow, self.tiers.medium)?;
        let endpoints = Endpoints {
            status: self.bus.status_register,
            left_motor: self.bus.left_motor_register,
            right_motor: self.bus.right_motor_register,
        };
        BusCodec::new(endpoints, tiers, self.bus.status_length)
    }
}
