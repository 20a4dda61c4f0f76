//! Position Types
//!
//! Decoded GPS fixes and the great-circle helpers the navigator steers with.

use embassy_time::Instant;

/// Mean Earth radius used for distance estimates (m)
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// UTC time of day carried by a sentence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtcTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: f32,
}

/// UTC calendar date carried by a sentence (two-digit year)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcDate {
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

/// One decoded location/velocity sample
///
/// Latitude and longitude are signed decimal degrees (north and east positive).
/// A fix with `valid == false` still carries whatever fields the receiver sent;
/// the navigator ignores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Speed over ground in knots, as transmitted
    pub speed_knots: f64,
    /// Track made good in degrees true
    pub track_deg: f64,
    pub valid: bool,
    pub time: Option<UtcTime>,
    pub date: Option<UtcDate>,
    /// Local receipt time
    pub received_at: Instant,
}

impl PositionFix {
    /// Position of this fix as a waypoint
    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.latitude, self.longitude)
    }
}

/// A point on the globe in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in metres (haversine)
    pub fn distance_to(&self, other: &Waypoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Initial bearing towards `other` in degrees true, `[0, 360)`
    pub fn bearing_to(&self, other: &Waypoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
        y.atan2(x).to_degrees().rem_euclid(360.0)
    }
}

/// Signed difference `to - from` folded into `(-180, 180]` degrees
///
/// Positive means `to` lies clockwise of `from`.
pub fn heading_error(from: f64, to: f64) -> f64 {
    let diff = (to - from).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}
