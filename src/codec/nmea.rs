//! RMC sentence decoding
//!
//! Decodes the "recommended minimum" positioning sentence from any talker
//! (`$GPRMC`, `$GNRMC`, ...). All other sentence classes are rejected with
//! [`Error::UnsupportedSentence`] so the ingest loop can report and skip them.
//!
//! Field layout after the address field:
//!
//! | # | Field |
//! |---|---|
//! | 1 | UTC time `hhmmss.sss` |
//! | 2 | Status `A` (valid) / `V` (no fix) |
//! | 3, 4 | Latitude `ddmm.mmmm`, `N`/`S` |
//! | 5, 6 | Longitude `dddmm.mmmm`, `E`/`W` |
//! | 7 | Speed over ground, knots |
//! | 8 | Track made good, degrees true |
//! | 9 | Date `ddmmyy` |
//! | 10, 11 | Magnetic variation, `E`/`W` |
//! | 12 | Mode indicator (NMEA 2.3+, optional) |

use embassy_time::Instant;

use crate::error::{Error, Result};
use crate::system::position::{PositionFix, UtcDate, UtcTime};

/// Sentence class this parser decodes
const RECOGNIZED_CLASS: &str = "RMC";

/// Data fields before the optional mode indicator
const MIN_FIELDS: usize = 12;
const MAX_FIELDS: usize = 13;

/// XOR of every byte between `$` and `*`
pub fn checksum(payload: &str) -> u8 {
    payload.bytes().fold(0, |acc, b| acc ^ b)
}

/// Decodes one sentence line into a fix stamped with `received_at`.
///
/// A receiver reporting "no fix" yields `Ok` with `valid == false`; empty
/// position fields in that case decode as `0.0`.
pub fn parse_rmc(line: &str, received_at: Instant) -> Result<PositionFix> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body = line
        .strip_prefix('$')
        .ok_or_else(|| Error::MalformedSentence(format!("missing '$' start: {line:?}")))?;
    let (payload, sum) = body
        .rsplit_once('*')
        .ok_or_else(|| Error::MalformedSentence(format!("missing checksum: {line:?}")))?;

    let expected = u8::from_str_radix(sum, 16)
        .ok()
        .filter(|_| sum.len() == 2)
        .ok_or_else(|| Error::MalformedSentence(format!("bad checksum field {sum:?}")))?;
    let actual = checksum(payload);
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }

    let fields: Vec<&str> = payload.split(',').collect();
    let address = fields[0];
    if address.len() != 5 || !address.ends_with(RECOGNIZED_CLASS) {
        return Err(Error::UnsupportedSentence(address.to_string()));
    }
    if !(MIN_FIELDS..=MAX_FIELDS).contains(&fields.len()) {
        return Err(Error::MalformedSentence(format!(
            "expected {} to {} fields, got {}",
            MIN_FIELDS,
            MAX_FIELDS,
            fields.len()
        )));
    }

    let valid = match fields[2] {
        "A" => true,
        "V" => false,
        other => {
            return Err(Error::MalformedSentence(format!("bad status {other:?}")));
        }
    };

    Ok(PositionFix {
        latitude: coordinate(fields[3], fields[4], 'N', 'S', 2)?,
        longitude: coordinate(fields[5], fields[6], 'E', 'W', 3)?,
        speed_knots: optional_number(fields[7], "speed")?,
        track_deg: optional_number(fields[8], "track")?,
        valid,
        time: utc_time(fields[1])?,
        date: utc_date(fields[9])?,
        received_at,
    })
}

/// Converts `(d)ddmm.mmmm` plus hemisphere into signed decimal degrees
fn coordinate(
    value: &str,
    hemisphere: &str,
    positive: char,
    negative: char,
    degree_digits: usize,
) -> Result<f64> {
    if value.is_empty() && hemisphere.is_empty() {
        return Ok(0.0);
    }
    let sign = match hemisphere.chars().next() {
        Some(c) if c == positive && hemisphere.len() == 1 => 1.0,
        Some(c) if c == negative && hemisphere.len() == 1 => -1.0,
        _ => {
            return Err(Error::MalformedSentence(format!(
                "bad hemisphere {hemisphere:?}"
            )));
        }
    };
    if value.len() < degree_digits + 2 || !value.is_char_boundary(degree_digits) {
        return Err(Error::MalformedSentence(format!("bad coordinate {value:?}")));
    }
    let (deg, min) = value.split_at(degree_digits);
    let degrees = number::<u16>(deg, "coordinate degrees")? as f64;
    let minutes = number::<f64>(min, "coordinate minutes")?;
    if minutes >= 60.0 {
        return Err(Error::MalformedSentence(format!("bad coordinate {value:?}")));
    }
    Ok(sign * (degrees + minutes / 60.0))
}

fn utc_time(field: &str) -> Result<Option<UtcTime>> {
    if field.is_empty() {
        return Ok(None);
    }
    if field.len() < 6 || !field.is_ascii() {
        return Err(Error::MalformedSentence(format!("bad time {field:?}")));
    }
    let time = UtcTime {
        hours: number(&field[0..2], "hours")?,
        minutes: number(&field[2..4], "minutes")?,
        seconds: number(&field[4..], "seconds")?,
    };
    if time.hours > 23 || time.minutes > 59 || time.seconds >= 61.0 {
        return Err(Error::MalformedSentence(format!("bad time {field:?}")));
    }
    Ok(Some(time))
}

fn utc_date(field: &str) -> Result<Option<UtcDate>> {
    if field.is_empty() {
        return Ok(None);
    }
    if field.len() != 6 || !field.is_ascii() {
        return Err(Error::MalformedSentence(format!("bad date {field:?}")));
    }
    let date = UtcDate {
        day: number(&field[0..2], "day")?,
        month: number(&field[2..4], "month")?,
        year: number(&field[4..6], "year")?,
    };
    if !(1..=31).contains(&date.day) || !(1..=12).contains(&date.month) {
        return Err(Error::MalformedSentence(format!("bad date {field:?}")));
    }
    Ok(Some(date))
}

fn optional_number(field: &str, what: &str) -> Result<f64> {
    if field.is_empty() {
        Ok(0.0)
    } else {
        number(field, what)
    }
}

/// Unsigned decimal field: digits with at most one `.`
fn number<T: std::str::FromStr>(field: &str, what: &str) -> Result<T> {
    let malformed = || Error::MalformedSentence(format!("non-numeric {what} {field:?}"));
    let digits = field.bytes().filter(u8::is_ascii_digit).count();
    let dots = field.bytes().filter(|&b| b == b'.').count();
    if digits == 0 || dots > 1 || digits + dots != field.len() {
        return Err(malformed());
    }
    field.parse().map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Wraps a payload into a full sentence with a correct checksum
    fn sentence(payload: &str) -> String {
        format!("${}*{:02X}", payload, checksum(payload))
    }

    fn now() -> Instant {
        Instant::from_ticks(0)
    }

    #[test]
    fn decodes_reference_sentence() {
        let fix = parse_rmc(
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A",
            now(),
        )
        .unwrap();
        assert!(fix.valid);
        assert_relative_eq!(fix.latitude, 48.0 + 7.038 / 60.0, epsilon = 1e-9);
        assert_relative_eq!(fix.longitude, 11.0 + 31.0 / 60.0, epsilon = 1e-9);
        assert_relative_eq!(fix.speed_knots, 22.4);
        assert_relative_eq!(fix.track_deg, 84.4);
        assert_eq!(
            fix.time,
            Some(UtcTime {
                hours: 12,
                minutes: 35,
                seconds: 19.0
            })
        );
        assert_eq!(
            fix.date,
            Some(UtcDate {
                day: 23,
                month: 3,
                year: 94
            })
        );
    }

    #[test]
    fn decodes_western_hemisphere() {
        let line = sentence("GPRMC,081836,A,3746.494,N,12225.164,W,0.0,0.0,130998,,,A");
        let fix = parse_rmc(&line, now()).unwrap();
        assert!(fix.valid);
        assert_relative_eq!(fix.latitude, 37.7749, epsilon = 1e-9);
        assert_relative_eq!(fix.longitude, -122.4194, epsilon = 1e-9);
        assert_relative_eq!(fix.speed_knots, 0.0);
    }

    #[test]
    fn accepts_other_talkers() {
        let line = sentence("GNRMC,081836,A,3746.494,S,12225.164,E,1.5,90.0,130998,,");
        let fix = parse_rmc(&line, now()).unwrap();
        assert_relative_eq!(fix.latitude, -37.7749, epsilon = 1e-9);
        assert_relative_eq!(fix.longitude, 122.4194, epsilon = 1e-9);
    }

    #[test]
    fn no_fix_is_not_an_error() {
        let line = sentence("GPRMC,081836,V,,,,,,,130998,,,N");
        let fix = parse_rmc(&line, now()).unwrap();
        assert!(!fix.valid);
        assert_relative_eq!(fix.latitude, 0.0);
    }

    #[test]
    fn single_character_mutation_breaks_checksum() {
        let payload = "GPRMC,081836,A,3746.494,N,12225.164,W,0.0,0.0,130998,,,A";
        let sum = checksum(payload);
        for (i, c) in payload.char_indices() {
            let replacement = if c == '7' { '8' } else { '7' };
            let mut mutated = payload.to_string();
            mutated.replace_range(i..i + 1, &replacement.to_string());
            let line = format!("${}*{:02X}", mutated, sum);
            assert!(
                matches!(parse_rmc(&line, now()), Err(Error::ChecksumMismatch { .. })),
                "mutation at {i} not detected"
            );
        }
    }

    #[test]
    fn other_classes_are_unsupported() {
        let line = sentence("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert!(matches!(
            parse_rmc(&line, now()),
            Err(Error::UnsupportedSentence(addr)) if addr == "GPGGA"
        ));
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let line = sentence("GPRMC,081836,A,3746.494,N");
        assert!(matches!(
            parse_rmc(&line, now()),
            Err(Error::MalformedSentence(_))
        ));
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let line = sentence("GPRMC,081836,A,37x6.494,N,12225.164,W,0.0,0.0,130998,,,A");
        assert!(matches!(
            parse_rmc(&line, now()),
            Err(Error::MalformedSentence(_))
        ));
    }

    #[test]
    fn signed_and_non_finite_fields_are_malformed() {
        for payload in [
            "GPRMC,081836,A,37NaN,N,12225.164,W,0.0,0.0,130998,,,A",
            "GPRMC,081836,A,3746.494,N,122-5.164,W,0.0,0.0,130998,,,A",
            "GPRMC,081836,A,3746.494,N,12225.164,W,inf,0.0,130998,,,A",
            "GPRMC,081836,A,3746.494,N,12225.164,W,0.0,NaN,130998,,,A",
            "GPRMC,081836,A,3746.494,N,12225.164,W,-1.0,0.0,130998,,,A",
            "GPRMC,081836,A,3746.494,N,12225.164,W,0.0,+90.0,130998,,,A",
            "GPRMC,081836,A,3746.4.4,N,12225.164,W,0.0,0.0,130998,,,A",
            "GPRMC,+81836,A,3746.494,N,12225.164,W,0.0,0.0,130998,,,A",
        ] {
            assert!(
                matches!(
                    parse_rmc(&sentence(payload), now()),
                    Err(Error::MalformedSentence(_))
                ),
                "{payload} accepted"
            );
        }
    }

    #[test]
    fn missing_checksum_is_malformed() {
        assert!(matches!(
            parse_rmc("$GPRMC,081836,A,3746.494,N,12225.164,W,0.0,0.0,130998,,,A", now()),
            Err(Error::MalformedSentence(_))
        ));
        assert!(matches!(
            parse_rmc("GPRMC,081836*00", now()),
            Err(Error::MalformedSentence(_))
        ));
    }

    #[test]
    fn trailing_line_ending_is_ignored() {
        let line = format!(
            "{}\r\n",
            sentence("GPRMC,081836,A,3746.494,N,12225.164,W,0.0,0.0,130998,,,A")
        );
        assert!(parse_rmc(&line, now()).is_ok());
    }
}
