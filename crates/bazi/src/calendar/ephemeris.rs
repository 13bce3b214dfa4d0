//! Sun and Moon positions from the Swiss Ephemeris.
//!
//! Without data files under `SE_EPHE_PATH` the library falls back to its
//! built-in Moshier theory, which covers roughly 3000 BC to 3000 AD.
//! Later years need the `sepl`/`semo` files.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use lazy_static::lazy_static;
use std::sync::Mutex;
use swisseph::swe::{calc_ut, julday, revjul};

use super::CalendarError;

const SUN: u32 = 0;
const MOON: u32 = 1;
// FLG_SWIEPH
const FLAGS: u32 = 2;

const TROPICAL_YEAR: f64 = 365.242_19;
/// Mean daily gain of the Moon on the Sun, degrees.
const ELONGATION_RATE: f64 = 12.190_749;
pub const SYNODIC_MONTH: f64 = 29.530_588_861;
/// Julian date of the mean new moon with lunation number 0 (2000-01-06).
pub const NEW_MOON_EPOCH: f64 = 2_451_550.097_66;

lazy_static! {
    // the C library keeps its file handles and caches in globals
    static ref SWE: Mutex<()> = Mutex::new(());
}

/// Signed difference `a - b` folded into [-180, 180).
pub fn angle_diff(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}

/// Julian Day Number (noon based) of a proleptic Gregorian date.
pub fn jdn(date: NaiveDate) -> i64 {
    // GREG_CAL = 1
    julday(date.year(), date.month() as i32, date.day() as i32, 12.0, 1).round() as i64
}

pub fn date_from_jdn(jdn: i64) -> Option<NaiveDate> {
    let (year, month, day, _) = revjul(jdn as f64, 1);
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Julian date of a naive date-time read on the UT scale.
pub fn julian_date(dt: NaiveDateTime) -> f64 {
    let hour = dt.num_seconds_from_midnight() as f64 / 3600.0;
    julday(dt.year(), dt.month() as i32, dt.day() as i32, hour, 1)
}

/// Inverse of [`julian_date`], rounded to the nearest second.
pub fn datetime_from_julian(jd: f64) -> Option<NaiveDateTime> {
    let (year, month, day, hour_decimal) = revjul(jd, 1);
    let midnight = NaiveDate::from_ymd_opt(year, month as u32, day as u32)?.and_hms_opt(0, 0, 0)?;
    let secs = (hour_decimal * 3600.0).round() as i64;
    Some(midnight + Duration::seconds(secs))
}

fn longitude(body: u32, jd: f64) -> Result<f64, CalendarError> {
    let _guard = SWE.lock().map_err(|_| CalendarError::Ephemeris {
        message: "ephemeris lock poisoned".to_string(),
    })?;
    let result = calc_ut(jd, body, FLAGS).map_err(|e| CalendarError::Ephemeris {
        message: format!("body {} at JD {:.5}: {}", body, jd, e),
    })?;
    Ok(result.out[0].rem_euclid(360.0))
}

/// Apparent geocentric ecliptic longitude of the Sun at a UT Julian date.
pub fn sun_longitude(jd: f64) -> Result<f64, CalendarError> {
    longitude(SUN, jd)
}

/// Moon minus Sun, in [-180, 180).
pub fn elongation(jd: f64) -> Result<f64, CalendarError> {
    Ok(angle_diff(longitude(MOON, jd)?, longitude(SUN, jd)?))
}

/// Instant (UT Julian date) at which the Sun reaches `target` degrees,
/// searched from `guess`, which must lie within a few days of the answer.
pub fn solve_solar_longitude(target: f64, guess: f64) -> Result<f64, CalendarError> {
    let mut jd = guess;
    for _ in 0..32 {
        let step = angle_diff(target, sun_longitude(jd)?) * TROPICAL_YEAR / 360.0;
        jd += step;
        if step.abs() < 1e-7 {
            return Ok(jd);
        }
    }
    Err(CalendarError::NoConvergence {
        what: format!("solar longitude {target}"),
    })
}

/// UT Julian date of the true new moon with lunation number `k`
/// (k = 0 is the new moon of 2000-01-06).
pub fn new_moon(k: i64) -> Result<f64, CalendarError> {
    let mut jd = NEW_MOON_EPOCH + SYNODIC_MONTH * k as f64;
    for _ in 0..32 {
        let step = -elongation(jd)? / ELONGATION_RATE;
        jd += step;
        if step.abs() < 1e-6 {
            return Ok(jd);
        }
    }
    Err(CalendarError::NoConvergence {
        what: format!("new moon {k}"),
    })
}

/// Lunation number of the mean new moon at or before `jd`.
pub fn lunation_floor(jd: f64) -> i64 {
    ((jd - NEW_MOON_EPOCH) / SYNODIC_MONTH).floor() as i64
}

/// Lunation whose mean new moon falls nearest to `jd`.
pub fn lunation_nearest(jd: f64) -> i64 {
    ((jd - NEW_MOON_EPOCH) / SYNODIC_MONTH + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_jdn_reference_dates() {
        assert_eq!(jdn(date(2000, 1, 1)), 2_451_545);
        assert_eq!(jdn(date(1949, 10, 1)), 2_433_191);
        assert_eq!(date_from_jdn(2_451_545), Some(date(2000, 1, 1)));
    }

    #[test]
    fn test_julian_date_round_trip() {
        let dt = date(2024, 2, 4).and_hms_opt(16, 26, 53).unwrap();
        assert_eq!(datetime_from_julian(julian_date(dt)), Some(dt));
        let noon = date(2000, 1, 1).and_hms_opt(12, 0, 0).unwrap();
        assert!((julian_date(noon) - 2_451_545.0).abs() < 1e-9);
    }

    #[test]
    fn test_spring_equinox_2024() {
        // 2024-03-20 03:06 UTC
        let guess = julian_date(date(2024, 3, 18).and_hms_opt(0, 0, 0).unwrap());
        let jd = solve_solar_longitude(0.0, guess).unwrap();
        let dt = datetime_from_julian(jd).unwrap();
        let expected = date(2024, 3, 20).and_hms_opt(3, 6, 0).unwrap();
        assert!((dt - expected).num_minutes().abs() <= 2, "{}", dt);
    }

    #[test]
    fn test_new_moon_before_lunar_new_year_2024() {
        // 2024-02-09 22:59 UTC
        let start = julian_date(date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap());
        let jd = new_moon(lunation_floor(start) + 1).unwrap();
        let dt = datetime_from_julian(jd).unwrap();
        let expected = date(2024, 2, 9).and_hms_opt(22, 59, 0).unwrap();
        assert!((dt - expected).num_minutes().abs() <= 2, "{}", dt);
    }

    #[test]
    fn test_angle_diff_wraps() {
        assert!((angle_diff(1.0, 359.0) - 2.0).abs() < 1e-12);
        assert!((angle_diff(359.0, 1.0) + 2.0).abs() < 1e-12);
    }
}
