//! Gregorian to Chinese lunisolar conversion.
//!
//! Pillar resolution goes through the [`LunarCalendar`] trait. The built-in
//! [`AstronomicalCalendar`] derives everything from solar longitude and new
//! moon instants taken from the Swiss Ephemeris, reckoned on almanac time
//! (UTC+8).

pub mod ephemeris;
pub mod lunar;
pub mod solar_terms;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{EarthlyBranch, GanZhi, HeavenlyStem, ZodiacAnimal};
pub use lunar::LunarDate;
pub use solar_terms::{SolarTerm, SolarTermInstant};

/// Almanac reckoning is done on China Standard Time.
pub const ALMANAC_UTC_OFFSET_HOURS: i64 = 8;

/// Proleptic Gregorian years accepted by [`AstronomicalCalendar`].
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// Errors that can occur during calendar conversion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("Year {year} is outside the supported range {MIN_YEAR}..={MAX_YEAR}")]
    YearOutOfRange { year: i32 },
    #[error("Iteration did not converge while solving {what}")]
    NoConvergence { what: String },
    #[error("Swiss Ephemeris error: {message}")]
    Ephemeris { message: String },
    #[error("Calendar backend unavailable: {message}")]
    Unavailable { message: String },
}

/// Everything the pillar resolver needs for one wall-clock moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    pub solar: NaiveDateTime,
    pub lunar: LunarDate,
    pub year: GanZhi,
    pub month: GanZhi,
    pub day: GanZhi,
    pub hour: GanZhi,
    pub zodiac: ZodiacAnimal,
    /// Term falling on the same civil day, if any.
    pub term_today: Option<SolarTerm>,
    /// 大雪 of the previous year through 大寒 of the next.
    pub term_table: Vec<SolarTermInstant>,
}

/// Source of lunisolar data. Implementations may fail; callers decide how to
/// degrade.
pub trait LunarCalendar {
    fn convert(&self, local: NaiveDateTime) -> Result<CalendarSnapshot, CalendarError>;

    fn lunar_date(&self, date: NaiveDate) -> Result<LunarDate, CalendarError>;

    fn solar_terms(&self, year: i32) -> Result<Vec<SolarTermInstant>, CalendarError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AstronomicalCalendar;

impl AstronomicalCalendar {
    pub fn new() -> Self {
        Self
    }

    fn check_year(year: i32) -> Result<(), CalendarError> {
        if (MIN_YEAR..=MAX_YEAR).contains(&year) {
            Ok(())
        } else {
            Err(CalendarError::YearOutOfRange { year })
        }
    }
}

impl LunarCalendar for AstronomicalCalendar {
    fn convert(&self, local: NaiveDateTime) -> Result<CalendarSnapshot, CalendarError> {
        let year = local.year();
        Self::check_year(year)?;

        let lunar = lunar::lunar_date(local.date())?;
        let year_gz = year_ganzhi(lunar.year);

        let term_table = solar_terms::solar_term_table(year)?;
        let month_gz = month_ganzhi(&term_table, local)?;

        let day_gz = day_ganzhi(local.date());
        let hour_gz = hour_ganzhi(local, day_gz);

        let term_today = solar_terms::solar_term_on_date(&term_table, local.date()).map(|t| t.term);

        Ok(CalendarSnapshot {
            solar: local,
            lunar,
            year: year_gz,
            month: month_gz,
            day: day_gz,
            hour: hour_gz,
            zodiac: year_gz.branch.zodiac(),
            term_today,
            term_table,
        })
    }

    fn lunar_date(&self, date: NaiveDate) -> Result<LunarDate, CalendarError> {
        Self::check_year(date.year())?;
        lunar::lunar_date(date)
    }

    fn solar_terms(&self, year: i32) -> Result<Vec<SolarTermInstant>, CalendarError> {
        Self::check_year(year)?;
        solar_terms::solar_terms_of_year(year)
    }
}

/// Year pillar of a lunar year: 1984 (甲子) starts the current cycle.
pub fn year_ganzhi(lunar_year: i32) -> GanZhi {
    GanZhi::from_cycle_index(lunar_year as i64 - 4)
}

/// Month pillar from the sectional terms: 立春 opens 寅 month, and the first
/// stem follows the year stem of the 立春 year (甲己 years open with 丙寅).
pub fn month_ganzhi(
    table: &[SolarTermInstant],
    at: NaiveDateTime,
) -> Result<GanZhi, CalendarError> {
    let last_jie = table
        .iter()
        .filter(|t| t.term.is_jie() && t.at <= at)
        .last()
        .ok_or_else(|| CalendarError::Unavailable {
            message: format!("no sectional term before {at}"),
        })?;

    // months since 立春: 立春 is index 2, jie every other index
    let months_from_yin = (last_jie.term.index() as i64 - 2).rem_euclid(24) / 2;

    // 小寒 opens 丑 month, still part of the previous 立春 year
    let li_chun_year = if last_jie.term.index() == 0 {
        last_jie.at.year() - 1
    } else {
        last_jie.at.year()
    };
    let year_stem = year_ganzhi(li_chun_year).stem;
    let first_stem = (year_stem.index() % 5) * 2 + 2;

    Ok(GanZhi::new(
        HeavenlyStem::from_index(first_stem + months_from_yin as usize),
        EarthlyBranch::from_index(2 + months_from_yin as usize),
    ))
}

/// Day pillar: the 60-day cycle counts 甲子 on JDN ≡ 11 (mod 60).
pub fn day_ganzhi(date: NaiveDate) -> GanZhi {
    GanZhi::from_cycle_index(ephemeris::jdn(date) - 11)
}

/// Hour pillar: two-hour branches starting 子 at 23:00. The late 子 hour
/// (23:00-24:00) takes its stem from the following day.
pub fn hour_ganzhi(at: NaiveDateTime, day: GanZhi) -> GanZhi {
    let hour = at.hour() as usize;
    let branch = EarthlyBranch::from_index((hour + 1) / 2);
    let day_stem = if hour == 23 {
        HeavenlyStem::from_index(day.stem.index() + 1)
    } else {
        day.stem
    };
    let first_stem = (day_stem.index() % 5) * 2;
    GanZhi::new(HeavenlyStem::from_index(first_stem + branch.index()), branch)
}
