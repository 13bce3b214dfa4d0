//! Chinese lunisolar date conversion.
//!
//! Months start on the civil day (UTC+8) of a new moon. Month 11 always holds
//! the winter solstice; when thirteen new moons separate two such months, the
//! first month without a principal term is the leap month.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ephemeris::{jdn, lunation_floor, lunation_nearest, new_moon, sun_longitude};
use super::{CalendarError, ALMANAC_UTC_OFFSET_HOURS};

const TZ_DAYS: f64 = ALMANAC_UTC_OFFSET_HOURS as f64 / 24.0;

const MONTH_NAMES: [&str; 12] = [
    "正月", "二月", "三月", "四月", "五月", "六月", "七月", "八月", "九月", "十月", "冬月", "臘月",
];

const DAY_NAMES: [&str; 30] = [
    "初一", "初二", "初三", "初四", "初五", "初六", "初七", "初八", "初九", "初十", "十一", "十二",
    "十三", "十四", "十五", "十六", "十七", "十八", "十九", "二十", "廿一", "廿二", "廿三", "廿四",
    "廿五", "廿六", "廿七", "廿八", "廿九", "三十",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunarDate {
    /// Lunar year, numbered by the Gregorian year in which it starts.
    pub year: i32,
    /// 1..=12
    pub month: u32,
    /// 1..=30
    pub day: u32,
    pub leap: bool,
}

impl LunarDate {
    pub fn month_name(&self) -> String {
        let base = MONTH_NAMES[(self.month as usize).saturating_sub(1) % 12];
        if self.leap {
            format!("閏{}", base)
        } else {
            base.to_string()
        }
    }

    pub fn day_name(&self) -> &'static str {
        DAY_NAMES[(self.day as usize).saturating_sub(1) % 30]
    }

    /// `year-month-day`, leap months written with a negative month number.
    pub fn ymd(&self) -> String {
        let month = if self.leap {
            -(self.month as i64)
        } else {
            self.month as i64
        };
        format!("{}-{}-{}", self.year, month, self.day)
    }
}

impl fmt::Display for LunarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.month_name(), self.day_name())
    }
}

/// Day number (JDN) of the civil day holding new moon `k`.
fn new_moon_day(k: i64) -> Result<i64, CalendarError> {
    Ok((new_moon(k)? + 0.5 + TZ_DAYS).floor() as i64)
}

/// 30° sector (0..12) of the Sun at the start of civil day `day`.
fn sun_sector(day: i64) -> Result<i64, CalendarError> {
    let jd = day as f64 - 0.5 - TZ_DAYS;
    Ok((sun_longitude(jd)? / 30.0).floor() as i64)
}

/// Day number on which the month containing the winter solstice of `year` begins.
fn month_11_start(year: i32) -> Result<i64, CalendarError> {
    let dec31 = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(CalendarError::YearOutOfRange { year })?;
    let k = lunation_floor(jdn(dec31) as f64);
    let nm = new_moon_day(k)?;
    if sun_sector(nm)? >= 9 {
        new_moon_day(k - 1)
    } else {
        Ok(nm)
    }
}

/// Months after month 11 (starting at `a11`) until the first month with no
/// principal term.
fn leap_month_offset(a11: i64) -> Result<i64, CalendarError> {
    let k = lunation_nearest(a11 as f64);
    let mut i = 1;
    let mut arc = sun_sector(new_moon_day(k + i)?)?;
    loop {
        let last = arc;
        i += 1;
        arc = sun_sector(new_moon_day(k + i)?)?;
        if arc == last || i >= 14 {
            break;
        }
    }
    Ok(i - 1)
}

/// Lunar date of a civil date (UTC+8 day boundaries).
pub fn lunar_date(date: NaiveDate) -> Result<LunarDate, CalendarError> {
    let day_number = jdn(date);
    let k = lunation_floor(day_number as f64);
    let mut month_start = new_moon_day(k + 1)?;
    if month_start > day_number {
        month_start = new_moon_day(k)?;
    }
    // mean-vs-true offsets can leave us one lunation late
    if month_start > day_number {
        month_start = new_moon_day(k - 1)?;
    }

    let year = date.year();
    let mut a11 = month_11_start(year)?;
    let mut b11 = a11;
    let mut lunar_year;
    if a11 >= month_start {
        lunar_year = year;
        a11 = month_11_start(year - 1)?;
    } else {
        lunar_year = year + 1;
        b11 = month_11_start(year + 1)?;
    }

    let day = (day_number - month_start + 1) as u32;
    let diff = (month_start - a11) / 29;
    let mut leap = false;
    let mut month = diff + 11;
    if b11 - a11 > 365 {
        let leap_diff = leap_month_offset(a11)?;
        if diff >= leap_diff {
            month = diff + 10;
            leap = diff == leap_diff;
        }
    }
    if month > 12 {
        month -= 12;
    }
    if month >= 11 && diff < 4 {
        lunar_year -= 1;
    }

    Ok(LunarDate {
        year: lunar_year,
        month: month as u32,
        day,
        leap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::ephemeris::date_from_jdn;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Civil date of the first day of lunar year `year` (Lunar New Year).
    fn lunar_new_year(year: i32) -> Result<NaiveDate, CalendarError> {
        let a11 = month_11_start(year - 1)?;
        let b11 = month_11_start(year)?;
        let k = lunation_nearest(a11 as f64);
        // month 1 is two lunations after month 11, three when a leap month falls
        // in month 11 or 12
        let mut offset = 2;
        if b11 - a11 > 365 && leap_month_offset(a11)? <= 2 {
            offset = 3;
        }
        date_from_jdn(new_moon_day(k + offset)?).ok_or(CalendarError::YearOutOfRange { year })
    }

    #[test]
    fn test_lunar_new_year_2024() {
        let eve = lunar_date(date(2024, 2, 9)).unwrap();
        assert_eq!((eve.year, eve.month, eve.day, eve.leap), (2023, 12, 30, false));
        let first = lunar_date(date(2024, 2, 10)).unwrap();
        assert_eq!((first.year, first.month, first.day, first.leap), (2024, 1, 1, false));
        assert_eq!(first.to_string(), "正月初一");
        assert_eq!(lunar_new_year(2024).unwrap(), date(2024, 2, 10));
    }

    #[test]
    fn test_leap_second_month_2023() {
        assert!(!lunar_date(date(2023, 3, 21)).unwrap().leap);
        let inside = lunar_date(date(2023, 3, 22)).unwrap();
        assert_eq!((inside.month, inside.day, inside.leap), (2, 1, true));
        assert_eq!(inside.month_name(), "閏二月");
        assert_eq!(inside.ymd(), "2023--2-1");
        assert!(lunar_date(date(2023, 4, 19)).unwrap().leap);
        let after = lunar_date(date(2023, 4, 20)).unwrap();
        assert_eq!((after.month, after.day, after.leap), (3, 1, false));
    }

    #[test]
    fn test_mid_autumn_2023() {
        let d = lunar_date(date(2023, 9, 29)).unwrap();
        assert_eq!((d.year, d.month, d.day), (2023, 8, 15));
        assert_eq!(d.day_name(), "十五");
    }

    #[test]
    fn test_lunar_new_year_dates() {
        assert_eq!(lunar_new_year(2023).unwrap(), date(2023, 1, 22));
        assert_eq!(lunar_new_year(2025).unwrap(), date(2025, 1, 29));
        assert_eq!(lunar_new_year(2000).unwrap(), date(2000, 2, 5));
    }
}
