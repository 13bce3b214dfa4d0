//! The 24 solar terms (節氣).

use chrono::{Duration, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use super::ephemeris::{datetime_from_julian, julian_date, solve_solar_longitude};
use super::{CalendarError, ALMANAC_UTC_OFFSET_HOURS};

// (chinese, english, ecliptic longitude), in calendar order from 小寒
pub const SOLAR_TERM_ORDER: [(&str, &str, f64); 24] = [
    ("小寒", "Slight Cold", 285.0),
    ("大寒", "Great Cold", 300.0),
    ("立春", "Start of Spring", 315.0),
    ("雨水", "Rain Water", 330.0),
    ("驚蟄", "Awakening of Insects", 345.0),
    ("春分", "Spring Equinox", 0.0),
    ("清明", "Clear and Bright", 15.0),
    ("穀雨", "Grain Rain", 30.0),
    ("立夏", "Start of Summer", 45.0),
    ("小滿", "Grain Buds", 60.0),
    ("芒種", "Grain in Ear", 75.0),
    ("夏至", "Summer Solstice", 90.0),
    ("小暑", "Slight Heat", 105.0),
    ("大暑", "Great Heat", 120.0),
    ("立秋", "Start of Autumn", 135.0),
    ("處暑", "End of Heat", 150.0),
    ("白露", "White Dew", 165.0),
    ("秋分", "Autumn Equinox", 180.0),
    ("寒露", "Cold Dew", 195.0),
    ("霜降", "Frost's Descent", 210.0),
    ("立冬", "Start of Winter", 225.0),
    ("小雪", "Slight Snow", 240.0),
    ("大雪", "Great Snow", 255.0),
    ("冬至", "Winter Solstice", 270.0),
];

lazy_static! {
    static ref TERM_BY_NAME: HashMap<&'static str, usize> = SOLAR_TERM_ORDER
        .iter()
        .enumerate()
        .flat_map(|(i, (zh, en, _))| [(*zh, i), (*en, i)])
        .collect();
}

/// A solar term, identified by its position in [`SOLAR_TERM_ORDER`].
/// Serialized as its Chinese name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolarTerm(u8);

impl SolarTerm {
    pub const LI_CHUN: SolarTerm = SolarTerm(2);
    pub const DONG_ZHI: SolarTerm = SolarTerm(23);

    pub fn from_index(index: usize) -> Self {
        SolarTerm((index % 24) as u8)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TERM_BY_NAME.get(name.trim()).map(|i| SolarTerm(*i as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        SOLAR_TERM_ORDER[self.index()].0
    }

    pub fn english(self) -> &'static str {
        SOLAR_TERM_ORDER[self.index()].1
    }

    pub fn longitude(self) -> f64 {
        SOLAR_TERM_ORDER[self.index()].2
    }

    /// Sectional terms (節) open a solar month; the others are principal terms (中氣).
    pub fn is_jie(self) -> bool {
        self.index() % 2 == 0
    }
}

impl Serialize for SolarTerm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SolarTerm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        SolarTerm::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown solar term: {name}")))
    }
}

impl fmt::Display for SolarTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A solar term occurrence, as almanac wall time (UTC+8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarTermInstant {
    pub term: SolarTerm,
    pub at: NaiveDateTime,
}

/// Almanac wall time of `term` in Gregorian `year`.
pub fn solar_term_instant(year: i32, term: SolarTerm) -> Result<SolarTermInstant, CalendarError> {
    // 小寒 falls around January 5-6; terms are ~15.2 days apart
    let jan6 = NaiveDate::from_ymd_opt(year, 1, 6)
        .ok_or(CalendarError::YearOutOfRange { year })?
        .and_hms_opt(0, 0, 0)
        .ok_or(CalendarError::YearOutOfRange { year })?;
    let guess = julian_date(jan6) + 15.218_4 * term.index() as f64;
    let jd = solve_solar_longitude(term.longitude(), guess)?;
    let utc = datetime_from_julian(jd).ok_or(CalendarError::YearOutOfRange { year })?;
    Ok(SolarTermInstant {
        term,
        at: utc + Duration::hours(ALMANAC_UTC_OFFSET_HOURS),
    })
}

/// All 24 terms of a Gregorian year, in order.
pub fn solar_terms_of_year(year: i32) -> Result<Vec<SolarTermInstant>, CalendarError> {
    (0..24)
        .map(|i| solar_term_instant(year, SolarTerm::from_index(i)))
        .collect()
}

/// The year's terms plus 大雪/冬至 of the previous year and 小寒/大寒 of the
/// next, so every instant of the year has a term on both sides.
pub fn solar_term_table(year: i32) -> Result<Vec<SolarTermInstant>, CalendarError> {
    let mut table = Vec::with_capacity(28);
    for i in [22, 23] {
        table.push(solar_term_instant(year - 1, SolarTerm::from_index(i))?);
    }
    table.extend(solar_terms_of_year(year)?);
    for i in [0, 1] {
        table.push(solar_term_instant(year + 1, SolarTerm::from_index(i))?);
    }
    Ok(table)
}

/// Term whose occurrence is closest to `at`. Equal distances resolve to the
/// lexicographically smaller name so the choice never depends on table order.
pub fn nearest_solar_term(table: &[SolarTermInstant], at: NaiveDateTime) -> Option<SolarTermInstant> {
    table
        .iter()
        .min_by(|a, b| {
            let da = (a.at - at).num_seconds().abs();
            let db = (b.at - at).num_seconds().abs();
            da.cmp(&db).then_with(|| a.term.name().cmp(b.term.name()))
        })
        .copied()
}

/// Term falling on the given civil date, if any.
pub fn solar_term_on_date(table: &[SolarTermInstant], date: NaiveDate) -> Option<SolarTermInstant> {
    table.iter().find(|t| t.at.date() == date).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_names_and_kinds() {
        assert_eq!(SolarTerm::LI_CHUN.name(), "立春");
        assert!(SolarTerm::LI_CHUN.is_jie());
        assert!(!SolarTerm::DONG_ZHI.is_jie());
        assert_eq!(SolarTerm::from_name("清明").unwrap().longitude(), 15.0);
        assert_eq!(SolarTerm::from_name("Winter Solstice"), Some(SolarTerm::DONG_ZHI));
        assert!(SolarTerm::from_name("元宵").is_none());
    }

    #[test]
    fn test_serializes_as_name() {
        let json = serde_json::to_string(&SolarTerm::LI_CHUN).unwrap();
        assert_eq!(json, "\"立春\"");
        let back: SolarTerm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SolarTerm::LI_CHUN);
    }

    #[test]
    fn test_known_dates_2024() {
        let expect = [
            (2, date(2024, 2, 4)),   // 立春
            (5, date(2024, 3, 20)),  // 春分
            (6, date(2024, 4, 4)),   // 清明
            (11, date(2024, 6, 21)), // 夏至
            (16, date(2024, 9, 7)),  // 白露
            (23, date(2024, 12, 21)), // 冬至
        ];
        for (i, d) in expect {
            let t = solar_term_instant(2024, SolarTerm::from_index(i)).unwrap();
            assert_eq!(t.at.date(), d, "{}", t.term);
        }
    }

    #[test]
    fn test_table_is_sorted_and_covers_year_edges() {
        let table = solar_term_table(2024).unwrap();
        assert_eq!(table.len(), 28);
        assert!(table.windows(2).all(|w| w[0].at < w[1].at));
        assert_eq!(table[0].term.name(), "大雪");
        assert_eq!(table[27].term.name(), "大寒");
    }

    #[test]
    fn test_nearest_term_tie_break_is_lexicographic() {
        let at = date(2024, 1, 10).and_hms_opt(0, 0, 0).unwrap();
        let a = SolarTermInstant {
            term: SolarTerm::from_index(1), // 大寒
            at: at + Duration::days(3),
        };
        let b = SolarTermInstant {
            term: SolarTerm::from_index(0), // 小寒
            at: at - Duration::days(3),
        };
        let nearest = nearest_solar_term(&[a, b], at).unwrap();
        assert_eq!(nearest.term.name(), "大寒".min("小寒"));
        let nearest_rev = nearest_solar_term(&[b, a], at).unwrap();
        assert_eq!(nearest.term, nearest_rev.term);
    }
}
