//! Birth input and the four-pillar chart.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::calendar::{solar_terms, AstronomicalCalendar, CalendarSnapshot, LunarCalendar, SolarTerm};
use crate::types::{GanZhi, ParseError, Pillar, ZodiacAnimal};

pub const META_GZ_YEAR: &str = "gzYear";
pub const META_GZ_MONTH: &str = "gzMonth";
pub const META_GZ_DAY: &str = "gzDay";
pub const META_GZ_HOUR: &str = "gzHour";
pub const META_LUNAR_YMD: &str = "lunarYmd";
pub const META_SOLAR_YMD: &str = "solarYmd";
pub const META_JIE_QI: &str = "jieQi";
pub const META_ERROR: &str = "error";

#[derive(Error, Debug)]
pub enum BirthInputError {
    #[error("Unknown time zone {zone:?}: {message}")]
    InvalidZone { zone: String, message: String },
    #[error("Cannot parse birth time {input:?} (expected RFC 3339, YYYY-MM-DDTHH:MM[:SS] or YYYY-MM-DD)")]
    InvalidTimestamp { input: String },
    #[error("Local time {local} does not exist in {zone}")]
    NonexistentLocalTime { local: NaiveDateTime, zone: String },
}

/// A birth instant in its IANA zone. `time_known = false` drops the hour pillar.
#[derive(Debug, Clone, PartialEq)]
pub struct BirthMoment {
    pub datetime: DateTime<Tz>,
    pub time_known: bool,
}

impl BirthMoment {
    pub fn new(datetime: DateTime<Tz>) -> Self {
        Self {
            datetime,
            time_known: true,
        }
    }

    pub fn zone(name: &str) -> Result<Tz, BirthInputError> {
        name.trim()
            .parse::<Tz>()
            .map_err(|e| BirthInputError::InvalidZone {
                zone: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Wall-clock fields in `tz`. Ambiguous times (DST fall-back) take the
    /// earlier instant.
    pub fn from_local(local: NaiveDateTime, tz: Tz) -> Result<Self, BirthInputError> {
        let datetime = tz
            .from_local_datetime(&local)
            .earliest()
            .ok_or_else(|| BirthInputError::NonexistentLocalTime {
                local,
                zone: tz.name().to_string(),
            })?;
        Ok(Self::new(datetime))
    }

    /// A birth date without a time of day; resolved at local noon.
    pub fn date_only(date: NaiveDate, tz: Tz) -> Result<Self, BirthInputError> {
        let mut moment = Self::from_local(date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()), tz)?;
        moment.time_known = false;
        Ok(moment)
    }

    /// Parses RFC 3339 (offset converted into `zone`), a naive local
    /// date-time, or a bare date (time unknown).
    pub fn parse(input: &str, zone: &str) -> Result<Self, BirthInputError> {
        let tz = Self::zone(zone)?;
        let input = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::new(dt.with_timezone(&tz)));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
            if let Ok(local) = NaiveDateTime::parse_from_str(input, fmt) {
                return Self::from_local(local, tz);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Self::date_only(date, tz);
        }
        Err(BirthInputError::InvalidTimestamp {
            input: input.to_string(),
        })
    }

    pub fn local(&self) -> NaiveDateTime {
        self.datetime.naive_local()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PillarPosition {
    Year,
    Month,
    Day,
    Hour,
}

/// Four pillars plus the derived labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaziChart {
    pub year: Pillar,
    pub month: Pillar,
    pub day: Pillar,
    pub hour: Option<Pillar>,
    pub zodiac_animal: Option<ZodiacAnimal>,
    pub solar_term: Option<SolarTerm>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl BaziChart {
    pub fn new(year: Pillar, month: Pillar, day: Pillar, hour: Option<Pillar>) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            zodiac_animal: None,
            solar_term: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Chart from literal pairs such as `("癸卯", "庚申", "乙巳", Some("辛巳"))`.
    pub fn from_ganzhi(
        year: &str,
        month: &str,
        day: &str,
        hour: Option<&str>,
    ) -> Result<Self, ParseError> {
        let hour = hour.map(|h| h.parse::<GanZhi>()).transpose()?;
        let year: GanZhi = year.parse()?;
        let mut chart = Self::new(
            year.into(),
            month.parse::<GanZhi>()?.into(),
            day.parse::<GanZhi>()?.into(),
            hour.map(Pillar::from),
        );
        chart.zodiac_animal = Some(year.branch.zodiac());
        Ok(chart)
    }

    /// Chart returned when the calendar could not be consulted.
    pub fn unknown(time_known: bool, reason: &str) -> Self {
        let mut chart = Self::new(
            Pillar::UNKNOWN,
            Pillar::UNKNOWN,
            Pillar::UNKNOWN,
            time_known.then_some(Pillar::UNKNOWN),
        );
        chart.metadata.insert(META_ERROR.to_string(), reason.to_string());
        chart
    }

    /// Pillars in year, month, day, hour order; the hour only when present.
    pub fn pillars(&self) -> impl Iterator<Item = (PillarPosition, &Pillar)> {
        [
            (PillarPosition::Year, Some(&self.year)),
            (PillarPosition::Month, Some(&self.month)),
            (PillarPosition::Day, Some(&self.day)),
            (PillarPosition::Hour, self.hour.as_ref()),
        ]
        .into_iter()
        .filter_map(|(pos, p)| p.map(|p| (pos, p)))
    }

    pub fn has_unknown_pillar(&self) -> bool {
        self.pillars().any(|(_, p)| p.is_unknown())
    }
}

/// Resolves birth moments into charts through a [`LunarCalendar`].
#[derive(Debug, Clone, Default)]
pub struct PillarResolver<C: LunarCalendar = AstronomicalCalendar> {
    calendar: C,
}

impl PillarResolver<AstronomicalCalendar> {
    pub fn new() -> Self {
        Self {
            calendar: AstronomicalCalendar::new(),
        }
    }
}

impl<C: LunarCalendar> PillarResolver<C> {
    pub fn with_calendar(calendar: C) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// Never fails: calendar errors yield [`Pillar::UNKNOWN`] pillars with the
    /// reason under the `error` metadata key.
    pub fn resolve(&self, birth: &BirthMoment) -> BaziChart {
        let local = birth.local();
        match self.calendar.convert(local) {
            Ok(snapshot) => build_chart(&snapshot, birth.time_known),
            Err(e) => {
                warn!("Calendar conversion failed for {} ({}): {}", local, birth.datetime.timezone().name(), e);
                BaziChart::unknown(birth.time_known, &e.to_string())
            }
        }
    }
}

fn build_chart(snapshot: &CalendarSnapshot, time_known: bool) -> BaziChart {
    let local = snapshot.solar;
    let solar_term = snapshot.term_today.or_else(|| {
        solar_terms::nearest_solar_term(&snapshot.term_table, local).map(|t| t.term)
    });
    debug!(
        "Resolved {} -> {} {} {} {} (term {:?})",
        local, snapshot.year, snapshot.month, snapshot.day, snapshot.hour, solar_term
    );

    let mut metadata = BTreeMap::new();
    metadata.insert(META_GZ_YEAR.to_string(), snapshot.year.to_string());
    metadata.insert(META_GZ_MONTH.to_string(), snapshot.month.to_string());
    metadata.insert(META_GZ_DAY.to_string(), snapshot.day.to_string());
    if time_known {
        metadata.insert(META_GZ_HOUR.to_string(), snapshot.hour.to_string());
    }
    metadata.insert(META_LUNAR_YMD.to_string(), snapshot.lunar.ymd());
    metadata.insert(
        META_SOLAR_YMD.to_string(),
        format!("{}-{}-{}", local.year(), local.month(), local.day()),
    );
    metadata.insert(
        META_JIE_QI.to_string(),
        solar_term.map(|t| t.name().to_string()).unwrap_or_default(),
    );

    BaziChart {
        year: snapshot.year.into(),
        month: snapshot.month.into(),
        day: snapshot.day.into(),
        hour: time_known.then(|| snapshot.hour.into()),
        zodiac_animal: Some(snapshot.zodiac),
        solar_term,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarError, LunarDate, SolarTermInstant};

    struct BrokenCalendar;

    impl LunarCalendar for BrokenCalendar {
        fn convert(&self, _local: NaiveDateTime) -> Result<CalendarSnapshot, CalendarError> {
            Err(CalendarError::Unavailable {
                message: "offline".to_string(),
            })
        }

        fn lunar_date(&self, _date: NaiveDate) -> Result<LunarDate, CalendarError> {
            Err(CalendarError::Unavailable {
                message: "offline".to_string(),
            })
        }

        fn solar_terms(&self, _year: i32) -> Result<Vec<SolarTermInstant>, CalendarError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_parse_forms() {
        let a = BirthMoment::parse("2023-08-15T10:00:00+08:00", "Asia/Taipei").unwrap();
        let b = BirthMoment::parse("2023-08-15T10:00", "Asia/Taipei").unwrap();
        assert_eq!(a.datetime, b.datetime);
        assert!(a.time_known);
        let c = BirthMoment::parse("2023-08-15", "Asia/Taipei").unwrap();
        assert!(!c.time_known);
        assert!(BirthMoment::parse("yesterday", "Asia/Taipei").is_err());
        assert!(BirthMoment::parse("2023-08-15", "Mars/Olympus").is_err());
    }

    #[test]
    fn test_offset_is_converted_into_zone() {
        // 02:00Z is 10:00 in Taipei
        let m = BirthMoment::parse("2023-08-15T02:00:00Z", "Asia/Taipei").unwrap();
        assert_eq!(m.local().format("%H:%M").to_string(), "10:00");
    }

    #[test]
    fn test_broken_calendar_yields_sentinel() {
        let resolver = PillarResolver::with_calendar(BrokenCalendar);
        let birth = BirthMoment::parse("2023-08-15T10:00", "Asia/Taipei").unwrap();
        let chart = resolver.resolve(&birth);
        assert!(chart.year.is_unknown());
        assert!(chart.month.is_unknown());
        assert!(chart.day.is_unknown());
        assert_eq!(chart.hour, Some(Pillar::UNKNOWN));
        assert!(chart.zodiac_animal.is_none());
        assert!(chart.solar_term.is_none());
        assert!(chart.metadata[META_ERROR].contains("offline"));
    }

    #[test]
    fn test_unknown_time_omits_hour() {
        let birth = BirthMoment::parse("2023-08-15", "Asia/Taipei").unwrap();
        let chart = PillarResolver::new().resolve(&birth);
        assert!(chart.hour.is_none());
        assert!(!chart.metadata.contains_key(META_GZ_HOUR));
        assert_eq!(chart.pillars().count(), 3);
    }

    #[test]
    fn test_from_ganzhi() {
        let chart = BaziChart::from_ganzhi("癸卯", "庚申", "乙巳", Some("辛巳")).unwrap();
        assert_eq!(chart.zodiac_animal, Some(ZodiacAnimal::Rabbit));
        assert_eq!(chart.pillars().count(), 4);
        assert!(BaziChart::from_ganzhi("癸", "庚申", "乙巳", None).is_err());
    }
}
