//! Daily almanac (黃曆) summary and a simple zodiac-year forecast.

use chrono::{Datelike, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::calendar::{self, solar_terms, AstronomicalCalendar, LunarCalendar, SolarTerm};
use crate::types::{GanZhi, ZodiacAnimal};

const YI_ON_TERM_DAY: [&str; 2] = ["祭祀", "拜訪"];
const JI_ON_TERM_DAY: [&str; 2] = ["動土", "嫁娶"];
const YI_ORDINARY: [&str; 3] = ["學習", "整理", "寫計畫"];
const JI_ORDINARY: [&str; 2] = ["爭執", "重大簽約"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlmanacDay {
    pub date: NaiveDate,
    pub ganzhi_year: Option<GanZhi>,
    pub ganzhi_day: GanZhi,
    pub lunar_month_cn: Option<String>,
    pub lunar_day_cn: Option<String>,
    pub solar_term: Option<SolarTerm>,
    /// Suggested (宜)
    pub yi: Vec<String>,
    /// Avoid (忌)
    pub ji: Vec<String>,
    pub zodiac_animal: Option<ZodiacAnimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZodiacForecast {
    pub year: i32,
    pub animal: ZodiacAnimal,
    pub summary: String,
    pub advice: Vec<String>,
}

pub fn almanac_day(date: NaiveDate) -> AlmanacDay {
    almanac_day_with(&AstronomicalCalendar::new(), date)
}

/// Fields the calendar cannot provide are left empty; the Yi/Ji lists are
/// always filled.
pub fn almanac_day_with<C: LunarCalendar>(calendar: &C, date: NaiveDate) -> AlmanacDay {
    let lunar = calendar
        .lunar_date(date)
        .map_err(|e| warn!("Almanac lunar date unavailable for {}: {}", date, e))
        .ok();
    let solar_term = calendar
        .solar_terms(date.year())
        .map_err(|e| warn!("Almanac solar terms unavailable for {}: {}", date.year(), e))
        .ok()
        .and_then(|terms| solar_terms::solar_term_on_date(&terms, date))
        .map(|t| t.term);

    let ganzhi_year = lunar.map(|l| calendar::year_ganzhi(l.year));
    let (yi, ji): (&[&str], &[&str]) = if solar_term.is_some() {
        (&YI_ON_TERM_DAY[..], &JI_ON_TERM_DAY[..])
    } else {
        (&YI_ORDINARY[..], &JI_ORDINARY[..])
    };

    AlmanacDay {
        date,
        ganzhi_year,
        ganzhi_day: calendar::day_ganzhi(date),
        lunar_month_cn: lunar.map(|l| l.month_name()),
        lunar_day_cn: lunar.map(|l| l.day_name().to_string()),
        solar_term,
        yi: yi.iter().map(|s| s.to_string()).collect(),
        ji: ji.iter().map(|s| s.to_string()).collect(),
        zodiac_animal: ganzhi_year.map(|gz| gz.branch.zodiac()),
    }
}

pub fn zodiac_forecast(year: i32, animal: ZodiacAnimal) -> ZodiacForecast {
    let hint = match year.rem_euclid(12) {
        0 => "循環重啟，適合立新目標",
        1 | 2 => "持續累積，步步為營",
        3 | 4 => "人際活絡，注意節奏",
        5 | 6 => "學習成長，穩健前行",
        7 | 8 => "機會浮現，審慎評估",
        _ => "收斂調整，強化根基",
    };
    ZodiacForecast {
        year,
        animal,
        summary: format!("{}年 {}：{}。切記量力而為，以穩為先。", animal.chinese(), year, hint),
        advice: vec![
            "維持規律作息，養精蓄銳".to_string(),
            "重要決策前先列利弊清單".to_string(),
            "建立每週回顧，調整節奏".to_string(),
        ],
    }
}
