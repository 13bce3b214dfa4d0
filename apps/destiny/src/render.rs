//! Plain-text rendering for terminal output.

use bazi::almanac::{AlmanacDay, ZodiacForecast};
use bazi::i18n::{label_pillar, label_solar_term, label_ten_god, label_zodiac, polarity_school_or_default, Lang};
use bazi::{BaziChart, Element, FiveElementsScore, LuckCycle, PillarPosition, TenGod, TenGodsProfile};

fn position_label(position: PillarPosition, lang: Lang) -> &'static str {
    match (position, lang) {
        (PillarPosition::Year, Lang::Zh) => "年柱",
        (PillarPosition::Month, Lang::Zh) => "月柱",
        (PillarPosition::Day, Lang::Zh) => "日柱",
        (PillarPosition::Hour, Lang::Zh) => "時柱",
        (PillarPosition::Year, Lang::En) => "Year",
        (PillarPosition::Month, Lang::En) => "Month",
        (PillarPosition::Day, Lang::En) => "Day",
        (PillarPosition::Hour, Lang::En) => "Hour",
    }
}

fn element_label(element: Element, lang: Lang) -> &'static str {
    if lang.is_zh() {
        element.chinese()
    } else {
        element.name()
    }
}

pub fn chart(chart: &BaziChart, lang: Lang) -> String {
    let mut out = String::new();
    for (position, pillar) in chart.pillars() {
        out.push_str(&format!("{:<6} {}\n", position_label(position, lang), label_pillar(pillar, lang)));
    }
    if chart.hour.is_none() {
        out.push_str(&format!("{:<6} -\n", position_label(PillarPosition::Hour, lang)));
    }
    out.push_str(&format!("zodiac: {}\n", label_zodiac(chart.zodiac_animal, lang)));
    out.push_str(&format!("solar term: {}\n", label_solar_term(chart.solar_term, lang)));
    for (key, value) in &chart.metadata {
        out.push_str(&format!("  {}: {}\n", key, value));
    }
    out
}

pub fn scores(score: &FiveElementsScore, gods: &TenGodsProfile, lang: Lang, school: Option<&str>) -> String {
    let mut out = String::new();
    for element in Element::ALL {
        let n = score.get(element);
        out.push_str(&format!(
            "{:<6} {:>3} {}\n",
            element_label(element, lang),
            n,
            "#".repeat(n.max(0) as usize)
        ));
    }
    out.push_str(&format!("total  {:>3}\n", score.total));

    if let Some(self_element) = gods.self_element {
        out.push_str(&format!("\nday master: {}\n", element_label(self_element, lang)));
    }
    let school = polarity_school_or_default(school);
    for god in TenGod::ALL {
        let Some(n) = gods.relationships.get(&god) else {
            continue;
        };
        let marker = if school.is_same_polarity(god) { "+" } else { " " };
        out.push_str(&format!("{} {:<24} {:>3}\n", marker, label_ten_god(god, lang), n));
    }
    if let Some(notes) = &gods.notes {
        out.push_str(&format!("({})\n", notes));
    }
    out
}

pub fn luck(cycles: &[LuckCycle]) -> String {
    let mut out = String::new();
    for c in cycles {
        out.push_str(&format!(
            "{}  {} .. {}\n",
            c.name,
            c.start.format("%Y-%m-%d"),
            c.end.format("%Y-%m-%d")
        ));
    }
    out
}

pub fn almanac(day: &AlmanacDay, lang: Lang) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}  {}日\n", day.date, day.ganzhi_day));
    if let Some(year) = day.ganzhi_year {
        out.push_str(&format!("year: {} ({})\n", year, label_zodiac(day.zodiac_animal, lang)));
    }
    if let (Some(month), Some(d)) = (&day.lunar_month_cn, &day.lunar_day_cn) {
        out.push_str(&format!("lunar: {}{}\n", month, d));
    }
    out.push_str(&format!("solar term: {}\n", label_solar_term(day.solar_term, lang)));
    out.push_str(&format!("宜: {}\n", day.yi.join("、")));
    out.push_str(&format!("忌: {}\n", day.ji.join("、")));
    out
}

pub fn forecast(forecast: &ZodiacForecast) -> String {
    let mut out = format!("{}\n", forecast.summary);
    for tip in &forecast.advice {
        out.push_str(&format!("- {}\n", tip));
    }
    out
}
