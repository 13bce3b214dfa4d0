//! Report prompt assembly.

use bazi::almanac::AlmanacDay;
use bazi::i18n::{label_pillar, label_solar_term, label_ten_god, label_zodiac, Lang};
use bazi::{
    compute_ten_gods, evaluate_five_elements_weighted, BaziChart, Element, FiveElementsScore,
    ScoringWeights, TenGodsProfile,
};
use serde::{Deserialize, Serialize};

pub const DATA_START: &str = "# DATA START";
pub const DATA_END: &str = "# DATA END";
pub const MAX_LINE_CHARS: usize = 120;
pub const MAX_SECTION_LINES: usize = 10;

const INSTRUCTION_ZH: &str = "你是命理顧問。以下是使用者的盤面摘要，請以溫和中性的語氣提供：1) 關鍵特質（條列），2) 現階段機會與風險（事業/情感/健康/財務），3) 三項具體可執行建議，4) 應避免的決策陷阱（簡述）。";
const INSTRUCTION_EN: &str = "You are a destiny advisor. Given the user's chart summaries, provide: 1) key traits (bulleted), 2) opportunities and risks (career/relationship/health/finance), 3) three actionable tips, 4) pitfalls to avoid (brief).";

/// Everything a report is written from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    pub chart: BaziChart,
    pub five_elements: FiveElementsScore,
    pub ten_gods: TenGodsProfile,
    pub almanac: Option<AlmanacDay>,
}

impl ReportInput {
    pub fn from_chart(chart: BaziChart, weights: &ScoringWeights) -> Self {
        Self {
            five_elements: evaluate_five_elements_weighted(&chart, weights),
            ten_gods: compute_ten_gods(&chart),
            chart,
            almanac: None,
        }
    }

    pub fn with_almanac(mut self, almanac: AlmanacDay) -> Self {
        self.almanac = Some(almanac);
        self
    }
}

/// Truncates to 120 characters, marking the cut with `…`.
pub fn clip_line(line: &str) -> String {
    if line.chars().count() > MAX_LINE_CHARS {
        let mut cut: String = line.chars().take(MAX_LINE_CHARS).collect();
        cut.push('…');
        cut
    } else {
        line.to_string()
    }
}

fn element_label(element: Element, lang: Lang) -> String {
    match lang {
        Lang::Zh => element.chinese().to_string(),
        Lang::En => element.name().to_string(),
    }
}

fn bazi_lines(input: &ReportInput, lang: Lang) -> Vec<String> {
    let chart = &input.chart;
    let pillars: Vec<String> = chart.pillars().map(|(_, p)| label_pillar(p, lang)).collect();
    let score = &input.five_elements;

    let mut lines = vec![
        format!("pillars: {}", pillars.join(" ")),
        format!("zodiac: {}", label_zodiac(chart.zodiac_animal, lang)),
        format!("solar term: {}", label_solar_term(chart.solar_term, lang)),
        format!(
            "five elements: {}",
            Element::ALL
                .iter()
                .map(|e| format!("{}={}", element_label(*e, lang), score.get(*e)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    ];
    if let Some(dominant) = score.dominant() {
        lines.push(format!("dominant element: {}", element_label(dominant, lang)));
    }
    let missing = score.missing();
    if !missing.is_empty() && score.total > 0 {
        lines.push(format!(
            "missing elements: {}",
            missing.iter().map(|e| element_label(*e, lang)).collect::<Vec<_>>().join(", ")
        ));
    }
    if let Some(self_element) = input.ten_gods.self_element {
        lines.push(format!("day master element: {}", element_label(self_element, lang)));
    }
    let mut gods: Vec<_> = input.ten_gods.relationships.iter().filter(|(_, n)| **n > 0).collect();
    gods.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    if !gods.is_empty() {
        lines.push(format!(
            "ten gods: {}",
            gods.iter()
                .map(|(g, n)| format!("{}={}", label_ten_god(**g, lang), n))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if let Some(lunar) = chart.metadata.get(bazi::chart::META_LUNAR_YMD) {
        lines.push(format!("lunar date: {}", lunar));
    }
    if let Some(error) = chart.metadata.get(bazi::chart::META_ERROR) {
        lines.push(format!("calendar unavailable: {}", error));
    }
    lines
}

fn almanac_lines(day: &AlmanacDay, lang: Lang) -> Vec<String> {
    let mut lines = vec![format!("date: {}", day.date), format!("day pillar: {}", day.ganzhi_day)];
    if let Some(year) = day.ganzhi_year {
        lines.push(format!("year pillar: {}", year));
    }
    if let (Some(month), Some(d)) = (&day.lunar_month_cn, &day.lunar_day_cn) {
        lines.push(format!("lunar: {}{}", month, d));
    }
    lines.push(format!("solar term: {}", label_solar_term(day.solar_term, lang)));
    lines.push(format!("yi: {}", day.yi.join("、")));
    lines.push(format!("ji: {}", day.ji.join("、")));
    lines
}

fn push_section(out: &mut String, title: &str, lines: &[String]) {
    let kept: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).take(MAX_SECTION_LINES).collect();
    if kept.is_empty() {
        return;
    }
    out.push_str(&format!("[{}]\n", title));
    for line in kept {
        out.push_str(&format!("- {}\n", clip_line(line)));
    }
    out.push('\n');
}

/// Instruction header in `lang`, then the chart data between the
/// `# DATA START` and `# DATA END` fences.
pub fn build_prompt(input: &ReportInput, lang: Lang) -> String {
    let mut out = String::new();
    out.push_str(match lang {
        Lang::Zh => INSTRUCTION_ZH,
        Lang::En => INSTRUCTION_EN,
    });
    out.push_str("\n\n");
    out.push_str(DATA_START);
    out.push('\n');

    push_section(&mut out, "BaZi", &bazi_lines(input, lang));
    if let Some(day) = &input.almanac {
        push_section(&mut out, "Almanac", &almanac_lines(day, lang));
    }

    out.push_str(DATA_END);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi::almanac::almanac_day;
    use chrono::NaiveDate;

    fn input() -> ReportInput {
        let chart = BaziChart::from_ganzhi("癸卯", "庚申", "乙巳", Some("辛巳")).unwrap();
        ReportInput::from_chart(chart, &ScoringWeights::default())
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt(&input(), Lang::Zh);
        assert!(prompt.starts_with("你是命理顧問"));
        let start = prompt.find(DATA_START).unwrap();
        let bazi = prompt.find("[BaZi]").unwrap();
        let end = prompt.find(DATA_END).unwrap();
        assert!(start < bazi && bazi < end);
        assert!(prompt.contains("- pillars: 癸卯 庚申 乙巳 辛巳"));
        assert!(prompt.contains("- five elements: 木=4, 火=1, 土=1, 金=7, 水=3"));
        assert!(prompt.contains("七殺=4"));
        assert!(!prompt.contains("[Almanac]"));
    }

    #[test]
    fn test_english_prompt_with_almanac() {
        let day = almanac_day(NaiveDate::from_ymd_opt(2024, 4, 4).unwrap());
        let prompt = build_prompt(&input().with_almanac(day), Lang::En);
        assert!(prompt.starts_with("You are a destiny advisor"));
        assert!(prompt.contains("- zodiac: Rabbit (兔)"));
        assert!(prompt.contains("[Almanac]"));
        assert!(prompt.contains("- solar term: Clear and Bright (清明)"));
        assert!(prompt.contains("- yi: 祭祀、拜訪"));
    }

    #[test]
    fn test_weights_only_tune_five_elements() {
        let chart = BaziChart::from_ganzhi("癸卯", "庚申", "乙巳", Some("辛巳")).unwrap();
        let heavy = ScoringWeights {
            stem_weight: 10.0,
            ..ScoringWeights::default()
        };
        let tuned = ReportInput::from_chart(chart.clone(), &heavy);
        assert_eq!(tuned.ten_gods, compute_ten_gods(&chart));
        assert_eq!(tuned.five_elements.water, 10);
        assert_ne!(tuned.five_elements, input().five_elements);
    }

    #[test]
    fn test_section_limits() {
        let long = "命".repeat(200);
        let clipped = clip_line(&long);
        assert_eq!(clipped.chars().count(), MAX_LINE_CHARS + 1);
        assert!(clipped.ends_with('…'));
        assert_eq!(clip_line("short"), "short");

        let mut out = String::new();
        let lines: Vec<String> = (0..15).map(|i| format!("line {}", i)).collect();
        push_section(&mut out, "X", &lines);
        assert_eq!(out.lines().filter(|l| l.starts_with("- ")).count(), MAX_SECTION_LINES);
    }
}
