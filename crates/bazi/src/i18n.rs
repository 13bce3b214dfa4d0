//! Display labels. Chinese UIs show the native term; English UIs show the
//! English name followed by the Chinese in parentheses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::calendar::SolarTerm;
use crate::ten_gods::TenGod;
use crate::types::{EarthlyBranch, HeavenlyStem, Pillar, ZodiacAnimal, UNKNOWN_MARK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lang {
    #[default]
    Zh,
    En,
}

impl Lang {
    /// Any tag starting with `zh` (zh, zh-TW, zh_Hant...) is Chinese.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("zh") {
            Lang::Zh
        } else {
            Lang::En
        }
    }

    pub fn is_zh(self) -> bool {
        self == Lang::Zh
    }
}

fn bilingual(lang: Lang, zh: &str, en: &str) -> String {
    match lang {
        Lang::Zh => zh.to_string(),
        Lang::En => format!("{} ({})", en, zh),
    }
}

pub fn ten_god_zh(god: TenGod) -> &'static str {
    match god {
        TenGod::BiJian => "比肩",
        TenGod::JieCai => "劫財",
        TenGod::ShiShen => "食神",
        TenGod::ShangGuan => "傷官",
        TenGod::ZhengCai => "正財",
        TenGod::PianCai => "偏財",
        TenGod::ZhengGuan => "正官",
        TenGod::QiSha => "七殺",
        TenGod::ZhengYin => "正印",
        TenGod::PianYin => "偏印",
    }
}

pub fn ten_god_en(god: TenGod) -> &'static str {
    match god {
        TenGod::BiJian => "Peer",
        TenGod::JieCai => "Rob Wealth",
        TenGod::ShiShen => "Eating God",
        TenGod::ShangGuan => "Hurting Officer",
        TenGod::ZhengCai => "Direct Wealth",
        TenGod::PianCai => "Indirect Wealth",
        TenGod::ZhengGuan => "Direct Officer",
        TenGod::QiSha => "Seven Killings",
        TenGod::ZhengYin => "Direct Resource",
        TenGod::PianYin => "Indirect Resource",
    }
}

pub fn label_ten_god(god: TenGod, lang: Lang) -> String {
    bilingual(lang, ten_god_zh(god), ten_god_en(god))
}

pub fn label_stem(stem: HeavenlyStem, lang: Lang) -> String {
    bilingual(lang, stem.chinese(), stem.pinyin())
}

pub fn label_branch(branch: EarthlyBranch, lang: Lang) -> String {
    bilingual(lang, branch.chinese(), branch.pinyin())
}

/// `甲子` in Chinese, `Jia-Zi (甲子)` in English; unknown halves print `?`.
pub fn label_pillar(pillar: &Pillar, lang: Lang) -> String {
    match lang {
        Lang::Zh => pillar.to_string(),
        Lang::En => {
            let stem = pillar.stem.map(HeavenlyStem::pinyin).unwrap_or(UNKNOWN_MARK);
            let branch = pillar.branch.map(EarthlyBranch::pinyin).unwrap_or(UNKNOWN_MARK);
            format!("{}-{} ({})", stem, branch, pillar)
        }
    }
}

pub fn label_zodiac(animal: Option<ZodiacAnimal>, lang: Lang) -> String {
    match animal {
        Some(a) => bilingual(lang, a.chinese(), a.english()),
        None => UNKNOWN_MARK.to_string(),
    }
}

pub fn label_solar_term(term: Option<SolarTerm>, lang: Lang) -> String {
    match (term, lang) {
        (Some(t), _) => bilingual(lang, t.name(), t.english()),
        (None, Lang::Zh) => "(無)".to_string(),
        (None, Lang::En) => "(none)".to_string(),
    }
}

/// A convention for which Ten Gods share the day stem's polarity when
/// charts are colour-coded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolaritySchool {
    pub id: String,
    pub name_zh: String,
    pub same_set: BTreeSet<TenGod>,
}

impl PolaritySchool {
    fn new(id: &str, name_zh: &str, same: [TenGod; 4]) -> Self {
        Self {
            id: id.to_string(),
            name_zh: name_zh.to_string(),
            same_set: same.into_iter().collect(),
        }
    }

    pub fn custom(same_set: BTreeSet<TenGod>) -> Self {
        Self {
            id: "custom".to_string(),
            name_zh: "自訂：使用者定義".to_string(),
            same_set,
        }
    }

    pub fn is_same_polarity(&self, god: TenGod) -> bool {
        self.same_set.contains(&god)
    }
}

pub fn polarity_schools() -> Vec<PolaritySchool> {
    use TenGod::*;
    vec![
        PolaritySchool::new("default", "傳統：比劫印同極", [BiJian, JieCai, ZhengYin, PianYin]),
        PolaritySchool::new("altA", "變體A：食傷同極", [BiJian, JieCai, ShiShen, ShangGuan]),
        PolaritySchool::new("altB", "變體B：財官同極", [ZhengCai, PianCai, ZhengGuan, QiSha]),
        PolaritySchool::new("altC", "變體C：比劫+財同極", [BiJian, JieCai, ZhengCai, PianCai]),
        PolaritySchool::new("altD", "變體D：印星+官殺同極", [ZhengYin, PianYin, ZhengGuan, QiSha]),
    ]
}

/// Looks up a school by id, falling back to the default one.
pub fn polarity_school_or_default(id: Option<&str>) -> PolaritySchool {
    let mut schools = polarity_schools();
    let idx = id
        .and_then(|id| schools.iter().position(|s| s.id == id))
        .unwrap_or(0);
    schools.swap_remove(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_tags() {
        assert_eq!(Lang::from_tag("zh-TW"), Lang::Zh);
        assert_eq!(Lang::from_tag("ZH"), Lang::Zh);
        assert_eq!(Lang::from_tag("en-US"), Lang::En);
        assert_eq!(Lang::from_tag(""), Lang::En);
    }

    #[test]
    fn test_labels() {
        assert_eq!(label_ten_god(TenGod::QiSha, Lang::Zh), "七殺");
        assert_eq!(label_ten_god(TenGod::QiSha, Lang::En), "Seven Killings (七殺)");
        assert_eq!(label_stem(HeavenlyStem::Geng, Lang::En), "Geng (庚)");
        assert_eq!(label_branch(EarthlyBranch::Hai, Lang::Zh), "亥");
        assert_eq!(label_zodiac(Some(ZodiacAnimal::Dragon), Lang::En), "Dragon (龍)");
        assert_eq!(label_zodiac(None, Lang::En), "?");
        assert_eq!(label_solar_term(None, Lang::Zh), "(無)");
        assert_eq!(label_solar_term(SolarTerm::from_name("白露"), Lang::En), "White Dew (白露)");
        assert_eq!(
            label_pillar(&Pillar::new(HeavenlyStem::Jia, EarthlyBranch::Zi), Lang::En),
            "Jia-Zi (甲子)"
        );
    }

    #[test]
    fn test_every_solar_term_has_english() {
        for i in 0..24 {
            let t = SolarTerm::from_index(i);
            assert!(label_solar_term(Some(t), Lang::En).ends_with(&format!("({})", t.name())));
            assert!(!t.english().is_empty());
        }
    }

    #[test]
    fn test_polarity_schools() {
        assert_eq!(polarity_schools().len(), 5);
        let default = polarity_school_or_default(None);
        assert_eq!(default.id, "default");
        assert!(default.is_same_polarity(TenGod::ZhengYin));
        assert!(!default.is_same_polarity(TenGod::QiSha));
        assert_eq!(polarity_school_or_default(Some("altB")).id, "altB");
        assert_eq!(polarity_school_or_default(Some("nope")).id, "default");
        let custom = PolaritySchool::custom([TenGod::QiSha].into_iter().collect());
        assert!(custom.is_same_polarity(TenGod::QiSha));
    }
}
