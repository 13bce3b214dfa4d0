//! Ten Gods (十神) relative to the day stem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::chart::{BaziChart, PillarPosition};
use crate::scoring::round_half_even;
use crate::types::{Element, HeavenlyStem, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TenGod {
    BiJian,
    JieCai,
    ShiShen,
    ShangGuan,
    ZhengCai,
    PianCai,
    ZhengGuan,
    QiSha,
    ZhengYin,
    PianYin,
}

impl TenGod {
    pub const ALL: [TenGod; 10] = [
        TenGod::BiJian,
        TenGod::JieCai,
        TenGod::ShiShen,
        TenGod::ShangGuan,
        TenGod::ZhengCai,
        TenGod::PianCai,
        TenGod::ZhengGuan,
        TenGod::QiSha,
        TenGod::ZhengYin,
        TenGod::PianYin,
    ];

    /// Stable key, e.g. `"BiJian"`.
    pub fn key(self) -> &'static str {
        match self {
            TenGod::BiJian => "BiJian",
            TenGod::JieCai => "JieCai",
            TenGod::ShiShen => "ShiShen",
            TenGod::ShangGuan => "ShangGuan",
            TenGod::ZhengCai => "ZhengCai",
            TenGod::PianCai => "PianCai",
            TenGod::ZhengGuan => "ZhengGuan",
            TenGod::QiSha => "QiSha",
            TenGod::ZhengYin => "ZhengYin",
            TenGod::PianYin => "PianYin",
        }
    }
}

impl fmt::Display for TenGod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TenGod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TenGod::ALL
            .iter()
            .copied()
            .find(|g| g.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::UnknownTenGod(s.to_string()))
    }
}

/// Relation of `other` to `self_stem`. Total over all stem pairs: the five
/// element relations partition every pair, polarity picks one of two gods.
pub fn classify(self_stem: HeavenlyStem, other: HeavenlyStem) -> TenGod {
    let se = self_stem.element();
    let so = other.element();
    let same = self_stem.polarity() == other.polarity();
    let pick = |same_polarity: TenGod, different: TenGod| if same { same_polarity } else { different };

    if se == so {
        pick(TenGod::BiJian, TenGod::JieCai)
    } else if se.generates() == so {
        pick(TenGod::ShiShen, TenGod::ShangGuan)
    } else if so.generates() == se {
        pick(TenGod::ZhengYin, TenGod::PianYin)
    } else if se.controls() == so {
        pick(TenGod::ZhengCai, TenGod::PianCai)
    } else {
        // the only relation left: so controls se
        pick(TenGod::ZhengGuan, TenGod::QiSha)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenGodsProfile {
    pub self_element: Option<Element>,
    /// Only gods that received weight appear.
    pub relationships: BTreeMap<TenGod, i32>,
    pub notes: Option<String>,
}

impl TenGodsProfile {
    pub fn count(&self, god: TenGod) -> i32 {
        self.relationships.get(&god).copied().unwrap_or(0)
    }

    /// Highest weighted god; earlier gods in [`TenGod::ALL`] order win ties.
    pub fn strongest(&self) -> Option<TenGod> {
        self.relationships
            .iter()
            .fold(None, |best: Option<(TenGod, i32)>, (god, n)| match best {
                Some((_, b)) if b >= *n => best,
                _ => Some((*god, *n)),
            })
            .map(|(god, _)| god)
    }
}

const TEN_GODS_STEM_WEIGHT: f64 = 3.0;
const TEN_GODS_MONTH_BOOST: f64 = 1.5;

/// Stems of year, month and hour count 3.0 each; hidden stems of every
/// branch count their ratio, the month branch's times 1.5. These weights are
/// fixed; [`ScoringWeights`](crate::scoring::ScoringWeights) only tunes the
/// Five-Elements balance.
pub fn compute_ten_gods(chart: &BaziChart) -> TenGodsProfile {
    let notes = Some(format!(
        "Weighted counts: stems={:.1}, hidden by ratio, month hidden x{:.1}",
        TEN_GODS_STEM_WEIGHT, TEN_GODS_MONTH_BOOST
    ));
    let Some(day_stem) = chart.day.stem else {
        return TenGodsProfile {
            self_element: None,
            relationships: BTreeMap::new(),
            notes,
        };
    };

    let mut weighted: BTreeMap<TenGod, f64> = BTreeMap::new();
    let mut add = |stem: HeavenlyStem, w: f64| {
        if w != 0.0 {
            *weighted.entry(classify(day_stem, stem)).or_insert(0.0) += w;
        }
    };

    for (position, pillar) in chart.pillars() {
        if position == PillarPosition::Day {
            continue;
        }
        if let Some(stem) = pillar.stem {
            add(stem, TEN_GODS_STEM_WEIGHT);
        }
    }
    for (position, pillar) in chart.pillars() {
        let Some(branch) = pillar.branch else {
            continue;
        };
        let scale = if position == PillarPosition::Month {
            TEN_GODS_MONTH_BOOST
        } else {
            1.0
        };
        for (stem, ratio) in branch.hidden_stems() {
            add(*stem, ratio * scale);
        }
    }

    TenGodsProfile {
        self_element: Some(day_stem.element()),
        relationships: weighted
            .into_iter()
            .map(|(god, w)| (god, round_half_even(w)))
            .collect(),
        notes,
    }
}
