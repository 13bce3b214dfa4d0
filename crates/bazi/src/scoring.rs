//! Five-Elements balance scoring.
//!
//! Stems count `stem_weight` toward their element; each branch contributes
//! its hidden stems by ratio, scaled by `hidden_multiplier` and, for the month
//! branch (月令), additionally by `month_hidden_boost`. Buckets are rounded
//! one by one, so the total may differ by one from the unrounded sum.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chart::{BaziChart, PillarPosition};
use crate::types::Element;

pub const DEFAULT_STEM_WEIGHT: f64 = 3.0;
pub const DEFAULT_HIDDEN_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_MONTH_HIDDEN_BOOST: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub stem_weight: f64,
    pub hidden_multiplier: f64,
    pub month_hidden_boost: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            stem_weight: DEFAULT_STEM_WEIGHT,
            hidden_multiplier: DEFAULT_HIDDEN_MULTIPLIER,
            month_hidden_boost: DEFAULT_MONTH_HIDDEN_BOOST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiveElementsScore {
    pub wood: i32,
    pub fire: i32,
    pub earth: i32,
    pub metal: i32,
    pub water: i32,
    /// Sum of the rounded buckets, saturating at `i32::MAX`.
    pub total: i32,
}

impl FiveElementsScore {
    pub fn new(wood: i32, fire: i32, earth: i32, metal: i32, water: i32) -> Self {
        Self {
            wood,
            fire,
            earth,
            metal,
            water,
            total: [fire, earth, metal, water]
                .into_iter()
                .fold(wood, i32::saturating_add),
        }
    }

    pub fn get(&self, element: Element) -> i32 {
        match element {
            Element::Wood => self.wood,
            Element::Fire => self.fire,
            Element::Earth => self.earth,
            Element::Metal => self.metal,
            Element::Water => self.water,
        }
    }

    /// Element with the highest score; earlier elements win ties.
    pub fn dominant(&self) -> Option<Element> {
        if self.total == 0 {
            return None;
        }
        Element::ALL
            .iter()
            .copied()
            .fold(None, |best: Option<Element>, e| match best {
                Some(b) if self.get(b) >= self.get(e) => Some(b),
                _ => Some(e),
            })
    }

    /// Elements with a zero score.
    pub fn missing(&self) -> Vec<Element> {
        Element::ALL
            .iter()
            .copied()
            .filter(|e| self.get(*e) == 0)
            .collect()
    }
}

/// Unrounded per-element accumulator.
#[derive(Debug, Clone, Default)]
pub(crate) struct ElementTally {
    buckets: BTreeMap<Element, f64>,
}

impl ElementTally {
    pub(crate) fn add(&mut self, element: Element, weight: f64) {
        *self.buckets.entry(element).or_insert(0.0) += weight;
    }

    pub(crate) fn raw(&self, element: Element) -> f64 {
        self.buckets.get(&element).copied().unwrap_or(0.0)
    }

    fn rounded(&self, element: Element) -> i32 {
        round_half_even(self.raw(element))
    }

    pub(crate) fn into_score(self) -> FiveElementsScore {
        FiveElementsScore::new(
            self.rounded(Element::Wood),
            self.rounded(Element::Fire),
            self.rounded(Element::Earth),
            self.rounded(Element::Metal),
            self.rounded(Element::Water),
        )
    }
}

/// Nearest integer, halves to even (1.5 -> 2, 2.5 -> 2). Out-of-range
/// values saturate; NaN maps to 0.
pub fn round_half_even(value: f64) -> i32 {
    value.round_ties_even() as i32
}

/// Five-Elements score with the default weights.
pub fn evaluate_five_elements(chart: &BaziChart) -> FiveElementsScore {
    evaluate_five_elements_weighted(chart, &ScoringWeights::default())
}

pub fn evaluate_five_elements_weighted(
    chart: &BaziChart,
    weights: &ScoringWeights,
) -> FiveElementsScore {
    tally_five_elements(chart, weights).into_score()
}

pub(crate) fn tally_five_elements(chart: &BaziChart, weights: &ScoringWeights) -> ElementTally {
    let mut tally = ElementTally::default();
    for (_, pillar) in chart.pillars() {
        if let Some(stem) = pillar.stem {
            tally.add(stem.element(), weights.stem_weight);
        }
    }
    for (position, pillar) in chart.pillars() {
        let Some(branch) = pillar.branch else {
            continue;
        };
        let scale = if position == PillarPosition::Month {
            weights.hidden_multiplier * weights.month_hidden_boost
        } else {
            weights.hidden_multiplier
        };
        for (stem, ratio) in branch.hidden_stems() {
            tally.add(stem.element(), ratio * scale);
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pillar;

    fn chart() -> BaziChart {
        BaziChart::from_ganzhi("癸卯", "庚申", "乙巳", Some("辛巳")).unwrap()
    }

    #[test]
    fn test_hand_computed_chart() {
        // stems: 癸 water, 庚 metal, 乙 wood, 辛 metal -> 3 each
        // 卯: 乙1.0 wood; 申 x1.5: 庚1.05 metal, 壬0.3 water, 戊0.15 earth
        // 巳 (day) and 巳 (hour): 丙0.6 fire, 戊0.2 earth, 庚0.2 metal each
        let tally = tally_five_elements(&chart(), &ScoringWeights::default());
        assert!((tally.raw(Element::Wood) - 4.0).abs() < 1e-9);
        assert!((tally.raw(Element::Fire) - 1.2).abs() < 1e-9);
        assert!((tally.raw(Element::Earth) - 0.55).abs() < 1e-9);
        assert!((tally.raw(Element::Metal) - 7.45).abs() < 1e-9);
        assert!((tally.raw(Element::Water) - 3.3).abs() < 1e-9);

        let score = evaluate_five_elements(&chart());
        assert_eq!(score, FiveElementsScore::new(4, 1, 1, 7, 3));
        assert_eq!(score.total, 16);
        assert_eq!(score.dominant(), Some(Element::Metal));
    }

    #[test]
    fn test_defaults_match_weighted_variant() {
        let defaults = ScoringWeights {
            stem_weight: 3.0,
            hidden_multiplier: 1.0,
            month_hidden_boost: 1.5,
        };
        assert_eq!(
            evaluate_five_elements_weighted(&chart(), &defaults),
            evaluate_five_elements(&chart())
        );
    }

    #[test]
    fn test_missing_hour_and_unknown_pillars_contribute_nothing() {
        let mut chart = chart();
        chart.hour = None;
        chart.month = Pillar::UNKNOWN;
        let score = evaluate_five_elements(&chart);
        // 癸 3 + 乙 3 + 卯 乙1.0 + 巳 (丙.6 戊.2 庚.2)
        assert_eq!(score, FiveElementsScore::new(4, 1, 0, 0, 3));
        assert!(score.missing().contains(&Element::Metal));
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(0.5), 0);
        assert_eq!(round_half_even(1.5), 2);
        assert_eq!(round_half_even(2.5), 2);
        assert_eq!(round_half_even(2.51), 3);
        assert_eq!(round_half_even(-0.4), 0);
    }

    #[test]
    fn test_zero_weights() {
        let weights = ScoringWeights {
            stem_weight: 0.0,
            hidden_multiplier: 0.0,
            month_hidden_boost: 1.5,
        };
        let score = evaluate_five_elements_weighted(&chart(), &weights);
        assert_eq!(score.total, 0);
        assert_eq!(score.dominant(), None);
    }
}
