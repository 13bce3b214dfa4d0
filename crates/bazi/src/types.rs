use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rendered in place of a stem or branch the calendar could not resolve.
pub const UNKNOWN_MARK: &str = "?";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown heavenly stem: {0}")]
    UnknownStem(String),
    #[error("Unknown earthly branch: {0}")]
    UnknownBranch(String),
    #[error("Unknown ten god: {0}")]
    UnknownTenGod(String),
    #[error("Invalid ganzhi pair: {0:?} (expected stem followed by branch, e.g. 甲子)")]
    InvalidGanZhi(String),
}

/// The five phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    Wood,
    Fire,
    Earth,
    Metal,
    Water,
}

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Wood,
        Element::Fire,
        Element::Earth,
        Element::Metal,
        Element::Water,
    ];

    /// Generating cycle: Wood -> Fire -> Earth -> Metal -> Water -> Wood.
    pub fn generates(self) -> Element {
        match self {
            Element::Wood => Element::Fire,
            Element::Fire => Element::Earth,
            Element::Earth => Element::Metal,
            Element::Metal => Element::Water,
            Element::Water => Element::Wood,
        }
    }

    /// Controlling cycle: Wood -> Earth -> Water -> Fire -> Metal -> Wood.
    pub fn controls(self) -> Element {
        match self {
            Element::Wood => Element::Earth,
            Element::Earth => Element::Water,
            Element::Water => Element::Fire,
            Element::Fire => Element::Metal,
            Element::Metal => Element::Wood,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Element::Wood => "Wood",
            Element::Fire => "Fire",
            Element::Earth => "Earth",
            Element::Metal => "Metal",
            Element::Water => "Water",
        }
    }

    pub fn chinese(self) -> &'static str {
        match self {
            Element::Wood => "木",
            Element::Fire => "火",
            Element::Earth => "土",
            Element::Metal => "金",
            Element::Water => "水",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Yang,
    Yin,
}

// (chinese, pinyin)
const STEM_NAMES: [(&str, &str); 10] = [
    ("甲", "Jia"),
    ("乙", "Yi"),
    ("丙", "Bing"),
    ("丁", "Ding"),
    ("戊", "Wu"),
    ("己", "Ji"),
    ("庚", "Geng"),
    ("辛", "Xin"),
    ("壬", "Ren"),
    ("癸", "Gui"),
];

/// The ten Heavenly Stems (天干), in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeavenlyStem {
    Jia,
    Yi,
    Bing,
    Ding,
    Wu,
    Ji,
    Geng,
    Xin,
    Ren,
    Gui,
}

impl HeavenlyStem {
    pub const ALL: [HeavenlyStem; 10] = [
        HeavenlyStem::Jia,
        HeavenlyStem::Yi,
        HeavenlyStem::Bing,
        HeavenlyStem::Ding,
        HeavenlyStem::Wu,
        HeavenlyStem::Ji,
        HeavenlyStem::Geng,
        HeavenlyStem::Xin,
        HeavenlyStem::Ren,
        HeavenlyStem::Gui,
    ];

    /// Wraps around the cycle, so any index is accepted.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 10]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn chinese(self) -> &'static str {
        STEM_NAMES[self.index()].0
    }

    pub fn pinyin(self) -> &'static str {
        STEM_NAMES[self.index()].1
    }

    /// Stems pair up by element: 甲乙 Wood, 丙丁 Fire, 戊己 Earth, 庚辛 Metal, 壬癸 Water.
    pub fn element(self) -> Element {
        Element::ALL[self.index() / 2]
    }

    pub fn polarity(self) -> Polarity {
        if self.index() % 2 == 0 {
            Polarity::Yang
        } else {
            Polarity::Yin
        }
    }
}

impl fmt::Display for HeavenlyStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chinese())
    }
}

impl FromStr for HeavenlyStem {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        STEM_NAMES
            .iter()
            .position(|(zh, py)| *zh == s || py.eq_ignore_ascii_case(s))
            .map(Self::from_index)
            .ok_or_else(|| ParseError::UnknownStem(s.to_string()))
    }
}

// (chinese, pinyin)
const BRANCH_NAMES: [(&str, &str); 12] = [
    ("子", "Zi"),
    ("丑", "Chou"),
    ("寅", "Yin"),
    ("卯", "Mao"),
    ("辰", "Chen"),
    ("巳", "Si"),
    ("午", "Wu"),
    ("未", "Wei"),
    ("申", "Shen"),
    ("酉", "You"),
    ("戌", "Xu"),
    ("亥", "Hai"),
];

/// Hidden stems (藏干) per branch, in branch order. Each row sums to 1.0.
const HIDDEN_STEMS: [&[(HeavenlyStem, f64)]; 12] = {
    use HeavenlyStem::*;
    [
        &[(Gui, 1.0)],
        &[(Ji, 0.5), (Gui, 0.3), (Xin, 0.2)],
        &[(Jia, 0.6), (Bing, 0.2), (Wu, 0.2)],
        &[(Yi, 1.0)],
        &[(Wu, 0.6), (Yi, 0.2), (Gui, 0.2)],
        &[(Bing, 0.6), (Wu, 0.2), (Geng, 0.2)],
        &[(Ding, 0.7), (Ji, 0.3)],
        &[(Ji, 0.6), (Ding, 0.2), (Yi, 0.2)],
        &[(Geng, 0.7), (Ren, 0.2), (Wu, 0.1)],
        &[(Xin, 1.0)],
        &[(Wu, 0.6), (Xin, 0.2), (Ding, 0.2)],
        &[(Ren, 0.8), (Jia, 0.2)],
    ]
};

/// The twelve Earthly Branches (地支), in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EarthlyBranch {
    Zi,
    Chou,
    Yin,
    Mao,
    Chen,
    Si,
    Wu,
    Wei,
    Shen,
    You,
    Xu,
    Hai,
}

impl EarthlyBranch {
    pub const ALL: [EarthlyBranch; 12] = [
        EarthlyBranch::Zi,
        EarthlyBranch::Chou,
        EarthlyBranch::Yin,
        EarthlyBranch::Mao,
        EarthlyBranch::Chen,
        EarthlyBranch::Si,
        EarthlyBranch::Wu,
        EarthlyBranch::Wei,
        EarthlyBranch::Shen,
        EarthlyBranch::You,
        EarthlyBranch::Xu,
        EarthlyBranch::Hai,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn chinese(self) -> &'static str {
        BRANCH_NAMES[self.index()].0
    }

    pub fn pinyin(self) -> &'static str {
        BRANCH_NAMES[self.index()].1
    }

    /// Main element of the branch itself.
    pub fn element(self) -> Element {
        match self {
            EarthlyBranch::Zi | EarthlyBranch::Hai => Element::Water,
            EarthlyBranch::Yin | EarthlyBranch::Mao => Element::Wood,
            EarthlyBranch::Si | EarthlyBranch::Wu => Element::Fire,
            EarthlyBranch::Shen | EarthlyBranch::You => Element::Metal,
            EarthlyBranch::Chou | EarthlyBranch::Chen | EarthlyBranch::Wei | EarthlyBranch::Xu => {
                Element::Earth
            }
        }
    }

    pub fn hidden_stems(self) -> &'static [(HeavenlyStem, f64)] {
        HIDDEN_STEMS[self.index()]
    }

    pub fn zodiac(self) -> ZodiacAnimal {
        ZodiacAnimal::ALL[self.index()]
    }
}

impl fmt::Display for EarthlyBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chinese())
    }
}

impl FromStr for EarthlyBranch {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        BRANCH_NAMES
            .iter()
            .position(|(zh, py)| *zh == s || py.eq_ignore_ascii_case(s))
            .map(Self::from_index)
            .ok_or_else(|| ParseError::UnknownBranch(s.to_string()))
    }
}

/// Zodiac animals (生肖), aligned with the branch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZodiacAnimal {
    Rat,
    Ox,
    Tiger,
    Rabbit,
    Dragon,
    Snake,
    Horse,
    Goat,
    Monkey,
    Rooster,
    Dog,
    Pig,
}

const ZODIAC_NAMES: [(&str, &str); 12] = [
    ("鼠", "Rat"),
    ("牛", "Ox"),
    ("虎", "Tiger"),
    ("兔", "Rabbit"),
    ("龍", "Dragon"),
    ("蛇", "Snake"),
    ("馬", "Horse"),
    ("羊", "Goat"),
    ("猴", "Monkey"),
    ("雞", "Rooster"),
    ("狗", "Dog"),
    ("豬", "Pig"),
];

impl ZodiacAnimal {
    pub const ALL: [ZodiacAnimal; 12] = [
        ZodiacAnimal::Rat,
        ZodiacAnimal::Ox,
        ZodiacAnimal::Tiger,
        ZodiacAnimal::Rabbit,
        ZodiacAnimal::Dragon,
        ZodiacAnimal::Snake,
        ZodiacAnimal::Horse,
        ZodiacAnimal::Goat,
        ZodiacAnimal::Monkey,
        ZodiacAnimal::Rooster,
        ZodiacAnimal::Dog,
        ZodiacAnimal::Pig,
    ];

    pub fn chinese(self) -> &'static str {
        ZODIAC_NAMES[self as usize].0
    }

    pub fn english(self) -> &'static str {
        ZODIAC_NAMES[self as usize].1
    }

    /// Accepts the Chinese name or the English one in any case.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        ZODIAC_NAMES
            .iter()
            .position(|(zh, en)| *zh == s || en.eq_ignore_ascii_case(s))
            .map(|i| Self::ALL[i])
    }
}

impl fmt::Display for ZodiacAnimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chinese())
    }
}

/// A stem/branch pair of the sexagenary cycle (干支).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GanZhi {
    pub stem: HeavenlyStem,
    pub branch: EarthlyBranch,
}

impl GanZhi {
    pub fn new(stem: HeavenlyStem, branch: EarthlyBranch) -> Self {
        Self { stem, branch }
    }

    /// Pair at position `index` of the 60 cycle, 0 being 甲子.
    pub fn from_cycle_index(index: i64) -> Self {
        let i = index.rem_euclid(60) as usize;
        Self::new(HeavenlyStem::from_index(i), EarthlyBranch::from_index(i))
    }

    /// Position in the 60 cycle. Pairs of mixed parity (e.g. 甲丑) never
    /// occur in the cycle and give a meaningless index.
    pub fn cycle_index(self) -> usize {
        let s = self.stem.index() as i64;
        let b = self.branch.index() as i64;
        // solve i = s (mod 10), i = b (mod 12)
        ((6 * s - 5 * b).rem_euclid(60)) as usize
    }
}

impl fmt::Display for GanZhi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.stem, self.branch)
    }
}

impl FromStr for GanZhi {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) => Ok(Self::new(
                a.to_string().parse()?,
                b.to_string().parse()?,
            )),
            _ => Err(ParseError::InvalidGanZhi(s.to_string())),
        }
    }
}

/// One of the four pillars. Either side may be unknown when the calendar
/// conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pillar {
    pub stem: Option<HeavenlyStem>,
    pub branch: Option<EarthlyBranch>,
}

impl Pillar {
    pub const UNKNOWN: Pillar = Pillar {
        stem: None,
        branch: None,
    };

    pub fn new(stem: HeavenlyStem, branch: EarthlyBranch) -> Self {
        Self {
            stem: Some(stem),
            branch: Some(branch),
        }
    }

    /// True when either the stem or the branch is the unknown sentinel.
    pub fn is_unknown(&self) -> bool {
        self.stem.is_none() || self.branch.is_none()
    }

    pub fn ganzhi(&self) -> Option<GanZhi> {
        Some(GanZhi::new(self.stem?, self.branch?))
    }

    pub fn stem_label(&self) -> &'static str {
        self.stem.map(HeavenlyStem::chinese).unwrap_or(UNKNOWN_MARK)
    }

    pub fn branch_label(&self) -> &'static str {
        self.branch.map(EarthlyBranch::chinese).unwrap_or(UNKNOWN_MARK)
    }
}

impl From<GanZhi> for Pillar {
    fn from(gz: GanZhi) -> Self {
        Pillar::new(gz.stem, gz.branch)
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.stem_label(), self.branch_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_weights_sum_to_one() {
        for branch in EarthlyBranch::ALL {
            let sum: f64 = branch.hidden_stems().iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-9, "{} sums to {}", branch, sum);
        }
    }

    #[test]
    fn stem_elements_and_polarity() {
        assert_eq!(HeavenlyStem::Jia.element(), Element::Wood);
        assert_eq!(HeavenlyStem::Ding.element(), Element::Fire);
        assert_eq!(HeavenlyStem::Ji.element(), Element::Earth);
        assert_eq!(HeavenlyStem::Xin.element(), Element::Metal);
        assert_eq!(HeavenlyStem::Gui.element(), Element::Water);
        let yang: Vec<_> = HeavenlyStem::ALL
            .iter()
            .filter(|s| s.polarity() == Polarity::Yang)
            .map(|s| s.chinese())
            .collect();
        assert_eq!(yang, vec!["甲", "丙", "戊", "庚", "壬"]);
    }

    #[test]
    fn zodiac_parse_accepts_both_languages() {
        assert_eq!(ZodiacAnimal::parse("龍"), Some(ZodiacAnimal::Dragon));
        assert_eq!(ZodiacAnimal::parse("dragon"), Some(ZodiacAnimal::Dragon));
        assert_eq!(ZodiacAnimal::parse(" Rooster "), Some(ZodiacAnimal::Rooster));
        assert_eq!(ZodiacAnimal::parse("unicorn"), None);
    }

    #[test]
    fn cycles_are_permutations() {
        for e in Element::ALL {
            assert_ne!(e.generates(), e);
            assert_ne!(e.controls(), e);
            assert_ne!(e.generates(), e.controls());
        }
    }

    #[test]
    fn parse_chinese_and_pinyin() {
        assert_eq!("庚".parse::<HeavenlyStem>().unwrap(), HeavenlyStem::Geng);
        assert_eq!("geng".parse::<HeavenlyStem>().unwrap(), HeavenlyStem::Geng);
        assert_eq!("Hai".parse::<EarthlyBranch>().unwrap(), EarthlyBranch::Hai);
        assert!("X".parse::<HeavenlyStem>().is_err());
    }

    #[test]
    fn ganzhi_cycle_index_round_trip() {
        for i in 0..60 {
            let gz = GanZhi::from_cycle_index(i);
            assert_eq!(gz.cycle_index(), i as usize);
        }
        let gz: GanZhi = "癸亥".parse().unwrap();
        assert_eq!(gz.cycle_index(), 59);
        assert!("甲".parse::<GanZhi>().is_err());
    }

    #[test]
    fn pillar_labels_and_sentinel() {
        let p = Pillar::new(HeavenlyStem::Jia, EarthlyBranch::Zi);
        assert!(!p.is_unknown());
        assert_eq!(p.to_string(), "甲子");
        let half = Pillar {
            stem: Some(HeavenlyStem::Jia),
            branch: None,
        };
        assert!(half.is_unknown());
        assert_eq!(half.to_string(), "甲?");
        assert_eq!(Pillar::UNKNOWN.to_string(), "??");
        assert!(Pillar::UNKNOWN.ganzhi().is_none());
    }
}
