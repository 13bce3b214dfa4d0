//! Four Pillars (八字) charting: lunisolar calendar, pillar resolution,
//! Five-Elements scoring, Ten Gods and the luck timeline.

pub mod almanac;
pub mod calendar;
pub mod chart;
pub mod i18n;
pub mod luck;
pub mod scoring;
pub mod ten_gods;
pub mod types;

pub use calendar::{AstronomicalCalendar, CalendarError, LunarCalendar, LunarDate, SolarTerm};
pub use chart::{BaziChart, BirthInputError, BirthMoment, PillarPosition, PillarResolver};
pub use luck::{compute_luck_cycles, LuckCycle};
pub use scoring::{evaluate_five_elements, evaluate_five_elements_weighted, FiveElementsScore, ScoringWeights};
pub use ten_gods::{compute_ten_gods, TenGod, TenGodsProfile};
pub use types::{EarthlyBranch, Element, GanZhi, HeavenlyStem, Pillar, Polarity, ZodiacAnimal};

/// Resolves `birth` with the built-in calendar.
pub fn resolve_pillars(birth: &BirthMoment) -> BaziChart {
    PillarResolver::new().resolve(birth)
}
