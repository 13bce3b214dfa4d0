use chrono::{DateTime, FixedOffset, Months, TimeZone};
use serde::{Deserialize, Serialize};

use crate::types::Element;

pub const DEFAULT_LUCK_CYCLES: usize = 8;
pub const LUCK_CYCLE_YEARS: u32 = 10;

/// A decade of the luck timeline (大運), counted from birth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuckCycle {
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub element_tendency: Option<Element>,
    pub note: Option<String>,
}

/// `count` back-to-back decades starting at the birth instant. Stops early if
/// the calendar overflows.
pub fn compute_luck_cycles<Tz: TimeZone>(birth: &DateTime<Tz>, count: usize) -> Vec<LuckCycle> {
    let mut cycles = Vec::with_capacity(count);
    let mut start = birth.fixed_offset();
    for i in 1..=count {
        let Some(end) = start.checked_add_months(Months::new(LUCK_CYCLE_YEARS * 12)) else {
            break;
        };
        cycles.push(LuckCycle {
            name: format!("大運{}", i),
            start,
            end,
            element_tendency: None,
            note: Some("Initial 10-year cycle".to_string()),
        });
        start = end;
    }
    cycles
}
