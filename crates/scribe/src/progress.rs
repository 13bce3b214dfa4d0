//! Section-based progress estimates for a report that is still streaming.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sections assumed when the model emits explicit section markers.
pub const PRESET_SECTIONS: usize = 8;
/// Estimate before any section has been seen.
pub const INITIAL_SECTION_ESTIMATE: usize = 6;
pub const MAX_SECTION_ESTIMATE: usize = 12;
/// Markers closer than this many characters open the same section.
const MARKER_GROUP_CHARS: usize = 40;
const MIN_PARAGRAPH_CHARS: usize = 60;
const MIN_PROGRESS_FRACTION: f64 = 0.25;

lazy_static! {
    static ref EXPLICIT: Regex =
        Regex::new(r"(?i)(<\|section\|>|<\|end_section\|>|<section>|</section>|\[/?section\])").expect("Invalid regex");
    static ref HEADING: Regex = Regex::new(
        r"(?m)(^#{1,6}\s)|(^【.+】$)|(^〈.+〉$)|(^《.+》$)|(^第[一二三四五六七八九十百千]+[章節篇部分][：:、.\s])"
    )
    .expect("Invalid regex");
    static ref BULLET: Regex = Regex::new(r"(?m)^[-*•]\s").expect("Invalid regex");
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n\n+").expect("Invalid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProgress {
    pub steps: usize,
    pub max_steps: usize,
    /// Characters written so far.
    pub content_len: usize,
    pub sections_done: usize,
    pub sections_estimated: usize,
}

impl ReportProgress {
    pub fn percent(&self) -> u8 {
        if self.max_steps == 0 {
            return 0;
        }
        ((self.steps.min(self.max_steps) * 100) / self.max_steps) as u8
    }
}

/// Character offsets of regex matches, sorted.
fn char_offsets<'a>(text: &str, regexes: impl IntoIterator<Item = &'a Regex>) -> Vec<usize> {
    let mut bytes: Vec<usize> = regexes
        .into_iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.start()))
        .collect();
    bytes.sort_unstable();
    bytes
        .into_iter()
        .map(|b| text[..b].chars().count())
        .collect()
}

fn group_markers(sorted: &[usize]) -> usize {
    let mut groups = 0;
    let mut last: Option<usize> = None;
    for &p in sorted {
        if last.map_or(true, |l| p - l > MARKER_GROUP_CHARS) {
            groups += 1;
            last = Some(p);
        }
    }
    groups
}

/// Sections started so far: grouped markers when any are present, otherwise
/// paragraphs of at least 60 characters.
pub fn count_sections(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    let markers = char_offsets(text, [&*EXPLICIT, &*HEADING, &*BULLET]);
    if markers.is_empty() {
        PARAGRAPH_BREAK
            .split(text)
            .filter(|p| p.trim().chars().count() >= MIN_PARAGRAPH_CHARS)
            .count()
    } else {
        group_markers(&markers)
    }
}

pub fn count_explicit_section_markers(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    group_markers(&char_offsets(text, [&*EXPLICIT]))
}

/// Extrapolates the section count from the share of steps used, treating
/// anything under a quarter as a quarter. Clamped to 6..=12.
pub fn estimate_total_sections(done: usize, steps: usize, max_steps: usize) -> usize {
    if done == 0 {
        return INITIAL_SECTION_ESTIMATE;
    }
    let fraction = if max_steps > 0 {
        steps as f64 / max_steps as f64
    } else {
        0.0
    };
    let estimate = (done as f64 / fraction.max(MIN_PROGRESS_FRACTION)).ceil() as usize;
    estimate.max(done).clamp(INITIAL_SECTION_ESTIMATE, MAX_SECTION_ESTIMATE)
}

/// Progress snapshot for `content` after `steps` of `max_steps`.
pub fn measure(content: &str, steps: usize, max_steps: usize, preset_sections: usize) -> ReportProgress {
    let sections_done = count_sections(content);
    let sections_estimated = if count_explicit_section_markers(content) > 0 {
        preset_sections
    } else {
        estimate_total_sections(sections_done, steps, max_steps)
    };
    ReportProgress {
        steps,
        max_steps,
        content_len: content.chars().count(),
        sections_done,
        sections_estimated,
    }
}

/// Progress once the stream has ended: all steps used, and the estimate
/// replaced by what was actually written.
pub fn finalize(content: &str, max_steps: usize, preset_sections: usize) -> ReportProgress {
    let sections_done = count_sections(content);
    ReportProgress {
        steps: max_steps,
        max_steps,
        content_len: content.chars().count(),
        sections_done,
        sections_estimated: if count_explicit_section_markers(content) > 0 {
            preset_sections
        } else {
            sections_done
        },
    }
}
