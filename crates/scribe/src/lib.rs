//! Report writing on top of `bazi` charts and the `oracle` generator.

pub mod error;
pub mod job;
pub mod progress;
pub mod prompt;

pub use error::ScribeError;
pub use job::{ReportJob, ReportOutcome};
pub use progress::{
    count_explicit_section_markers, count_sections, estimate_total_sections, ReportProgress, PRESET_SECTIONS,
};
pub use prompt::{build_prompt, ReportInput};
