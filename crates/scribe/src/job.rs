//! Drives a [`Generator`] over a report prompt while tracking progress.

use oracle::{CancelFlag, GenerationOutcome, Generator, OracleError, StreamChunk, TokenCodec};
use serde::{Deserialize, Serialize};

use crate::error::ScribeError;
use crate::progress::{self, ReportProgress, PRESET_SECTIONS};

pub const DEFAULT_MAX_STEPS: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub outcome: GenerationOutcome,
    /// Every chunk received, real or echoed.
    pub content: String,
    pub progress: ReportProgress,
}

impl ReportOutcome {
    pub fn is_degraded(&self) -> bool {
        self.outcome.is_degraded()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, GenerationOutcome::Failed { .. })
    }
}

pub struct ReportJob {
    pub max_steps: usize,
    pub preset_sections: usize,
    /// Counts tokens per chunk for the step estimate; without it every chunk
    /// is one step.
    codec: Option<Box<dyn TokenCodec + Send>>,
    cancel: Option<CancelFlag>,
}

impl Default for ReportJob {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            preset_sections: PRESET_SECTIONS,
            codec: None,
            cancel: None,
        }
    }
}

impl ReportJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(mut self, codec: Box<dyn TokenCodec + Send>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn chunk_steps(&self, text: &str) -> usize {
        self.codec
            .as_ref()
            .and_then(|c| c.encode(text).ok())
            .map_or(1, |ids| ids.len())
    }

    /// Streams the report. `on_progress` sees every chunk with the progress
    /// after it; an error from it stops the run as failed.
    pub fn run<F>(&self, generator: &mut Generator, prompt: &str, mut on_progress: F) -> Result<ReportOutcome, ScribeError>
    where
        F: FnMut(&StreamChunk, &ReportProgress) -> Result<(), ScribeError>,
    {
        if prompt.trim().is_empty() {
            return Err(ScribeError::EmptyPrompt);
        }
        let max_steps = self.max_steps.max(1);
        let mut content = String::new();
        let mut steps = 0usize;
        let mut degraded_seen = false;

        let outcome = generator.generate(prompt, self.cancel.as_ref(), |chunk| {
            if chunk.degraded && !degraded_seen {
                log::warn!("Report is being written from stub output");
                degraded_seen = true;
            }
            content.push_str(&chunk.text);
            steps = (steps + self.chunk_steps(&chunk.text)).min(max_steps);
            let snapshot = progress::measure(&content, steps, max_steps, self.preset_sections);
            on_progress(chunk, &snapshot).map_err(|e| OracleError::Callback(e.to_string()))
        });

        let progress = match &outcome {
            GenerationOutcome::Failed { reason } => {
                log::warn!("Report generation failed: {}", reason);
                progress::measure(&content, steps, max_steps, self.preset_sections)
            }
            _ => progress::finalize(&content, max_steps, self.preset_sections),
        };
        log::info!(
            "Report finished: {} chars, {} sections",
            progress.content_len,
            progress.sections_done
        );
        Ok(ReportOutcome {
            outcome,
            content,
            progress,
        })
    }
}
