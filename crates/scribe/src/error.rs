use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Report prompt is empty")]
    EmptyPrompt,
    #[error("Progress sink failed: {0}")]
    Sink(String),
}
