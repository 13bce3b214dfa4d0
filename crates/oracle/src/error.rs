use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("ONNX session error: {0}")]
    Session(String),
    #[error("Unsupported model schema: {0}")]
    Schema(String),
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
    #[error("Model assets not found in {dir}")]
    AssetsNotFound { dir: PathBuf },
    #[error("Chunk consumer failed: {0}")]
    Callback(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OracleError>;
