//! On-device report generation: a decoder-only token loop over ONNX Runtime
//! with nucleus sampling and a flagged echo fallback.

pub mod assets;
pub mod config;
pub mod error;
pub mod generator;
pub mod sampling;
pub mod schema;
pub mod session;
pub mod tokenizer;

pub use assets::{AssetStatus, ModelAssets};
pub use config::GenerationConfig;
pub use error::{OracleError, Result};
pub use generator::{cancel_flag, CancelFlag, GenerationOutcome, Generator, StreamChunk};
pub use sampling::sample_from_logits;
pub use schema::{detect_schema, DetectedSchema, IoDescriptor, TensorKind};
pub use session::{DecoderSession, OrtDecoderSession};
pub use tokenizer::{HfTokenizer, TokenCodec};
