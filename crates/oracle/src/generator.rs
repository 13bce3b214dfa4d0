//! Streaming text generation with an explicit degraded mode.
//!
//! A [`Generator`] runs a decoder-only token loop when both a session and a
//! codec are loaded and the model's I/O can be recognised. Otherwise, or when
//! the loop fails part-way, it echoes the prompt back in fixed-width slices.
//! Echoed chunks carry `degraded = true` and the run ends in
//! [`GenerationOutcome::GeneratedStub`], so callers can always tell the two
//! apart.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::assets::{AssetStatus, ModelAssets};
use crate::config::GenerationConfig;
use crate::error::{OracleError, Result};
use crate::sampling::sample_from_logits;
use crate::schema::{detect_schema, DetectedSchema};
use crate::session::{DecoderSession, OrtDecoderSession};
use crate::tokenizer::{HfTokenizer, TokenCodec};

/// Echo slices emitted when no model is available.
pub const STUB_CHUNKS_WITHOUT_SESSION: usize = 8;
/// Echo slices emitted after the real loop failed.
pub const STUB_CHUNKS_AFTER_FAILURE: usize = 16;

/// Shared cancellation flag, checked between decode steps.
pub type CancelFlag = Arc<AtomicBool>;

pub fn cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub text: String,
    /// Set on echo output that did not come from the model.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GenerationOutcome {
    GeneratedReal { text: String, tokens: usize },
    GeneratedStub { text: String, reason: String },
    Failed { reason: String },
}

impl GenerationOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationOutcome::GeneratedReal { text, .. } | GenerationOutcome::GeneratedStub { text, .. } => {
                Some(text)
            }
            GenerationOutcome::Failed { .. } => None,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, GenerationOutcome::GeneratedReal { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, GenerationOutcome::GeneratedStub { .. })
    }
}

/// Why a streaming loop stopped early.
enum Abort {
    Model(OracleError),
    Consumer(OracleError),
    Cancelled,
}

fn is_cancelled(cancel: Option<&CancelFlag>) -> bool {
    cancel.is_some_and(|c| c.load(Ordering::Relaxed))
}

pub struct Generator {
    session: Option<Box<dyn DecoderSession + Send>>,
    codec: Option<Box<dyn TokenCodec + Send>>,
    config: GenerationConfig,
    rng: ChaCha8Rng,
}

impl Generator {
    /// A generator with no model; every run is degraded.
    pub fn stub(config: GenerationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            session: None,
            codec: None,
            config,
            rng,
        }
    }

    pub fn with_backend(
        session: Box<dyn DecoderSession + Send>,
        codec: Box<dyn TokenCodec + Send>,
        config: GenerationConfig,
    ) -> Self {
        let mut generator = Self::stub(config);
        generator.session = Some(session);
        generator.codec = Some(codec);
        generator
    }

    /// Loads the ONNX model and tokenizer. Assets that are missing, fail
    /// their checksum, or fail to load leave the generator in stub mode.
    pub fn load(assets: &ModelAssets, config: GenerationConfig) -> Self {
        match assets.verify() {
            AssetStatus::Missing => {
                log::warn!("Model file {} not found; using stub output", assets.model_path.display());
                return Self::stub(config);
            }
            AssetStatus::ChecksumMismatch => {
                log::error!(
                    "Model checksum mismatch for {}; re-download the model assets",
                    assets.model_path.display()
                );
                return Self::stub(config);
            }
            AssetStatus::Verified | AssetStatus::Unverified => {}
        }

        let session = match OrtDecoderSession::load(&assets.model_path) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{}; using stub output", e);
                return Self::stub(config);
            }
        };
        let codec = match HfTokenizer::from_file(&assets.tokenizer_path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("{}; using stub output", e);
                return Self::stub(config);
            }
        };
        Self::with_backend(Box::new(session), Box::new(codec), config)
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn has_model(&self) -> bool {
        self.session.is_some() && self.codec.is_some()
    }

    /// Schema of the loaded model, if it can drive the token loop.
    pub fn schema(&self) -> Option<DetectedSchema> {
        let session = self.session.as_ref()?;
        detect_schema(session.inputs(), session.outputs())
    }

    /// Streams `prompt` through the model, handing each chunk to `on_chunk`.
    /// An error from `on_chunk` or a raised `cancel` flag ends the run as
    /// [`GenerationOutcome::Failed`].
    pub fn generate<F>(&mut self, prompt: &str, cancel: Option<&CancelFlag>, mut on_chunk: F) -> GenerationOutcome
    where
        F: FnMut(&StreamChunk) -> Result<()>,
    {
        let config = self.config.clone();
        let schema = self.schema();
        let has_model = self.has_model();

        let (Some(session), Some(codec), Some(schema)) = (self.session.as_deref_mut(), self.codec.as_deref(), schema)
        else {
            let reason = if has_model {
                "model inputs not recognised"
            } else {
                "no model loaded"
            };
            log::info!("Generating stub output: {}", reason);
            return finish_stub(prompt, STUB_CHUNKS_WITHOUT_SESSION, &config, reason.to_string(), cancel, &mut on_chunk);
        };

        match decode_loop(session, codec, &schema, prompt, &config, &mut self.rng, cancel, &mut on_chunk) {
            Ok((text, tokens)) => {
                log::debug!("Generated {} tokens", tokens);
                GenerationOutcome::GeneratedReal { text, tokens }
            }
            Err(Abort::Model(e)) => {
                log::warn!("Token loop failed, falling back to stub output: {}", e);
                finish_stub(prompt, STUB_CHUNKS_AFTER_FAILURE, &config, e.to_string(), cancel, &mut on_chunk)
            }
            Err(Abort::Consumer(e)) => GenerationOutcome::Failed { reason: e.to_string() },
            Err(Abort::Cancelled) => GenerationOutcome::Failed {
                reason: "cancelled".to_string(),
            },
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn decode_loop<R, F>(
    session: &mut (dyn DecoderSession + Send),
    codec: &(dyn TokenCodec + Send),
    schema: &DetectedSchema,
    prompt: &str,
    config: &GenerationConfig,
    rng: &mut R,
    cancel: Option<&CancelFlag>,
    on_chunk: &mut F,
) -> std::result::Result<(String, usize), Abort>
where
    R: Rng,
    F: FnMut(&StreamChunk) -> Result<()>,
{
    let mut tokens: Vec<i64> = codec
        .encode(prompt)
        .map_err(Abort::Model)?
        .into_iter()
        .map(i64::from)
        .collect();
    if tokens.is_empty() {
        return Err(Abort::Model(OracleError::Tokenizer("prompt encoded to no tokens".to_string())));
    }
    if schema.has_kv_cache() {
        log::debug!("Model exposes a KV cache; running without it");
    }

    let mut generated = String::new();
    let mut steps = 0;
    while steps < config.max_tokens {
        if is_cancelled(cancel) {
            return Err(Abort::Cancelled);
        }
        // whole prompt first, then only the newest token
        let feed = if steps == 0 {
            &tokens[..]
        } else {
            &tokens[tokens.len() - 1..]
        };
        let logits = session.run_step(schema, feed).map_err(Abort::Model)?;
        let next = sample_from_logits(&logits, config.temperature, config.top_p, rng) as u32;
        tokens.push(i64::from(next));

        let text = codec.decode(&[next]).map_err(Abort::Model)?;
        let chunk = StreamChunk { text, degraded: false };
        on_chunk(&chunk).map_err(Abort::Consumer)?;
        generated.push_str(&chunk.text);
        steps += 1;
    }
    Ok((generated, steps))
}

/// Fixed-width character slices of `prompt`, at most `limit` of them and
/// never more than `max_tokens`.
pub fn stub_chunks(prompt: &str, chunk_chars: usize, limit: usize, max_tokens: usize) -> Vec<String> {
    let chars: Vec<char> = prompt.chars().collect();
    chars
        .chunks(chunk_chars.max(1))
        .take(limit.min(max_tokens))
        .map(|c| c.iter().collect())
        .collect()
}

fn finish_stub<F>(
    prompt: &str,
    limit: usize,
    config: &GenerationConfig,
    reason: String,
    cancel: Option<&CancelFlag>,
    on_chunk: &mut F,
) -> GenerationOutcome
where
    F: FnMut(&StreamChunk) -> Result<()>,
{
    let mut text = String::new();
    for slice in stub_chunks(prompt, config.stub_chunk_chars, limit, config.max_tokens) {
        if is_cancelled(cancel) {
            return GenerationOutcome::Failed {
                reason: "cancelled".to_string(),
            };
        }
        let chunk = StreamChunk {
            text: slice,
            degraded: true,
        };
        if let Err(e) = on_chunk(&chunk) {
            return GenerationOutcome::Failed { reason: e.to_string() };
        }
        text.push_str(&chunk.text);
    }
    GenerationOutcome::GeneratedStub { text, reason }
}
