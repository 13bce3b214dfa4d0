use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::{OracleError, Result};

/// Text to token ids and back.
pub trait TokenCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    fn decode(&self, ids: &[u32]) -> Result<String>;
}

/// `tokenizer.json` loaded through the Hugging Face `tokenizers` crate.
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }
        let inner = Tokenizer::from_file(path)
            .map_err(|e| OracleError::Tokenizer(format!("load {} failed: {e}", path.display())))?;
        Ok(Self { inner })
    }
}

impl TokenCodec for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| OracleError::Tokenizer(format!("encode failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| OracleError::Tokenizer(format!("decode failed: {e}")))
    }
}
