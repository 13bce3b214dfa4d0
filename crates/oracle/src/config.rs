use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: usize = 512;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_STUB_CHUNK_CHARS: usize = 64;

/// Knobs for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    /// Slice width, in characters, of degraded (echo) output.
    pub stub_chunk_chars: usize,
    /// Fixed sampler seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            stub_chunk_chars: DEFAULT_STUB_CHUNK_CHARS,
            seed: None,
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `DESTINY_*` variables on top of `self`; unparsable values are
    /// ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("DESTINY_MAX_TOKENS") {
            if let Ok(n) = v.parse::<usize>() {
                self.max_tokens = n;
            }
        }
        if let Ok(v) = std::env::var("DESTINY_TEMPERATURE") {
            if let Ok(t) = v.parse::<f32>() {
                self.temperature = t;
            }
        }
        if let Ok(v) = std::env::var("DESTINY_TOP_P") {
            if let Ok(p) = v.parse::<f32>() {
                self.top_p = p;
            }
        }
        if let Ok(v) = std::env::var("DESTINY_STUB_CHUNK_CHARS") {
            if let Ok(n) = v.parse::<usize>() {
                self.stub_chunk_chars = n.max(1);
            }
        }
        if let Ok(v) = std::env::var("DESTINY_SEED") {
            if let Ok(s) = v.parse::<u64>() {
                self.seed = Some(s);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = GenerationConfig::default();
        assert_eq!(cfg.max_tokens, 512);
        assert_eq!(cfg.stub_chunk_chars, 64);
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("DESTINY_SEED", "42");
        std::env::set_var("DESTINY_TOP_P", "not-a-number");
        let cfg = GenerationConfig::from_env();
        std::env::remove_var("DESTINY_SEED");
        std::env::remove_var("DESTINY_TOP_P");
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.top_p, DEFAULT_TOP_P);
    }
}
