use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATHS: [&str; 2] = ["configs/destiny.toml", "../../configs/destiny.toml"];

#[derive(Debug, Clone, PartialEq)]
pub struct BaziSettings {
    pub default_zone: String,
    pub lang: String,
    pub stem_weight: f64,
    pub hidden_multiplier: f64,
    pub month_hidden_boost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub model_dir: PathBuf,
    pub expected_sha256: Option<String>,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub stub_chunk_chars: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestinySettings {
    pub bazi: BaziSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Deserialize)]
struct BaziToml {
    #[serde(default = "default_zone")]
    default_zone: String,
    #[serde(default = "default_lang")]
    lang: String,
    #[serde(default = "default_stem_weight")]
    stem_weight: f64,
    #[serde(default = "default_hidden_multiplier")]
    hidden_multiplier: f64,
    #[serde(default = "default_month_hidden_boost")]
    month_hidden_boost: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct LlmToml {
    #[serde(default = "default_model_dir")]
    model_dir: PathBuf,
    #[serde(default)]
    expected_sha256: Option<String>,
    #[serde(default = "default_max_tokens")]
    max_tokens: usize,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_top_p")]
    top_p: f32,
    #[serde(default = "default_stub_chunk_chars")]
    stub_chunk_chars: usize,
    #[serde(default)]
    seed: Option<u64>,
}

fn default_zone() -> String {
    "Asia/Taipei".to_string()
}

fn default_lang() -> String {
    "zh-TW".to_string()
}

fn default_stem_weight() -> f64 {
    3.0
}

fn default_hidden_multiplier() -> f64 {
    1.0
}

fn default_month_hidden_boost() -> f64 {
    1.5
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_max_tokens() -> usize {
    512
}

fn default_temperature() -> f32 {
    0.8
}

fn default_top_p() -> f32 {
    0.95
}

fn default_stub_chunk_chars() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RootConfigToml {
    #[serde(default)]
    bazi: Option<BaziToml>,
    #[serde(default)]
    llm: Option<LlmToml>,
}

impl Default for DestinySettings {
    fn default() -> Self {
        // empty document: every field takes its serde default
        from_root(RootConfigToml::default())
    }
}

fn from_root(root: RootConfigToml) -> DestinySettings {
    let bazi = root.bazi.unwrap_or_else(|| BaziToml {
        default_zone: default_zone(),
        lang: default_lang(),
        stem_weight: default_stem_weight(),
        hidden_multiplier: default_hidden_multiplier(),
        month_hidden_boost: default_month_hidden_boost(),
    });
    let llm = root.llm.unwrap_or_else(|| LlmToml {
        model_dir: default_model_dir(),
        expected_sha256: None,
        max_tokens: default_max_tokens(),
        temperature: default_temperature(),
        top_p: default_top_p(),
        stub_chunk_chars: default_stub_chunk_chars(),
        seed: None,
    });
    DestinySettings {
        bazi: BaziSettings {
            default_zone: bazi.default_zone,
            lang: bazi.lang,
            stem_weight: bazi.stem_weight,
            hidden_multiplier: bazi.hidden_multiplier,
            month_hidden_boost: bazi.month_hidden_boost,
        },
        llm: LlmSettings {
            model_dir: llm.model_dir,
            expected_sha256: llm.expected_sha256.filter(|s| !s.trim().is_empty()),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            top_p: llm.top_p,
            stub_chunk_chars: llm.stub_chunk_chars,
            seed: llm.seed,
        },
    }
}

/// `explicit` if given, otherwise the first of [`CONFIG_PATHS`] that exists.
pub fn read_config_text(explicit: Option<&Path>) -> anyhow::Result<String> {
    if let Some(path) = explicit {
        return fs::read_to_string(path).with_context(|| format!("Could not read config {}", path.display()));
    }
    for p in &CONFIG_PATHS {
        if let Ok(c) = fs::read_to_string(p) {
            return Ok(c);
        }
    }
    anyhow::bail!("Could not load destiny.toml from {:?}", CONFIG_PATHS);
}

/// Upper bound for every `[bazi]` weight.
pub const MAX_WEIGHT: f64 = 1_000.0;

pub fn validate(settings: &DestinySettings) -> anyhow::Result<()> {
    let b = &settings.bazi;
    for (name, value) in [
        ("stem_weight", b.stem_weight),
        ("hidden_multiplier", b.hidden_multiplier),
        ("month_hidden_boost", b.month_hidden_boost),
    ] {
        if !value.is_finite() || !(0.0..=MAX_WEIGHT).contains(&value) {
            anyhow::bail!("bazi.{} must be a number in [0, {}], got {}", name, MAX_WEIGHT, value);
        }
    }
    if b.default_zone.trim().is_empty() {
        anyhow::bail!("bazi.default_zone must not be empty");
    }

    let l = &settings.llm;
    if l.max_tokens == 0 {
        anyhow::bail!("llm.max_tokens must be at least 1");
    }
    if !l.temperature.is_finite() || l.temperature < 0.0 {
        anyhow::bail!("llm.temperature must be a non-negative number, got {}", l.temperature);
    }
    if !(l.top_p > 0.0 && l.top_p <= 1.0) {
        anyhow::bail!("llm.top_p must be in (0, 1], got {}", l.top_p);
    }
    if l.stub_chunk_chars == 0 {
        anyhow::bail!("llm.stub_chunk_chars must be at least 1");
    }
    if let Some(sha) = &l.expected_sha256 {
        let sha = sha.trim();
        if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("llm.expected_sha256 must be 64 hex characters");
        }
    }
    Ok(())
}

pub fn parse_settings(text: &str) -> anyhow::Result<DestinySettings> {
    let root: RootConfigToml =
        toml::from_str(text).map_err(|e| anyhow::anyhow!("Failed to parse destiny.toml: {e}"))?;
    let settings = from_root(root);
    validate(&settings)?;
    Ok(settings)
}

pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<DestinySettings> {
    parse_settings(&read_config_text(explicit)?)
}

/// Like [`load_settings`], but a missing default file yields the built-in
/// defaults. An explicit path must exist.
pub fn load_settings_or_default(explicit: Option<&Path>) -> anyhow::Result<DestinySettings> {
    if explicit.is_some() {
        return load_settings(explicit);
    }
    match read_config_text(None) {
        Ok(text) => parse_settings(&text),
        Err(e) => {
            log::info!("{}; using built-in defaults", e);
            Ok(DestinySettings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = DestinySettings::default();
        assert_eq!(s.bazi.default_zone, "Asia/Taipei");
        assert_eq!(s.bazi.stem_weight, 3.0);
        assert_eq!(s.llm.max_tokens, 512);
        assert!(s.llm.expected_sha256.is_none());
        assert!(validate(&s).is_ok());
    }

    #[test]
    fn test_partial_tables_fill_defaults() {
        let s = parse_settings("[bazi]\nmonth_hidden_boost = 2.0\n[llm]\ntop_p = 0.5\nexpected_sha256 = \"\"\n").unwrap();
        assert_eq!(s.bazi.month_hidden_boost, 2.0);
        assert_eq!(s.bazi.hidden_multiplier, 1.0);
        assert_eq!(s.llm.top_p, 0.5);
        assert_eq!(s.llm.temperature, 0.8);
        assert!(s.llm.expected_sha256.is_none());
    }

    #[test]
    fn test_validation_errors() {
        assert!(parse_settings("[bazi]\nstem_weight = -1.0\n").is_err());
        assert!(parse_settings("[bazi]\nstem_weight = 1e9\n").is_err());
        assert!(parse_settings("[bazi]\nhidden_multiplier = nan\n").is_err());
        assert!(parse_settings("[bazi]\nmonth_hidden_boost = inf\n").is_err());
        assert!(parse_settings("[bazi]\nstem_weight = 1000.0\n").is_ok());
        assert!(parse_settings("[llm]\ntop_p = 0.0\n").is_err());
        assert!(parse_settings("[llm]\nmax_tokens = 0\n").is_err());
        assert!(parse_settings("[llm]\nexpected_sha256 = \"abc\"\n").is_err());
        assert!(parse_settings("[bazi\n").is_err());
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("destiny.toml");
        fs::write(&path, "[bazi]\ndefault_zone = \"Asia/Shanghai\"\n").unwrap();
        let s = load_settings(Some(&path)).unwrap();
        assert_eq!(s.bazi.default_zone, "Asia/Shanghai");
        assert!(load_settings_or_default(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_shipped_config_parses() {
        let s = parse_settings(include_str!("../../../configs/destiny.toml")).unwrap();
        assert_eq!(s.llm.model_dir, PathBuf::from("models"));
    }
}
