//! Locating and verifying the on-disk model files.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{OracleError, Result};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Lowercase hex SHA-256 of a file, read in 8 KiB blocks.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// `false` when the file is missing or the digest differs. Comparison ignores
/// case and surrounding whitespace.
pub fn validate_checksum(path: &Path, expected: &str) -> bool {
    if !path.exists() {
        return false;
    }
    match sha256_file(path) {
        Ok(actual) => actual.eq_ignore_ascii_case(expected.trim()),
        Err(e) => {
            log::warn!("Checksum read failed for {}: {}", path.display(), e);
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    Verified,
    /// No expected digest was available.
    Unverified,
    ChecksumMismatch,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAssets {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub expected_sha256: Option<String>,
}

impl ModelAssets {
    /// First `*.onnx` in `dir` by file name, with `tokenizer.json` beside it.
    /// The expected digest is `explicit_sha256` when non-blank, otherwise the
    /// first word of a `<model>.sha256` sidecar.
    pub fn locate(dir: &Path, explicit_sha256: Option<&str>) -> Result<Self> {
        let mut models: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|_| OracleError::AssetsNotFound { dir: dir.to_path_buf() })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("onnx"))
            })
            .collect();
        models.sort();
        let model_path = models
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::AssetsNotFound { dir: dir.to_path_buf() })?;

        let expected_sha256 = explicit_sha256
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| read_sidecar(&model_path));

        Ok(Self {
            tokenizer_path: dir.join(TOKENIZER_FILE),
            model_path,
            expected_sha256,
        })
    }

    pub fn has_tokenizer(&self) -> bool {
        self.tokenizer_path.is_file()
    }

    pub fn verify(&self) -> AssetStatus {
        if !self.model_path.is_file() {
            return AssetStatus::Missing;
        }
        let Some(expected) = self.expected_sha256.as_deref() else {
            return AssetStatus::Unverified;
        };
        let ok = validate_checksum(&self.model_path, expected);
        log::info!(
            "Model checksum {} for {}",
            if ok { "ok" } else { "MISMATCH" },
            self.model_path.display()
        );
        if ok {
            AssetStatus::Verified
        } else {
            AssetStatus::ChecksumMismatch
        }
    }
}

fn read_sidecar(model_path: &Path) -> Option<String> {
    let mut name = model_path.file_name()?.to_os_string();
    name.push(CHECKSUM_SUFFIX);
    let text = fs::read_to_string(model_path.with_file_name(name)).ok()?;
    text.split_whitespace().next().map(str::to_string)
}
