// src/checksum/service.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use sha2::Digest;
use tracing::debug;

use crate::errors::{Error, Result};

/// Supported checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Blake3,
    Sha256,
    Sha512,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "blake3" => Ok(Algorithm::Blake3),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            "sha512" | "sha-512" => Ok(Algorithm::Sha512),
            other => Err(anyhow!("cannot hash with algorithm '{other}'")),
        }
    }
}

/// Incremental hasher over any supported algorithm.
enum AnyHasher {
    Blake3(blake3::Hasher),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl AnyHasher {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Blake3 => AnyHasher::Blake3(blake3::Hasher::new()),
            Algorithm::Sha256 => AnyHasher::Sha256(sha2::Sha256::new()),
            Algorithm::Sha512 => AnyHasher::Sha512(sha2::Sha512::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            AnyHasher::Blake3(h) => {
                h.update(bytes);
            }
            AnyHasher::Sha256(h) => h.update(bytes),
            AnyHasher::Sha512(h) => h.update(bytes),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            AnyHasher::Blake3(h) => h.finalize().to_hex().to_string(),
            AnyHasher::Sha256(h) => hex_string(&h.finalize()),
            AnyHasher::Sha512(h) => hex_string(&h.finalize()),
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Memo entry: digest of a file at a given length + mtime.
#[derive(Debug, Clone)]
struct CachedDigest {
    len: u64,
    modified: Option<SystemTime>,
    hex: String,
}

/// One memoized digest table per algorithm.
#[derive(Default)]
struct DigestCache {
    entries: Mutex<HashMap<PathBuf, CachedDigest>>,
}

impl DigestCache {
    fn hash(&self, algorithm: Algorithm, path: &Path) -> Result<String> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("reading metadata of {path:?}"))?;
        let len = meta.len();
        let modified = meta.modified().ok();

        if let Some(cached) = self.entries.lock().get(path) {
            if cached.len == len && cached.modified == modified {
                return Ok(cached.hex.clone());
            }
        }

        let hex = hash_file(algorithm, path)?;
        self.entries.lock().insert(
            path.to_path_buf(),
            CachedDigest {
                len,
                modified,
                hex: hex.clone(),
            },
        );
        Ok(hex)
    }
}

/// Stream a file through the given algorithm.
fn hash_file(algorithm: Algorithm, path: &Path) -> Result<String> {
    debug!(?path, algorithm = algorithm.name(), "hashing file");
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {path:?}"))?;

    let mut hasher = AnyHasher::new(algorithm);
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// Checksum service with one digest memo per supported algorithm.
///
/// `hash` fails for any algorithm name outside the supported set.
#[derive(Default)]
pub struct ChecksumService {
    blake3: DigestCache,
    sha256: DigestCache,
    sha512: DigestCache,
}

impl ChecksumService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of one file under the named algorithm, memoized until the
    /// file's length or mtime changes.
    pub fn hash(&self, path: &Path, algorithm: &str) -> Result<String> {
        let algorithm: Algorithm = algorithm.parse()?;
        self.cache_for(algorithm).hash(algorithm, path)
    }

    /// Deterministic aggregate digest over a set of files.
    ///
    /// Order of `paths` does not matter; they are sorted before hashing so
    /// the aggregate is stable. Missing paths fail rather than silently
    /// changing the digest.
    pub fn aggregate(&self, paths: &[PathBuf], algorithm: &str) -> Result<String> {
        let algo: Algorithm = algorithm.parse()?;

        let mut sorted: Vec<&PathBuf> = paths.iter().collect();
        sorted.sort();

        let mut hasher = AnyHasher::new(algo);
        for path in sorted {
            let digest = self.cache_for(algo).hash(algo, path)?;
            hasher.update(digest.as_bytes());
        }
        Ok(hasher.finalize_hex())
    }

    fn cache_for(&self, algorithm: Algorithm) -> &DigestCache {
        match algorithm {
            Algorithm::Blake3 => &self.blake3,
            Algorithm::Sha256 => &self.sha256,
            Algorithm::Sha512 => &self.sha512,
        }
    }
}
