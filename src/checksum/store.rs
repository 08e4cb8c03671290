// src/checksum/store.rs

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use parking_lot::Mutex;
use tracing::info;

use crate::errors::Result;
use crate::plan::TaskName;

/// Default path of the checksum store, relative to the working directory.
///
/// The file format is a simple line-based mapping:
///
/// ```text
/// task_name_1 <whitespace> hex_digest_1
/// task_name_2 <whitespace> hex_digest_2
/// ...
/// ```
pub const DEFAULT_STORE_PATH: &str = ".dagrun/checksums";

/// Persistent per-task aggregate input digests.
///
/// Entries are loaded once on open and rewritten on every update; the inner
/// lock makes updates safe from concurrently completing workers.
pub struct ChecksumStore {
    path: PathBuf,
    entries: Mutex<HashMap<TaskName, String>>,
}

impl ChecksumStore {
    /// Open the store at `path`, loading existing entries if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = load_entries(&path)?;
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// The stored digest for a task, if any.
    pub fn get(&self, task: &str) -> Option<String> {
        self.entries.lock().get(task).cloned()
    }

    /// Record the digest for a task and persist the whole store.
    pub fn put(&self, task: &str, digest: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(task.to_string(), digest.to_string());
        save_entries(&self.path, &entries)?;
        info!(task = %task, digest = %digest, "stored task checksum");
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<HashMap<TaskName, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let file =
        File::open(path).with_context(|| format!("opening checksum store at {path:?}"))?;
    let reader = BufReader::new(file);

    let mut map = HashMap::new();
    for line_res in reader.lines() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((name, digest)) = trimmed.split_once(char::is_whitespace) {
            map.insert(name.to_string(), digest.trim().to_string());
        }
    }

    Ok(map)
}

fn save_entries(path: &Path, map: &HashMap<TaskName, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating checksum directory at {parent:?}"))?;
        }
    }

    let file =
        File::create(path).with_context(|| format!("creating checksum store at {path:?}"))?;
    let mut writer = BufWriter::new(file);

    for (name, digest) in map.iter() {
        writeln!(writer, "{name} {digest}")?;
    }

    writer.flush()?;
    Ok(())
}
