use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use taxmate_core::ReviewSession;

/// `$TAXMATE_HOME`, or `~/.taxmate`
pub fn taxmate_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TAXMATE_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".taxmate"))
}

pub fn ensure_taxmate_home() -> Result<PathBuf> {
    let dir = taxmate_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn session_path() -> Result<PathBuf> {
    Ok(ensure_taxmate_home()?.join("review.json"))
}

/// The review session on disk, with the hustle it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub hustle_id: String,
    pub session: ReviewSession,
}

pub fn read_session(path: &Path) -> Result<Option<StoredSession>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let stored = serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(stored))
}

pub fn write_session(path: &Path, stored: &StoredSession) -> Result<()> {
    let json = serde_json::to_string_pretty(stored)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
