//! Archive of executed scripts
//!
//! Each script is saved as a standalone `.py` file whose header records the
//! conversation that produced it, so it can be read back or re-run later.

use crate::session::Transcript;
use scriptpilot_error::{Error, Result};
use scriptpilot_llm::Role;
use serde::Serialize;
use std::path::{Path, PathBuf};

const LOG_VERSION: f32 = 0.1;

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    model: &'a str,
    timestamp: u64,
    log_version: f32,
}

/// Directory of saved scripts.
#[derive(Debug, Clone)]
pub struct ScriptArchive {
    dir: PathBuf,
}

impl ScriptArchive {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::from(e)
                .with_operation("archive::new")
                .with_context("dir", dir.display().to_string())
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `script` with the non-system part of `transcript` as its header.
    pub fn save(&self, transcript: &Transcript, model: &str, script: &str) -> Result<PathBuf> {
        let timestamp = current_timestamp();
        let path = self.free_path(timestamp);
        let contents = render(transcript, model, timestamp, script)?;

        std::fs::write(&path, contents).map_err(|e| {
            Error::from(e)
                .with_operation("archive::save")
                .with_context("path", path.display().to_string())
        })?;

        tracing::debug!(path = %path.display(), "archived script");
        Ok(path)
    }

    fn free_path(&self, timestamp: u64) -> PathBuf {
        let mut path = self.dir.join(format!("script_{}.py", timestamp));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("script_{}_{}.py", timestamp, n));
            n += 1;
        }
        path
    }
}

fn render(transcript: &Transcript, model: &str, timestamp: u64, script: &str) -> Result<String> {
    let conversation: Vec<_> = transcript
        .messages()
        .iter()
        .filter(|m| m.role != Role::System)
        .collect();
    let metadata = Metadata {
        model,
        timestamp,
        log_version: LOG_VERSION,
    };

    let to_json = |value: serde_json::Result<String>| {
        value.map_err(|e| {
            Error::unexpected("cannot serialize script header")
                .with_operation("archive::render")
                .set_source(e)
        })
    };
    let conversation = to_json(serde_json::to_string_pretty(&conversation))?;
    let metadata = to_json(serde_json::to_string_pretty(&metadata))?;

    Ok(format!(
        "conversation = {}\n\nmetadata = {}\n\n\n{}\n",
        conversation,
        metadata,
        script.trim_end()
    ))
}

fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
