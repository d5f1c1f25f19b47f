//! Timestamped summary files.
//!
//! Each save creates a new file; an existing file is never overwritten. Two
//! saves in the same second get `_1`, `_2`, ... suffixes.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::PersistenceError;

const FILE_PREFIX: &str = "summary_";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Writes rendered summaries into one directory.
#[derive(Debug, Clone)]
pub struct SummarySink {
    dir: PathBuf,
}

impl SummarySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Save `text` under the current local time.
    pub fn save(&self, text: &str) -> Result<PathBuf, PersistenceError> {
        self.save_at(text, Local::now())
    }

    /// Save `text` with a file name derived from `at`.
    pub fn save_at(&self, text: &str, at: DateTime<Local>) -> Result<PathBuf, PersistenceError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let stem = format!("{FILE_PREFIX}{}", at.format(TIMESTAMP_FORMAT));
        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("{stem}.txt"),
                n => format!("{stem}_{n}.txt"),
            };
            let path = self.dir.join(name);

            let written = write_new(&path, |file| {
                file.write_all(text.as_bytes())?;
                file.sync_all()
            });
            match written {
                Ok(()) => {
                    info!(path = %path.display(), "Summary saved");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(PersistenceError::Write { path, source }),
            }
        }
    }
}

/// Create `path`, which must not exist yet, and fill it with `fill`.
///
/// A file that could not be filled completely is removed again.
fn write_new(path: &Path, fill: impl FnOnce(&mut File) -> std::io::Result<()>) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    if let Err(e) = fill(&mut file) {
        drop(file);
        if let Err(cleanup) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %cleanup, "Failed to remove partial summary");
        }
        return Err(e);
    }
    Ok(())
}
