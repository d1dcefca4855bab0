use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct Batch {
    urls: Vec<String>,
}

/// Collected identifiers on disk, one `<batch_key>_url.json` per batch.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, batch_key: &str) -> PathBuf {
        self.dir.join(format!("{batch_key}_url.json"))
    }

    pub fn exists(&self, batch_key: &str) -> bool {
        self.path(batch_key).is_file()
    }

    pub fn save(&self, batch_key: &str, urls: &[String]) -> Result<()> {
        fs_err::create_dir_all(&self.dir)?;
        let path = self.path(batch_key);
        let batch = Batch {
            urls: urls.to_vec(),
        };
        fs_err::write(&path, serde_json::to_string_pretty(&batch)?)?;
        log::info!("Saved {} identifiers to {}", urls.len(), path.display());
        Ok(())
    }

    pub fn load(&self, batch_key: &str) -> Result<Vec<String>> {
        let path = self.path(batch_key);
        let content = match fs_err::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CrawlError::CheckpointMissing {
                    batch_key: batch_key.to_string(),
                    path,
                })
            }
            Err(e) => return Err(e.into()),
        };
        let batch: Batch = serde_json::from_str(&content)?;
        Ok(batch.urls)
    }
}
