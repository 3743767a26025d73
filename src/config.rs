use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::sentences::SentenceSet;
use crate::survey::Questionnaire;
use crate::timer::{DEFAULT_COUNTDOWN_SECS, DEFAULT_PRACTICE_SECS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub participant_id: Option<String>,
    pub sentence_set: SentenceSet,
    pub practice_set: SentenceSet,
    pub countdown_secs: u64,
    /// 0 skips the practice block.
    pub practice_secs: u64,
    pub questionnaire: Questionnaire,
    pub shuffle: bool,
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            participant_id: None,
            sentence_set: SentenceSet::Measurement,
            practice_set: SentenceSet::Practice,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            practice_secs: DEFAULT_PRACTICE_SECS,
            questionnaire: Questionnaire::Sus,
            shuffle: false,
            output_dir: None,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "entrylab") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("entrylab_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing files give the defaults; unreadable ones are logged and ignored.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("ignoring invalid config {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
            .with_context(|| format!("unable to write {}", self.path.display()))
    }
}
