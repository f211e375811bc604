use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, Result};
use crate::specific_fail;

/// Settings read from `config.yaml`; everything is optional.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// notebook to import into instead of `"{root}: {date}"`
    pub notebook: Option<String>,
    /// program that runs the automation scripts
    pub osascript: String,
    /// extra attempts after a failed call to the note application
    pub retries: u32,
    /// milliseconds to wait before the first retry, growing with each attempt
    pub retry_backoff_ms: u64,
    /// filename regexes to skip on top of the built-in junk list
    pub junk_patterns: Vec<String>,
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            notebook: None,
            osascript: "osascript".to_string(),
            retries: 2,
            retry_backoff_ms: 500,
            junk_patterns: vec![],
            progress: true,
        }
    }
}

/// The config file to read, if any. An explicit path has to exist.
pub fn find_config_file(explicit: &Option<String>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        let path = PathBuf::from(path);
        if !path.is_file() {
            return specific_fail!(ErrorKind::Config, format!("{} does not exist.", path.display()));
        }
        return Ok(Some(path));
    }
    match dirs::config_dir() {
        Some(p) => {
            let default_path = p.join("dir2note").join("config.yaml");
            if default_path.is_file() {
                Ok(Some(default_path))
            } else {
                Ok(None)
            }
        }
        None => Ok(None),
    }
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    match serde_yaml::from_str(&contents) {
        Ok(c) => Ok(c),
        Err(e) => specific_fail!(ErrorKind::Config,
                                 format!("invalid YAML in {}: {}", path.display(), e)),
    }
}

pub fn load(explicit: &Option<String>) -> Result<Config> {
    match find_config_file(explicit)? {
        Some(path) => {
            log::debug!("reading config from {}", path.display());
            load_from_path(&path)
        }
        None => Ok(Config::default()),
    }
}
