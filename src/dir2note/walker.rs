//! Directory enumeration.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::errors::Result;
use crate::record::{sync_dir_for, LEGACY_SYNC_DIR_NAMES};

/// OS metadata files that never get imported
pub static JUNK_PATTERNS: &[&str] = &[
    r"^npm-debug\.log$",
    r"^\..*\.swp$",
    r"^\.DS_Store$",
    r"^\.AppleDouble$",
    r"^\.LSOverride$",
    r"^Icon\r$",
    r"^\._.*",
    r"^\.Spotlight-V100$",
    r"\.Trashes",
    r"^__MACOSX$",
    r"~$",
    r"^Thumbs\.db$",
    r"^ehthumbs\.db$",
    r"^Desktop\.ini$",
    r"@eaDir$",
];

/// A file found under the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub dir: PathBuf,
    pub filename: String,
}

impl FileEntry {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

pub struct JunkFilter {
    patterns: Vec<Regex>,
}

impl JunkFilter {
    /// Built-in patterns plus `extra`.
    pub fn new(extra: &[String]) -> Result<JunkFilter> {
        let mut patterns = Vec::with_capacity(JUNK_PATTERNS.len() + extra.len());
        for p in JUNK_PATTERNS.iter() {
            patterns.push(Regex::new(p)?);
        }
        for p in extra.iter() {
            patterns.push(Regex::new(p)?);
        }
        Ok(JunkFilter { patterns: patterns })
    }

    pub fn is_junk(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// The legacy sync directory in `dir` still waiting to be renamed, if any.
pub fn legacy_sync_dir(dir: &Path) -> Option<PathBuf> {
    if sync_dir_for(dir).exists() {
        return None;
    }
    LEGACY_SYNC_DIR_NAMES.iter().map(|n| dir.join(n)).find(|p| p.is_dir())
}

/// Rename a legacy sync directory in `dir` to the current name.
/// Returns whether anything was renamed.
pub fn migrate_legacy_sync_dir(dir: &Path) -> Result<bool> {
    let current = sync_dir_for(dir);
    for legacy in LEGACY_SYNC_DIR_NAMES.iter() {
        let old = dir.join(legacy);
        if !old.is_dir() {
            continue;
        }
        if current.exists() {
            log::warn!("both {} and {} exist, leaving the legacy directory alone",
                       old.display(),
                       current.display());
            return Ok(false);
        }
        fs::rename(&old, &current)?;
        log::info!("migrated {} -> {}", old.display(), current.display());
        return Ok(true);
    }
    Ok(false)
}

/// Every importable file under `root`, depth first, names sorted per directory.
///
/// Legacy sync directories are renamed on the way unless `migrate` is off,
/// in which case they are only reported.
pub fn enumerate(root: &Path, junk: &JunkFilter, migrate: bool) -> Result<Vec<FileEntry>> {
    let mut entries = vec![];
    visit(root, junk, migrate, &mut entries)?;
    Ok(entries)
}

fn visit(dir: &Path, junk: &JunkFilter, migrate: bool, entries: &mut Vec<FileEntry>) -> Result<()> {
    if migrate {
        migrate_legacy_sync_dir(dir)?;
    } else if let Some(old) = legacy_sync_dir(dir) {
        log::info!("dry run: would migrate {}", old.display());
    }

    let mut names = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        match entry.file_name().into_string() {
            Ok(n) => names.push(n),
            Err(n) => log::warn!("skipping non UTF-8 name {:?} in {}", n, dir.display()),
        }
    }
    names.sort();

    for name in names {
        if junk.is_junk(&name) || is_hidden(&name) {
            continue;
        }
        let path = dir.join(&name);
        let meta = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("can't stat {}: {}", path.display(), e);
                continue;
            }
        };
        if meta.is_dir() {
            // a broken subtree shouldn't stop the rest of the walk
            if let Err(e) = visit(&path, junk, migrate, entries) {
                log::error!("can't read {}: {}", path.display(), e);
            }
        } else if meta.file_type().is_symlink() && path.is_dir() {
            log::debug!("not following directory symlink {}", path.display());
        } else {
            entries.push(FileEntry {
                dir: dir.to_path_buf(),
                filename: name,
            });
        }
    }
    Ok(())
}
