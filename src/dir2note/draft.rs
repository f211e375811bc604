use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::walker::FileEntry;

/// date format used in default notebook names, e.g. `Mon Oct 19 2026`
pub static NOTEBOOK_DATEFMT: &str = "%a %b %d %Y";

/// The payload handed to the note application for one file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NoteDraft {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "withText", default)]
    pub with_text: String,
    #[serde(default)]
    pub notebook: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}

/// Where a run imports to: the canonical root and the notebook notes land in.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub root: PathBuf,
    pub root_name: String,
    pub notebook: String,
}

impl Target {
    /// `notebook` overrides the `"{root name}: {date}"` default.
    pub fn new(root: &Path, notebook: Option<&str>, today: NaiveDate) -> Target {
        Target::named(root, root_dir_name(root), notebook, today)
    }

    /// Like `new`, but with the root's name chosen by the caller.
    pub fn named(root: &Path, root_name: String, notebook: Option<&str>, today: NaiveDate) -> Target {
        let notebook = match notebook {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => default_notebook_name(&root_name, today),
        };
        Target {
            root: root.to_path_buf(),
            root_name: root_name,
            notebook: notebook,
        }
    }
}

impl NoteDraft {
    /// Build the draft for `entry`, filed into `notebook` when given, else the target's.
    pub fn new(entry: &FileEntry, target: &Target, notebook: Option<&str>) -> NoteDraft {
        NoteDraft {
            title: entry.filename.clone(),
            with_text: entry.filename.clone(),
            notebook: notebook.unwrap_or(&target.notebook).to_string(),
            tags: derive_tags(&target.root, &entry.dir, &target.root_name),
            attachments: vec![entry.path()],
        }
    }
}

pub fn root_dir_name(root: &Path) -> String {
    match root.file_name() {
        Some(n) => n.to_string_lossy().into_owned(),
        None => root.display().to_string(),
    }
}

/// Name of the root as the user typed it, so a symlinked root keeps the
/// link's name. Falls back to the canonical path for `.` and friends.
pub fn given_root_name(given: &Path, canonical: &Path) -> String {
    match given.file_name() {
        Some(n) => n.to_string_lossy().into_owned(),
        None => root_dir_name(canonical),
    }
}

pub fn default_notebook_name(root_name: &str, today: NaiveDate) -> String {
    format!("{}: {}", root_name, today.format(NOTEBOOK_DATEFMT))
}

/// Root name first, then every directory between the root and the file,
/// nearest first. Duplicates keep their first position.
pub fn derive_tags(root: &Path, dir: &Path, root_name: &str) -> Vec<String> {
    let mut tags = vec![root_name.to_string()];
    let relative = dir.strip_prefix(root).unwrap_or(Path::new(""));
    let names: Vec<String> = relative.components()
                                     .filter_map(|c| match c {
                                         Component::Normal(n) => Some(n.to_string_lossy().into_owned()),
                                         _ => None,
                                     })
                                     .collect();
    for name in names.into_iter().rev() {
        if !tags.contains(&name) {
            tags.push(name);
        }
    }
    tags
}
