//! An in-process [`NoteStore`] for exercising runs without the desktop app.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::draft::NoteDraft;
use crate::errors::Result;
use crate::store::{remote_error, NoteStore};

/// One call made against a [`MemoryStore`].
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateNotebook(String),
    CreateNote(String),
    FindNote(String),
    DeleteNote(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::FindNote(_))
    }
}

/// A stored note in a [`MemoryStore`].
#[derive(Clone, Debug, PartialEq)]
pub struct StoredNote {
    pub notebook: String,
    pub draft: NoteDraft,
}

/// Keeps everything in memory and logs each call.
#[derive(Default)]
pub struct MemoryStore {
    pub notebooks: Vec<String>,
    pub notes: BTreeMap<String, StoredNote>,
    pub calls: Vec<Call>,
    /// the next this many calls fail with a bridge error
    pub fail_next: u32,
    /// like `fail_next`, but only for note creation
    pub fail_creates: u32,
    /// like `fail_next`, but only for deletes; the note stays put
    pub fail_deletes: u32,
    /// payload file handed to the most recent create
    pub last_payload: Option<PathBuf>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn mutations(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| c.is_mutation()).collect()
    }

    /// remove a note behind the importer's back
    pub fn forget(&mut self, id: &str) {
        self.notes.remove(id);
    }

    fn check_failure(&mut self) -> Result<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(remote_error("note application is not running".to_string()));
        }
        Ok(())
    }
}

impl NoteStore for MemoryStore {
    fn create_notebook(&mut self, name: &str) -> Result<()> {
        self.calls.push(Call::CreateNotebook(name.to_string()));
        self.check_failure()?;
        if !self.notebooks.iter().any(|n| n == name) {
            self.notebooks.push(name.to_string());
        }
        Ok(())
    }

    fn create_note(&mut self, payload: &Path) -> Result<String> {
        let mut contents = String::new();
        File::open(payload)?.read_to_string(&mut contents)?;
        let draft: NoteDraft = serde_json::from_str(&contents)?;
        self.last_payload = Some(payload.to_path_buf());
        self.calls.push(Call::CreateNote(draft.title.clone()));
        self.check_failure()?;
        if self.fail_creates > 0 {
            self.fail_creates -= 1;
            return Err(remote_error("note application rejected the note".to_string()));
        }

        self.next_id += 1;
        let id = format!("note-{}", self.next_id);
        self.notes.insert(id.clone(), StoredNote {
            notebook: draft.notebook.clone(),
            draft: draft,
        });
        Ok(id)
    }

    fn find_note(&mut self, id: &str) -> Result<bool> {
        self.calls.push(Call::FindNote(id.to_string()));
        self.check_failure()?;
        Ok(self.notes.contains_key(id))
    }

    fn delete_note(&mut self, id: &str) -> Result<Option<String>> {
        self.calls.push(Call::DeleteNote(id.to_string()));
        self.check_failure()?;
        if self.fail_deletes > 0 {
            self.fail_deletes -= 1;
            return Err(remote_error("note is locked".to_string()));
        }
        Ok(self.notes.remove(id).map(|n| n.notebook))
    }
}
