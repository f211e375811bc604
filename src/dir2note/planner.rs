use std::fmt;

use crate::draft::{NoteDraft, Target};
use crate::errors::Result;
use crate::record::{self, SyncRecord};
use crate::store::NoteStore;
use crate::walker::FileEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// imported before and unchanged since
    Skip,
    Create,
    /// changed since the last import; the old note is already gone
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(match *self {
            Action::Skip => "skip",
            Action::Create => "create",
            Action::Update => "update",
        })
    }
}

/// What to do with one file.
#[derive(Clone, Debug)]
pub struct Plan {
    pub entry: FileEntry,
    pub action: Action,
    pub draft: NoteDraft,
    pub prior: Option<SyncRecord>,
    /// fingerprint of the file as read during planning
    pub fingerprint: String,
}

/// Decide whether `entry` needs a new note.
///
/// A changed file has its old note deleted here, before the replacement is
/// created; the replacement goes to the notebook the old note was in. A failed
/// delete is logged and the replacement goes to the target notebook.
pub fn plan<S: NoteStore + ?Sized>(store: &mut S, entry: &FileEntry, target: &Target) -> Result<Plan> {
    let prior = record::load(&entry.dir, &entry.filename)?;
    let fingerprint = record::fingerprint(&entry.path())?;

    let (action, notebook) = match prior {
        None => (Action::Create, None),
        Some(ref r) => {
            let note_id = r.note_id.trim();
            if !store.find_note(note_id)? {
                log::info!("note {} for {} is gone, recreating", note_id, entry.path().display());
                (Action::Create, None)
            } else if r.fingerprint == fingerprint {
                (Action::Skip, None)
            } else {
                // best effort; the stale note may stay behind
                let notebook = match store.delete_note(note_id) {
                    Ok(n) => n.filter(|n| !n.is_empty()),
                    Err(e) => {
                        log::warn!("couldn't delete note {} for {}: {}", note_id, entry.path().display(), e);
                        None
                    }
                };
                (Action::Update, notebook)
            }
        }
    };

    Ok(Plan {
        entry: entry.clone(),
        action: action,
        draft: NoteDraft::new(entry, target, notebook.as_deref()),
        prior: prior,
        fingerprint: fingerprint,
    })
}
