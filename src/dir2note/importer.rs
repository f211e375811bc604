use std::io::Write;

use tempfile::Builder;

use crate::errors::Result;
use crate::planner::{Action, Plan};
use crate::record::{self, SyncRecord};
use crate::store::NoteStore;

/// Notes made during a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub created: usize,
    pub updated: usize,
}

/// Carry out `plan` and record the result.
///
/// The note is created first and the sync record written afterwards. If the
/// record write fails the note is orphaned and the next run creates it again.
pub fn execute<S: NoteStore + ?Sized>(store: &mut S,
                                      plan: &Plan,
                                      counters: &mut Counters)
                                      -> Result<String> {
    if plan.action == Action::Skip {
        return Ok(plan.prior.as_ref().map(|r| r.note_id.trim().to_string()).unwrap_or_default());
    }

    // removed on drop, whichever way we leave
    let mut scratch = Builder::new()
        .prefix("dir2note")
        .suffix(".json")
        .rand_bytes(8)
        .tempfile()?;
    serde_json::to_writer(scratch.as_file_mut(), &plan.draft)?;
    scratch.as_file_mut().flush()?;

    store.create_notebook(&plan.draft.notebook)?;
    let note_id = store.create_note(scratch.path())?.trim().to_string();
    if let Err(e) = scratch.close() {
        log::warn!("couldn't remove scratch file: {}", e);
    }

    let record = SyncRecord::new(&plan.entry.dir,
                                 &plan.entry.filename,
                                 plan.draft.clone(),
                                 &note_id,
                                 &plan.fingerprint);
    if let Err(e) = record::save(&plan.entry.dir, &plan.entry.filename, &record) {
        log::error!("note {} was created for {} but its sync record could not be written",
                    note_id,
                    plan.entry.path().display());
        return Err(e);
    }

    match plan.action {
        Action::Create => counters.created += 1,
        Action::Update => counters.updated += 1,
        Action::Skip => {}
    }
    Ok(note_id)
}
