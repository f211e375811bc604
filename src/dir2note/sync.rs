//! One import run: walk the tree, plan every file, then import what changed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;

use crate::draft::{given_root_name, Target};
use crate::errors::Result;
use crate::importer::{execute, Counters};
use crate::planner::{plan, Action};
use crate::progress::Progress;
use crate::specific_fail;
use crate::store::NoteStore;
use crate::walker::{enumerate, JunkFilter};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Flag set by the ^C handler.
pub fn interrupt_flag() -> &'static AtomicBool {
    &INTERRUPTED
}

/// Raise `flag`; true when it was already up.
fn raise(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::SeqCst)
}

/// Stop after the file in flight on the first ^C, exit on the second.
pub fn install_interrupt_handler() {
    let installed = ctrlc::set_handler(|| {
        if raise(&INTERRUPTED) {
            std::process::exit(130);
        }
    });
    if let Err(e) = installed {
        log::warn!("can't install the ^C handler: {}", e);
    }
}

pub struct SyncOptions {
    /// overrides the `"{root}: {date}"` notebook
    pub notebook: Option<String>,
    pub junk: JunkFilter,
    pub progress: bool,
    /// plan only; nothing gets created or recorded
    pub dry_run: bool,
}

/// How one file went.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<Action>,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub counters: Counters,
    pub skipped: usize,
    pub failed: usize,
    /// files planned for a create or update
    pub actionable: usize,
    pub interrupted: bool,
    pub outcomes: Vec<FileOutcome>,
}

impl Summary {
    fn record(&mut self, path: PathBuf, result: Result<Action>) {
        match result {
            Ok(Action::Skip) => self.skipped += 1,
            Ok(_) => {}
            Err(ref e) => {
                log::error!("{}: {}", path.display(), e);
                self.failed += 1;
            }
        }
        self.outcomes.push(FileOutcome {
            path: path,
            result: result,
        });
    }

    pub fn planned(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| matches!(o.result, Ok(a) if a == action)).count()
    }
}

/// Import everything under `root` into `store`.
///
/// Every file is planned first, then the creates and updates are carried out.
/// Failures are contained per file; only an unreadable root fails the run.
/// `stop` is checked between files.
pub fn sync_tree<S: NoteStore + ?Sized>(root: &Path,
                                        store: &mut S,
                                        options: &SyncOptions,
                                        stop: &AtomicBool)
                                        -> Result<Summary> {
    let canonical = root.canonicalize()?;
    if !canonical.is_dir() {
        return specific_fail!(format!("{} is not a directory.", canonical.display()));
    }
    let target = Target::named(&canonical,
                               given_root_name(root, &canonical),
                               options.notebook.as_deref(),
                               Local::now().date_naive());
    log::info!("importing {} into '{}'", canonical.display(), target.notebook);

    let mut progress = Progress::new(options.progress && !options.dry_run);
    progress.calculating()?;
    let entries = enumerate(&canonical, &options.junk, !options.dry_run)?;

    let mut summary = Summary::default();
    let mut pending = vec![];
    for (i, entry) in entries.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            log::warn!("interrupted while planning, {} files left", entries.len() - i);
            summary.interrupted = true;
            break;
        }
        match plan(&mut *store, entry, &target) {
            Ok(p) if p.action == Action::Skip => {
                log::debug!("unchanged {}", entry.path().display());
                summary.record(entry.path(), Ok(Action::Skip));
            }
            Ok(p) => pending.push(p),
            Err(e) => summary.record(entry.path(), Err(e)),
        }
    }
    if summary.interrupted {
        progress.finish()?;
        return Ok(summary);
    }

    summary.actionable = pending.len();
    progress.start(pending.len())?;
    for (done, p) in pending.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            log::warn!("interrupted, {} files left", pending.len() - done);
            summary.interrupted = true;
            break;
        }
        let result = if options.dry_run {
            println!("{:<6}  {}", p.action, p.entry.path().display());
            Ok(p.action)
        } else {
            execute(&mut *store, p, &mut summary.counters).map(|id| {
                log::info!("{} {} -> {}", p.action, p.entry.path().display(), id);
                p.action
            })
        };
        summary.record(p.entry.path(), result);
        progress.tick()?;
    }

    progress.finish()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::store::DryRun;
    use crate::testing::{Call, MemoryStore};
    use std::fs;
    use tempfile::tempdir;

    fn options() -> SyncOptions {
        SyncOptions {
            notebook: None,
            junk: JunkFilter::new(&[]).unwrap(),
            progress: false,
            dry_run: false,
        }
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_failed_file_does_not_stop_the_run() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("notes");
        write(&root.join("a.txt"), "a");
        write(&root.join("b.txt"), "b");
        write(&root.join(".en-sync/.a.txt.json"), "corrupt");
        let mut store = MemoryStore::new();

        let summary = sync_tree(&root, &mut store, &options(), &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.counters, Counters { created: 1, updated: 0 });
        assert!(matches!(summary.outcomes[0].result, Err(ref e) if matches!(e.kind, ErrorKind::RecordCorrupt)));
        assert!(matches!(summary.outcomes[1].result, Ok(Action::Create)));
    }

    #[test]
    fn test_remote_failure_is_contained() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("notes");
        write(&root.join("a.txt"), "a");
        write(&root.join("b.txt"), "b");
        let mut store = MemoryStore::new();
        store.fail_creates = 1;

        let summary = sync_tree(&root, &mut store, &options(), &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.counters.created, 1);

        // the failed file is picked up next time
        let summary = sync_tree(&root, &mut store, &options(), &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.counters.created, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_interrupt_stops_before_first_file() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("notes");
        write(&root.join("a.txt"), "a");
        let mut store = MemoryStore::new();

        let summary = sync_tree(&root, &mut store, &options(), &AtomicBool::new(true)).unwrap();
        assert!(summary.interrupted);
        assert!(summary.outcomes.is_empty());
        assert!(store.calls.is_empty());
    }

    #[test]
    fn test_dry_run_reports_without_writing() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("notes");
        write(&root.join("a.txt"), "a");
        write(&root.join("sub/b.txt"), "b");
        let mut store = MemoryStore::new();
        let mut opts = options();
        opts.dry_run = true;

        let summary = sync_tree(&root, &mut DryRun::new(&mut store), &opts, &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.planned(Action::Create), 2);
        assert_eq!(summary.counters, Counters::default());
        assert!(store.calls.is_empty());
        assert!(!root.join(".en-sync").exists());
    }

    #[test]
    fn test_notebook_override() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("notes");
        write(&root.join("a.txt"), "a");
        let mut store = MemoryStore::new();
        let mut opts = options();
        opts.notebook = Some("Inbox".to_string());

        sync_tree(&root, &mut store, &opts, &AtomicBool::new(false)).unwrap();
        assert_eq!(store.calls[0], Call::CreateNotebook("Inbox".to_string()));
        assert!(store.notes.values().all(|n| n.notebook == "Inbox"));
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("file.txt");
        write(&file, "x");
        let mut store = MemoryStore::new();

        assert!(sync_tree(&file, &mut store, &options(), &AtomicBool::new(false)).is_err());
        assert!(sync_tree(&temp_dir.path().join("missing"), &mut store, &options(), &AtomicBool::new(false)).is_err());
    }

    #[test]
    fn test_progress_counts_only_actionable_files() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("notes");
        write(&root.join("a.txt"), "a");
        write(&root.join("b.txt"), "b");
        write(&root.join("c.txt"), "c");
        let mut store = MemoryStore::new();
        let summary = sync_tree(&root, &mut store, &options(), &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.actionable, 3);

        write(&root.join("b.txt"), "b, edited");
        let summary = sync_tree(&root, &mut store, &options(), &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.actionable, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.counters, Counters { created: 0, updated: 1 });
    }

    #[test]
    fn test_second_interrupt_is_reported() {
        let flag = AtomicBool::new(false);
        assert!(!raise(&flag));
        assert!(flag.load(Ordering::SeqCst));
        assert!(raise(&flag));
    }

    #[test]
    fn test_dry_run_leaves_legacy_sync_dir_alone() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("notes");
        write(&root.join("a.txt"), "a");
        let mut store = MemoryStore::new();
        sync_tree(&root, &mut store, &options(), &AtomicBool::new(false)).unwrap();
        fs::rename(root.join(".en-sync"), root.join(".evernote-sync")).unwrap();
        store.calls.clear();

        let mut opts = options();
        opts.dry_run = true;
        let summary = sync_tree(&root, &mut DryRun::new(&mut store), &opts, &AtomicBool::new(false)).unwrap();
        assert!(root.join(".evernote-sync").is_dir());
        assert!(!root.join(".en-sync").exists());
        // records are still read from the legacy directory
        assert_eq!(summary.planned(Action::Skip), 1);
        assert!(store.mutations().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_keeps_the_given_name() {
        let temp_dir = tempdir().unwrap();
        let real = temp_dir.path().join("real");
        write(&real.join("sub/a.txt"), "a");
        let link = temp_dir.path().join("linked");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let mut store = MemoryStore::new();

        sync_tree(&link, &mut store, &options(), &AtomicBool::new(false)).unwrap();
        let note = store.notes.values().next().unwrap();
        assert_eq!(note.draft.tags, vec!["linked", "sub"]);
        assert!(note.notebook.starts_with("linked: "));
    }
}
