//! Per-file sync records.
//!
//! Every scanned directory gets a reserved `.en-sync` subdirectory holding one
//! hidden JSON file per imported source file, so the records never show up as
//! importable files themselves and two files with the same name in different
//! directories can't clobber each other.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use sha2::{Digest, Sha256};

use crate::draft::NoteDraft;
use crate::errors::{Error, ErrorKind, Result};

/// name of the reserved sync-state directory
pub static SYNC_DIR_NAME: &str = ".en-sync";
/// names older releases used for the same directory
pub static LEGACY_SYNC_DIR_NAMES: &[&str] = &[".evernote-sync"];

/// What we remember about a file after importing it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SyncRecord {
    #[serde(rename = "SyncEntry")]
    pub sync_entry: PathBuf,
    #[serde(flatten)]
    pub draft: NoteDraft,
    #[serde(rename = "noteId")]
    pub note_id: String,
    /// content fingerprint; the key predates the switch away from md5
    #[serde(rename = "md5")]
    pub fingerprint: String,
    #[serde(rename = "syncDate")]
    pub sync_date: DateTime<Utc>,
}

impl SyncRecord {
    pub fn new(dir: &Path,
               filename: &str,
               draft: NoteDraft,
               note_id: &str,
               fingerprint: &str)
               -> SyncRecord {
        SyncRecord {
            sync_entry: record_path_for(dir, filename),
            draft: draft,
            note_id: note_id.trim().to_string(),
            fingerprint: fingerprint.to_string(),
            sync_date: Utc::now(),
        }
    }
}

pub fn sync_dir_for(dir: &Path) -> PathBuf {
    dir.join(SYNC_DIR_NAME)
}

/// `<dir>/.en-sync/.<filename>.json`
pub fn record_path_for(dir: &Path, filename: &str) -> PathBuf {
    sync_dir_for(dir).join(format!(".{}.json", filename))
}

/// Load the record for `dir/filename`, `None` if the file was never imported.
///
/// A directory that still has only a legacy sync directory is read from there.
pub fn load(dir: &Path, filename: &str) -> Result<Option<SyncRecord>> {
    let mut path = record_path_for(dir, filename);
    if !sync_dir_for(dir).exists() {
        let record_name = format!(".{}.json", filename);
        if let Some(legacy) = LEGACY_SYNC_DIR_NAMES.iter()
                                                   .map(|n| dir.join(n).join(&record_name))
                                                   .find(|p| p.is_file()) {
            path = legacy;
        }
    }
    if !path.is_file() {
        return Ok(None);
    }
    let mut contents = String::new();
    File::open(&path)?.read_to_string(&mut contents)?;
    match serde_json::from_str(&contents) {
        Ok(r) => Ok(Some(r)),
        Err(e) => Err(Error::new(ErrorKind::RecordCorrupt,
                                 format!("unreadable sync record {}", path.display()))
                      .with_detail(e.to_string())),
    }
}

/// Write the record for `dir/filename`, creating the sync directory if needed.
pub fn save(dir: &Path, filename: &str, record: &SyncRecord) -> Result<PathBuf> {
    fs::create_dir_all(sync_dir_for(dir))?;
    let path = record_path_for(dir, filename);
    let mut writer = BufWriter::new(File::create(&path)?);
    let mut ser = serde_json::Serializer::with_formatter(&mut writer,
                                                         PrettyFormatter::with_indent(b"    "));
    record.serialize(&mut ser)?;
    writer.flush()?;
    Ok(path)
}

/// Hex SHA-256 of the file's current bytes.
pub fn fingerprint(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut chunk = [0_u8; 64 * 1024];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn draft_for(dir: &Path, filename: &str) -> NoteDraft {
        NoteDraft {
            title: filename.to_string(),
            with_text: filename.to_string(),
            notebook: "root: Mon Oct 19 2026".to_string(),
            tags: vec!["root".to_string()],
            attachments: vec![dir.join(filename)],
        }
    }

    #[test]
    fn test_load_missing_record_is_none() {
        let temp_dir = tempdir().unwrap();
        assert!(load(temp_dir.path(), "a.txt").unwrap().is_none());
    }

    #[test]
    fn test_save_creates_sync_dir_and_round_trips() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        let record = SyncRecord::new(dir, "a.txt", draft_for(dir, "a.txt"), " note-1\n", "abc");

        let path = save(dir, "a.txt", &record).unwrap();
        assert_eq!(path, dir.join(".en-sync").join(".a.txt.json"));
        assert!(sync_dir_for(dir).is_dir());

        let loaded = load(dir, "a.txt").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.note_id, "note-1");
    }

    #[test]
    fn test_save_overwrites_existing_record() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        save(dir, "a.txt", &SyncRecord::new(dir, "a.txt", draft_for(dir, "a.txt"), "n1", "old")).unwrap();
        save(dir, "a.txt", &SyncRecord::new(dir, "a.txt", draft_for(dir, "a.txt"), "n2", "new")).unwrap();

        let loaded = load(dir, "a.txt").unwrap().unwrap();
        assert_eq!(loaded.note_id, "n2");
        assert_eq!(loaded.fingerprint, "new");
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        fs::create_dir_all(sync_dir_for(dir)).unwrap();
        fs::write(record_path_for(dir, "a.txt"), "{ not json").unwrap();

        let err = load(dir, "a.txt").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::RecordCorrupt));
    }

    #[test]
    fn test_reads_records_written_by_older_releases() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        fs::create_dir_all(sync_dir_for(dir)).unwrap();
        let legacy = r#"{
    "SyncEntry": "/notes/.en-sync/.a.txt.json",
    "withText": "a.txt",
    "title": "a.txt",
    "notebook": "notes: Thu Jun 01 2017",
    "attachments": ["/notes/a.txt"],
    "tags": ["notes", "notes"],
    "syncDate": "2017-06-01T10:20:30.123Z",
    "md5": "0cc175b9c0f1b6a831c399e269772661",
    "noteId": "x-coredata://abc/ENNote/p42\n"
}"#;
        fs::write(record_path_for(dir, "a.txt"), legacy).unwrap();

        let loaded = load(dir, "a.txt").unwrap().unwrap();
        assert_eq!(loaded.draft.notebook, "notes: Thu Jun 01 2017");
        assert_eq!(loaded.fingerprint, "0cc175b9c0f1b6a831c399e269772661");
        assert_eq!(loaded.note_id.trim(), "x-coredata://abc/ENNote/p42");
    }

    #[test]
    fn test_load_falls_back_to_legacy_dir() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        save(dir, "a.txt", &SyncRecord::new(dir, "a.txt", draft_for(dir, "a.txt"), "n1", "f")).unwrap();
        fs::rename(sync_dir_for(dir), dir.join(".evernote-sync")).unwrap();

        assert_eq!(load(dir, "a.txt").unwrap().unwrap().note_id, "n1");
        assert!(load(dir, "b.txt").unwrap().is_none());
    }

    #[test]
    fn test_record_file_keys() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        let path = save(dir, "a.txt", &SyncRecord::new(dir, "a.txt", draft_for(dir, "a.txt"), "n1", "f")).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        for key in ["SyncEntry", "withText", "title", "notebook", "attachments", "tags", "noteId", "md5", "syncDate"] {
            assert!(raw.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "hello").unwrap();
        let first = fingerprint(&file).unwrap();
        assert_eq!(first, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
        assert_eq!(fingerprint(&file).unwrap(), first);

        fs::write(&file, "hello!").unwrap();
        assert_ne!(fingerprint(&file).unwrap(), first);
    }

    #[test]
    fn test_same_name_in_different_dirs_do_not_collide() {
        let temp_dir = tempdir().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();

        save(&a, "same.txt", &SyncRecord::new(&a, "same.txt", draft_for(&a, "same.txt"), "na", "fa")).unwrap();
        save(&b, "same.txt", &SyncRecord::new(&b, "same.txt", draft_for(&b, "same.txt"), "nb", "fb")).unwrap();

        assert_eq!(load(&a, "same.txt").unwrap().unwrap().note_id, "na");
        assert_eq!(load(&b, "same.txt").unwrap().unwrap().note_id, "nb");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// distinct (dir, filename) pairs always map to distinct record paths
        #[test]
        fn prop_record_paths_are_unique(
            dir_a in "[a-z]{1,6}(/[a-z]{1,6}){0,2}",
            dir_b in "[a-z]{1,6}(/[a-z]{1,6}){0,2}",
            name_a in "[a-zA-Z0-9_-]{1,10}\\.[a-z]{1,3}",
            name_b in "[a-zA-Z0-9_-]{1,10}\\.[a-z]{1,3}",
        ) {
            prop_assume!(dir_a != dir_b || name_a != name_b);
            let root = Path::new("/r");
            let pa = record_path_for(&root.join(&dir_a), &name_a);
            let pb = record_path_for(&root.join(&dir_b), &name_b);
            prop_assert_ne!(pa, pb);
        }

        /// record files are hidden so the walker never imports them
        #[test]
        fn prop_record_file_names_are_hidden(name in "[a-zA-Z0-9 _.-]{1,20}") {
            let path = record_path_for(Path::new("/r"), &name);
            let file_name = path.file_name().unwrap().to_str().unwrap().to_string();
            prop_assert!(file_name.starts_with('.'));
            prop_assert!(file_name.ends_with(".json"));
        }
    }
}
