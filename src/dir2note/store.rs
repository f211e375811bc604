//! The note application, seen from here.
//!
//! Every method takes `&mut self`: the desktop application behind the bridge
//! handles one request at a time, so holding the store exclusively is what
//! keeps calls serialized.

use std::path::Path;
use std::process::Command;
use std::thread::sleep;
use std::time::Duration;

use crate::errors::{Error, ErrorKind, Result};

pub trait NoteStore {
    /// Create a local notebook called `name` unless one already exists.
    fn create_notebook(&mut self, name: &str) -> Result<()>;

    /// Create a note from the JSON draft stored at `payload`, returning its id.
    fn create_note(&mut self, payload: &Path) -> Result<String>;

    fn find_note(&mut self, id: &str) -> Result<bool>;

    /// Delete the note, returning the notebook it lived in if it was found.
    fn delete_note(&mut self, id: &str) -> Result<Option<String>>;
}

impl<S: NoteStore + ?Sized> NoteStore for &mut S {
    fn create_notebook(&mut self, name: &str) -> Result<()> {
        (**self).create_notebook(name)
    }

    fn create_note(&mut self, payload: &Path) -> Result<String> {
        (**self).create_note(payload)
    }

    fn find_note(&mut self, id: &str) -> Result<bool> {
        (**self).find_note(id)
    }

    fn delete_note(&mut self, id: &str) -> Result<Option<String>> {
        (**self).delete_note(id)
    }
}

pub(crate) fn remote_error(desc: String) -> Error {
    Error::new(ErrorKind::RemoteCall, desc)
}

static NOTE_LOOKUP_JS: &str = r#"
function lookup(app, id) {
    var books = app.notebooks();
    for (var i = 0; i < books.length; i++) {
        var note = books[i].notes.byId(id);
        try {
            note.title();
            return note;
        } catch (e) {}
    }
    return null;
}
"#;

static CREATE_NOTEBOOK_JS: &str = r#"
function run(argv) {
    var app = Application("Evernote");
    var name = argv[0];
    var exists = app.notebooks().some(function (nb) { return nb.name() === name; });
    if (!exists) {
        app.createNotebook(name, { withType: "local only" });
    }
    return "";
}
"#;

static CREATE_NOTE_JS: &str = r#"
ObjC.import("Foundation");
function run(argv) {
    var app = Application("Evernote");
    var raw = $.NSString.stringWithContentsOfFileEncodingError(argv[0], $.NSUTF8StringEncoding, null).js;
    var params = JSON.parse(raw);
    params.attachments = params.attachments.map(function (p) { return Path(p); });
    return app.createNote(params).id();
}
"#;

static FIND_NOTE_JS: &str = r#"
function run(argv) {
    return lookup(Application("Evernote"), argv[0]) ? "true" : "false";
}
"#;

static DELETE_NOTE_JS: &str = r#"
function run(argv) {
    var app = Application("Evernote");
    var note = lookup(app, argv[0]);
    if (!note) {
        return "";
    }
    var name = note.notebook().name();
    app.delete(note);
    return name;
}
"#;

/// Drives the desktop note application through JavaScript for Automation.
pub struct ScriptBridge {
    program: String,
}

impl ScriptBridge {
    pub fn new(program: &str) -> ScriptBridge {
        ScriptBridge { program: program.to_string() }
    }

    fn run_script(&self, script: &str, arg: &str) -> Result<String> {
        let output = Command::new(&self.program)
            .args(["-l", "JavaScript", "-e", script, arg])
            .output()
            .map_err(|e| remote_error(format!("failed to start '{}': {}", self.program, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(remote_error(format!("'{}' exited with {}", self.program, output.status))
                           .with_detail(stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl NoteStore for ScriptBridge {
    fn create_notebook(&mut self, name: &str) -> Result<()> {
        self.run_script(CREATE_NOTEBOOK_JS, name)?;
        Ok(())
    }

    fn create_note(&mut self, payload: &Path) -> Result<String> {
        let id = self.run_script(CREATE_NOTE_JS, &payload.display().to_string())?;
        if id.is_empty() {
            return Err(remote_error("note application returned no note id".to_string()));
        }
        Ok(id)
    }

    fn find_note(&mut self, id: &str) -> Result<bool> {
        let script = format!("{}{}", NOTE_LOOKUP_JS, FIND_NOTE_JS);
        Ok(self.run_script(&script, id)? == "true")
    }

    fn delete_note(&mut self, id: &str) -> Result<Option<String>> {
        let script = format!("{}{}", NOTE_LOOKUP_JS, DELETE_NOTE_JS);
        let notebook = self.run_script(&script, id)?;
        Ok(if notebook.is_empty() { None } else { Some(notebook) })
    }
}

/// Retries bridge failures a bounded number of times.
pub struct Retrying<S> {
    inner: S,
    retries: u32,
    backoff: Duration,
}

impl<S: NoteStore> Retrying<S> {
    pub fn new(inner: S, retries: u32, backoff: Duration) -> Retrying<S> {
        Retrying {
            inner: inner,
            retries: retries,
            backoff: backoff,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn attempt<T, F>(&mut self, what: &str, mut call: F) -> Result<T>
        where F: FnMut(&mut S) -> Result<T>
    {
        let mut tries = 0;
        loop {
            match call(&mut self.inner) {
                Err(e) if e.is_retryable() && tries < self.retries => {
                    tries += 1;
                    log::warn!("{} failed ({}), retry {}/{}", what, e, tries, self.retries);
                    sleep(self.backoff * tries);
                }
                other => return other,
            }
        }
    }
}

impl<S: NoteStore> NoteStore for Retrying<S> {
    fn create_notebook(&mut self, name: &str) -> Result<()> {
        self.attempt("create notebook", |s| s.create_notebook(name))
    }

    fn create_note(&mut self, payload: &Path) -> Result<String> {
        self.attempt("create note", |s| s.create_note(payload))
    }

    fn find_note(&mut self, id: &str) -> Result<bool> {
        self.attempt("find note", |s| s.find_note(id))
    }

    fn delete_note(&mut self, id: &str) -> Result<Option<String>> {
        self.attempt("delete note", |s| s.delete_note(id))
    }
}

/// Answers lookups from the wrapped store but never changes anything.
pub struct DryRun<S> {
    inner: S,
}

impl<S: NoteStore> DryRun<S> {
    pub fn new(inner: S) -> DryRun<S> {
        DryRun { inner: inner }
    }
}

impl<S: NoteStore> NoteStore for DryRun<S> {
    fn create_notebook(&mut self, name: &str) -> Result<()> {
        log::info!("dry run: would create notebook '{}'", name);
        Ok(())
    }

    fn create_note(&mut self, _payload: &Path) -> Result<String> {
        Err(remote_error("dry run: notes are never created".to_string()))
    }

    fn find_note(&mut self, id: &str) -> Result<bool> {
        self.inner.find_note(id)
    }

    fn delete_note(&mut self, id: &str) -> Result<Option<String>> {
        log::info!("dry run: would delete note {}", id);
        Ok(None)
    }
}
