use std::fmt;
use std::convert::From;
use std::error::Error as StdError;
use std::io::Error as IoError;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug)]
pub enum ErrorKind {
    /// a sync record exists but can't be parsed
    RecordCorrupt,
    /// the note application bridge failed
    RemoteCall,
    Filesystem(IoError),
    Config,
    Generic,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub desc: String,
    pub detail: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, desc: String) -> Error {
        Error {
            kind: kind,
            desc: desc,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: String) -> Error {
        self.detail = Some(detail);
        self
    }

    /// only bridge failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::RemoteCall)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.detail {
            Some(ref d) => write!(f, "{} ({})", &self.desc, d),
            None => write!(f, "{}", &self.desc),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.kind {
            ErrorKind::Filesystem(ref e) => Some(e),
            _ => None,
        }
    }
}

#[macro_export]
macro_rules! specific_fail {
    ($short:expr) => {{
        use $crate::errors::{Error, ErrorKind};
        Err(::std::convert::From::from(
            Error {
                kind: ErrorKind::Generic,
                desc: $short,
                detail: None
            }
        ))
    }};
    ($kind:expr, $short:expr) => {{
        use $crate::errors::Error;
        Err(::std::convert::From::from(
            Error {
                kind: $kind,
                desc: $short,
                detail: None
            }
        ))
    }}
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error {
            desc: err.to_string(),
            kind: ErrorKind::Filesystem(err),
            detail: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: format!("JSON error: {}", err),
            detail: None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error {
            kind: ErrorKind::Config,
            desc: format!("YAML error: {}", err),
            detail: None,
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Error {
        Error {
            kind: ErrorKind::Config,
            desc: format!("invalid pattern: {}", err),
            detail: None,
        }
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: err,
            detail: None,
        }
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: err.to_string(),
            detail: None,
        }
    }
}
