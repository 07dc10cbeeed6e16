use std::fmt;
use std::io;
use std::time::Duration;

use crate::types::Location;

/// A traversal limit together with its configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Maximum directory depth, relative to the search root.
    Depth(usize),
    /// Maximum number of emitted items.
    Items(usize),
    /// Maximum wall-clock duration of a search.
    Duration(Duration),
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Depth(d) => write!(f, "directory depth exceeded maximum tolerated depth of {}", d),
            Limit::Items(n) => write!(f, "item count exceeded maximum tolerated value of {}", n),
            Limit::Duration(t) => write!(f, "exceeded maximum tolerated duration of {:?}", t),
        }
    }
}

/// The error type for storage, search and config resolution.
///
/// Nothing in this crate recovers locally: every variant is handed to the
/// immediate caller. Existence checks never produce an error, they report
/// [`crate::types::Existence::Unknown`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A read, write, list or stat call failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The path the failing call was made on.
        path: String,
        #[source]
        source: io::Error,
    },
    /// A search breached one of its runtime limits.
    #[error("search algorithm terminated - {0}")]
    LimitExceeded(Limit),
    /// The pending work queue outgrew its safety bound.
    #[error("queue {size} exceeds maximum size permitted {max}")]
    QueueOverflow { size: usize, max: usize },
    /// Bytes were declared or inferred as a format outside the supported set.
    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),
    /// Bytes did not deserialize into the requested structure.
    #[error("could not parse {format} contents: {message}")]
    Parse { format: String, message: String },
    /// A proxy chain revisited a `(location, path)` pair.
    #[error("circular reference encountered whilst importing config {}", format_chain(.chain))]
    CircularReference { chain: Vec<(Location, String)> },
    /// A proxy chain grew past the configured ceiling.
    #[error("proxy chain exceeds maximum length of {max}: {}", format_chain(.chain))]
    ChainTooLong { max: usize, chain: Vec<(Location, String)> },
    /// No backend is implemented or registered for the location.
    #[error("files manager not implemented for {0}")]
    UnsupportedBackend(Location),
    /// A payload was neither given nor backed by a default document.
    #[error("no payload given and no default location set for {0}")]
    MissingSource(String),
}

impl Error {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub fn parse(format: impl fmt::Display, err: impl fmt::Display) -> Self {
        Error::Parse { format: format.to_string(), message: err.to_string() }
    }

    /// The breached limit, if this is a limit error.
    pub fn limit(&self) -> Option<Limit> {
        match self {
            Error::LimitExceeded(limit) => Some(*limit),
            _ => None,
        }
    }
}

/// Formats a resolution chain as `loc/path -> loc/path -> ...`.
pub fn format_chain(chain: &[(Location, String)]) -> String {
    chain
        .iter()
        .map(|(loc, path)| format!("{}/{}", loc, path))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A type alias for `Result<T, Error>`, used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// An extension trait for attaching the offending path to `io::Result`s.
pub trait IoResultExt<T> {
    /// Converts an `io::Result<T>` into a [`Result<T>`] tagged with `path`.
    fn with_path(self, path: &str) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: &str) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
