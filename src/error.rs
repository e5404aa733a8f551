//! Error handling for surface generation

use std::fmt;
use std::path::PathBuf;

/// Result type for cvsurface operations
pub type Result<T> = std::result::Result<T, Error>;

/// The native entry an alias was derived from, as reported in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeOrigin {
    /// An opaque structure and the header/subsystem that declared it.
    Type { name: String, origin: String },
    /// An enumeration constant and its group.
    Constant { name: String, group: String },
}

impl NativeOrigin {
    pub fn native_name(&self) -> &str {
        match self {
            NativeOrigin::Type { name, .. } | NativeOrigin::Constant { name, .. } => name,
        }
    }
}

impl fmt::Display for NativeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeOrigin::Type { name, origin } if origin.is_empty() => write!(f, "type `{name}`"),
            NativeOrigin::Type { name, origin } => write!(f, "type `{name}` ({origin})"),
            NativeOrigin::Constant { name, group } => {
                write!(f, "constant `{name}` in group `{group}`")
            }
        }
    }
}

/// Errors that can occur while loading, resolving or emitting a surface.
///
/// Every variant is fatal to the run that produced it: no partial surface is
/// ever handed to a consumer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The native description is structurally invalid.
    #[error("malformed source{}: {message}", line_suffix(.line))]
    MalformedSource { line: Option<usize>, message: String },

    /// Two distinct native entries resolve to the same target identifier.
    #[error("alias collision on `{target}`: {first} and {second} both map to it")]
    AliasCollision {
        target: String,
        first: NativeOrigin,
        second: NativeOrigin,
    },

    /// Emission was requested on an empty surface in strict mode.
    #[error("refusing to emit an empty binding surface")]
    EmptySurface,

    /// A computed target identifier cannot be used by the output.
    #[error("invalid target identifier `{target}` for {native}: {reason}")]
    InvalidTarget {
        target: String,
        native: NativeOrigin,
        reason: String,
    },

    /// Configuration file or option error.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedSource { line: None, message: message.into() }
    }

    pub(crate) fn malformed_at(line: usize, message: impl Into<String>) -> Self {
        Error::MalformedSource { line: Some(line), message: message.into() }
    }

    /// Native identifiers named by this error, in the order they are reported.
    pub fn native_names(&self) -> Vec<&str> {
        match self {
            Error::AliasCollision { first, second, .. } => {
                vec![first.native_name(), second.native_name()]
            }
            Error::InvalidTarget { native, .. } => vec![native.native_name()],
            _ => Vec::new(),
        }
    }
}
