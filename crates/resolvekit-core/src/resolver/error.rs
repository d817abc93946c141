use crate::authority::AuthorityError;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised while a request flows through the hook pipeline.
///
/// "Not found" is never an error: it is `Ok(None)` from `do_resolve`.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The install-location authority refused to place a specifier.
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error("Hook `{name}` doesn't exist")]
    UnknownHook { name: String },

    #[error("Recursion in resolving: {frame}")]
    Recursion { frame: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authority(err) => err.code(),
            Self::UnknownHook { .. } => "UNKNOWN_HOOK",
            Self::Recursion { .. } => "RECURSION",
            Self::Io { .. } => "IO_ERROR",
        }
    }
}
