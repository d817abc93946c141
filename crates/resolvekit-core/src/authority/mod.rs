//! Install-location authorities.
//!
//! An authority knows, for a specifier and the directory issuing it, where
//! the package physically lives on disk. The pipeline only depends on the
//! [`Authority`] trait; [`ManifestAuthority`] is a small JSON-backed
//! implementation used by the CLI and tests.

mod manifest;

pub use manifest::{ManifestAuthority, ManifestPackage, PNPAPI_SPECIFIER};

use thiserror::Error;

/// Options for [`Authority::resolve_to_unqualified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnqualifiedOptions {
    /// Treat runtime builtins (`fs`, `node:path`, ...) as pass-through
    /// before consulting the dependency map.
    pub consider_builtins: bool,
}

/// Domain error from an authority.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("{package} tried to access {specifier}, but it isn't declared in its dependencies (via {issuer})")]
    UndeclaredDependency {
        specifier: String,
        package: String,
        issuer: String,
    },

    #[error("{package} tried to access {specifier} (a peer dependency), but it isn't provided by its ancestors (via {issuer})")]
    MissingPeerDependency {
        specifier: String,
        package: String,
        issuer: String,
    },

    #[error("{0}")]
    Other(String),
}

impl AuthorityError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UndeclaredDependency { .. } => "UNDECLARED_DEPENDENCY",
            Self::MissingPeerDependency { .. } => "MISSING_PEER_DEPENDENCY",
            Self::Other(_) => "AUTHORITY_ERROR",
        }
    }
}

/// Translates specifiers into unqualified install locations.
///
/// Contract:
/// - `issuer` always ends with `/`.
/// - Returning `specifier` unchanged means "not my concern, pass through".
/// - Returning an absolute path means "continue resolution from here".
/// - An error means the specifier is this authority's concern but cannot be placed.
pub trait Authority: Send + Sync {
    /// Name used in resolution log messages.
    fn name(&self) -> &str {
        "pnp"
    }

    fn resolve_to_unqualified(
        &self,
        specifier: &str,
        issuer: &str,
        options: UnqualifiedOptions,
    ) -> Result<String, AuthorityError>;
}
