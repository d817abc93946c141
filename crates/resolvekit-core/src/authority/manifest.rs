//! JSON-backed install-location authority.
//!
//! The manifest lists packages with their on-disk location and the
//! locations of the dependencies each one declares:
//!
//! ```json
//! {
//!   "builtins": ["fs", "path"],
//!   "packages": [
//!     { "name": "app", "location": "/proj/",
//!       "dependencies": { "lodash": "/proj/.store/lodash-4.0/", "react": null } }
//!   ]
//! }
//! ```
//!
//! A `null` dependency location marks a peer dependency nobody provides.

use super::{Authority, AuthorityError, UnqualifiedOptions};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Specifier that always maps to the manifest itself.
pub const PNPAPI_SPECIFIER: &str = "pnpapi";

/// One package entry in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPackage {
    pub name: String,
    /// Package root directory.
    pub location: String,
    /// Declared dependency name -> install location (`None` for a missing peer).
    #[serde(default)]
    pub dependencies: BTreeMap<String, Option<String>>,
}

impl ManifestPackage {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Declare a dependency installed at `location`.
    #[must_use]
    pub fn dependency(mut self, name: impl Into<String>, location: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), Some(location.into()));
        self
    }

    /// Declare a peer dependency with no provider.
    #[must_use]
    pub fn missing_peer(mut self, name: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), None);
        self
    }

    fn owns(&self, issuer: &str) -> bool {
        let location = self.location.trim_end_matches('/');
        issuer
            .strip_prefix(location)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    builtins: Vec<String>,
    #[serde(default)]
    packages: Vec<ManifestPackage>,
}

/// Authority answering from an in-memory package map.
#[derive(Debug, Clone)]
pub struct ManifestAuthority {
    path: PathBuf,
    packages: Vec<ManifestPackage>,
    builtins: HashSet<String>,
}

impl ManifestAuthority {
    /// Create an authority whose manifest lives at `path`.
    pub fn new(path: impl Into<PathBuf>, packages: Vec<ManifestPackage>) -> Self {
        Self {
            path: path.into(),
            packages,
            builtins: HashSet::new(),
        }
    }

    /// Add runtime builtin module names.
    #[must_use]
    pub fn with_builtins<I, S>(mut self, builtins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builtins.extend(builtins.into_iter().map(Into::into));
        self
    }

    /// Load a manifest from disk.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ManifestFile =
            serde_json::from_str(&content).map_err(|source| Error::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            path = %path.display(),
            packages = file.packages.len(),
            "loaded install manifest"
        );
        Ok(Self::new(path, file.packages).with_builtins(file.builtins))
    }

    /// Location of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The package whose location is the longest prefix of `issuer`.
    fn owner(&self, issuer: &str) -> Option<&ManifestPackage> {
        self.packages
            .iter()
            .filter(|pkg| pkg.owns(issuer))
            .max_by_key(|pkg| pkg.location.trim_end_matches('/').len())
    }

    fn is_builtin(&self, specifier: &str) -> bool {
        let name = specifier.strip_prefix("node:").unwrap_or(specifier);
        let name = name.split('/').next().unwrap_or(name);
        self.builtins.contains(name)
    }
}

impl Authority for ManifestAuthority {
    fn resolve_to_unqualified(
        &self,
        specifier: &str,
        issuer: &str,
        options: UnqualifiedOptions,
    ) -> Result<String, AuthorityError> {
        if specifier == PNPAPI_SPECIFIER {
            return Ok(self.path.to_string_lossy().into_owned());
        }

        if options.consider_builtins && self.is_builtin(specifier) {
            return Ok(specifier.to_string());
        }

        if is_path_specifier(specifier) {
            return Ok(specifier.to_string());
        }

        // Issuers outside the dependency tree are not ours to police.
        let Some(owner) = self.owner(issuer) else {
            return Ok(specifier.to_string());
        };

        let (name, subpath) = split_package_name(specifier);
        match owner.dependencies.get(name) {
            Some(Some(location)) => Ok(match subpath {
                Some(subpath) => format!("{}/{subpath}", location.trim_end_matches('/')),
                None => location.clone(),
            }),
            Some(None) => Err(AuthorityError::MissingPeerDependency {
                specifier: name.to_string(),
                package: owner.name.clone(),
                issuer: issuer.to_string(),
            }),
            None if self.is_builtin(specifier) => Ok(specifier.to_string()),
            None => Err(AuthorityError::UndeclaredDependency {
                specifier: name.to_string(),
                package: owner.name.clone(),
                issuer: issuer.to_string(),
            }),
        }
    }
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
        // Rooted but not absolute on Windows.
        || specifier.starts_with('/')
}

/// Split `@scope/name/sub/path` into (`@scope/name`, `Some("sub/path")`).
fn split_package_name(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if specifier.starts_with('@') {
        specifier.match_indices('/').nth(1).map(|(i, _)| i)
    } else {
        specifier.find('/')
    };

    match name_end {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STRICT: UnqualifiedOptions = UnqualifiedOptions {
        consider_builtins: false,
    };

    fn authority() -> ManifestAuthority {
        ManifestAuthority::new(
            "/proj/.pnp.json",
            vec![
                ManifestPackage::new("app", "/proj/")
                    .dependency("lodash", "/proj/.store/lodash-4.0/")
                    .dependency("@babel/core", "/proj/.store/babel-core-7.0")
                    .dependency("fs", "/proj/.store/fs-shim/")
                    .missing_peer("react"),
                ManifestPackage::new("lodash", "/proj/.store/lodash-4.0/"),
            ],
        )
        .with_builtins(["fs", "path"])
    }

    #[test]
    fn test_declared_dependency() {
        let resolved = authority()
            .resolve_to_unqualified("lodash", "/proj/src/", STRICT)
            .unwrap();
        assert_eq!(resolved, "/proj/.store/lodash-4.0/");
    }

    #[test]
    fn test_subpath_and_scoped_names() {
        let auth = authority();
        assert_eq!(
            auth.resolve_to_unqualified("lodash/fp", "/proj/src/", STRICT)
                .unwrap(),
            "/proj/.store/lodash-4.0/fp"
        );
        assert_eq!(
            auth.resolve_to_unqualified("@babel/core", "/proj/", STRICT)
                .unwrap(),
            "/proj/.store/babel-core-7.0"
        );
        assert_eq!(
            auth.resolve_to_unqualified("@babel/core/lib/index.js", "/proj/", STRICT)
                .unwrap(),
            "/proj/.store/babel-core-7.0/lib/index.js"
        );
    }

    #[test]
    fn test_undeclared_dependency_uses_innermost_owner() {
        // /proj/.store/lodash-4.0/ is owned by `lodash`, which declares nothing.
        let err = authority()
            .resolve_to_unqualified("react-dom", "/proj/.store/lodash-4.0/", STRICT)
            .unwrap_err();
        assert_eq!(
            err,
            AuthorityError::UndeclaredDependency {
                specifier: "react-dom".to_string(),
                package: "lodash".to_string(),
                issuer: "/proj/.store/lodash-4.0/".to_string(),
            }
        );
        assert_eq!(err.code(), "UNDECLARED_DEPENDENCY");
    }

    #[test]
    fn test_missing_peer() {
        let err = authority()
            .resolve_to_unqualified("react", "/proj/src/", STRICT)
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_PEER_DEPENDENCY");
    }

    #[test]
    fn test_builtins() {
        let auth = authority();
        // Undeclared builtins pass through even when not considered up front.
        assert_eq!(
            auth.resolve_to_unqualified("path", "/proj/src/", STRICT)
                .unwrap(),
            "path"
        );
        // A declared shim wins unless builtins are considered first.
        assert_eq!(
            auth.resolve_to_unqualified("fs", "/proj/src/", STRICT).unwrap(),
            "/proj/.store/fs-shim/"
        );
        let lenient = UnqualifiedOptions {
            consider_builtins: true,
        };
        assert_eq!(
            auth.resolve_to_unqualified("fs", "/proj/src/", lenient)
                .unwrap(),
            "fs"
        );
        assert_eq!(
            auth.resolve_to_unqualified("node:fs/promises", "/proj/src/", lenient)
                .unwrap(),
            "node:fs/promises"
        );
    }

    #[test]
    fn test_pass_through() {
        let auth = authority();
        for spec in ["./util", "../lib", ".", "/abs/file.js"] {
            assert_eq!(
                auth.resolve_to_unqualified(spec, "/proj/src/", STRICT)
                    .unwrap(),
                spec
            );
        }
        // Issuer outside every package
        assert_eq!(
            auth.resolve_to_unqualified("lodash", "/elsewhere/", STRICT)
                .unwrap(),
            "lodash"
        );
        // Sibling directory sharing a name prefix is not owned
        assert_eq!(
            auth.resolve_to_unqualified("lodash", "/project/", STRICT)
                .unwrap(),
            "lodash"
        );
    }

    #[test]
    fn test_pnpapi_maps_to_manifest() {
        assert_eq!(
            authority()
                .resolve_to_unqualified(PNPAPI_SPECIFIER, "/proj/src/", STRICT)
                .unwrap(),
            "/proj/.pnp.json"
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("install.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "builtins": ["fs"],
                "packages": [
                    {"name": "app", "location": "/proj/", "dependencies": {"a": "/store/a/", "p": null}}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let auth = ManifestAuthority::from_file(&path).unwrap();
        assert_eq!(auth.path(), path);
        assert_eq!(
            auth.resolve_to_unqualified("a", "/proj/", STRICT).unwrap(),
            "/store/a/"
        );
        assert!(auth.resolve_to_unqualified("p", "/proj/", STRICT).is_err());
        assert_eq!(
            auth.resolve_to_unqualified("fs", "/proj/", STRICT).unwrap(),
            "fs"
        );
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            ManifestAuthority::from_file(&missing),
            Err(Error::ManifestRead { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[1, 2").unwrap();
        assert!(matches!(
            ManifestAuthority::from_file(&bad),
            Err(Error::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_split_package_name() {
        assert_eq!(split_package_name("lodash"), ("lodash", None));
        assert_eq!(split_package_name("lodash/fp"), ("lodash", Some("fp")));
        assert_eq!(split_package_name("@a/b"), ("@a/b", None));
        assert_eq!(split_package_name("@a/b/c/d"), ("@a/b", Some("c/d")));
    }
}
