//! Resolution requests.
//!
//! A [`Request`] reads "resolve `request` as seen from directory `path`".
//! Steps never mutate the request they receive; they derive a new one with
//! [`Request::with_overrides`] so sibling steps on the same hook still see
//! the request they were given.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A request flowing through the hook pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Absolute directory the specifier is resolved relative to.
    pub path: PathBuf,
    /// Specifier to resolve. `None` or empty means "resolve `path` itself".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    /// Skip symlink realization downstream.
    #[serde(default)]
    pub ignore_symlinks: bool,
    /// Fields carried opaquely from step to step.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How a derived request treats one field of its parent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Override<T> {
    /// Keep the parent's value.
    #[default]
    Inherit,
    /// Reset to the empty value (`None` / `false`).
    Clear,
    /// Replace with a new value.
    Set(T),
}

impl<T> Override<T> {
    fn apply(self, current: T, empty: T) -> T {
        match self {
            Self::Inherit => current,
            Self::Clear => empty,
            Self::Set(value) => value,
        }
    }
}

/// Field overrides for [`Request::with_overrides`].
///
/// Unmentioned fields, including every entry in `extra`, are inherited.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub path: Override<PathBuf>,
    pub request: Override<String>,
    pub ignore_symlinks: Override<bool>,
    /// Extra fields to insert or replace.
    pub extra: Map<String, Value>,
}

impl Request {
    /// Create a request for `specifier` issued from `path`.
    pub fn new(path: impl Into<PathBuf>, specifier: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            request: Some(specifier.into()),
            ignore_symlinks: false,
            extra: Map::new(),
        }
    }

    /// Create a path-only request.
    pub fn path_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            request: None,
            ignore_symlinks: false,
            extra: Map::new(),
        }
    }

    /// Attach an opaque field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The specifier, if present and non-empty.
    pub fn specifier(&self) -> Option<&str> {
        self.request.as_deref().filter(|s| !s.is_empty())
    }

    /// Structural copy of this request with `overrides` applied.
    #[must_use]
    pub fn with_overrides(&self, overrides: RequestOverrides) -> Self {
        let mut extra = self.extra.clone();
        extra.extend(overrides.extra);

        Self {
            path: overrides.path.apply(self.path.clone(), PathBuf::new()),
            request: match overrides.request {
                Override::Inherit => self.request.clone(),
                Override::Clear => None,
                Override::Set(request) => Some(request),
            },
            ignore_symlinks: overrides
                .ignore_symlinks
                .apply(self.ignore_symlinks, false),
            extra,
        }
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.specifier() {
            Some(spec) => write!(f, "({}) {spec}", self.path.display()),
            None => write!(f, "({})", self.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_specifier_filters_empty() {
        assert_eq!(Request::new("/proj", "lodash").specifier(), Some("lodash"));
        assert_eq!(Request::new("/proj", "").specifier(), None);
        assert_eq!(Request::path_only("/proj").specifier(), None);
    }

    #[test]
    fn test_with_overrides_inherits_by_default() {
        let req = Request::new("/proj/src", "lodash").with_field("issuer", "/proj/src/a.js");
        let derived = req.with_overrides(RequestOverrides::default());
        assert_eq!(derived, req);
    }

    #[test]
    fn test_with_overrides_set_and_clear() {
        let req = Request::new("/proj/src", "lodash").with_field("kind", "import");
        let derived = req.with_overrides(RequestOverrides {
            path: Override::Set(PathBuf::from("/store/lodash")),
            request: Override::Clear,
            ignore_symlinks: Override::Set(true),
            ..Default::default()
        });

        assert_eq!(derived.path, PathBuf::from("/store/lodash"));
        assert_eq!(derived.request, None);
        assert!(derived.ignore_symlinks);
        assert_eq!(derived.extra.get("kind"), Some(&json!("import")));

        // Parent untouched
        assert_eq!(req.request.as_deref(), Some("lodash"));
        assert!(!req.ignore_symlinks);
    }

    #[test]
    fn test_serde_flattens_extra_fields() {
        let req = Request::new("/proj", "lodash").with_field("fullySpecified", false);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "path": "/proj",
                "request": "lodash",
                "ignoreSymlinks": false,
                "fullySpecified": false
            })
        );

        let back: Request = serde_json::from_value(value).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_display() {
        assert_eq!(Request::new("/proj", "lodash").to_string(), "(/proj) lodash");
        assert_eq!(Request::path_only("/proj").to_string(), "(/proj)");
    }
}
