//! Per-call resolution context.
//!
//! One [`ResolveContext`] is created by the top-level caller and borrowed
//! mutably through every nested `do_resolve`. Steps only ever add to it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Append-only set of paths, shared by every step in one resolution tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    paths: BTreeSet<PathBuf>,
}

impl DependencySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path. Returns `true` if it was not already present.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate paths in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

/// Side channel for a single top-level resolution.
#[derive(Debug, Default)]
pub struct ResolveContext {
    /// Files consulted while producing the answer, if the caller tracks them.
    pub file_dependencies: Option<DependencySet>,
    /// Paths probed and found absent, if the caller tracks them.
    pub missing_dependencies: Option<DependencySet>,
    /// Indented `do_resolve` messages, if the caller wants a log.
    log: Option<Vec<String>>,
    /// Frames currently being resolved, outermost first.
    stack: Vec<String>,
}

impl ResolveContext {
    /// Context with no tracking and no log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable file and missing-path dependency tracking.
    #[must_use]
    pub fn with_dependency_tracking(mut self) -> Self {
        self.file_dependencies = Some(DependencySet::new());
        self.missing_dependencies = Some(DependencySet::new());
        self
    }

    /// Enable the resolution log.
    #[must_use]
    pub fn with_log(mut self) -> Self {
        self.log = Some(Vec::new());
        self
    }

    /// Recorded log lines, if logging is enabled.
    pub fn log(&self) -> Option<&[String]> {
        self.log.as_deref()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Record a file dependency if tracking is enabled.
    pub fn add_file_dependency(&mut self, path: impl Into<PathBuf>) {
        if let Some(deps) = self.file_dependencies.as_mut() {
            deps.add(path);
        }
    }

    /// Record a missing path if tracking is enabled.
    pub fn add_missing_dependency(&mut self, path: impl Into<PathBuf>) {
        if let Some(deps) = self.missing_dependencies.as_mut() {
            deps.add(path);
        }
    }

    pub(crate) fn push_log(&mut self, line: &str) {
        let indent = self.stack.len().saturating_sub(1);
        if let Some(log) = self.log.as_mut() {
            log.push(format!("{}{line}", "  ".repeat(indent)));
        }
    }

    /// Push a frame. Returns `false` if the frame is already being resolved.
    pub(crate) fn enter(&mut self, frame: String) -> bool {
        if self.stack.contains(&frame) {
            return false;
        }
        self.stack.push(frame);
        true
    }

    pub(crate) fn leave(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_set_is_append_only() {
        let mut deps = DependencySet::new();
        assert!(deps.add("/proj/.pnp.cjs"));
        assert!(!deps.add("/proj/.pnp.cjs"));
        assert!(deps.add("/proj/a.js"));

        assert_eq!(deps.len(), 2);
        assert!(deps.contains("/proj/a.js"));
        let paths: Vec<_> = deps.iter().collect();
        assert_eq!(paths, [Path::new("/proj/.pnp.cjs"), Path::new("/proj/a.js")]);
    }

    #[test]
    fn test_tracking_is_optional() {
        let mut ctx = ResolveContext::new();
        ctx.add_file_dependency("/proj/a.js");
        ctx.add_missing_dependency("/proj/b.js");
        assert!(ctx.file_dependencies.is_none());
        assert!(ctx.missing_dependencies.is_none());

        let mut ctx = ResolveContext::new().with_dependency_tracking();
        ctx.add_file_dependency("/proj/a.js");
        ctx.add_missing_dependency("/proj/b.js");
        assert!(ctx.file_dependencies.unwrap().contains("/proj/a.js"));
        assert!(ctx.missing_dependencies.unwrap().contains("/proj/b.js"));
    }

    #[test]
    fn test_stack_rejects_repeated_frame() {
        let mut ctx = ResolveContext::new();
        assert!(ctx.enter("resolve: (/proj) a".to_string()));
        assert!(ctx.enter("raw-module: (/proj) a".to_string()));
        assert!(!ctx.enter("resolve: (/proj) a".to_string()));
        assert_eq!(ctx.depth(), 2);

        ctx.leave();
        ctx.leave();
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_log_is_indented_by_depth() {
        let mut ctx = ResolveContext::new().with_log();
        ctx.enter("a".to_string());
        ctx.push_log("outer");
        ctx.enter("b".to_string());
        ctx.push_log("inner");

        assert_eq!(ctx.log().unwrap(), ["outer", "  inner"]);
    }
}
