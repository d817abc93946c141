//! Built-in steps.
//!
//! These are the plain collaborators the default pipeline is assembled
//! from: forwarding, joining relative specifiers, checking the file system,
//! and producing the final result.

use super::context::ResolveContext;
use super::error::ResolveError;
use super::hook::{HookId, HookRef, Resolver};
use super::request::{Override, Request, RequestOverrides};
use super::step::{Plugin, Step, StepOutcome};
use futures::future::{BoxFuture, FutureExt};
use std::path::Path;
use tracing::trace;

/// Taps `source` with `step`, after ensuring `target` exists.
fn tap_between<S>(
    resolver: &mut Resolver,
    source: HookRef,
    target: HookRef,
    make: impl FnOnce(HookId) -> S,
) -> Result<(), ResolveError>
where
    S: Step + 'static,
{
    let target = resolver.ensure_hook(target);
    let source = resolver.get_hook(source)?;
    resolver.tap(source, make(target))
}

// ============================================================================
// NextPlugin
// ============================================================================

/// Forwards every request from `source` to `target` unchanged.
///
/// A not-found from `target` lets the remaining steps on `source` run.
pub struct NextPlugin {
    source: HookRef,
    target: HookRef,
}

impl NextPlugin {
    pub fn new(source: impl Into<HookRef>, target: impl Into<HookRef>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Plugin for NextPlugin {
    fn apply(self, resolver: &mut Resolver) -> Result<(), ResolveError> {
        tap_between(resolver, self.source, self.target, |target| NextStep {
            target,
        })
    }
}

struct NextStep {
    target: HookId,
}

impl Step for NextStep {
    fn name(&self) -> &str {
        "NextPlugin"
    }

    fn attempt<'a>(
        &'a self,
        resolver: &'a Resolver,
        request: &'a Request,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, StepOutcome> {
        async move {
            let result = resolver
                .do_resolve(self.target, request.clone(), None, ctx)
                .await;
            StepOutcome::from_forward(result)
        }
        .boxed()
    }
}

// ============================================================================
// JoinRequestPlugin
// ============================================================================

/// Joins relative and absolute specifiers onto the request path.
///
/// Path-only requests are forwarded as they are; bare specifiers decline.
pub struct JoinRequestPlugin {
    source: HookRef,
    target: HookRef,
}

impl JoinRequestPlugin {
    pub fn new(source: impl Into<HookRef>, target: impl Into<HookRef>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Plugin for JoinRequestPlugin {
    fn apply(self, resolver: &mut Resolver) -> Result<(), ResolveError> {
        tap_between(resolver, self.source, self.target, |target| JoinStep {
            target,
        })
    }
}

struct JoinStep {
    target: HookId,
}

impl Step for JoinStep {
    fn name(&self) -> &str {
        "JoinRequestPlugin"
    }

    fn attempt<'a>(
        &'a self,
        resolver: &'a Resolver,
        request: &'a Request,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, StepOutcome> {
        async move {
            let derived = match request.specifier() {
                None => request.clone(),
                Some(spec) if is_relative(spec) || Path::new(spec).is_absolute() => request
                    .with_overrides(RequestOverrides {
                        path: Override::Set(request.path.join(spec)),
                        request: Override::Clear,
                        ..Default::default()
                    }),
                Some(_) => return StepOutcome::Decline,
            };

            let message = format!("using path: {}", derived.path.display());
            let result = resolver
                .do_resolve(self.target, derived, Some(message.as_str()), ctx)
                .await;
            StepOutcome::from_forward(result)
        }
        .boxed()
    }
}

fn is_relative(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

// ============================================================================
// ExistingPathPlugin
// ============================================================================

/// Forwards path-only requests whose path exists on disk.
///
/// Found paths are recorded as file dependencies and, unless the request
/// says `ignore_symlinks`, realized to their canonical location. Missing
/// paths are recorded as missing dependencies and decline.
pub struct ExistingPathPlugin {
    source: HookRef,
    target: HookRef,
}

impl ExistingPathPlugin {
    pub fn new(source: impl Into<HookRef>, target: impl Into<HookRef>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Plugin for ExistingPathPlugin {
    fn apply(self, resolver: &mut Resolver) -> Result<(), ResolveError> {
        tap_between(resolver, self.source, self.target, |target| ExistingPathStep {
            target,
        })
    }
}

struct ExistingPathStep {
    target: HookId,
}

impl Step for ExistingPathStep {
    fn name(&self) -> &str {
        "ExistingPathPlugin"
    }

    fn attempt<'a>(
        &'a self,
        resolver: &'a Resolver,
        request: &'a Request,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, StepOutcome> {
        async move {
            if request.specifier().is_some() {
                return StepOutcome::Decline;
            }

            match tokio::fs::metadata(&request.path).await {
                Ok(_) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    trace!(path = %request.path.display(), "missing");
                    ctx.add_missing_dependency(&request.path);
                    return StepOutcome::Decline;
                }
                Err(source) => {
                    return StepOutcome::Failed(ResolveError::Io {
                        path: request.path.clone(),
                        source,
                    })
                }
            }
            ctx.add_file_dependency(&request.path);

            let mut derived = request.clone();
            if !request.ignore_symlinks {
                match dunce::canonicalize(&request.path) {
                    Ok(real) => derived.path = real,
                    Err(source) => {
                        return StepOutcome::Failed(ResolveError::Io {
                            path: request.path.clone(),
                            source,
                        })
                    }
                }
            }

            let message = format!("existing path: {}", derived.path.display());
            let result = resolver
                .do_resolve(self.target, derived, Some(message.as_str()), ctx)
                .await;
            StepOutcome::from_forward(result)
        }
        .boxed()
    }
}

// ============================================================================
// ResultPlugin
// ============================================================================

/// Terminal step: every request reaching `source` is the answer.
pub struct ResultPlugin {
    source: HookRef,
}

impl ResultPlugin {
    pub fn new(source: impl Into<HookRef>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Plugin for ResultPlugin {
    fn apply(self, resolver: &mut Resolver) -> Result<(), ResolveError> {
        let source = resolver.get_hook(self.source)?;
        resolver.tap(source, ResultStep)
    }
}

struct ResultStep;

impl Step for ResultStep {
    fn name(&self) -> &str {
        "ResultPlugin"
    }

    fn attempt<'a>(
        &'a self,
        _resolver: &'a Resolver,
        request: &'a Request,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, StepOutcome> {
        ctx.push_log(&format!("reporting result {}", request.path.display()));
        futures::future::ready(StepOutcome::Resolved(request.clone())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn pipeline() -> (Resolver, HookId) {
        let mut resolver = Resolver::new();
        let entry = resolver.ensure_hook("entry");
        resolver.ensure_hook("resolved");
        resolver
            .apply(JoinRequestPlugin::new("entry", "existing"))
            .unwrap();
        resolver
            .apply(ExistingPathPlugin::new("existing", "resolved"))
            .unwrap();
        resolver.apply(ResultPlugin::new("resolved")).unwrap();
        (resolver, entry)
    }

    #[test]
    fn test_plugins_require_source_hook() {
        let mut resolver = Resolver::new();
        assert!(resolver.apply(NextPlugin::new("a", "b")).is_err());
        assert!(resolver.apply(ResultPlugin::new("a")).is_err());
        // Targets are still ensured
        assert!(resolver.get_hook("b").is_ok());
    }

    #[tokio::test]
    async fn test_join_relative_specifier() {
        let dir = tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        std::fs::create_dir_all(root.join("src/lib")).unwrap();

        let (resolver, entry) = pipeline();
        let mut ctx = ResolveContext::new().with_dependency_tracking();
        let result = resolver
            .do_resolve(entry, Request::new(root.join("src"), "./lib"), None, &mut ctx)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.path, root.join("src/lib"));
        assert_eq!(result.request, None);
        assert!(ctx.file_dependencies.unwrap().contains(root.join("src/lib")));
    }

    #[tokio::test]
    async fn test_bare_specifier_declines() {
        let (resolver, entry) = pipeline();
        let mut ctx = ResolveContext::new();
        let result = resolver
            .do_resolve(entry, Request::new("/proj", "lodash"), None, &mut ctx)
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_missing_path_is_recorded() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        let (resolver, entry) = pipeline();
        let mut ctx = ResolveContext::new().with_dependency_tracking();
        let result = resolver
            .do_resolve(entry, Request::path_only(&missing), None, &mut ctx)
            .await
            .unwrap();

        assert_eq!(result, None);
        assert!(ctx.missing_dependencies.unwrap().contains(&missing));
        assert!(ctx.file_dependencies.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_realized_unless_ignored() {
        let dir = tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let real = root.join("real");
        let link = root.join("link");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let (resolver, entry) = pipeline();

        let mut ctx = ResolveContext::new();
        let result = resolver
            .do_resolve(entry, Request::path_only(&link), None, &mut ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.path, real);

        let mut request = Request::path_only(&link);
        request.ignore_symlinks = true;
        let result = resolver
            .do_resolve(entry, request, None, &mut ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.path, link);
    }

    #[tokio::test]
    async fn test_next_plugin_falls_through_on_not_found() {
        let dir = tempdir().unwrap();
        let root = PathBuf::from(dir.path());

        let mut resolver = Resolver::new();
        resolver.ensure_hook("entry");
        resolver.ensure_hook("resolved");
        // entry -> empty (always not found), then entry -> resolved
        resolver.apply(NextPlugin::new("entry", "empty")).unwrap();
        resolver.apply(NextPlugin::new("entry", "resolved")).unwrap();
        resolver.apply(ResultPlugin::new("resolved")).unwrap();

        let mut ctx = ResolveContext::new().with_log();
        let entry = resolver.get_hook("entry").unwrap();
        let result = resolver
            .do_resolve(entry, Request::path_only(&root), None, &mut ctx)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.path, root);
        assert_eq!(
            ctx.log().unwrap(),
            [
                "  no step on empty produced a result",
                format!("  reporting result {}", root.display()).as_str(),
            ]
        );
    }
}
