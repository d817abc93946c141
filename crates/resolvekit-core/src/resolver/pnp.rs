//! Delegation to an install-location authority.
//!
//! [`PnpPlugin`] taps a source hook. For every request carrying a
//! specifier it asks the [`Authority`] where the package lives relative to
//! the issuing directory. If the authority relocates it, the request is
//! rewritten to a path-only request at that location and resolution
//! continues at the target hook. Once the authority has claimed a
//! specifier, a not-found from the target hook is final.

use super::context::ResolveContext;
use super::error::ResolveError;
use super::hook::{HookId, HookRef, Resolver};
use super::request::{Override, Request, RequestOverrides};
use super::step::{Plugin, Step, StepOutcome};
use crate::authority::{Authority, AuthorityError, UnqualifiedOptions, PNPAPI_SPECIFIER};
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const OPTIONS: UnqualifiedOptions = UnqualifiedOptions {
    consider_builtins: false,
};

/// Routes requests on `source` through `authority`, continuing at `target`.
pub struct PnpPlugin {
    source: HookRef,
    authority: Arc<dyn Authority>,
    target: HookRef,
}

impl PnpPlugin {
    pub fn new(
        source: impl Into<HookRef>,
        authority: Arc<dyn Authority>,
        target: impl Into<HookRef>,
    ) -> Self {
        Self {
            source: source.into(),
            authority,
            target: target.into(),
        }
    }
}

impl Plugin for PnpPlugin {
    fn apply(self, resolver: &mut Resolver) -> Result<(), ResolveError> {
        let target = resolver.ensure_hook(self.target);
        let source = resolver.get_hook(self.source)?;
        resolver.tap(
            source,
            PnpStep {
                authority: self.authority,
                target,
            },
        )
    }
}

struct PnpStep {
    authority: Arc<dyn Authority>,
    target: HookId,
}

impl PnpStep {
    /// Translate `specifier`, plus the authority's own manifest when the
    /// caller tracks file dependencies. Either lookup failing fails both.
    fn translate(
        &self,
        specifier: &str,
        issuer: &str,
        track: bool,
    ) -> Result<(String, Option<String>), AuthorityError> {
        let resolution = self
            .authority
            .resolve_to_unqualified(specifier, issuer, OPTIONS)?;
        let api_resolution = if track {
            Some(
                self.authority
                    .resolve_to_unqualified(PNPAPI_SPECIFIER, issuer, OPTIONS)?,
            )
        } else {
            None
        };
        Ok((resolution, api_resolution))
    }
}

impl Step for PnpStep {
    fn name(&self) -> &str {
        "PnpPlugin"
    }

    fn attempt<'a>(
        &'a self,
        resolver: &'a Resolver,
        request: &'a Request,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, StepOutcome> {
        async move {
            let Some(specifier) = request.specifier() else {
                return StepOutcome::Decline;
            };

            let issuer = issuer_directory(&request.path);
            let track = ctx.file_dependencies.is_some();
            let (resolution, api_resolution) = match self.translate(specifier, &issuer, track) {
                Ok(translated) => translated,
                Err(err) => {
                    debug!(specifier, issuer = %issuer, code = err.code(), "authority refused");
                    return StepOutcome::Failed(err.into());
                }
            };

            if resolution == specifier {
                return StepOutcome::Decline;
            }

            if let Some(api_resolution) = api_resolution {
                ctx.add_file_dependency(api_resolution);
            }

            debug!(specifier, resolution = %resolution, "relocated by {}", self.authority.name());
            let message = format!("resolved by {} to {resolution}", self.authority.name());
            let derived = request.with_overrides(RequestOverrides {
                path: Override::Set(PathBuf::from(resolution)),
                request: Override::Clear,
                ignore_symlinks: Override::Set(true),
                ..Default::default()
            });

            let result = resolver
                .do_resolve(self.target, derived, Some(message.as_str()), ctx)
                .await;
            StepOutcome::from_final(result)
        }
        .boxed()
    }
}

/// The request directory with a trailing `/`, marking it as a folder.
fn issuer_directory(path: &Path) -> String {
    let mut issuer = path.to_string_lossy().into_owned();
    if !issuer.ends_with('/') {
        issuer.push('/');
    }
    issuer
}
