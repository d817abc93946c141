//! The contract between the pipeline and the steps tapped on its hooks.

use super::context::ResolveContext;
use super::error::ResolveError;
use super::hook::Resolver;
use super::request::Request;
use futures::future::BoxFuture;

/// What a step decided about a request.
#[derive(Debug)]
pub enum StepOutcome {
    /// Not this step's concern; the next step on the hook runs.
    Decline,
    /// Final answer; later steps on the hook do not run.
    Resolved(Request),
    /// No further alternatives; stops the hook without a result.
    NotFound,
    /// Unexpected failure; stops the hook and surfaces the error.
    Failed(ResolveError),
}

impl StepOutcome {
    /// Map a nested `do_resolve` result where "not found" is final.
    pub fn from_final(result: Result<Option<Request>, ResolveError>) -> Self {
        match result {
            Ok(Some(request)) => Self::Resolved(request),
            Ok(None) => Self::NotFound,
            Err(err) => Self::Failed(err),
        }
    }

    /// Map a nested `do_resolve` result where "not found" lets siblings try.
    pub fn from_forward(result: Result<Option<Request>, ResolveError>) -> Self {
        match result {
            Ok(Some(request)) => Self::Resolved(request),
            Ok(None) => Self::Decline,
            Err(err) => Self::Failed(err),
        }
    }
}

/// A step tapped on a hook.
///
/// Steps are awaited one at a time in registration order. A step may call
/// back into [`Resolver::do_resolve`] to continue at another hook.
pub trait Step: Send + Sync {
    /// Step name for logs.
    fn name(&self) -> &str;

    fn attempt<'a>(
        &'a self,
        resolver: &'a Resolver,
        request: &'a Request,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, StepOutcome>;
}

/// Something that taps one or more hooks.
///
/// Plugins own their configuration; the resolver owns the hooks.
pub trait Plugin {
    fn apply(self, resolver: &mut Resolver) -> Result<(), ResolveError>;
}
