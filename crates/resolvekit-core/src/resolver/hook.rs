//! Hook registry and request dispatch.
//!
//! A [`Resolver`] owns a set of named hooks, each an ordered list of
//! [`Step`]s. A request enters a hook through [`Resolver::do_resolve`] and
//! visits the hook's steps in registration order until one of them
//! produces a terminal outcome.
//!
//! Hooks are registered up front (`ensure_hook`, `tap`, `apply`); once built,
//! the resolver is immutable and can be shared across concurrent resolutions.

use super::builder::hooks;
use super::context::ResolveContext;
use super::error::ResolveError;
use super::request::Request;
use super::step::{Plugin, Step, StepOutcome};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use tracing::trace;

/// Handle to a hook registered on a [`Resolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(usize);

impl std::fmt::Display for HookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A hook given either by name or by handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookRef {
    Name(String),
    Id(HookId),
}

impl From<&str> for HookRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for HookRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<HookId> for HookRef {
    fn from(id: HookId) -> Self {
        Self::Id(id)
    }
}

struct Hook {
    name: String,
    steps: Vec<Box<dyn Step>>,
}

/// The hook pipeline.
#[derive(Default)]
pub struct Resolver {
    hooks: Vec<Hook>,
    names: HashMap<String, HookId>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.hooks.iter().map(|hook| {
                let steps: Vec<&str> = hook.steps.iter().map(|s| s.name()).collect();
                (&hook.name, steps)
            }))
            .finish()
    }
}

impl Resolver {
    /// Create a resolver with no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the hook, creating a named hook on first use.
    pub fn ensure_hook(&mut self, hook: impl Into<HookRef>) -> HookId {
        let name = match hook.into() {
            HookRef::Id(id) => return id,
            HookRef::Name(name) => name,
        };
        if let Some(&id) = self.names.get(&name) {
            return id;
        }

        let id = HookId(self.hooks.len());
        self.hooks.push(Hook {
            name: name.clone(),
            steps: Vec::new(),
        });
        self.names.insert(name, id);
        id
    }

    /// Look up a hook that must already exist.
    pub fn get_hook(&self, hook: impl Into<HookRef>) -> Result<HookId, ResolveError> {
        match hook.into() {
            HookRef::Id(id) if id.0 < self.hooks.len() => Ok(id),
            HookRef::Name(name) => match self.names.get(&name) {
                Some(&id) => Ok(id),
                None => Err(ResolveError::UnknownHook { name }),
            },
            HookRef::Id(id) => Err(ResolveError::UnknownHook {
                name: id.to_string(),
            }),
        }
    }

    /// Name a hook was registered under.
    pub fn hook_name(&self, hook: HookId) -> Option<&str> {
        self.hooks.get(hook.0).map(|h| h.name.as_str())
    }

    /// Append a step to a hook.
    pub fn tap(&mut self, hook: HookId, step: impl Step + 'static) -> Result<(), ResolveError> {
        let Some(entry) = self.hooks.get_mut(hook.0) else {
            return Err(ResolveError::UnknownHook {
                name: hook.to_string(),
            });
        };
        trace!(hook = %entry.name, step = step.name(), "tap");
        entry.steps.push(Box::new(step));
        Ok(())
    }

    /// Let a plugin tap its hooks.
    pub fn apply(&mut self, plugin: impl Plugin) -> Result<(), ResolveError> {
        plugin.apply(self)
    }

    /// Resolve `request` from the `resolve` hook.
    pub async fn resolve(
        &self,
        request: Request,
        ctx: &mut ResolveContext,
    ) -> Result<Option<Request>, ResolveError> {
        let hook = self.get_hook(hooks::RESOLVE)?;
        self.do_resolve(hook, request, None, ctx).await
    }

    /// Run `request` through the steps tapped on `hook`.
    ///
    /// Returns `Ok(Some(result))` when a step resolves it, `Ok(None)` when a
    /// step reports "no further alternatives" or every step declines, and
    /// `Err` when a step fails. `message` only feeds the resolution log.
    pub fn do_resolve<'a>(
        &'a self,
        hook: HookId,
        request: Request,
        message: Option<&'a str>,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, Result<Option<Request>, ResolveError>> {
        async move {
            let Some(entry) = self.hooks.get(hook.0) else {
                return Err(ResolveError::UnknownHook {
                    name: hook.to_string(),
                });
            };

            let frame = format!("{}: {request}", entry.name);
            if !ctx.enter(frame.clone()) {
                return Err(ResolveError::Recursion { frame });
            }
            if let Some(message) = message {
                trace!(hook = %entry.name, "{message}");
                ctx.push_log(message);
            }

            let result = self.run_steps(entry, &request, ctx).await;
            ctx.leave();
            result
        }
        .boxed()
    }

    async fn run_steps(
        &self,
        hook: &Hook,
        request: &Request,
        ctx: &mut ResolveContext,
    ) -> Result<Option<Request>, ResolveError> {
        for step in &hook.steps {
            match step.attempt(self, request, ctx).await {
                StepOutcome::Decline => {}
                StepOutcome::Resolved(result) => return Ok(Some(result)),
                StepOutcome::NotFound => {
                    trace!(hook = %hook.name, step = step.name(), "no further alternatives");
                    return Ok(None);
                }
                StepOutcome::Failed(err) => return Err(err),
            }
        }

        ctx.push_log(&format!("no step on {} produced a result", hook.name));
        Ok(None)
    }
}
