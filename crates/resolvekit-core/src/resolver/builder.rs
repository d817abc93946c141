//! Default pipeline assembly.

use super::error::ResolveError;
use super::hook::Resolver;
use super::pnp::PnpPlugin;
use super::step::Plugin;
use super::steps::{ExistingPathPlugin, JoinRequestPlugin, NextPlugin, ResultPlugin};
use crate::authority::Authority;
use std::sync::Arc;

/// Names of the hooks in the default pipeline.
pub mod hooks {
    /// Entry hook for [`Resolver::resolve`](super::Resolver::resolve).
    pub const RESOLVE: &str = "resolve";
    /// Bare module specifiers.
    pub const RAW_MODULE: &str = "raw-module";
    /// Path-only requests to check on disk.
    pub const EXISTING_PATH: &str = "existing-path";
    /// Final answers.
    pub const RESOLVED: &str = "resolved";

    pub const ALL: &[&str] = &[RESOLVE, RAW_MODULE, EXISTING_PATH, RESOLVED];
}

/// Builds a [`Resolver`] with the default hook graph:
///
/// ```text
/// resolve ──JoinRequest──▶ existing-path ──ExistingPath──▶ resolved ──Result
///    └──────Next──────▶ raw-module ──Pnp──▶ existing-path
/// ```
///
/// Custom plugins are applied after the defaults, so they tap the end of
/// each hook.
#[derive(Default)]
pub struct ResolverBuilder {
    authority: Option<Arc<dyn Authority>>,
    plugins: Vec<Box<dyn FnOnce(&mut Resolver) -> Result<(), ResolveError>>>,
}

impl ResolverBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route bare specifiers through `authority`.
    #[must_use]
    pub fn with_authority(mut self, authority: Arc<dyn Authority>) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Apply an extra plugin once the default hooks are in place.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins
            .push(Box::new(move |resolver: &mut Resolver| plugin.apply(resolver)));
        self
    }

    pub fn build(self) -> Result<Resolver, ResolveError> {
        let mut resolver = Resolver::new();
        for name in hooks::ALL {
            resolver.ensure_hook(*name);
        }

        resolver.apply(JoinRequestPlugin::new(hooks::RESOLVE, hooks::EXISTING_PATH))?;
        resolver.apply(NextPlugin::new(hooks::RESOLVE, hooks::RAW_MODULE))?;
        if let Some(authority) = self.authority {
            resolver.apply(PnpPlugin::new(
                hooks::RAW_MODULE,
                authority,
                hooks::EXISTING_PATH,
            ))?;
        }
        resolver.apply(ExistingPathPlugin::new(
            hooks::EXISTING_PATH,
            hooks::RESOLVED,
        ))?;
        resolver.apply(ResultPlugin::new(hooks::RESOLVED))?;

        for plugin in self.plugins {
            plugin(&mut resolver)?;
        }
        Ok(resolver)
    }
}
