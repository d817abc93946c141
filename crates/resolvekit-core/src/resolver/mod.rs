//! Hook-based module resolver.
//!
//! Requests flow through named hooks; each hook runs its steps in order
//! until one resolves, rejects, or fails the request. [`PnpPlugin`] bridges
//! a hook to an install-location [`Authority`](crate::authority::Authority).

mod builder;
mod context;
mod error;
mod hook;
mod pnp;
mod request;
mod step;
mod steps;

pub use builder::{hooks, ResolverBuilder};
pub use context::{DependencySet, ResolveContext};
pub use error::ResolveError;
pub use hook::{HookId, HookRef, Resolver};
pub use pnp::PnpPlugin;
pub use request::{Override, Request, RequestOverrides};
pub use step::{Plugin, Step, StepOutcome};
pub use steps::{ExistingPathPlugin, JoinRequestPlugin, NextPlugin, ResultPlugin};
