#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod authority;
pub mod config;
pub mod error;
pub mod resolver;
pub mod version;

pub use authority::{Authority, AuthorityError, ManifestAuthority, UnqualifiedOptions};
pub use config::Config;
pub use error::Error;
pub use resolver::{
    hooks, PnpPlugin, Request, ResolveContext, ResolveError, Resolver, ResolverBuilder,
};
pub use version::VERSION;
