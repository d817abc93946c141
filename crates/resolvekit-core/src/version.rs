use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version for the `resolve --json` output.
/// Bump when the output shape changes incompatibly.
pub const RESOLVE_SCHEMA_VERSION: u32 = 1;

/// Version line for `resolvekit version`: crate version, the JSON schema
/// consumers should expect from `resolve --json`, and the git hash if the
/// build recorded one.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("resolvekit {VERSION} (resolve schema v{RESOLVE_SCHEMA_VERSION})");

    if let Some(hash) = option_env!("RESOLVEKIT_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
