use miette::{IntoDiagnostic, Result};
use resolvekit_core::resolver::DependencySet;
use resolvekit_core::version::RESOLVE_SCHEMA_VERSION;
use resolvekit_core::{
    Config, ManifestAuthority, Request, ResolveContext, ResolveError, ResolverBuilder,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Resolve result for JSON output.
#[derive(Serialize)]
struct ResolveOutput {
    schema_version: u32,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    specifier: Option<String>,
    from: String,
    resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_dependencies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_dependencies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorOutput>,
}

#[derive(Serialize)]
struct ErrorOutput {
    code: String,
    message: String,
}

fn paths(set: Option<&DependencySet>) -> Option<Vec<String>> {
    set.map(|deps| deps.iter().map(|p| p.display().to_string()).collect())
}

/// Run the resolve command.
///
/// Exits with status 1 if the specifier cannot be resolved.
pub fn run(config: &Config, specifier: Option<&str>, from: Option<&Path>, json: bool) -> Result<()> {
    let from: PathBuf = match from {
        Some(dir) => config.cwd.join(dir),
        None => config.cwd.clone(),
    };

    let mut builder = ResolverBuilder::new();
    if let Some(manifest) = &config.manifest {
        let authority = ManifestAuthority::from_file(manifest).into_diagnostic()?;
        builder = builder.with_authority(Arc::new(authority));
    }
    let resolver = builder.build().into_diagnostic()?;

    let mut ctx = ResolveContext::new();
    if config.track_dependencies {
        ctx = ctx.with_dependency_tracking();
    }
    if config.trace {
        ctx = ctx.with_log();
    }

    let request = match specifier {
        Some(spec) => Request::new(&from, spec),
        None => Request::path_only(&from),
    };
    debug!(request = %request, "resolving");

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = runtime.block_on(resolver.resolve(request, &mut ctx));

    let (resolved, error) = match result {
        Ok(resolved) => (resolved.map(|r| r.path), None),
        Err(err) => (None, Some(err)),
    };

    if json {
        let output = ResolveOutput {
            schema_version: RESOLVE_SCHEMA_VERSION,
            ok: resolved.is_some(),
            specifier: specifier.map(str::to_string),
            from: from.display().to_string(),
            resolved: resolved.as_ref().map(|p| p.display().to_string()),
            file_dependencies: paths(ctx.file_dependencies.as_ref()),
            missing_dependencies: paths(ctx.missing_dependencies.as_ref()),
            log: ctx.log().map(<[String]>::to_vec),
            error: error.as_ref().map(error_output),
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else {
        print_human(&ctx, specifier, &from, resolved.as_deref(), error.as_ref());
    }

    if resolved.is_none() {
        std::process::exit(1);
    }
    Ok(())
}

fn error_output(err: &ResolveError) -> ErrorOutput {
    ErrorOutput {
        code: err.code().to_string(),
        message: err.to_string(),
    }
}

fn print_human(
    ctx: &ResolveContext,
    specifier: Option<&str>,
    from: &Path,
    resolved: Option<&Path>,
    error: Option<&ResolveError>,
) {
    if let Some(log) = ctx.log() {
        for line in log {
            eprintln!("{line}");
        }
    }

    let target = specifier.unwrap_or(".");
    match (resolved, error) {
        (Some(path), _) => println!("{}", path.display()),
        (None, Some(err)) => eprintln!("error: {}: {err}", err.code()),
        (None, None) => eprintln!(
            "error: could not resolve `{target}` from {}",
            from.display()
        ),
    }

    if let Some(deps) = &ctx.file_dependencies {
        for path in deps.iter() {
            println!("  file: {}", path.display());
        }
    }
    if let Some(deps) = &ctx.missing_dependencies {
        for path in deps.iter() {
            println!("  missing: {}", path.display());
        }
    }
}
