use super::{fail, print_json, EXIT_NOT_FOUND, EXIT_VALIDATION_ERROR};
use crate::Context;
use miette::Result;
use serde::Serialize;
use stackbuild_core::build::codes;
use stackbuild_core::{Resolution, ResolveError};
use std::path::PathBuf;

#[derive(Serialize)]
struct ResolveOutput<'a> {
    ok: bool,
    specifier: &'a str,
    from: &'a str,
    resolved: Option<&'a str>,
}

/// Resolve `specifier` as if imported from a module in `from`.
///
/// An unresolved specifier is reported (not an error in JSON mode) and exits
/// with [`EXIT_NOT_FOUND`].
pub fn run(ctx: &Context, specifier: &str, from: Option<&PathBuf>) -> Result<()> {
    let from = ctx.dir_or_cwd(from);
    let resolver = ctx.resolver();

    let resolution = match resolver.resolve(specifier, &from) {
        Ok(resolution) => resolution,
        Err(e @ ResolveError::InvalidSpecifier(_)) => {
            fail(
                ctx.json,
                codes::RESOLVE_INVALID_SPECIFIER,
                &e.to_string(),
                EXIT_VALIDATION_ERROR,
            );
        }
    };

    let output = ResolveOutput {
        ok: resolution.is_resolved(),
        specifier,
        from: &from,
        resolved: resolution.path(),
    };

    if ctx.json {
        print_json(&output)?;
    } else {
        match &resolution {
            Resolution::Resolved(path) => println!("{path}"),
            Resolution::Unresolved => eprintln!("unresolved: {specifier} (from {from})"),
        }
    }

    if !resolution.is_resolved() {
        std::process::exit(EXIT_NOT_FOUND);
    }
    Ok(())
}
