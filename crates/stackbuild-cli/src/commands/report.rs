use super::{fail, print_json, EXIT_VALIDATION_ERROR};
use crate::Context;
use miette::Result;
use serde::Serialize;
use stackbuild_proto::{decode_build_report, Diagnostic};

/// Code printed when a payload cannot be decoded.
const REPORT_INVALID: &str = "REPORT_INVALID";

#[derive(Serialize)]
struct ReportOutput<'a> {
    ok: bool,
    build_id: u32,
    errors: usize,
    diagnostics: &'a [Diagnostic],
}

pub fn run(ctx: &Context, payload: &str) -> Result<()> {
    let report = match decode_build_report(payload.trim()) {
        Ok(report) => report,
        Err(e) => fail(
            ctx.json,
            REPORT_INVALID,
            &format!("invalid build report: {e}"),
            EXIT_VALIDATION_ERROR,
        ),
    };

    let errors = report.diagnostics.iter().filter(|d| d.is_error()).count();

    if ctx.json {
        print_json(&ReportOutput {
            ok: errors == 0,
            build_id: report.build_id,
            errors,
            diagnostics: &report.diagnostics,
        })?;
    } else {
        println!(
            "build {}: {} error(s), {} warning(s)",
            report.build_id,
            errors,
            report.diagnostics.len() - errors
        );
        for diagnostic in &report.diagnostics {
            let kind = if diagnostic.is_error() { "error" } else { "warning" };
            match &diagnostic.location {
                Some(loc) => println!(
                    "  {kind} [{}] {}:{}: {}",
                    diagnostic.id, loc.file, loc.line, diagnostic.text
                ),
                None => println!("  {kind} [{}] {}", diagnostic.id, diagnostic.text),
            }
        }
    }
    Ok(())
}
