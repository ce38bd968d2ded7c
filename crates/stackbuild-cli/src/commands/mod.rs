pub mod bootstrap;
pub mod entry;
pub mod report;
pub mod resolve;
pub mod version;

use miette::{IntoDiagnostic, Result};
use serde::Serialize;

/// Exit code when the input names something that cannot be used.
pub const EXIT_VALIDATION_ERROR: i32 = 2;

/// Exit code when a lookup completes but finds nothing.
pub const EXIT_NOT_FOUND: i32 = 1;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

/// Report a failure with a stable code and exit.
pub fn fail(json: bool, code: &str, message: &str, exit_code: i32) -> ! {
    if json {
        let error_json = serde_json::json!({
            "ok": false,
            "error": {
                "code": code,
                "message": message
            }
        });
        match serde_json::to_string_pretty(&error_json) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{error_json}"),
        }
    } else {
        eprintln!("error: {message}");
    }
    std::process::exit(exit_code);
}
