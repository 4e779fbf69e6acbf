use std::process::ExitCode;

use serde::Serialize;
use skillmatch_core::Response;

/// Exit status for a `{success: false}` response.
pub const FAILURE_EXIT: u8 = 2;

/// Render a serializable response as JSON.
pub fn render<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<String> {
    if compact {
        Ok(serde_json::to_string(value)?)
    } else {
        Ok(serde_json::to_string_pretty(value)?)
    }
}

/// Print the response on stdout. Failures are repeated on stderr and turn
/// into a non-zero exit status.
pub fn emit(response: &Response, compact: bool) -> anyhow::Result<ExitCode> {
    println!("{}", render(response, compact)?);
    match response.failure() {
        Some(message) => {
            eprintln!("skillmatch: {message}");
            Ok(ExitCode::from(FAILURE_EXIT))
        }
        None => Ok(ExitCode::SUCCESS),
    }
}
