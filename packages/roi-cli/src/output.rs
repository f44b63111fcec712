use crate::cli::ReportArgs;
use std::io::Write;
use std::path::Path;

/// Write JSON string to stdout or a file.
pub fn write_output(json: &str, output_path: Option<&Path>) -> Result<(), String> {
    match output_path {
        Some(path) => std::fs::write(path, json)
            .map_err(|e| format!("Failed to write output file '{}': {}", path.display(), e)),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(json.as_bytes())
                .and_then(|_| handle.write_all(b"\n"))
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Serialize a value to JSON (pretty or compact).
pub fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String, String> {
    if compact {
        serde_json::to_string(value).map_err(|e| format!("JSON serialization failed: {}", e))
    } else {
        serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {}", e))
    }
}

/// Pretty-print `value` to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    to_json(value, false).and_then(|json| write_output(&json, None))
}

/// Emit a report to stdout (`--json`) and/or a file (`--report`).
pub fn emit_report<T: serde::Serialize>(value: &T, args: &ReportArgs) -> Result<(), String> {
    if !args.json && args.report.is_none() {
        return Ok(());
    }
    let json = to_json(value, args.compact)?;
    if let Some(path) = &args.report {
        write_output(&json, Some(path))?;
    }
    if args.json {
        write_output(&json, None)?;
    }
    Ok(())
}
