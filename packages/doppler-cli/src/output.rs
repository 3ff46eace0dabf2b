use std::io::Write;
use std::path::{Path, PathBuf};

/// Serialize a value to JSON (pretty or compact).
pub fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String, String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.map_err(|e| format!("JSON serialization failed: {}", e))
}

/// Write text to a file, or to stdout followed by a newline.
pub fn write_output(text: &str, output_path: Option<&Path>) -> Result<(), String> {
    match output_path {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| format!("Failed to write output file '{}': {}", path.display(), e)),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", text).map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Serialize and write in one step.
pub fn emit_json<T: serde::Serialize>(
    value: &T,
    compact: bool,
    output_path: Option<&Path>,
) -> Result<(), String> {
    write_output(&to_json(value, compact)?, output_path)
}

/// `<dir>/<stem of input>_report.json`
pub fn report_path(dir: &Path, input: &str) -> PathBuf {
    let stem = Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    dir.join(format!("{}_report.json", stem))
}
