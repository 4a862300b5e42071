//! Storage key to file name mapping.

use std::io;
use std::path::Path;

/// Percent-encode `raw` so it is a single safe path component.
///
/// A leading `.` is escaped too, so encoded names never collide with the
/// hidden temp files used for atomic writes and never form `.` or `..`.
pub(crate) fn file_component(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    let encoded = urlencoding::encode(raw);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded.into_owned(),
    }
}

/// Temp file name used while writing `final_name`.
pub(crate) fn temp_name(final_name: &str) -> String {
    format!(".{final_name}.tmp")
}

/// Write `bytes` to `dir/name` through a temp file and rename.
pub(crate) async fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let temp_path = dir.join(temp_name(name));
    tokio::fs::write(&temp_path, bytes).await?;
    tokio::fs::rename(&temp_path, dir.join(name)).await
}

/// Treat a missing file or directory as success.
pub(crate) fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
