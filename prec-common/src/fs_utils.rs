//! Filesystem helpers

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Sibling temporary path used while writing `target` (`<name>.tmp`)
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name: OsString = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Write `bytes` to `target` using write-fsync-rename
///
/// Readers observe either the previous content or the complete new content,
/// never a partially written file. The temporary file lives next to the
/// target so the final rename stays on one filesystem.
pub fn atomic_write(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(target);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp_path)?;

    if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(file);

    std::fs::rename(&temp_path, target)?;

    // Sync parent directory so the rename itself is durable
    #[cfg(unix)]
    if let Some(parent) = target.parent() {
        if parent.exists() {
            std::fs::File::open(parent)?.sync_all()?;
        }
    }

    Ok(())
}
