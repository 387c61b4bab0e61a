//! Crash-safe in-place file replacement
//!
//! New content is written to `<target>.tmp` in the same directory, synced to
//! disk, and renamed over the target. Until the rename succeeds the target
//! keeps its original bytes, and the temporary file is removed on every
//! failure path.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use crate::error::{Error, Result};

/// Suffix appended to a document's path while its replacement is written
pub const TEMP_SUFFIX: &str = ".tmp";

/// Sibling temporary path used while replacing `target`
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Temporary file removed on drop unless it was committed
struct TempArtifact {
    path: PathBuf,
    committed: bool,
}

impl TempArtifact {
    fn new(path: PathBuf) -> Self {
        Self { path, committed: false }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed temporary file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), "Could not remove temporary file: {}", err),
        }
    }
}

/// Atomically replace `target` with `bytes`
pub fn replace_in_place(target: &Path, bytes: &[u8]) -> Result<()> {
    replace_in_place_with(target, |file| file.write_all(bytes))
}

/// Atomically replace `target` with whatever `write` produces.
///
/// If `write` fails, or anything up to and including the rename fails, the
/// target is left untouched and the temporary file is removed.
pub fn replace_in_place_with<F>(target: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let temp = temp_path_for(target);
    let write_failure = |source: io::Error| Error::WriteFailure {
        path: target.to_path_buf(),
        source,
    };

    // Declared before the file so the handle closes before removal
    let artifact = TempArtifact::new(temp.clone());
    let mut file = File::create(&temp).map_err(write_failure)?;

    write(&mut file).map_err(write_failure)?;
    file.flush().map_err(write_failure)?;
    file.sync_all().map_err(write_failure)?;
    drop(file);

    fs::rename(&temp, target).map_err(write_failure)?;
    artifact.commit();

    sync_parent_dir(target);
    debug!(path = %target.display(), "Replaced file in place");
    Ok(())
}

/// Persist the rename itself; best effort
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if let Err(err) = File::open(parent).and_then(|dir| dir.sync_all()) {
        debug!(path = %parent.display(), "Could not sync directory: {}", err);
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_is_sibling() {
        let temp = temp_path_for(Path::new("dir/Invoice 2.pdf"));
        assert_eq!(temp, PathBuf::from("dir/Invoice 2.pdf.tmp"));
    }

    #[test]
    fn test_replace_writes_new_content() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("doc.pdf");
        fs::write(&target, b"original").expect("write original");

        replace_in_place(&target, b"stamped content").expect("replace");

        assert_eq!(fs::read(&target).expect("read"), b"stamped content");
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn test_interrupted_write_keeps_original() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("doc.pdf");
        fs::write(&target, b"original bytes").expect("write original");

        let result = replace_in_place_with(&target, |file| {
            file.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "simulated crash"))
        });

        assert!(matches!(result, Err(Error::WriteFailure { .. })));
        assert_eq!(fs::read(&target).expect("read"), b"original bytes");
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn test_missing_directory_is_write_failure() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("missing").join("doc.pdf");

        let result = replace_in_place(&target, b"data");
        assert!(matches!(result, Err(Error::WriteFailure { .. })));
        assert!(!target.exists());
    }
}
