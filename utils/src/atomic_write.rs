//! Crash-safe document saves.
//!
//! The new contents go to a temp file in the destination directory, which is
//! synced and renamed over the document. Readers see either the old or the new
//! text, never a partial write. An existing document keeps its permissions.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace the contents of `path` with `bytes`.
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).ok().map(|meta| meta.permissions());

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        staged.as_file().set_permissions(permissions)?;
    }

    staged.persist(path).map_err(|e| {
        tracing::warn!(path = %path.display(), "Rename over document failed: {}", e.error);
        e.error
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::atomic_write;

    #[test]
    fn overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("main.rs");

        atomic_write(&path, b"fn main(){}").expect("first save");
        atomic_write(&path, b"fn main() {}\n").expect("second save");

        assert_eq!(fs::read_to_string(&path).expect("read"), "fn main() {}\n");
        let entries = fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn keeps_the_document_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("build.rs");
        fs::write(&path, "old").expect("seed");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).expect("chmod");

        atomic_write(&path, b"new").expect("save");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gone").join("lib.rs");
        assert!(atomic_write(&path, b"x").is_err());
    }
}
