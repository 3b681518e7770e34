use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// New file contents written next to their destination but not yet visible there.
///
/// Call [`StagedFile::commit`] to rename the temp file over the destination.
/// Dropping an uncommitted stage removes the temp file.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Write `bytes` to a temp file in the destination's directory.
    ///
    /// Missing parent directories are created. The destination itself is not touched.
    ///
    /// # Errors
    /// Returns an error if the directory or temp file cannot be created or written.
    pub fn stage(path: &Path, bytes: &[u8]) -> io::Result<Self> {
        let parent = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;

        // Same directory as the target so the final rename stays on one filesystem
        let temp_path = parent.join(format!(
            ".{}.tmp.{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
            std::process::id()
        ));

        let staged = Self {
            temp_path,
            target: path.to_path_buf(),
            committed: false,
        };

        let mut file = File::create(&staged.temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;

        Ok(staged)
    }

    /// Destination path of this stage.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staged contents over the destination.
    ///
    /// # Errors
    /// Returns an error if the rename (or the Windows copy fallback) fails.
    pub fn commit(mut self) -> io::Result<()> {
        let result = match fs::rename(&self.temp_path, &self.target) {
            Ok(()) => Ok(()),
            // On Windows, rename can fail if target exists. Try copy + remove as fallback.
            Err(_) if cfg!(windows) => fs::copy(&self.temp_path, &self.target).map(|_| ()),
            Err(e) => Err(e),
        };
        if result.is_ok() {
            self.committed = true;
            let _ = fs::remove_file(&self.temp_path);
        }
        result
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Atomically write bytes to a file by staging a temp file then renaming.
///
/// The file will either have the old contents or the new contents, never a partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    StagedFile::stage(path, bytes)?.commit()
}

/// Whether `path` already holds exactly `bytes`.
///
/// A missing or unreadable file counts as different.
#[must_use]
pub fn same_contents(path: &Path, bytes: &[u8]) -> bool {
    fs::read(path).map(|existing| existing == bytes).unwrap_or(false)
}

/// Remove a directory with everything in it, then recreate it empty.
///
/// # Errors
/// Returns an error if the directory cannot be removed or created.
pub fn reset_dir(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(path)
}

/// Lexically normalize a path: drop `.` components and fold `..` into the parent.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compute `to` relative to the directory `from`.
///
/// Both paths are normalized lexically first. Returns `"."` for identical paths.
#[must_use]
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);

    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();
    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push("..");
    }
    for part in &to_parts[common..] {
        rel.push(part.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        rel
    }
}

/// Render a path with forward slashes, as module specifiers expect.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_to_string_lossy_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x80, 0x81])
            .unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert!(content.starts_with("Hello"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("test.txt");

        atomic_write(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        atomic_write(&path, b"world").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "world");
    }

    #[test]
    fn test_dropped_stage_leaves_target_and_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.ts");
        fs::write(&path, "old").unwrap();

        {
            let staged = StagedFile::stage(&path, b"new").unwrap();
            assert_eq!(staged.target(), path.as_path());
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_same_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        assert!(!same_contents(&path, b"x"));
        fs::write(&path, "x").unwrap();
        assert!(same_contents(&path, b"x"));
        assert!(!same_contents(&path, b"y"));
    }

    #[test]
    fn test_reset_dir() {
        let dir = tempdir().unwrap();
        let build = dir.path().join(".build");
        fs::create_dir_all(build.join("types")).unwrap();
        fs::write(build.join("types").join("stale.d.ts"), "x").unwrap();

        reset_dir(&build).unwrap();
        assert!(build.is_dir());
        assert_eq!(fs::read_dir(&build).unwrap().count(), 0);

        // Missing directories are simply created
        let fresh = dir.path().join("fresh");
        reset_dir(&fresh).unwrap();
        assert!(fresh.is_dir());
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/p/.blackboox"), Path::new("/p")),
            PathBuf::from("..")
        );
        assert_eq!(
            relative_path(Path::new("/p/.blackboox/types"), Path::new("/p/app/services/auth")),
            PathBuf::from("../../app/services/auth")
        );
        assert_eq!(
            relative_path(Path::new("/p/./src"), Path::new("/p/src")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
    }
}
