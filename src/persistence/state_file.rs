//! Registry file primitives: atomic replacement and the advisory lock.
//!
//! Saves go through a temporary file in the same directory which is then
//! renamed over the target (`tempfile::NamedTempFile::persist()`), so a
//! reader never observes a half-written document. Mutations additionally
//! hold an exclusive `flock` on a sidecar `<state>.lock` file for the whole
//! load-mutate-save sequence. The lock lives on the sidecar because the
//! state file itself is replaced on every save.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{AppError, Result};

/// Write `content` to `path` atomically, creating parent directories.
///
/// # Errors
///
/// Returns `AppError::Io` if the directory, temporary file, write or
/// rename fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|err| {
        AppError::Io(format!(
            "failed to create state directory {}: {err}",
            parent.display()
        ))
    })?;

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|err| AppError::Io(format!("failed to create temporary file: {err}")))?;

    tmp.write_all(content)
        .map_err(|err| AppError::Io(format!("failed to write temporary file: {err}")))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| AppError::Io(format!("failed to sync temporary file: {err}")))?;

    tmp.persist(path).map_err(|err| {
        AppError::Io(format!("failed to persist state to {}: {err}", path.display()))
    })?;

    Ok(())
}

/// Sidecar lock file guarding `state_path`.
#[must_use]
pub fn lock_path(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map_or_else(|| OsString::from("state"), |name| name.to_os_string());
    name.push(".lock");
    state_path.with_file_name(name)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Exclusive advisory lock on a registry, released on drop.
pub struct StateLock {
    #[cfg(unix)]
    _guard: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl StateLock {
    /// Block until the exclusive lock for `state_path` is held.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the lock file cannot be opened or locked.
    pub fn acquire(state_path: &Path) -> Result<Self> {
        let path = lock_path(state_path);
        let parent = parent_dir(&path);
        fs::create_dir_all(parent).map_err(|err| {
            AppError::Io(format!(
                "failed to create state directory {}: {err}",
                parent.display()
            ))
        })?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|err| {
                AppError::Io(format!("failed to open lock file {}: {err}", path.display()))
            })?;

        Self::lock(file, &path)
    }

    #[cfg(unix)]
    fn lock(file: File, path: &Path) -> Result<Self> {
        use nix::fcntl::{Flock, FlockArg};

        let guard = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            AppError::Io(format!("failed to lock {}: {errno}", path.display()))
        })?;
        Ok(Self { _guard: guard })
    }

    #[cfg(not(unix))]
    #[allow(clippy::unnecessary_wraps)]
    fn lock(file: File, _path: &Path) -> Result<Self> {
        Ok(Self { _file: file })
    }
}
