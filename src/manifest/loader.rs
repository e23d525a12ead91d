//! Manifest file loader.
//!
//! Reads a manifest from disk and runs the full pipeline: decode with
//! defaults, `~/` expansion, anchoring the mount source at the manifest's
//! directory, then validation against the resolved path.

use std::env;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::models::manifest::DevEnvironment;
use crate::{AppError, Result};

/// Loads and validates development environment manifests.
pub struct ManifestLoader;

impl ManifestLoader {
    /// Load the manifest at `path`, resolving relative paths against the
    /// process working directory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file or working directory cannot be
    /// read, `AppError::Decode` for a malformed document and
    /// `AppError::Validation` when the manifest fails its checks.
    pub fn load(path: &Path, home: &Path) -> Result<DevEnvironment> {
        let cwd = env::current_dir()
            .map_err(|err| AppError::Io(format!("cannot read working directory: {err}")))?;
        Self::load_with_cwd(path, home, &cwd)
    }

    /// Load the manifest at `path` with an explicit working directory.
    ///
    /// # Errors
    ///
    /// Same as [`ManifestLoader::load`].
    pub fn load_with_cwd(path: &Path, home: &Path, cwd: &Path) -> Result<DevEnvironment> {
        let raw = fs::read(path).map_err(|err| {
            AppError::Io(format!("failed to read manifest {}: {err}", path.display()))
        })?;

        let mut dev = DevEnvironment::parse(&raw)?;
        dev.expand_home(home);
        dev.resolve_path(path, cwd);
        dev.validate()?;

        debug!(
            manifest = %path.display(),
            source = %dev.mount.source.display(),
            deployment = %dev.swap.deployment.name,
            "manifest loaded"
        );
        Ok(dev)
    }
}
