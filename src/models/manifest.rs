//! Development environment manifest model.
//!
//! A manifest names the deployment/container to swap into development mode
//! and describes how the local source tree is mounted into it.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Label added to a deployment while it is in development mode.
pub const DEV_DEPLOYMENT_LABEL: &str = "cnd.okteto.com/deployment";

/// Annotation holding the original deployment manifest.
pub const DEV_DEPLOYMENT_ANNOTATION: &str = "cnd.okteto.com/manifest";

/// Prefix of the per-container manifest annotations.
pub const MANIFEST_ANNOTATION_PREFIX: &str = "cnd.okteto.com/cnd-manifest-";

/// Name of the sidecar container running the synchronization agent.
pub const SYNC_CONTAINER: &str = "cnd-sync";

/// Mount source used when the manifest omits one.
pub const DEFAULT_MOUNT_SOURCE: &str = ".";

/// Mount target used when the manifest omits one.
pub const DEFAULT_MOUNT_TARGET: &str = "/src";

const INIT_SYNC_CONTAINER_PREFIX: &str = "cnd-init-";
const SYNC_VOLUME_PREFIX: &str = "cnd-data-";
const SYNC_MOUNT_ROOT: &str = "/var/cnd-sync";

/// A cloud native development environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DevEnvironment {
    /// Container being swapped into development mode.
    #[serde(default)]
    pub swap: Swap,
    /// How the local filesystem is mounted.
    #[serde(default)]
    pub mount: Mount,
    /// Named helper commands.
    #[serde(default)]
    pub scripts: HashMap<String, String>,
}

/// Wrapper around the swap target, mirroring the `swap.deployment` layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Swap {
    /// Deployment and container to swap.
    #[serde(default)]
    pub deployment: SwapTarget,
}

/// Deployment/container pair replaced by the development container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwapTarget {
    /// Deployment name; required.
    #[serde(default)]
    pub name: String,
    /// Container within the deployment.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,
    /// Development image.
    #[serde(default)]
    pub image: String,
    /// Entrypoint override.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Argument override.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Local source directory and its mount point inside the container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mount {
    /// Host directory; relative paths are resolved against the manifest file.
    #[serde(default = "default_mount_source")]
    pub source: PathBuf,
    /// Path inside the container.
    #[serde(default = "default_mount_target")]
    pub target: PathBuf,
}

impl Default for Mount {
    fn default() -> Self {
        Self {
            source: default_mount_source(),
            target: default_mount_target(),
        }
    }
}

fn default_mount_source() -> PathBuf {
    PathBuf::from(DEFAULT_MOUNT_SOURCE)
}

fn default_mount_target() -> PathBuf {
    PathBuf::from(DEFAULT_MOUNT_TARGET)
}

impl DevEnvironment {
    /// Decode a manifest document, filling in defaults for omitted fields.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Decode` if the bytes are not a valid manifest.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let dev: Self = serde_yaml::from_slice(bytes)?;
        Ok(dev)
    }

    /// Replace a leading `~` in the mount source with `home`.
    pub fn expand_home(&mut self, home: &Path) {
        if let Ok(rest) = self.mount.source.strip_prefix("~") {
            self.mount.source = if rest.as_os_str().is_empty() {
                home.to_path_buf()
            } else {
                home.join(rest)
            };
        }
    }

    /// Anchor a relative mount source at the manifest's directory.
    pub fn resolve_path(&mut self, manifest_path: &Path, cwd: &Path) {
        self.mount.source = resolve_source(&self.mount.source, manifest_path, cwd);
    }

    /// Check the semantic invariants of the manifest.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the mount source is missing or
    /// not a directory, or the deployment name is empty. Returns
    /// `AppError::Io` if the source cannot be inspected for another reason.
    pub fn validate(&self) -> Result<()> {
        match fs::metadata(&self.mount.source) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(AppError::Validation("source is not a directory".into())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(AppError::Validation("source folder missing".into()));
            }
            Err(err) => {
                return Err(AppError::Io(format!(
                    "cannot inspect source folder {}: {err}",
                    self.mount.source.display()
                )));
            }
        }

        if self.swap.deployment.name.is_empty() {
            return Err(AppError::Validation("target name required".into()));
        }

        Ok(())
    }

    /// Annotation key holding the manifest of the swapped container.
    #[must_use]
    pub fn manifest_annotation_key(&self) -> String {
        format!("{MANIFEST_ANNOTATION_PREFIX}{}", self.swap.deployment.container)
    }

    /// Name of the init container seeding the sync volume.
    #[must_use]
    pub fn init_sync_container_name(&self) -> String {
        format!("{INIT_SYNC_CONTAINER_PREFIX}{}", self.swap.deployment.container)
    }

    /// Name of the volume shared with the sync container.
    #[must_use]
    pub fn sync_volume_name(&self) -> String {
        format!("{SYNC_VOLUME_PREFIX}{}", self.swap.deployment.container)
    }

    /// Mount path of the sync volume inside the sync container.
    #[must_use]
    pub fn sync_mount_path(&self) -> String {
        format!("{SYNC_MOUNT_ROOT}/{}", self.swap.deployment.container)
    }
}

/// Resolve `source` relative to the directory containing `manifest_path`.
///
/// Absolute sources are returned normalized. A relative `manifest_path` is
/// itself anchored at `cwd`. Purely lexical; the filesystem is not touched.
#[must_use]
pub fn resolve_source(source: &Path, manifest_path: &Path, cwd: &Path) -> PathBuf {
    if source.is_absolute() {
        return normalize(source);
    }
    let manifest_dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
    let base = if manifest_path.is_absolute() {
        manifest_dir.to_path_buf()
    } else {
        cwd.join(manifest_dir)
    };
    normalize(&base.join(source))
}

/// Lexically collapse `.` and `..` components.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
