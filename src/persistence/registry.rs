//! Session registry backed by a single YAML state file.
//!
//! Every operation reads the document fresh. Mutations run under
//! [`StateLock`] and only write when the document actually changed.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::models::manifest::{normalize, DevEnvironment};
use crate::models::session::{Registry, SessionKey, SessionRecord, SCHEMA_VERSION};
use crate::{AppError, Result};

use super::state_file::{self, StateLock};

/// Handle to the persisted session registry at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    path: PathBuf,
}

impl SessionRegistry {
    /// Create a registry persisted at `path`. Nothing is read until the
    /// first operation.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the registry document.
    ///
    /// A missing or blank file yields an empty registry at the current
    /// schema version.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file exists but cannot be read and
    /// `AppError::Decode` if it is malformed.
    pub fn load(&self) -> Result<Registry> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Registry::default()),
            Err(err) => {
                return Err(AppError::Io(format!(
                    "error reading the state file {}: {err}",
                    self.path.display()
                )));
            }
        };

        if raw.trim().is_empty() {
            return Ok(Registry::default());
        }

        let registry: Registry = serde_yaml::from_str(&raw).map_err(|err| {
            AppError::Decode(format!(
                "error decoding the state file {}: {err}",
                self.path.display()
            ))
        })?;

        if registry.schema_version != SCHEMA_VERSION {
            warn!(
                path = %self.path.display(),
                found = %registry.schema_version,
                expected = SCHEMA_VERSION,
                "state file has a different schema version; it will be rewritten on save"
            );
        }

        Ok(registry)
    }

    /// Overwrite the state file with `registry`, stamping the current
    /// schema version.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be written.
    pub fn save(&self, registry: &Registry) -> Result<()> {
        let mut document = registry.clone();
        document.schema_version = SCHEMA_VERSION.into();

        let yaml = serde_yaml::to_string(&document)
            .map_err(|err| AppError::Io(format!("error encoding state: {err}")))?;
        state_file::write_atomic(&self.path, yaml.as_bytes())
    }

    /// Record that `agent_handle` is serving the session for `dev`.
    ///
    /// Re-inserting an identical record is a no-op. A stopped session is
    /// reactivated.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyRunning` if a different agent is attached
    /// to the session, leaving the record untouched. Propagates load and
    /// save failures.
    pub fn insert(&self, namespace: &str, dev: &DevEnvironment, agent_handle: &str) -> Result<()> {
        let key = SessionKey::new(namespace, dev);
        let record = SessionRecord::new(absolute_folder(&dev.mount.source)?, agent_handle);

        self.update(|registry| {
            if let Some(existing) = registry.sessions.get(&key) {
                if *existing == record {
                    debug!(%key, "session already registered");
                    return Ok(false);
                }
                if existing.conflicts_with(&record) {
                    return Err(AppError::AlreadyRunning(key.to_string()));
                }
            }

            info!(%key, folder = %record.folder.display(), "session registered");
            registry.sessions.insert(key, record);
            Ok(true)
        })
    }

    /// Fetch the record for `dev` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no session is recorded for the key.
    pub fn get(&self, namespace: &str, dev: &DevEnvironment) -> Result<SessionRecord> {
        let key = SessionKey::new(namespace, dev);
        let mut registry = self.load()?;
        registry.sessions.remove(&key).ok_or_else(|| {
            AppError::NotFound(format!("no development environment registered for '{key}'"))
        })
    }

    /// Detach the agent from the session for `dev`, keeping its folder.
    /// Succeeds without writing when no record exists.
    ///
    /// # Errors
    ///
    /// Propagates load and save failures.
    pub fn stop(&self, namespace: &str, dev: &DevEnvironment) -> Result<()> {
        let key = SessionKey::new(namespace, dev);
        self.update(|registry| {
            let Some(record) = registry.sessions.get_mut(&key) else {
                debug!(%key, "stop requested for unknown session");
                return Ok(false);
            };
            record.agent_handle.clear();
            info!(%key, "session stopped");
            Ok(true)
        })
    }

    /// Remove the session for `dev`. Absent records are not an error.
    ///
    /// # Errors
    ///
    /// Propagates load and save failures.
    pub fn delete(&self, namespace: &str, dev: &DevEnvironment) -> Result<()> {
        let key = SessionKey::new(namespace, dev);
        self.update(|registry| {
            if registry.sessions.remove(&key).is_some() {
                info!(%key, "session deleted");
            }
            Ok(true)
        })
    }

    /// All recorded sessions.
    ///
    /// # Errors
    ///
    /// Propagates load failures.
    pub fn all(&self) -> Result<BTreeMap<SessionKey, SessionRecord>> {
        Ok(self.load()?.sessions)
    }

    /// All recorded sessions, or an empty map if the state file cannot be
    /// loaded.
    ///
    /// A broken state file is indistinguishable from "nothing running" to
    /// the caller; the failure is only visible in the warning log. Prefer
    /// [`SessionRegistry::all`] unless listing must never fail.
    #[must_use]
    pub fn all_or_empty(&self) -> BTreeMap<SessionKey, SessionRecord> {
        match self.all() {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to load state file, listing no sessions");
                BTreeMap::new()
            }
        }
    }

    /// Load, mutate and save under the registry lock. `mutate` returns
    /// whether the document changed.
    fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Registry) -> Result<bool>,
    {
        let _lock = StateLock::acquire(&self.path)?;
        let mut registry = self.load()?;
        if mutate(&mut registry)? {
            self.save(&registry)?;
        }
        Ok(())
    }
}

/// Absolute form of a mount source, anchored at the working directory.
fn absolute_folder(source: &Path) -> Result<PathBuf> {
    if source.is_absolute() {
        return Ok(normalize(source));
    }
    let cwd = env::current_dir()
        .map_err(|err| AppError::Io(format!("cannot read working directory: {err}")))?;
    Ok(normalize(&cwd.join(source)))
}
