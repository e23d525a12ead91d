//! Session records and the persisted registry document.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::manifest::DevEnvironment;

/// Schema version stamped on every saved registry document.
pub const SCHEMA_VERSION: &str = "1.0";

const KEY_SEPARATOR: char = '/';

/// Identifies one development session: `<namespace>/<deployment>/<container>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derive the key for `dev` within `namespace`.
    #[must_use]
    pub fn new(namespace: &str, dev: &DevEnvironment) -> Self {
        let target = &dev.swap.deployment;
        Self(format!(
            "{namespace}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            target.name, target.container
        ))
    }

    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a stored session, derived from its agent handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// An agent is attached.
    Active,
    /// The record survives but no agent is attached.
    Stopped,
}

/// Persisted entry for one session key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Absolute host path of the synchronized source directory.
    #[serde(default)]
    pub folder: PathBuf,
    /// Opaque handle of the synchronization agent; empty when stopped.
    #[serde(default, alias = "syncthing")]
    pub agent_handle: String,
}

impl SessionRecord {
    /// Construct a record bound to `agent_handle`.
    #[must_use]
    pub fn new(folder: PathBuf, agent_handle: impl Into<String>) -> Self {
        Self {
            folder,
            agent_handle: agent_handle.into(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.agent_handle.is_empty() {
            SessionState::Stopped
        } else {
            SessionState::Active
        }
    }

    /// Whether inserting `incoming` over this record would steal a live session.
    #[must_use]
    pub fn conflicts_with(&self, incoming: &Self) -> bool {
        self.state() == SessionState::Active && self.agent_handle != incoming.agent_handle
    }
}

/// The persisted registry document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    /// Schema version of the document.
    #[serde(default = "current_schema_version", alias = "version")]
    pub schema_version: String,
    /// Session records keyed by session key, kept in key order.
    #[serde(default, alias = "services")]
    pub sessions: BTreeMap<SessionKey, SessionRecord>,
}

fn current_schema_version() -> String {
    SCHEMA_VERSION.into()
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            schema_version: current_schema_version(),
            sessions: BTreeMap::new(),
        }
    }
}
