//! `.charter/config.toml` loading.
//!
//! Every field is optional; a missing file yields [`CharterConfig::default`].

use crate::core::error::CharterError;
use crate::plugins::registry::{RoleRegistry, VoterRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CharterConfig {
    /// Framework version stamped into new proposals.
    pub framework_version: String,
    /// Accept unregistered identities that pass the eligibility heuristic.
    pub allow_unregistered: bool,
    /// Identity -> role.
    pub voters: BTreeMap<String, VoterRole>,
}

impl Default for CharterConfig {
    fn default() -> Self {
        Self {
            framework_version: env!("CARGO_PKG_VERSION").to_string(),
            allow_unregistered: true,
            voters: BTreeMap::new(),
        }
    }
}

impl CharterConfig {
    pub fn load(path: &Path) -> Result<Self, CharterError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|e| match e {
            CharterError::ConfigError(msg) => {
                CharterError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, CharterError> {
        toml::from_str(raw).map_err(|e| CharterError::ConfigError(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, CharterError> {
        toml::to_string_pretty(self).map_err(|e| CharterError::ConfigError(e.to_string()))
    }

    pub fn registry(&self) -> RoleRegistry {
        let mut registry = RoleRegistry::new().allow_unregistered(self.allow_unregistered);
        for (voter, role) in &self.voters {
            registry.register(voter, *role);
        }
        registry
    }
}
