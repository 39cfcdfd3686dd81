//! Voter weighting and eligibility.
//!
//! The workflow only sees the [`VoterRegistry`] trait, so the role table and
//! the unregistered-identity heuristic below can be swapped for a real
//! membership check without touching any transition.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub trait VoterRegistry: Send + Sync {
    fn weight_of(&self, voter: &str) -> u32;
    fn is_eligible(&self, voter: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoterRole {
    Maintainer,
    Contributor,
    Community,
}

impl VoterRole {
    pub fn weight(self) -> u32 {
        match self {
            VoterRole::Maintainer => 3,
            VoterRole::Contributor => 2,
            VoterRole::Community => 1,
        }
    }
}

pub const UNREGISTERED_WEIGHT: u32 = 1;

/// Heuristic for identities that are not in the role table: anything that
/// looks like an email address or is longer than three characters.
pub fn looks_like_voter(voter: &str) -> bool {
    voter.contains('@') || voter.chars().count() > 3
}

#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: FxHashMap<String, VoterRole>,
    allow_unregistered: bool,
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self {
            roles: FxHashMap::default(),
            allow_unregistered: true,
        }
    }

    pub fn allow_unregistered(mut self, allow: bool) -> Self {
        self.allow_unregistered = allow;
        self
    }

    pub fn with_voter(mut self, voter: &str, role: VoterRole) -> Self {
        self.register(voter, role);
        self
    }

    pub fn register(&mut self, voter: &str, role: VoterRole) {
        self.roles.insert(voter.to_string(), role);
    }

    pub fn role_of(&self, voter: &str) -> Option<VoterRole> {
        self.roles.get(voter).copied()
    }
}

impl VoterRegistry for RoleRegistry {
    fn weight_of(&self, voter: &str) -> u32 {
        self.role_of(voter)
            .map(VoterRole::weight)
            .unwrap_or(UNREGISTERED_WEIGHT)
    }

    fn is_eligible(&self, voter: &str) -> bool {
        if self.roles.contains_key(voter) {
            return true;
        }
        self.allow_unregistered && looks_like_voter(voter)
    }
}
