//! # Option Registry
//!
//! The fixed table of options a session is willing to negotiate, and how
//! each side answers an unsolicited offer. Codes missing from the registry
//! are refused outright and never get an automaton.
//!
//! The registry is plain configuration: it is built (or deserialized) once
//! and handed to the session before the first byte is fed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::negotiation::Decision;
use crate::protocol::OptionIdentity;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("option {0} is listed more than once")]
    DuplicateOption(OptionIdentity),
}

/// Policy for one option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionPolicy {
    pub identity: OptionIdentity,
    /// Answer to the peer's unsolicited WILL
    pub remote: Decision,
    /// Answer to the peer's unsolicited DO
    pub local: Decision,
}

impl OptionPolicy {
    pub fn new(identity: OptionIdentity, remote: Decision, local: Decision) -> Self {
        Self {
            identity,
            remote,
            local,
        }
    }
}

/// Serialized form of an [`OptionPolicy`]
///
/// ```toml
/// [[options]]
/// code = 1
/// accept_remote = true
/// accept_local = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub code: u8,
    #[serde(default)]
    pub accept_remote: bool,
    #[serde(default)]
    pub accept_local: bool,
}

impl From<OptionEntry> for OptionPolicy {
    fn from(entry: OptionEntry) -> Self {
        OptionPolicy::new(
            OptionIdentity::from_code(entry.code),
            Decision::from_accept(entry.accept_remote),
            Decision::from_accept(entry.accept_local),
        )
    }
}

impl From<&OptionPolicy> for OptionEntry {
    fn from(policy: &OptionPolicy) -> Self {
        OptionEntry {
            code: policy.identity.code,
            accept_remote: policy.remote.accepts(),
            accept_local: policy.local.accepts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<OptionEntry>", into = "Vec<OptionEntry>")]
pub struct OptionRegistry {
    policies: BTreeMap<u8, OptionPolicy>,
}

impl Default for OptionRegistry {
    /// Options a MUD client is usually happy to run with
    fn default() -> Self {
        use Decision::{Accept, Refuse};

        let mut registry = Self::empty();
        for policy in [
            OptionPolicy::new(OptionIdentity::BINARY, Accept, Accept),
            OptionPolicy::new(OptionIdentity::ECHO, Accept, Refuse),
            OptionPolicy::new(OptionIdentity::SUPPRESS_GO_AHEAD, Accept, Accept),
            OptionPolicy::new(OptionIdentity::TERMINAL_TYPE, Refuse, Accept),
            OptionPolicy::new(OptionIdentity::END_OF_RECORD, Accept, Refuse),
        ] {
            registry.policies.insert(policy.identity.code, policy);
        }
        registry
    }
}

impl OptionRegistry {
    /// Registry that refuses everything
    pub fn empty() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    /// Build from a list of policies, rejecting duplicate codes
    pub fn from_policies(
        policies: impl IntoIterator<Item = OptionPolicy>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::empty();
        for policy in policies {
            if registry.policies.contains_key(&policy.identity.code) {
                return Err(RegistryError::DuplicateOption(policy.identity));
            }
            registry.policies.insert(policy.identity.code, policy);
        }
        Ok(registry)
    }

    /// Add or replace the policy for an option
    pub fn insert(&mut self, policy: OptionPolicy) -> Option<OptionPolicy> {
        self.policies.insert(policy.identity.code, policy)
    }

    pub fn get(&self, code: u8) -> Option<&OptionPolicy> {
        self.policies.get(&code)
    }

    pub fn contains(&self, code: u8) -> bool {
        self.policies.contains_key(&code)
    }

    /// Policies in ascending code order
    pub fn iter(&self) -> impl Iterator<Item = &OptionPolicy> {
        self.policies.values()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn entries(&self) -> Vec<OptionEntry> {
        self.iter().map(OptionEntry::from).collect()
    }
}

impl TryFrom<Vec<OptionEntry>> for OptionRegistry {
    type Error = RegistryError;

    fn try_from(entries: Vec<OptionEntry>) -> Result<Self, Self::Error> {
        Self::from_policies(entries.into_iter().map(OptionPolicy::from))
    }
}

impl From<OptionRegistry> for Vec<OptionEntry> {
    fn from(registry: OptionRegistry) -> Self {
        registry.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = OptionRegistry::default();
        assert_eq!(registry.len(), 5);

        let binary = registry.get(0).unwrap();
        assert_eq!(binary.identity, OptionIdentity::BINARY);
        assert!(binary.remote.accepts());
        assert!(binary.local.accepts());

        let echo = registry.get(OptionIdentity::ECHO.code).unwrap();
        assert_eq!(echo.remote, Decision::Accept);
        assert_eq!(echo.local, Decision::Refuse);

        assert!(!registry.contains(OptionIdentity::GMCP.code));
    }

    #[test]
    fn test_iteration_is_ordered_by_code() {
        let codes: Vec<u8> = OptionRegistry::default()
            .iter()
            .map(|p| p.identity.code)
            .collect();
        assert_eq!(codes, vec![0, 1, 3, 24, 25]);
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let entries = vec![
            OptionEntry {
                code: 1,
                accept_remote: true,
                accept_local: false,
            },
            OptionEntry {
                code: 1,
                accept_remote: false,
                accept_local: false,
            },
        ];
        assert_eq!(
            OptionRegistry::try_from(entries),
            Err(RegistryError::DuplicateOption(OptionIdentity::ECHO))
        );
    }

    #[test]
    fn test_entries_round_trip_policies() {
        let registry = OptionRegistry::default();
        let rebuilt = OptionRegistry::try_from(registry.entries()).unwrap();
        assert_eq!(rebuilt, registry);
    }

    #[test]
    fn test_insert_replaces() {
        let mut registry = OptionRegistry::empty();
        assert!(registry.is_empty());
        let policy = OptionPolicy::new(OptionIdentity::GMCP, Decision::Accept, Decision::Refuse);
        assert!(registry.insert(policy).is_none());
        let replaced = registry.insert(OptionPolicy::new(
            OptionIdentity::GMCP,
            Decision::Refuse,
            Decision::Refuse,
        ));
        assert_eq!(replaced, Some(policy));
        assert_eq!(registry.get(201).unwrap().remote, Decision::Refuse);
    }
}
