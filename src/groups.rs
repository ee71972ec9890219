// Group labels and membership state
// The label set is a startup parameter; membership holds the invariant that
// a key lives in at most one group for the life of the process.

use crate::participant::ParticipantKey;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// GROUP CONFIG
// ============================================================================

/// The configured set of group labels, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    labels: Vec<String>,
}

impl GroupConfig {
    /// Build a config from label names. Blank or repeated labels are rejected.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if labels.is_empty() {
            bail!("at least one group label is required");
        }
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                bail!("group label {} is blank", i + 1);
            }
            if labels[..i].contains(label) {
                bail!("group label '{}' is repeated", label);
            }
        }

        Ok(GroupConfig { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ============================================================================
// GROUP STATE
// ============================================================================

/// Group membership: label -> member keys in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    config: GroupConfig,
    members: HashMap<String, Vec<ParticipantKey>>,
}

impl GroupState {
    pub fn new(config: GroupConfig) -> Self {
        let members = config
            .labels()
            .iter()
            .map(|label| (label.clone(), Vec::new()))
            .collect();

        GroupState { config, members }
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// The group this key already belongs to, if any.
    /// Scans labels in display order.
    pub fn group_of(&self, key: &ParticipantKey) -> Option<&str> {
        self.config
            .labels()
            .iter()
            .find(|label| self.members(label).contains(key))
            .map(String::as_str)
    }

    pub fn contains(&self, key: &ParticipantKey) -> bool {
        self.group_of(key).is_some()
    }

    /// Members of one group, empty for unknown labels
    pub fn members(&self, label: &str) -> &[ParticipantKey] {
        self.members.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, label: &str) -> usize {
        self.members(label).len()
    }

    pub fn total(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    /// Iterate (label, members) in display order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParticipantKey])> {
        self.config
            .labels
            .iter()
            .map(move |label| (label.as_str(), self.members(label)))
    }

    /// Guarded append: refuses unknown labels and keys already placed
    /// anywhere. Returns whether the key was actually inserted.
    pub(crate) fn insert(&mut self, label: &str, key: ParticipantKey) -> bool {
        if self.contains(&key) {
            return false;
        }
        match self.members.get_mut(label) {
            Some(members) => {
                members.push(key);
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
