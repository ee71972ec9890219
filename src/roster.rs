// Roster synchronizer - free-text edits in, stable wheel entries out
// The edited list is authoritative for membership; styles stick to keys that
// survive the edit so the wheel does not reshuffle colors on every keystroke.

use crate::participant::{Entry, ParticipantKey};
use rand::Rng;
use thiserror::Error;

/// Validation failures on the explicit add path
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RosterError {
    #[error("name is empty")]
    EmptyName,

    #[error("'{0}' is already on the wheel")]
    DuplicateName(String),
}

/// Rebuild the pending roster from the intended list of raw names.
///
/// Blank lines are dropped. A key already present in `current` keeps its
/// style and takes the latest raw casing as its display name; a new key gets
/// a fresh style. Keys missing from `intended` are removed. When the same
/// key appears twice the first occurrence wins.
pub fn reconcile<R: Rng>(intended: &[&str], current: &[Entry], rng: &mut R) -> Vec<Entry> {
    let mut next: Vec<Entry> = Vec::with_capacity(intended.len());

    for raw in intended {
        let Some(key) = ParticipantKey::new(raw) else {
            continue;
        };
        if next.iter().any(|entry| entry.key == key) {
            continue;
        }

        match current.iter().find(|entry| entry.key == key) {
            Some(existing) => next.push(Entry {
                key,
                display_name: raw.trim().to_string(),
                style: existing.style.clone(),
            }),
            None => {
                if let Some(entry) = Entry::new(raw, rng) {
                    next.push(entry);
                }
            }
        }
    }

    next
}

/// Append one name via the explicit add path
pub fn add_one<R: Rng>(raw: &str, current: &[Entry], rng: &mut R) -> Result<Vec<Entry>, RosterError> {
    let entry = Entry::new(raw, rng).ok_or(RosterError::EmptyName)?;

    if current.iter().any(|existing| existing.key == entry.key) {
        return Err(RosterError::DuplicateName(entry.display_name));
    }

    let mut next = current.to_vec();
    next.push(entry);
    Ok(next)
}

/// Drop the entry whose assignment was just committed
pub fn remove_committed(current: &[Entry], key: &ParticipantKey) -> Vec<Entry> {
    current
        .iter()
        .filter(|entry| &entry.key != key)
        .cloned()
        .collect()
}

/// Text view of the roster, one display name per line.
/// Keeps the editable text and the wheel from ever diverging.
pub fn to_text(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|entry| entry.display_name.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// TESTS
// ============================================================================
