// Orchestration reducer - one event in, redraw directives out
// All mutable state lives behind this layer; the wheel widget and the
// presentation surface only exchange events and directives with it.

use crate::engine::{AssignmentEngine, SpinError};
use crate::groups::GroupConfig;
use crate::overrides::OverrideTable;
use crate::participant::{Entry, ParticipantKey};
use crate::roster::{self, RosterError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

// ============================================================================
// EVENTS & DIRECTIVES
// ============================================================================

/// External happenings the core reacts to, one at a time
#[derive(Debug, Clone)]
pub enum Event {
    /// The free-text editor changed; the raw blob is authoritative
    TextEdited(String),

    /// The add button was pressed with this raw name
    AddRequested(String),

    /// The wheel stopped on this index into the pending roster
    SpinResolved(usize),

    /// The announcement was confirmed
    ConfirmRequested,

    /// The announcement was closed without confirming
    DismissRequested,

    /// A (re)load of the override table finished
    OverridesLoaded(OverrideTable),
}

/// What the presentation surface should redraw after an event
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Redraw the wheel and the editable text view
    ShowPending { entries: Vec<Entry>, text: String },

    /// Redraw group membership, (label, members) in display order
    ShowGroups(Vec<(String, Vec<ParticipantKey>)>),

    /// Show the post-spin announcement
    ShowAnnouncement {
        name: String,
        group: Option<String>,
        conflict: Option<String>,
    },

    /// Surface a validation failure from the add path
    ShowValidationError(RosterError),
}

// ============================================================================
// APP
// ============================================================================

/// Single-owner application state, advanced one event at a time.
/// No operation blocks; each event runs to completion before the next.
pub struct App<R: Rng = StdRng> {
    engine: AssignmentEngine,
    pending: Vec<Entry>,
    text: String,
    rng: R,
}

impl App<StdRng> {
    pub fn new(config: GroupConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> App<R> {
    /// Build with an injected randomness source so tests can pin outcomes
    pub fn with_rng(config: GroupConfig, rng: R) -> Self {
        App {
            engine: AssignmentEngine::new(config),
            pending: Vec::new(),
            text: String::new(),
            rng,
        }
    }

    pub fn engine(&self) -> &AssignmentEngine {
        &self.engine
    }

    pub fn pending(&self) -> &[Entry] {
        &self.pending
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Size of the pool the selector spins over
    pub fn pool_size(&self) -> usize {
        self.pending.len()
    }

    /// Advance the state machine by one event
    pub fn apply(&mut self, event: Event) -> Vec<Directive> {
        match event {
            Event::TextEdited(raw) => {
                let intended: Vec<&str> = raw.lines().collect();
                self.pending = roster::reconcile(&intended, &self.pending, &mut self.rng);
                self.text = raw;
                vec![self.show_pending()]
            }

            Event::AddRequested(raw) => {
                match roster::add_one(&raw, &self.pending, &mut self.rng) {
                    Ok(next) => {
                        self.pending = next;
                        self.text = roster::to_text(&self.pending);
                        vec![self.show_pending()]
                    }
                    Err(err) => vec![Directive::ShowValidationError(err)],
                }
            }

            Event::SpinResolved(index) => {
                let Some(entry) = self.pending.get(index).cloned() else {
                    // Contract violation by the selector: refuse, do not throw
                    warn!(
                        index,
                        pool = self.pending.len(),
                        "selector produced an out-of-range index, ignoring"
                    );
                    return Vec::new();
                };

                match self
                    .engine
                    .propose(&entry.display_name, entry.key.clone(), &mut self.rng)
                {
                    Ok(proposal) => {
                        let conflict = proposal.already_assigned.as_ref().map(|group| {
                            format!(
                                "{} is already in group {}, not added again",
                                proposal.display_name, group
                            )
                        });
                        vec![Directive::ShowAnnouncement {
                            name: proposal.display_name,
                            group: proposal.target,
                            conflict,
                        }]
                    }
                    Err(SpinError::Busy) => {
                        warn!("spin resolved while a proposal is outstanding, ignoring");
                        Vec::new()
                    }
                }
            }

            Event::ConfirmRequested => match self.engine.commit() {
                Some(key) => {
                    self.pending = roster::remove_committed(&self.pending, &key);
                    self.text = roster::to_text(&self.pending);
                    vec![self.show_groups(), self.show_pending()]
                }
                // Conflict acknowledgement or stray confirm: nothing changed
                None => Vec::new(),
            },

            Event::DismissRequested => {
                self.engine.dismiss();
                Vec::new()
            }

            Event::OverridesLoaded(table) => {
                self.engine.set_overrides(table);
                Vec::new()
            }
        }
    }

    fn show_pending(&self) -> Directive {
        Directive::ShowPending {
            entries: self.pending.clone(),
            text: self.text.clone(),
        }
    }

    fn show_groups(&self) -> Directive {
        Directive::ShowGroups(
            self.engine
                .groups()
                .iter()
                .map(|(label, members)| (label.to_string(), members.to_vec()))
                .collect(),
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
