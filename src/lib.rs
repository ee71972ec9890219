// Group Draw - Core Library
// Random wheel selection into balanced groups, with an externally supplied
// override table and a free-text pending roster.

pub mod app;
pub mod engine;
pub mod groups;
pub mod overrides;
pub mod participant;
pub mod roster;

// Re-export commonly used types
pub use app::{App, Directive, Event};
pub use engine::{AssignmentEngine, Proposal, SpinError};
pub use groups::{GroupConfig, GroupState};
pub use overrides::{
    load, load_csv, load_or_keep, OverrideSource, OverrideTable, DEFAULT_SHEET_RANGE,
};
pub use participant::{Entry, ParticipantKey, SegmentStyle};
pub use roster::{add_one, reconcile, remove_committed, to_text, RosterError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
