// ⚙️ Assignment engine - override resolution, load-balanced tie-break,
// duplicate detection
//
// propose() never mutates group state. commit() is the single mutation point
// and absorbs a duplicate invocation without double-inserting.

use crate::groups::{GroupConfig, GroupState};
use crate::overrides::OverrideTable;
use crate::participant::ParticipantKey;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// PROPOSAL
// ============================================================================

/// Outcome of one selection round, awaiting confirmation.
/// Exactly one proposal is live at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub key: ParticipantKey,

    /// Raw casing for the announcement
    pub display_name: String,

    /// Group to join on commit; None when the participant is already placed
    pub target: Option<String>,

    /// Group the participant already belongs to, if any
    pub already_assigned: Option<String>,
}

impl Proposal {
    /// True when this round re-selected someone already in a group
    pub fn is_conflict(&self) -> bool {
        self.already_assigned.is_some()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpinError {
    /// A prior proposal is still awaiting confirmation or dismissal
    #[error("a proposal is already awaiting confirmation")]
    Busy,
}

// ============================================================================
// ASSIGNMENT ENGINE
// ============================================================================

/// Owns group membership, the current override table, and the zero-or-one
/// live proposal.
pub struct AssignmentEngine {
    groups: GroupState,
    overrides: OverrideTable,
    live: Option<Proposal>,
}

impl AssignmentEngine {
    pub fn new(config: GroupConfig) -> Self {
        AssignmentEngine {
            groups: GroupState::new(config),
            overrides: OverrideTable::default(),
            live: None,
        }
    }

    pub fn groups(&self) -> &GroupState {
        &self.groups
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    pub fn live_proposal(&self) -> Option<&Proposal> {
        self.live.as_ref()
    }

    /// Swap the override table for future proposals.
    /// Assignments committed under the old table are untouched.
    pub fn set_overrides(&mut self, table: OverrideTable) {
        self.overrides = table;
    }

    /// Decide where the selected participant would go, without moving anyone.
    ///
    /// Resolution order:
    /// 1. already in a group -> conflict report, no target
    /// 2. override table hit -> that label, unconditionally
    /// 3. uniform pick among the groups tied at the minimum member count
    pub fn propose<R: Rng>(
        &mut self,
        display_name: &str,
        key: ParticipantKey,
        rng: &mut R,
    ) -> Result<Proposal, SpinError> {
        if self.live.is_some() {
            return Err(SpinError::Busy);
        }

        let proposal = if let Some(group) = self.groups.group_of(&key) {
            Proposal {
                key,
                display_name: display_name.to_string(),
                target: None,
                already_assigned: Some(group.to_string()),
            }
        } else {
            let target = match self.overrides.get(&key) {
                Some(group) => group.to_string(),
                None => self.balanced_pick(rng),
            };
            Proposal {
                key,
                display_name: display_name.to_string(),
                target: Some(target),
                already_assigned: None,
            }
        };

        self.live = Some(proposal.clone());
        Ok(proposal)
    }

    /// Uniform choice among the groups whose count equals the minimum,
    /// computed over the full configured label set.
    fn balanced_pick<R: Rng>(&self, rng: &mut R) -> String {
        let labels = self.groups.config().labels();
        let min = labels
            .iter()
            .map(|label| self.groups.count(label))
            .min()
            .unwrap_or(0);

        let candidates: Vec<&String> = labels
            .iter()
            .filter(|label| self.groups.count(label) == min)
            .collect();

        candidates[rng.gen_range(0..candidates.len())].clone()
    }

    /// Finalize the live proposal.
    ///
    /// Returns the key to drop from the pending roster, or None when there
    /// was nothing to add (conflict proposal, duplicate commit, or no live
    /// proposal at all).
    pub fn commit(&mut self) -> Option<ParticipantKey> {
        let proposal = self.live.take()?;
        let target = proposal.target?;

        // Re-check membership; a stale proposal must not double-insert
        self.groups.insert(&target, proposal.key.clone());

        Some(proposal.key)
    }

    /// Drop the live proposal without touching group state
    pub fn dismiss(&mut self) -> Option<Proposal> {
        self.live.take()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine(labels: &[&str]) -> AssignmentEngine {
        AssignmentEngine::new(GroupConfig::new(labels.to_vec()).unwrap())
    }

    fn key(raw: &str) -> ParticipantKey {
        ParticipantKey::new(raw).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    /// Scenario A: empty groups, empty overrides -> any group, count 1 after
    /// commit
    #[test]
    fn test_all_tied_pick_lands_in_configured_set() {
        let mut engine = engine(&["A", "B", "C"]);
        let mut rng = rng();

        let proposal = engine.propose("alice", key("alice"), &mut rng).unwrap();
        let target = proposal.target.clone().unwrap();
        assert!(["A", "B", "C"].contains(&target.as_str()));
        assert!(proposal.already_assigned.is_none());

        // Nothing moved until commit
        assert_eq!(engine.groups().total(), 0);

        let removed = engine.commit().unwrap();
        assert_eq!(removed, key("alice"));
        assert_eq!(engine.groups().count(&target), 1);
        assert_eq!(engine.groups().total(), 1);
    }

    /// Scenario B: override wins even when its group is not minimal
    #[test]
    fn test_override_beats_balancing() {
        let mut engine = engine(&["A", "B", "C"]);
        let mut rng = rng();

        // Load B up so it is clearly not the minimum
        let mut prefilled = GroupStateFixture::new(&mut engine);
        prefilled.put("B", &["p1", "p2"]);

        engine.set_overrides(OverrideTable::from_rows(
            [("bob", "B")],
            engine.groups().config(),
        ));

        let proposal = engine.propose("bob", key("bob"), &mut rng).unwrap();
        assert_eq!(proposal.target.as_deref(), Some("B"));
    }

    /// Scenario C: re-selected participant is reported, nothing mutates
    #[test]
    fn test_conflict_is_reported_without_mutation() {
        let mut engine = engine(&["A", "B", "C"]);
        let mut rng = rng();

        let mut fixture = GroupStateFixture::new(&mut engine);
        fixture.put("A", &["carol"]);

        let proposal = engine.propose("Carol", key("Carol"), &mut rng).unwrap();
        assert_eq!(proposal.already_assigned.as_deref(), Some("A"));
        assert!(proposal.target.is_none());
        assert!(proposal.is_conflict());
        assert_eq!(engine.groups().total(), 1);

        // Committing a conflict proposal adds nothing and removes nothing
        assert_eq!(engine.commit(), None);
        assert_eq!(engine.groups().total(), 1);
    }

    #[test]
    fn test_balanced_pick_always_hits_minimum() {
        let mut engine = engine(&["A", "B", "C", "D"]);
        let mut rng = rng();

        let mut fixture = GroupStateFixture::new(&mut engine);
        fixture.put("A", &["a1", "a2"]);
        fixture.put("B", &["b1"]);
        fixture.put("C", &["c1"]);
        // D empty: the unique minimum

        for i in 0..50 {
            let name = format!("fresh{}", i);
            let proposal = engine.propose(&name, key(&name), &mut rng).unwrap();
            assert_eq!(proposal.target.as_deref(), Some("D"));
            engine.dismiss();
        }
    }

    #[test]
    fn test_tie_break_reaches_every_tied_group() {
        let mut engine = engine(&["A", "B", "C"]);
        let mut rng = rng();

        let mut seen = std::collections::HashSet::new();
        for i in 0..200 {
            let name = format!("p{}", i);
            let proposal = engine.propose(&name, key(&name), &mut rng).unwrap();
            seen.insert(proposal.target.clone().unwrap());
            engine.dismiss();
        }

        // All three tied at zero, so chance must reach each of them
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_second_propose_while_live_is_refused() {
        let mut engine = engine(&["A", "B"]);
        let mut rng = rng();

        engine.propose("eve", key("eve"), &mut rng).unwrap();
        let second = engine.propose("frank", key("frank"), &mut rng);

        assert_eq!(second, Err(SpinError::Busy));
        assert_eq!(engine.live_proposal().unwrap().key, key("eve"));
    }

    #[test]
    fn test_commit_is_idempotent() {
        let mut engine = engine(&["A", "B"]);
        let mut rng = rng();

        engine.propose("grace", key("grace"), &mut rng).unwrap();
        let first = engine.commit();
        let second = engine.commit();

        assert_eq!(first, Some(key("grace")));
        assert_eq!(second, None);
        assert_eq!(engine.groups().total(), 1);
    }

    #[test]
    fn test_commit_without_proposal_is_a_noop() {
        let mut engine = engine(&["A", "B"]);
        assert_eq!(engine.commit(), None);
        assert_eq!(engine.groups().total(), 0);
    }

    #[test]
    fn test_dismiss_leaves_state_unchanged() {
        let mut engine = engine(&["A", "B"]);
        let mut rng = rng();

        engine.propose("heidi", key("heidi"), &mut rng).unwrap();
        let dismissed = engine.dismiss().unwrap();

        assert_eq!(dismissed.key, key("heidi"));
        assert_eq!(engine.groups().total(), 0);
        assert!(engine.live_proposal().is_none());

        // The slot is free again
        assert!(engine.propose("heidi", key("heidi"), &mut rng).is_ok());
    }

    #[test]
    fn test_late_override_swap_applies_to_future_rounds_only() {
        let mut engine = engine(&["A", "B"]);
        let mut rng = rng();

        engine.propose("ivan", key("ivan"), &mut rng).unwrap();
        engine.commit();
        let placed = engine.groups().group_of(&key("ivan")).unwrap().to_string();

        // Table arrives after the fact, pointing ivan elsewhere
        let other = if placed == "A" { "B" } else { "A" };
        engine.set_overrides(OverrideTable::from_rows(
            [("ivan", other)],
            engine.groups().config(),
        ));

        // Committed state is untouched and a re-spin reports the conflict
        assert_eq!(engine.groups().group_of(&key("ivan")).unwrap(), placed);
        let proposal = engine.propose("ivan", key("ivan"), &mut rng).unwrap();
        assert_eq!(proposal.already_assigned.as_deref(), Some(placed.as_str()));
    }

    #[test]
    fn test_at_most_one_group_over_many_rounds() {
        let mut engine = engine(&["A", "B", "C"]);
        let mut rng = rng();

        let names = ["n1", "n2", "n3", "n1", "n2", "n4"];
        for name in names {
            if engine.propose(name, key(name), &mut rng).is_ok() {
                engine.commit();
            }
        }

        // Re-selected names were conflicts; each key sits in exactly one group
        assert_eq!(engine.groups().total(), 4);
        for name in ["n1", "n2", "n3", "n4"] {
            let homes: Vec<&str> = engine
                .groups()
                .iter()
                .filter(|(_, members)| members.contains(&key(name)))
                .map(|(label, _)| label)
                .collect();
            assert_eq!(homes.len(), 1, "{} should live in exactly one group", name);
        }
    }

    /// Drives propose/commit to preload groups without reaching into
    /// private state.
    struct GroupStateFixture<'a> {
        engine: &'a mut AssignmentEngine,
    }

    impl<'a> GroupStateFixture<'a> {
        fn new(engine: &'a mut AssignmentEngine) -> Self {
            GroupStateFixture { engine }
        }

        fn put(&mut self, label: &str, names: &[&str]) {
            let config = self.engine.groups().config().clone();
            for name in names {
                let prior = self.engine.overrides().clone();
                self.engine
                    .set_overrides(OverrideTable::from_rows([(*name, label)], &config));
                let mut rng = StdRng::seed_from_u64(0);
                self.engine.propose(name, key(name), &mut rng).unwrap();
                self.engine.commit();
                self.engine.set_overrides(prior);
            }
        }
    }
}
