//! Ordered ledger of operator goals.

use crate::StateError;
use planner_core::{GoalRef, OperatorGoal, OperatorGoalType, OperatorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// A tracked goal with its focus flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OperatorGoalState {
    pub operator_id: OperatorId,
    pub goal: OperatorGoalType,
    #[serde(default)]
    pub focused: bool,
}

impl OperatorGoalState {
    /// Identity of this entry.
    pub fn key(&self) -> OperatorGoal {
        OperatorGoal {
            operator_id: self.operator_id.clone(),
            goal: self.goal,
        }
    }

    pub fn matches(&self, goal: &OperatorGoal) -> bool {
        self.goal == goal.goal && self.operator_id == goal.operator_id
    }
}

impl GoalRef for OperatorGoalState {
    fn operator_id(&self) -> &OperatorId {
        &self.operator_id
    }
    fn goal_type(&self) -> OperatorGoalType {
        self.goal
    }
}

/// Wire shape of the goal ledger.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoalsState {
    pub operators: Vec<OperatorGoalState>,
}

/// Goals in user order. No two entries share an `(operator, goal)` identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GoalsState", into = "GoalsState")]
pub struct GoalLedger {
    operators: Vec<OperatorGoalState>,
}

impl TryFrom<GoalsState> for GoalLedger {
    type Error = StateError;

    fn try_from(state: GoalsState) -> Result<Self, Self::Error> {
        GoalLedger::from_entries(state.operators)
    }
}

impl From<GoalLedger> for GoalsState {
    fn from(ledger: GoalLedger) -> Self {
        GoalsState {
            operators: ledger.operators,
        }
    }
}

impl GoalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from existing entries, rejecting duplicate identities.
    pub fn from_entries(entries: Vec<OperatorGoalState>) -> Result<Self, StateError> {
        let mut seen = BTreeSet::new();
        for e in &entries {
            if !seen.insert(e.key()) {
                return Err(StateError::DuplicateGoal {
                    operator: e.operator_id.clone(),
                    goal: e.goal,
                });
            }
        }
        Ok(Self { operators: entries })
    }

    pub fn entries(&self) -> &[OperatorGoalState] {
        &self.operators
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorGoalState> {
        self.operators.iter()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn contains(&self, goal: &OperatorGoal) -> bool {
        self.position_of(goal).is_some()
    }

    /// Index of `goal` in the underlying order.
    pub fn position_of(&self, goal: &OperatorGoal) -> Option<usize> {
        self.operators.iter().position(|e| e.matches(goal))
    }

    /// Focused entries paired with their underlying index, for callers that
    /// present a focused-only view and must translate indices back.
    pub fn focused(&self) -> impl Iterator<Item = (usize, &OperatorGoalState)> {
        self.operators.iter().enumerate().filter(|(_, e)| e.focused)
    }

    /// Append goals not already present, unfocused, in input order.
    /// Returns how many were added.
    pub fn add_goals<I>(&mut self, goals: I) -> usize
    where
        I: IntoIterator<Item = OperatorGoal>,
    {
        let before = self.operators.len();
        for goal in goals {
            if self.contains(&goal) {
                continue;
            }
            self.operators.push(OperatorGoalState {
                operator_id: goal.operator_id,
                goal: goal.goal,
                focused: false,
            });
        }
        self.operators.len() - before
    }

    /// Remove the entry with this identity. Returns whether one was removed.
    pub fn delete_goal(&mut self, goal: &OperatorGoal) -> bool {
        match self.position_of(goal) {
            Some(i) => {
                self.operators.remove(i);
                true
            }
            None => false,
        }
    }

    /// Flip the focus flag. Returns the new flag, or `None` if absent.
    pub fn toggle_focus(&mut self, goal: &OperatorGoal) -> Option<bool> {
        let entry = self.operators.iter_mut().find(|e| e.matches(goal))?;
        entry.focused = !entry.focused;
        Some(entry.focused)
    }

    /// Move the entry at `old_index` to `new_index`. Both are positions in the
    /// full ledger. Out-of-range indices leave the ledger unchanged.
    pub fn reorder_goal(&mut self, old_index: usize, new_index: usize) -> bool {
        let len = self.operators.len();
        if old_index >= len || new_index >= len {
            warn!(old_index, new_index, len, "reorder index out of range");
            return false;
        }
        let moved = self.operators.remove(old_index);
        self.operators.insert(new_index, moved);
        true
    }

    pub fn clear(&mut self) {
        self.operators.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn g(op: &str, goal: OperatorGoalType) -> OperatorGoal {
        OperatorGoal::new(op, goal)
    }

    fn ops(ledger: &GoalLedger) -> Vec<&str> {
        ledger.iter().map(|e| e.operator_id.0.as_str()).collect()
    }

    #[test]
    fn add_dedups_by_identity() {
        let mut ledger = GoalLedger::new();
        let amiya = g("char_002_amiya", OperatorGoalType::Elite1);
        assert_eq!(ledger.add_goals([amiya.clone()]), 1);
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.entries()[0].focused);
        assert_eq!(ledger.add_goals([amiya.clone()]), 0);
        assert_eq!(ledger.len(), 1);

        // Same operator, other goal is a distinct identity.
        ledger.add_goals([g("char_002_amiya", OperatorGoalType::Elite2), amiya]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn add_appends_in_order() {
        let mut ledger = GoalLedger::new();
        ledger.add_goals([g("a", OperatorGoalType::Elite1)]);
        ledger.add_goals([g("b", OperatorGoalType::Elite1), g("c", OperatorGoalType::Elite1)]);
        assert_eq!(ops(&ledger), vec!["a", "b", "c"]);
    }

    #[test]
    fn delete_matches_exact_identity() {
        let mut ledger = GoalLedger::new();
        ledger.add_goals([
            g("a", OperatorGoalType::Elite1),
            g("a", OperatorGoalType::Elite2),
            g("b", OperatorGoalType::Elite1),
        ]);
        assert!(ledger.delete_goal(&g("a", OperatorGoalType::Elite2)));
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&g("a", OperatorGoalType::Elite1)));
        assert!(ledger.contains(&g("b", OperatorGoalType::Elite1)));
        assert!(!ledger.delete_goal(&g("c", OperatorGoalType::Elite1)));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn toggle_focus_flips_one_entry() {
        let mut ledger = GoalLedger::new();
        ledger.add_goals([g("a", OperatorGoalType::Elite1), g("b", OperatorGoalType::Elite1)]);
        assert_eq!(ledger.toggle_focus(&g("b", OperatorGoalType::Elite1)), Some(true));
        let focused: Vec<usize> = ledger.focused().map(|(i, _)| i).collect();
        assert_eq!(focused, vec![1]);
        assert_eq!(ledger.toggle_focus(&g("b", OperatorGoalType::Elite1)), Some(false));
        assert_eq!(ledger.toggle_focus(&g("z", OperatorGoalType::Elite1)), None);
    }

    #[test]
    fn reorder_moves_element() {
        let mut ledger = GoalLedger::new();
        ledger.add_goals(["A", "B", "C"].map(|o| g(o, OperatorGoalType::Elite1)));
        assert!(ledger.reorder_goal(0, 2));
        assert_eq!(ops(&ledger), vec!["B", "C", "A"]);
        assert!(ledger.reorder_goal(2, 0));
        assert_eq!(ops(&ledger), vec!["A", "B", "C"]);
        assert!(!ledger.reorder_goal(0, 3));
        assert_eq!(ops(&ledger), vec!["A", "B", "C"]);
    }

    #[test]
    fn clear_empties_and_allows_re_adding() {
        let mut ledger = GoalLedger::new();
        ledger.add_goals([g("a", OperatorGoalType::Elite1), g("b", OperatorGoalType::Elite2)]);
        ledger.toggle_focus(&g("a", OperatorGoalType::Elite1));
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.focused().count(), 0);
        assert_eq!(ledger.add_goals([g("a", OperatorGoalType::Elite1)]), 1);
        assert!(!ledger.entries()[0].focused);
    }

    #[test]
    fn deserialize_rejects_duplicates_and_unknown_goal() {
        let dup = r#"{"operators":[
            {"operatorId":"a","goal":0,"focused":false},
            {"operatorId":"a","goal":0,"focused":true}]}"#;
        assert!(serde_json::from_str::<GoalLedger>(dup).is_err());

        let bad = r#"{"operators":[{"operatorId":"a","goal":99}]}"#;
        assert!(serde_json::from_str::<GoalLedger>(bad).is_err());

        let ok = r#"{"operators":[{"operatorId":"a","goal":3}]}"#;
        let ledger: GoalLedger = serde_json::from_str(ok).unwrap();
        assert_eq!(ledger.entries()[0].goal, OperatorGoalType::Skill1Mastery2);
    }

    fn goal_strategy() -> impl Strategy<Value = OperatorGoal> {
        (0usize..4, 0usize..17).prop_map(|(o, i)| {
            OperatorGoal::new(format!("op{o}"), OperatorGoalType::ALL[i])
        })
    }

    proptest! {
        #[test]
        fn ledger_never_holds_duplicates(
            batches in proptest::collection::vec(proptest::collection::vec(goal_strategy(), 0..8), 0..8)
        ) {
            let mut ledger = GoalLedger::new();
            for batch in batches {
                ledger.add_goals(batch);
            }
            let keys: BTreeSet<OperatorGoal> = ledger.iter().map(|e| e.key()).collect();
            prop_assert_eq!(keys.len(), ledger.len());
        }

        #[test]
        fn reorder_is_permutation(n in 1usize..12, a in 0usize..12, b in 0usize..12) {
            let (i, j) = (a % n, b % n);
            let mut ledger = GoalLedger::new();
            ledger.add_goals((0..n).map(|k| OperatorGoal::new(format!("op{k}"), OperatorGoalType::Elite1)));
            let before: BTreeSet<OperatorGoal> = ledger.iter().map(|e| e.key()).collect();
            let moved = ledger.entries()[i].key();
            prop_assert!(ledger.reorder_goal(i, j));
            let after: BTreeSet<OperatorGoal> = ledger.iter().map(|e| e.key()).collect();
            prop_assert_eq!(ledger.len(), n);
            prop_assert_eq!(before, after);
            prop_assert_eq!(ledger.entries()[j].key(), moved);
        }
    }
}
