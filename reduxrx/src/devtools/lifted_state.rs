use super::actions::devtools_types;
use super::DevToolsConfiguration;
use crate::Action;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A reducer panic captured while computing a state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("reducer panicked: {message}")]
pub struct ReducerPanic {
    pub message: String,
}

/// A recorded action with the time it was staged, in milliseconds since the
/// Unix epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct LiftedAction {
    pub action: Action,
    pub timestamp: i64,
}

impl LiftedAction {
    pub fn new(action: Action) -> Self {
        LiftedAction {
            action,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub(crate) fn init() -> Self {
        LiftedAction::new(Action::new(devtools_types::INIT))
    }

    pub(crate) fn paused() -> Self {
        LiftedAction::new(Action::new(devtools_types::PAUSED))
    }
}

/// The state computed after one staged action.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedState<S> {
    pub state: S,
    pub error: Option<ReducerPanic>,
}

impl<S> ComputedState<S> {
    pub fn new(state: S) -> Self {
        ComputedState { state, error: None }
    }
}

/// The history kept by an instrumented store.
///
/// `staged_action_ids[0]` is always the `@@INIT` entry. `computed_states[i]`
/// is the state after `staged_action_ids[i]`, and `current_state_index`
/// selects the state the store exposes; it is `None` until the store has
/// been initialized.
#[derive(Clone, Debug, PartialEq)]
pub struct LiftedState<S> {
    pub next_action_id: usize,
    pub actions_by_id: BTreeMap<usize, LiftedAction>,
    pub staged_action_ids: Vec<usize>,
    pub skipped_action_ids: BTreeSet<usize>,
    pub committed_state: S,
    pub current_state_index: Option<usize>,
    pub computed_states: Vec<ComputedState<S>>,
    pub is_locked: bool,
    pub is_paused: bool,
}

impl<S: Clone> LiftedState<S> {
    pub fn new(committed_state: S, config: &DevToolsConfiguration) -> Self {
        LiftedState {
            next_action_id: 1,
            actions_by_id: BTreeMap::from([(0, LiftedAction::init())]),
            staged_action_ids: vec![0],
            skipped_action_ids: BTreeSet::new(),
            committed_state,
            current_state_index: None,
            computed_states: Vec::new(),
            is_locked: config.should_start_locked,
            is_paused: !config.should_record_changes,
        }
    }

    /// The entry at the current index.
    pub fn current(&self) -> Option<&ComputedState<S>> {
        self.current_state_index
            .and_then(|index| self.computed_states.get(index))
    }

    pub fn current_state(&self) -> Option<&S> {
        self.current().map(|computed| &computed.state)
    }

    /// Position of `action_id` in the staged list.
    pub fn position_of(&self, action_id: usize) -> Option<usize> {
        self.staged_action_ids.iter().position(|id| *id == action_id)
    }

    pub fn is_skipped(&self, action_id: usize) -> bool {
        self.skipped_action_ids.contains(&action_id)
    }

    /// The staged action at `index`.
    pub fn action_at(&self, index: usize) -> Option<&LiftedAction> {
        self.staged_action_ids
            .get(index)
            .and_then(|id| self.actions_by_id.get(id))
    }

    /// Drops every staged action but the `@@INIT` entry.
    pub(crate) fn reset_history(&mut self) {
        self.actions_by_id = BTreeMap::from([(0, LiftedAction::init())]);
        self.next_action_id = 1;
        self.staged_action_ids = vec![0];
        self.skipped_action_ids.clear();
        self.current_state_index = Some(0);
        self.computed_states.clear();
    }

    pub(crate) fn is_at_tip(&self) -> bool {
        self.current_state_index
            .map_or(true, |index| index + 1 == self.staged_action_ids.len())
    }
}
