use super::actions::{is_global_init, DevToolsAction};
use super::lifted_state::{ComputedState, LiftedAction, LiftedState, ReducerPanic};
use super::DevToolsConfiguration;
use crate::error::panic_message;
use crate::{Action, Reducer, State};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Turns `reducer` into a reducer of the whole [`LiftedState`].
///
/// Application actions must arrive wrapped in
/// [`DevToolsAction::PerformAction`]; see [`DevToolsAction::lift`].
pub fn lift_reducer_with<S: State>(
    reducer: Reducer<S>,
    initial_committed_state: S,
    config: &DevToolsConfiguration,
) -> Reducer<LiftedState<S>> {
    let lifter = Lifter {
        reducer,
        initial_committed_state,
        max_age: config.max_age,
        catch_panics: config.should_catch_exceptions,
    };
    Arc::new(move |lifted: LiftedState<S>, action: &Action| lifter.reduce(lifted, action))
}

struct Lifter<S> {
    reducer: Reducer<S>,
    initial_committed_state: S,
    max_age: usize,
    catch_panics: bool,
}

impl<S: State> Lifter<S> {
    fn reduce(&self, mut lifted: LiftedState<S>, action: &Action) -> LiftedState<S> {
        let min_invalidated = if is_global_init(action) {
            lifted.committed_state = self.current_or_initial(&lifted);
            lifted.reset_history();
            0
        } else {
            let Some(command) = DevToolsAction::from_action(action) else {
                return self.recompute(lifted, usize::MAX);
            };
            match command {
                DevToolsAction::PerformAction(inner) => {
                    if lifted.is_locked {
                        return lifted;
                    }
                    if lifted.is_paused {
                        return self.compute_paused(lifted, Some(inner));
                    }
                    let recorded = lifted.staged_action_ids.len() - 1;
                    if self.max_age > 0 && recorded >= self.max_age {
                        lifted = self.commit_excess(lifted, recorded - self.max_age + 1);
                    }
                    let at_tip = lifted.is_at_tip();
                    let action_id = lifted.next_action_id;
                    lifted.next_action_id += 1;
                    lifted
                        .actions_by_id
                        .insert(action_id, LiftedAction::new(inner.clone()));
                    lifted.staged_action_ids.push(action_id);
                    if at_tip {
                        lifted.current_state_index = Some(lifted.staged_action_ids.len() - 1);
                    }
                    lifted.staged_action_ids.len() - 1
                }
                DevToolsAction::Reset => {
                    lifted.committed_state = self.initial_committed_state.clone();
                    lifted.reset_history();
                    0
                }
                DevToolsAction::Rollback => {
                    lifted.reset_history();
                    0
                }
                DevToolsAction::Commit => {
                    if let Some(state) = lifted.current_state().cloned() {
                        lifted.committed_state = state;
                    }
                    lifted.reset_history();
                    0
                }
                DevToolsAction::Toggle { start, end, active } => {
                    let range = *start.min(end)..=*start.max(end);
                    if *active {
                        lifted.skipped_action_ids.retain(|id| !range.contains(id));
                    } else {
                        let staged = lifted
                            .staged_action_ids
                            .iter()
                            .filter(|id| **id != 0 && range.contains(*id));
                        lifted.skipped_action_ids.extend(staged);
                    }
                    lifted
                        .staged_action_ids
                        .iter()
                        .position(|id| range.contains(id))
                        .unwrap_or(usize::MAX)
                }
                DevToolsAction::Sweep => {
                    let first_removed = lifted
                        .staged_action_ids
                        .iter()
                        .position(|id| lifted.skipped_action_ids.contains(id));
                    let skipped = std::mem::take(&mut lifted.skipped_action_ids);
                    lifted.staged_action_ids.retain(|id| !skipped.contains(id));
                    lifted.actions_by_id.retain(|id, _| !skipped.contains(id));
                    let last = lifted.staged_action_ids.len() - 1;
                    lifted.current_state_index = lifted.current_state_index.map(|index| index.min(last));
                    first_removed.unwrap_or(usize::MAX)
                }
                DevToolsAction::JumpToState(index) => {
                    if *index < lifted.staged_action_ids.len() {
                        lifted.current_state_index = Some(*index);
                    }
                    usize::MAX
                }
                DevToolsAction::JumpToAction(action_id) => {
                    if let Some(index) = lifted.position_of(*action_id) {
                        lifted.current_state_index = Some(index);
                    }
                    usize::MAX
                }
                DevToolsAction::LockChanges(locked) => {
                    lifted.is_locked = *locked;
                    usize::MAX
                }
                DevToolsAction::PauseRecording(true) => {
                    if lifted.is_paused {
                        return lifted;
                    }
                    lifted.is_paused = true;
                    return self.compute_paused(lifted, None);
                }
                DevToolsAction::PauseRecording(false) => {
                    lifted.is_paused = false;
                    lifted.committed_state = self.current_or_initial(&lifted);
                    lifted.reset_history();
                    0
                }
            }
        };
        self.recompute(lifted, min_invalidated)
    }

    fn current_or_initial(&self, lifted: &LiftedState<S>) -> S {
        lifted
            .current_state()
            .cloned()
            .unwrap_or_else(|| self.initial_committed_state.clone())
    }

    /// Recomputes the states from `min_invalidated` on, reusing the ones before.
    fn recompute(&self, mut lifted: LiftedState<S>, min_invalidated: usize) -> LiftedState<S> {
        let staged = lifted.staged_action_ids.len();
        if min_invalidated >= lifted.computed_states.len() && lifted.computed_states.len() == staged {
            return lifted;
        }
        let mut computed = std::mem::take(&mut lifted.computed_states);
        computed.truncate(min_invalidated.min(staged));

        for index in computed.len()..staged {
            let action_id = lifted.staged_action_ids[index];
            let previous = index.checked_sub(1).and_then(|prev| computed.get(prev));
            let previous_state = previous
                .map(|entry| entry.state.clone())
                .unwrap_or_else(|| lifted.committed_state.clone());

            let entry = if lifted.skipped_action_ids.contains(&action_id) {
                ComputedState {
                    state: previous_state,
                    error: previous.and_then(|entry| entry.error.clone()),
                }
            } else if let Some(error) = previous
                .and_then(|entry| entry.error.clone())
                .filter(|_| self.catch_panics)
            {
                ComputedState {
                    state: previous_state,
                    error: Some(error),
                }
            } else {
                match lifted.actions_by_id.get(&action_id) {
                    Some(lifted_action) => self.compute_next_entry(&lifted_action.action, previous_state),
                    None => {
                        tracing::warn!(action_id, "staged action without record");
                        ComputedState::new(previous_state)
                    }
                }
            };
            computed.push(entry);
        }
        tracing::trace!(from = min_invalidated.min(staged), to = staged, "states recomputed");
        lifted.computed_states = computed;
        lifted
    }

    fn compute_next_entry(&self, action: &Action, state: S) -> ComputedState<S> {
        if !self.catch_panics {
            return ComputedState::new((self.reducer)(state, action));
        }
        let previous = state.clone();
        match panic::catch_unwind(AssertUnwindSafe(|| (self.reducer)(state, action))) {
            Ok(next) => ComputedState::new(next),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(action = action.kind(), %message, "reducer panicked");
                ComputedState {
                    state: previous,
                    error: Some(ReducerPanic { message }),
                }
            }
        }
    }

    /// Folds the `excess` oldest actions into the committed state.
    ///
    /// Stops before the first action whose state holds an error, so that the
    /// error stays visible in the history.
    fn commit_excess(&self, mut lifted: LiftedState<S>, excess: usize) -> LiftedState<S> {
        let limit = excess
            .min(lifted.staged_action_ids.len() - 1)
            .min(lifted.computed_states.len().saturating_sub(1));
        let excess = (1..=limit)
            .find(|index| lifted.computed_states[*index].error.is_some())
            .map_or(limit, |index| index - 1);
        if excess < limit {
            tracing::warn!(excess, limit, "auto-commit stopped at a failed state");
        }
        if excess == 0 {
            return lifted;
        }

        for id in lifted.staged_action_ids.drain(1..=excess) {
            lifted.actions_by_id.remove(&id);
            lifted.skipped_action_ids.remove(&id);
        }
        lifted.computed_states.drain(..excess);
        if let Some(first) = lifted.computed_states.first() {
            lifted.committed_state = first.state.clone();
        }
        lifted.current_state_index = lifted
            .current_state_index
            .map(|index| index.saturating_sub(excess));
        lifted
    }

    /// Computes the transient entry shown while recording is paused.
    ///
    /// `action` is `None` when pausing starts; the tip entry is then a copy of
    /// the current state. Later actions replace the tip entry.
    fn compute_paused(&self, mut lifted: LiftedState<S>, action: Option<&Action>) -> LiftedState<S> {
        let entry = match action {
            None => lifted
                .current()
                .cloned()
                .unwrap_or_else(|| ComputedState::new(lifted.committed_state.clone())),
            Some(action) => {
                let previous = lifted
                    .current_state()
                    .cloned()
                    .unwrap_or_else(|| lifted.committed_state.clone());
                self.compute_next_entry(action, previous)
            }
        };

        if lifted.next_action_id == 1 {
            lifted.reset_history();
            lifted.committed_state = entry.state.clone();
            lifted.computed_states = vec![entry];
            lifted.is_paused = true;
            return lifted;
        }

        if action.is_none() {
            let action_id = lifted.next_action_id;
            lifted.next_action_id += 1;
            lifted.staged_action_ids.push(action_id);
        }
        let tip = lifted.staged_action_ids.len() - 1;
        let tip_id = lifted.staged_action_ids[tip];
        lifted.actions_by_id.insert(tip_id, LiftedAction::paused());
        lifted.computed_states.truncate(tip);
        lifted.computed_states.push(entry);
        lifted.current_state_index = Some(tip);
        lifted.is_paused = true;
        lifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_types;

    fn counter() -> Reducer<i32> {
        Arc::new(|state: i32, action: &Action| match action.kind() {
            "increment" => state + 1,
            "add" => state + action.payload::<i32>().copied().unwrap_or_default(),
            "explode" => panic!("exploded"),
            _ => state,
        })
    }

    struct Harness {
        reducer: Reducer<LiftedState<i32>>,
        lifted: LiftedState<i32>,
    }

    impl Harness {
        fn new(config: DevToolsConfiguration) -> Self {
            let reducer = lift_reducer_with(counter(), 0, &config);
            let lifted = reducer(LiftedState::new(0, &config), &Action::new(action_types::INIT));
            Harness { reducer, lifted }
        }

        fn perform(&mut self, action: Action) -> &mut Self {
            self.command(DevToolsAction::PerformAction(action))
        }

        fn command(&mut self, command: DevToolsAction) -> &mut Self {
            let lifted = std::mem::replace(&mut self.lifted, LiftedState::new(0, &Default::default()));
            self.lifted = (self.reducer)(lifted, &command.into_action());
            self
        }

        fn state(&self) -> i32 {
            *self.lifted.current_state().unwrap()
        }
    }

    #[test]
    fn test_init_creates_single_entry() {
        let harness = Harness::new(DevToolsConfiguration::default());
        assert_eq!(harness.lifted.staged_action_ids, vec![0]);
        assert_eq!(harness.lifted.current_state_index, Some(0));
        assert_eq!(harness.lifted.computed_states.len(), 1);
        assert_eq!(harness.state(), 0);
    }

    #[test]
    fn test_perform_appends_and_follows_tip() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::new("increment"))
            .perform(Action::with_payload("add", 5));
        assert_eq!(harness.lifted.staged_action_ids, vec![0, 1, 2]);
        assert_eq!(harness.lifted.current_state_index, Some(2));
        assert_eq!(harness.state(), 6);
    }

    #[test]
    fn test_perform_does_not_move_index_after_jump() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::new("increment"))
            .command(DevToolsAction::JumpToState(0))
            .perform(Action::new("increment"));
        assert_eq!(harness.lifted.current_state_index, Some(0));
        assert_eq!(harness.lifted.computed_states.last().unwrap().state, 2);
    }

    #[test]
    fn test_invalid_jump_is_ignored() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::new("increment"))
            .command(DevToolsAction::JumpToState(7))
            .command(DevToolsAction::JumpToAction(42));
        assert_eq!(harness.lifted.current_state_index, Some(1));
    }

    #[test]
    fn test_commit_excess_respects_max_age() {
        let mut harness = Harness::new(DevToolsConfiguration::default().with_max_age(3));
        for _ in 0..5 {
            harness.perform(Action::new("increment"));
        }
        assert_eq!(harness.lifted.staged_action_ids.len(), 4);
        assert_eq!(harness.lifted.staged_action_ids[0], 0);
        assert_eq!(harness.lifted.committed_state, 2);
        assert_eq!(harness.lifted.computed_states.last().unwrap().state, 5);
        assert!(!harness.lifted.actions_by_id.contains_key(&1));
    }

    #[test]
    fn test_commit_excess_stops_at_failed_state() {
        let mut harness = Harness::new(DevToolsConfiguration::default().with_max_age(2));
        harness
            .perform(Action::new("explode"))
            .perform(Action::new("increment"))
            .perform(Action::new("increment"));
        // the failed entry sits right after INIT and cannot be committed away
        assert_eq!(harness.lifted.staged_action_ids.len(), 4);
        assert!(harness.lifted.computed_states[1].error.is_some());
    }

    #[test]
    fn test_panics_are_sticky_when_caught() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::new("increment"))
            .perform(Action::new("explode"))
            .perform(Action::new("increment"));
        let computed = &harness.lifted.computed_states;
        assert_eq!(computed[2].state, 1);
        assert_eq!(
            computed[2].error,
            Some(ReducerPanic {
                message: "exploded".to_string()
            })
        );
        assert_eq!(computed[3].state, 1);
        assert!(computed[3].error.is_some());

        harness.command(DevToolsAction::Toggle {
            start: 2,
            end: 2,
            active: false,
        });
        assert_eq!(harness.state(), 2);
        assert!(harness.lifted.computed_states[3].error.is_none());
    }

    #[test]
    fn test_panics_propagate_when_not_caught() {
        let config = DevToolsConfiguration::default().with_catch_exceptions(false);
        let reducer = lift_reducer_with(counter(), 0, &config);
        let lifted = reducer(LiftedState::new(0, &config), &Action::new(action_types::INIT));
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            reducer(
                lifted,
                &DevToolsAction::PerformAction(Action::new("explode")).into_action(),
            )
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_toggle_reuses_states_before_the_range() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::with_payload("add", 1))
            .perform(Action::with_payload("add", 10))
            .perform(Action::with_payload("add", 100));
        let before = harness.lifted.computed_states[..2].to_vec();
        harness.command(DevToolsAction::Toggle {
            start: 2,
            end: 2,
            active: false,
        });
        assert_eq!(&harness.lifted.computed_states[..2], &before[..]);
        assert_eq!(harness.state(), 101);
    }

    #[test]
    fn test_toggle_accepts_unbounded_range() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::with_payload("add", 1))
            .perform(Action::with_payload("add", 10))
            .perform(Action::with_payload("add", 100))
            .command(DevToolsAction::Toggle {
                start: 2,
                end: usize::MAX,
                active: false,
            });
        assert_eq!(harness.lifted.skipped_action_ids.len(), 2);
        assert_eq!(harness.state(), 1);

        harness.command(DevToolsAction::Toggle {
            start: usize::MAX,
            end: 0,
            active: true,
        });
        assert!(harness.lifted.skipped_action_ids.is_empty());
        assert_eq!(harness.state(), 111);
    }

    #[test]
    fn test_sweep_drops_skipped_actions() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::with_payload("add", 1))
            .perform(Action::with_payload("add", 10))
            .command(DevToolsAction::Toggle {
                start: 1,
                end: 1,
                active: false,
            })
            .command(DevToolsAction::Sweep);
        assert_eq!(harness.lifted.staged_action_ids, vec![0, 2]);
        assert!(harness.lifted.skipped_action_ids.is_empty());
        assert!(!harness.lifted.actions_by_id.contains_key(&1));
        assert_eq!(harness.lifted.current_state_index, Some(1));
        assert_eq!(harness.state(), 10);
    }

    #[test]
    fn test_reset_rollback_commit() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::with_payload("add", 3))
            .command(DevToolsAction::Commit)
            .perform(Action::with_payload("add", 4));
        assert_eq!(harness.lifted.committed_state, 3);
        assert_eq!(harness.state(), 7);

        harness.command(DevToolsAction::Rollback);
        assert_eq!(harness.state(), 3);
        assert_eq!(harness.lifted.staged_action_ids, vec![0]);

        harness.command(DevToolsAction::Reset);
        assert_eq!(harness.lifted.committed_state, 0);
        assert_eq!(harness.state(), 0);
    }

    #[test]
    fn test_lock_ignores_actions() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .command(DevToolsAction::LockChanges(true))
            .perform(Action::new("increment"));
        assert_eq!(harness.lifted.staged_action_ids, vec![0]);
        assert_eq!(harness.state(), 0);
        harness
            .command(DevToolsAction::LockChanges(false))
            .perform(Action::new("increment"));
        assert_eq!(harness.state(), 1);
    }

    #[test]
    fn test_pause_replaces_tip_entry() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::new("increment"))
            .command(DevToolsAction::PauseRecording(true));
        assert_eq!(harness.lifted.staged_action_ids, vec![0, 1, 2]);

        harness
            .perform(Action::new("increment"))
            .perform(Action::new("increment"));
        assert!(harness.lifted.is_paused);
        assert_eq!(harness.lifted.staged_action_ids.len(), 3);
        assert_eq!(harness.lifted.computed_states.len(), 3);
        assert_eq!(harness.state(), 3);
        assert_eq!(
            harness.lifted.action_at(2).unwrap().action.kind(),
            super::super::devtools_types::PAUSED
        );

        harness.command(DevToolsAction::PauseRecording(false));
        assert!(!harness.lifted.is_paused);
        assert_eq!(harness.lifted.staged_action_ids, vec![0]);
        assert_eq!(harness.lifted.committed_state, 3);
        assert_eq!(harness.state(), 3);
    }

    #[test]
    fn test_pausing_twice_keeps_one_tip_entry() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .perform(Action::new("increment"))
            .command(DevToolsAction::PauseRecording(true))
            .command(DevToolsAction::PauseRecording(true))
            .command(DevToolsAction::PauseRecording(true))
            .perform(Action::new("increment"));
        assert_eq!(harness.lifted.staged_action_ids, vec![0, 1, 2]);
        assert_eq!(harness.lifted.computed_states.len(), 3);
        assert_eq!(harness.state(), 2);
    }

    #[test]
    fn test_pause_before_any_action_keeps_single_entry() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness
            .command(DevToolsAction::PauseRecording(true))
            .perform(Action::new("increment"))
            .perform(Action::new("increment"));
        assert_eq!(harness.lifted.staged_action_ids, vec![0]);
        assert_eq!(harness.lifted.committed_state, 2);
        assert_eq!(harness.state(), 2);
    }

    #[test]
    fn test_unknown_action_keeps_history() {
        let mut harness = Harness::new(DevToolsConfiguration::default());
        harness.perform(Action::new("increment"));
        let before = harness.lifted.clone();
        let after = (harness.reducer)(before.clone(), &Action::new("something"));
        assert_eq!(after, before);
    }
}
