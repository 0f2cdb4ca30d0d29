use crate::Action;

/// Action types understood by the lifted reducer.
pub mod devtools_types {
    pub const INIT: &str = "@@INIT";
    pub const PERFORM_ACTION: &str = "PERFORM_ACTION";
    pub const RESET: &str = "RESET";
    pub const ROLLBACK: &str = "ROLLBACK";
    pub const COMMIT: &str = "COMMIT";
    pub const SWEEP: &str = "SWEEP";
    pub const TOGGLE_ACTION: &str = "TOGGLE_ACTION";
    pub const JUMP_TO_STATE: &str = "JUMP_TO_STATE";
    pub const JUMP_TO_ACTION: &str = "JUMP_TO_ACTION";
    pub const LOCK_CHANGES: &str = "LOCK_CHANGES";
    pub const PAUSE_RECORDING: &str = "PAUSE_RECORDING";
    /// Marks the transient entry shown while recording is paused.
    pub const PAUSED: &str = "@@PAUSED";
}

/// A command of the time-travel layer.
#[derive(Clone, Debug, PartialEq)]
pub enum DevToolsAction {
    /// Records an application action.
    PerformAction(Action),
    /// Drops the history and returns to the initial state.
    Reset,
    /// Drops the history and returns to the last committed state.
    Rollback,
    /// Makes the current state the new committed state.
    Commit,
    /// Forgets the skipped actions.
    Sweep,
    /// Includes (`active`) or skips the actions with ids in `start..=end`.
    Toggle { start: usize, end: usize, active: bool },
    JumpToState(usize),
    JumpToAction(usize),
    LockChanges(bool),
    PauseRecording(bool),
}

impl DevToolsAction {
    pub fn kind(&self) -> &'static str {
        use devtools_types::*;
        match self {
            DevToolsAction::PerformAction(_) => PERFORM_ACTION,
            DevToolsAction::Reset => RESET,
            DevToolsAction::Rollback => ROLLBACK,
            DevToolsAction::Commit => COMMIT,
            DevToolsAction::Sweep => SWEEP,
            DevToolsAction::Toggle { .. } => TOGGLE_ACTION,
            DevToolsAction::JumpToState(_) => JUMP_TO_STATE,
            DevToolsAction::JumpToAction(_) => JUMP_TO_ACTION,
            DevToolsAction::LockChanges(_) => LOCK_CHANGES,
            DevToolsAction::PauseRecording(_) => PAUSE_RECORDING,
        }
    }

    pub fn into_action(self) -> Action {
        Action::with_payload(self.kind(), self)
    }

    /// Extracts the command carried by `action`, if any.
    pub fn from_action(action: &Action) -> Option<&DevToolsAction> {
        action
            .payload::<DevToolsAction>()
            .filter(|command| command.kind() == action.kind())
    }

    /// Wraps an application action for the lifted reducer. Commands and the
    /// global init actions pass through unchanged.
    pub fn lift(action: &Action) -> Action {
        if DevToolsAction::from_action(action).is_some() || is_global_init(action) {
            action.clone()
        } else {
            DevToolsAction::PerformAction(action.clone()).into_action()
        }
    }
}

/// True for the actions dispatched when a store is created or its reducer replaced.
pub fn is_global_init(action: &Action) -> bool {
    matches!(
        action.kind(),
        crate::action_types::INIT | crate::action_types::REPLACE
    )
}
