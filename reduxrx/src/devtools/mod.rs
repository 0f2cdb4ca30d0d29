//! Time travel for stores: every action is recorded in a [`LiftedState`] and
//! the exposed state can be moved along the history.

mod actions;
mod config;
mod diff;
mod instrument;
mod lift;
mod lifted_state;
mod registry;

pub use actions::*;
pub use config::*;
pub use diff::*;
pub use instrument::*;
pub use lift::*;
pub use lifted_state::*;
pub use registry::*;
