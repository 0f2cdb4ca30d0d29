//! A predictable state container: a [`Store`] owns the state, actions
//! describe changes, reducers compute the next state.
//!
//! ```
//! use reduxrx::{create_slice, create_store_from_slices};
//!
//! let counter = create_slice("counter", 0i32, |builder| {
//!     builder.add("increment", |state: i32, _| state + 1);
//! })
//! .unwrap();
//! let increment = counter.action_creator("increment").unwrap().clone();
//!
//! let store = create_store_from_slices([counter.into_dyn()], None).unwrap();
//! store.dispatch_creator(&increment).unwrap();
//! assert_eq!(store.get_slice_state::<i32>("counter").unwrap(), 1);
//! ```

mod action;
mod error;
mod factory;
mod partitioned_state;
mod reducer;
mod slice;
mod store;
mod stream_ext;
mod subscription;
mod thunk;

pub mod devtools;

pub use action::*;
pub use error::*;
pub use factory::*;
pub use partitioned_state::*;
pub use reducer::*;
pub use slice::*;
pub use store::*;
pub use stream_ext::*;
pub use subscription::{Comparer, SubscribeOptions, Subscription};
pub use thunk::*;

#[cfg(test)]
mod unit_tests;

/// Values a [`Store`] can hold.
pub trait State: Clone + Send + Sync + 'static {}
