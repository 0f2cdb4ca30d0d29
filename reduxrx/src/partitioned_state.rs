use crate::{AnyValue, State, StoreError};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// A state that is split into named slices.
pub trait PartitionableState: State {
    fn get<T: AnyValue>(&self, slice_name: &str) -> Result<&T, StoreError>;

    /// Returns a new state with `slice_name` set to `value`. The receiver is left untouched.
    fn set<T: AnyValue>(&self, slice_name: &str, value: T) -> Result<Self, StoreError>;

    fn contains(&self, slice_name: &str) -> bool;
}

/// The immutable root state of a store composed of slices.
///
/// Slice values are shared between versions: `set` copies the map of
/// pointers, never the slice states themselves.
#[derive(Clone, Default)]
pub struct PartitionedState {
    slices: Arc<BTreeMap<String, Arc<dyn AnyValue>>>,
}

impl State for PartitionedState {}

impl PartitionedState {
    pub fn new() -> Self {
        PartitionedState::default()
    }

    /// Returns a clone of the slice state.
    pub fn get_cloned<T: AnyValue + Clone>(&self, slice_name: &str) -> Result<T, StoreError> {
        self.get::<T>(slice_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn slice_names(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }

    /// True when both values share the same slice map.
    pub fn ptr_eq(&self, other: &PartitionedState) -> bool {
        Arc::ptr_eq(&self.slices, &other.slices)
    }

    fn check_name(slice_name: &str) -> Result<(), StoreError> {
        if slice_name.is_empty() {
            return Err(StoreError::InvalidArgument {
                name: "slice_name",
                reason: "Slice name cannot be null or empty.".to_string(),
            });
        }
        Ok(())
    }
}

impl PartitionableState for PartitionedState {
    fn get<T: AnyValue>(&self, slice_name: &str) -> Result<&T, StoreError> {
        Self::check_name(slice_name)?;
        let value = self
            .slices
            .get(slice_name)
            .ok_or_else(|| StoreError::SliceNotFound(slice_name.to_string()))?;
        value
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| StoreError::SliceTypeMismatch {
                name: slice_name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    fn set<T: AnyValue>(&self, slice_name: &str, value: T) -> Result<Self, StoreError> {
        Self::check_name(slice_name)?;
        let mut slices = BTreeMap::clone(&self.slices);
        slices.insert(slice_name.to_string(), Arc::new(value));
        Ok(PartitionedState {
            slices: Arc::new(slices),
        })
    }

    fn contains(&self, slice_name: &str) -> bool {
        self.slices.contains_key(slice_name)
    }
}

impl PartialEq for PartitionedState {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.slices.len() == other.slices.len()
            && self.slices.iter().zip(other.slices.iter()).all(
                |((name_a, value_a), (name_b, value_b))| {
                    name_a == name_b && value_a.eq_value(value_b.as_ref())
                },
            )
    }
}

impl Debug for PartitionedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.slices.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        value: i32,
    }

    #[test]
    fn test_set_returns_new_state() {
        let empty = PartitionedState::new();
        let one = empty.set("counter", Counter { value: 1 }).unwrap();
        let two = one.set("counter", Counter { value: 2 }).unwrap();

        assert!(empty.is_empty());
        assert_eq!(one.get::<Counter>("counter").unwrap().value, 1);
        assert_eq!(two.get::<Counter>("counter").unwrap().value, 2);
    }

    #[test]
    fn test_get_reports_distinct_errors() {
        let state = PartitionedState::new().set("counter", Counter { value: 0 }).unwrap();

        assert!(state.get::<Counter>("").unwrap_err().is_invalid_argument());
        assert!(state.get::<Counter>("missing").unwrap_err().is_not_found());
        assert!(matches!(
            state.get::<String>("counter"),
            Err(StoreError::SliceTypeMismatch { .. })
        ));
        assert!(state.set("", 1).is_err());
    }

    #[test]
    fn test_structural_equality() {
        let a = PartitionedState::new().set("n", 1).unwrap();
        let b = PartitionedState::new().set("n", 1).unwrap();
        let c = a.set("n", 2).unwrap();
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn test_unchanged_slices_are_shared() {
        let a = PartitionedState::new()
            .set("left", vec![1, 2, 3])
            .unwrap()
            .set("right", 0)
            .unwrap();
        let b = a.set("right", 1).unwrap();
        let left_a = a.get::<Vec<i32>>("left").unwrap() as *const Vec<i32>;
        let left_b = b.get::<Vec<i32>>("left").unwrap() as *const Vec<i32>;
        assert_eq!(left_a, left_b);
    }
}
