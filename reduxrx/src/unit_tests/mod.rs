use crate::{reducer, Action, Reducer, State};

mod store_test;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestState {
    pub count: i32,
    pub label: String,
}

impl State for TestState {}

// bare counters for the lifted reducer tests
impl State for i32 {}

impl TestState {
    pub fn add_count(self, count: i32) -> Self {
        Self {
            count: self.count + count,
            ..self
        }
    }

    pub fn set_label(self, label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..self
        }
    }
}

/// `increment`, `add(i32)`, `label(String)` and `explode`, which panics.
pub fn test_reducer() -> Reducer<TestState> {
    reducer(|state: TestState, action: &Action| match action.kind() {
        "increment" => state.add_count(1),
        "add" => {
            let amount = action.payload::<i32>().copied().unwrap_or_default();
            state.add_count(amount)
        }
        "label" => match action.payload::<String>() {
            Some(label) => state.set_label(label),
            None => state,
        },
        "explode" => panic!("reducer exploded"),
        _ => state,
    })
}
