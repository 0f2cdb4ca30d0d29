#![allow(dead_code)]

use reduxrx::{create_slice, ActionCreator, Slice};

pub const INCREMENT: ActionCreator = ActionCreator::new("counter/increment");
pub const DECREMENT: ActionCreator = ActionCreator::new("counter/decrement");
pub const INCREMENT_BY: ActionCreator<i32> = ActionCreator::new("counter/incrementBy");
pub const SET_GREETING: ActionCreator<String> = ActionCreator::new("greeting/set");

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CounterState {
    pub value: i32,
}

impl CounterState {
    pub fn add(self, amount: i32) -> Self {
        Self {
            value: self.value + amount,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GreetingState {
    pub text: String,
}

pub fn counter_slice() -> Slice<CounterState> {
    create_slice("counter", CounterState::default(), |builder| {
        builder
            .add_case(&INCREMENT, |state: CounterState, _| state.add(1))
            .add_case(&DECREMENT, |state: CounterState, _| state.add(-1))
            .add_payload_case(&INCREMENT_BY, |state: CounterState, amount: &i32| {
                state.add(*amount)
            });
    })
    .unwrap()
}

pub fn greeting_slice() -> Slice<GreetingState> {
    create_slice("greeting", GreetingState::default(), |builder| {
        builder.add_payload_case(&SET_GREETING, |_: GreetingState, text: &String| {
            GreetingState { text: text.clone() }
        });
    })
    .unwrap()
}
