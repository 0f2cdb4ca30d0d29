use crate::tracing_setup::tracing_init;
use futures_signals::signal::SignalExt;
use reduxrx::devtools::{DevToolsConfiguration, DevToolsRegistry};
use reduxrx::{
    create_async_thunk, create_slice_with_extra, create_store_from_slices, default_enhancer,
    ActionCreator, AsyncThunk, DefaultEnhancerConfiguration, PartitionedState, Slice, StoreError,
    ThunkApi, ThunkError,
};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod tracing_setup;

const INCREMENT: ActionCreator = ActionCreator::new("counter/increment");
const INCREMENT_BY: ActionCreator<i64> = ActionCreator::new("counter/incrementBy");

#[derive(Debug, Clone, Default, PartialEq)]
struct Counter {
    value: i64,
    loading: bool,
}

fn fetch_amount() -> Result<AsyncThunk<u64, i64, PartitionedState>, StoreError> {
    create_async_thunk(
        "counter/fetchAmount",
        |delay_ms: u64, api: ThunkApi<u64, i64, PartitionedState>, token: CancellationToken| async move {
            debug!("Worker | fetching amount, request {}", api.request_id());
            tokio::select! {
                _ = token.cancelled() => Err(ThunkError::CanceledExternally),
                _ = sleep(Duration::from_millis(delay_ms)) => Ok(delay_ms as i64),
            }
        },
    )
}

fn counter_slice(thunk: &AsyncThunk<u64, i64, PartitionedState>) -> Result<Slice<Counter>, StoreError> {
    create_slice_with_extra(
        "counter",
        Counter::default(),
        |builder| {
            builder
                .add_case(&INCREMENT, |state: Counter, _| Counter {
                    value: state.value + 1,
                    ..state
                })
                .add_payload_case(&INCREMENT_BY, |state: Counter, amount: &i64| Counter {
                    value: state.value + amount,
                    ..state
                });
        },
        |extra| {
            extra
                .add_case(thunk.pending(), |state: Counter, _| Counter {
                    loading: true,
                    ..state
                })
                .add_payload_case(thunk.fulfilled(), |state: Counter, amount: &i64| Counter {
                    value: state.value + amount,
                    loading: false,
                })
                .add_case(thunk.rejected(), |state: Counter, _| Counter {
                    loading: false,
                    ..state
                });
        },
    )
}

#[tokio::main]
async fn main() -> Result<(), StoreError> {
    tracing_init();

    info!("==========================================");
    warn!("A. Slice actions and an async thunk");

    let registry = DevToolsRegistry::new();
    let thunk = fetch_amount()?;
    let store = create_store_from_slices(
        [counter_slice(&thunk)?.into_dyn()],
        Some(default_enhancer(
            DefaultEnhancerConfiguration::default()
                .with_dev_tools(DevToolsConfiguration::enabled().with_name("Counter"))
                .with_registry(registry.clone()),
        )),
    )?;

    store.dispatch_creator(&INCREMENT)?;
    store.dispatch_creator_with(&INCREMENT_BY, 10)?;

    let store_clone = store.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        if let Err(error) = store_clone.dispatch(thunk.invoke(30).into_action()) {
            warn!("Worker | dispatch failed: {}", error);
        }
    });

    store
        .to_signal()
        .stop_if(|root| {
            root.get_cloned::<Counter>("counter")
                .map(|counter| counter.value >= 41)
                .unwrap_or(true)
        })
        .for_each(|root| async move {
            info!("  Main | show state: {:?} ", root.get_cloned::<Counter>("counter"));
        })
        .await;

    info!("==========================================");
    warn!("B. History of the instrumented store");

    let devtools = store.instrumented()?;
    info!("  Main | connected stores: {:?}", registry);
    let lifted = devtools.get_lifted_state();
    for (index, id) in lifted.staged_action_ids.iter().enumerate() {
        let kind = lifted.actions_by_id.get(id).map(|lifted| lifted.action.kind());
        info!("  Main | #{} id={} {:?}", index, id, kind);
        if let Some(diff) = devtools.diff_at(index).filter(|diff| diff.has_changes()) {
            info!("  Main | diff:\n{}", diff);
        }
    }

    info!("==========================================");
    warn!("C. Time travel");

    devtools.jump_to_state(1)?;
    info!("  Main | after jump to #1: {:?}", store.get_slice_state::<Counter>("counter")?);
    devtools.jump_to_state(lifted.staged_action_ids.len() - 1)?;

    devtools.toggle_action(2)?;
    info!("  Main | without incrementBy: {:?}", store.get_slice_state::<Counter>("counter")?);
    devtools.toggle_action(2)?;

    devtools.commit()?;
    store.dispatch_creator(&INCREMENT)?;
    devtools.rollback()?;
    info!(
        "  Main | after commit and rollback: {:?}",
        store.get_slice_state::<Counter>("counter")?
    );

    store.dispose();
    info!("  Main | connected after dispose: {}", registry.connected_stores().len());
    info!("  Main | Finish");
    Ok(())
}
