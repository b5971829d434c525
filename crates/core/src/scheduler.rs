//! Background flush loop.
//!
//! One loop per [`NoteStore`]. It waits for whichever comes first of the
//! flush timer, the buffer-full signal, or shutdown, and runs a flush for the
//! first two. Flush failures are logged and never stop the loop.

use std::sync::Arc;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::models::{FlushOutcome, FlushTrigger, StoreState};
use crate::shutdown::{is_shutdown_requested, ShutdownSignal};
use crate::storage::NoteStore;

/// Run the flush loop until `shutdown` fires.
///
/// Notes still buffered at shutdown stay as loose files in the working copy
/// unless the store was configured with `flush_on_shutdown`.
pub async fn run_flush_loop(store: Arc<NoteStore>, mut shutdown: ShutdownSignal) {
    let Some(mut flush_rx) = store.take_flush_signal() else {
        error!("flush loop already running for this store");
        return;
    };

    let period = store.flush_interval();
    info!(
        interval_secs = period.as_secs(),
        buffer_size = store.buffer_size(),
        "starting flush loop"
    );

    let mut ticker = (!period.is_zero()).then(|| {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        if is_shutdown_requested(&shutdown) {
            break;
        }

        let trigger = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_ok() && !is_shutdown_requested(&shutdown) {
                    continue;
                }
                FlushTrigger::ShutdownRequested
            }
            Some(()) = flush_rx.recv() => FlushTrigger::BufferFull,
            _ = next_tick(&mut ticker) => FlushTrigger::TimerTick,
        };

        if trigger == FlushTrigger::ShutdownRequested {
            break;
        }
        run_flush(&store, trigger).await;
    }

    flush_rx.close();
    if store.flush_on_shutdown() {
        info!(pending = store.pending_count(), "running final flush before shutdown");
        run_flush(&store, FlushTrigger::ShutdownRequested).await;
    } else if store.pending_count() > 0 {
        info!(
            pending = store.pending_count(),
            "unflushed notes left in working copy"
        );
    }

    store.replace_state(StoreState::Stopped);
    info!("flush loop stopped");
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run_flush(store: &NoteStore, trigger: FlushTrigger) {
    debug!(%trigger, "start updating remote storage");
    match store.flush().await {
        Ok(FlushOutcome::Flushed(report)) => {
            info!(
                %trigger,
                count = report.count,
                sha = %report.commit,
                "notes saved successfully"
            );
        }
        Ok(FlushOutcome::NothingToDo) => {
            debug!(%trigger, "no new notes to save");
        }
        Err(e) => {
            let stats = store.stats();
            error!(
                %trigger,
                stage = %e.stage(),
                error = %e,
                consecutive_failures = stats.consecutive_failures,
                "error while handling pending notes"
            );
        }
    }
}
