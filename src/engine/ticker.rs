use super::Shared;
use crate::model::{RecordId, TickOutcome, UploadEvent};
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};

/// Drive one record from `uploading` to a terminal status.
///
/// Exits when the record finishes or disappears from the active set. Removal
/// also aborts this task, but the lookup keeps a tick that raced the abort
/// from touching anything.
pub(super) async fn run_ticker(shared: Arc<Shared>, id: RecordId, first_tick: Instant) {
    let mut interval = tokio::time::interval_at(first_tick, shared.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let status = {
            let mut guard = shared.lock();
            let reg = &mut *guard;
            let Some(record) = reg.records.iter_mut().find(|r| r.id == id) else {
                return;
            };

            let increment = shared.oracle.next_increment(&id);
            match record.advance(increment, || shared.oracle.decide(&id)) {
                TickOutcome::Progressed(progress) => {
                    shared.emit(UploadEvent::Progress {
                        id: id.clone(),
                        progress,
                    });
                    continue;
                }
                TickOutcome::Finished(status) => {
                    reg.tickers.remove(&id);
                    shared.emit(UploadEvent::Finished {
                        id: id.clone(),
                        status,
                    });
                    shared.publish_in_flight(reg);
                    status
                }
                TickOutcome::Ignored => {
                    reg.tickers.remove(&id);
                    return;
                }
            }
        };

        tracing::debug!(%id, ?status, "upload finished");
        return;
    }
}
