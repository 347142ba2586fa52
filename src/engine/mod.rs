mod oracle;
mod ticker;

pub use oracle::{ProgressOracle, RandomOracle};
#[cfg(test)]
pub(crate) use oracle::scripted::ScriptedOracle;

use crate::model::{
    Category, FileDescriptor, RecordId, SimConfig, UploadEvent, UploadRecord, UploadStatus,
};
use crate::views;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;
const MIN_TICK: Duration = Duration::from_millis(1);

/// Active set plus the ticker task owned by each still-uploading record.
#[derive(Default)]
struct Registry {
    records: Vec<UploadRecord>,
    tickers: HashMap<RecordId, JoinHandle<()>>,
}

impl Registry {
    fn in_flight(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == UploadStatus::Uploading)
            .count()
    }
}

struct Shared {
    registry: Mutex<Registry>,
    oracle: Arc<dyn ProgressOracle>,
    tick_interval: Duration,
    event_tx: mpsc::UnboundedSender<UploadEvent>,
    in_flight_tx: watch::Sender<usize>,
}

impl Shared {
    // Never held across an await; a poisoned lock only means a ticker panicked mid-update.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, ev: UploadEvent) {
        let _ = self.event_tx.send(ev);
    }

    fn publish_in_flight(&self, reg: &Registry) {
        self.in_flight_tx.send_replace(reg.in_flight());
    }
}

/// Simulated upload center.
///
/// Every submitted file gets its own periodic ticker task; the task is the only
/// writer of that record and is aborted when the record is removed. Cloning the
/// simulator is cheap and every clone drives the same active set.
#[derive(Clone)]
pub struct UploadSimulator {
    shared: Arc<Shared>,
}

impl UploadSimulator {
    pub fn new(
        tick_interval: Duration,
        oracle: Arc<dyn ProgressOracle>,
        event_tx: mpsc::UnboundedSender<UploadEvent>,
    ) -> Self {
        let (in_flight_tx, _) = watch::channel(0usize);
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                oracle,
                tick_interval: tick_interval.max(MIN_TICK),
                event_tx,
                in_flight_tx,
            }),
        }
    }

    /// Build a simulator with the random oracle described by `cfg`.
    pub fn from_config(cfg: &SimConfig, event_tx: mpsc::UnboundedSender<UploadEvent>) -> Self {
        Self::new(
            cfg.tick_interval,
            Arc::new(RandomOracle::from_config(cfg)),
            event_tx,
        )
    }

    /// Register a new upload and start its ticker.
    ///
    /// Any descriptor is accepted. Must be called from within a Tokio runtime.
    pub fn submit(&self, file: FileDescriptor) -> UploadRecord {
        let record = {
            let mut reg = self.shared.lock();
            let id = unique_id(&reg);
            let record = UploadRecord::new(id.clone(), file);
            reg.records.push(record.clone());

            // The schedule starts now, not when the task is first polled.
            let first_tick = tokio::time::Instant::now() + self.shared.tick_interval;
            let handle = tokio::spawn(ticker::run_ticker(
                self.shared.clone(),
                id.clone(),
                first_tick,
            ));
            reg.tickers.insert(id, handle);

            // Emitted under the lock so a record's events can't overtake its submission.
            self.shared.emit(UploadEvent::Submitted {
                record: Box::new(record.clone()),
            });
            self.shared.publish_in_flight(&reg);
            record
        };

        // Subscribers may block on their writer; never log with the registry held.
        tracing::debug!(id = %record.id, name = %record.name, category = ?record.category, "upload submitted");
        record
    }

    pub fn submit_batch(&self, files: impl IntoIterator<Item = FileDescriptor>) -> Vec<UploadRecord> {
        files.into_iter().map(|f| self.submit(f)).collect()
    }

    /// Drop a record and cancel its ticker. Returns `false` if the id is unknown.
    pub fn remove(&self, id: &RecordId) -> bool {
        {
            let mut reg = self.shared.lock();
            let Some(pos) = reg.records.iter().position(|r| &r.id == id) else {
                return false;
            };
            reg.records.remove(pos);
            if let Some(handle) = reg.tickers.remove(id) {
                handle.abort();
            }

            self.shared.emit(UploadEvent::Removed { id: id.clone() });
            self.shared.publish_in_flight(&reg);
        }

        tracing::debug!(%id, "upload removed");
        true
    }

    /// Abort every running ticker. Records stay in the active set as they are.
    pub fn shutdown(&self) {
        let mut reg = self.shared.lock();
        for (_, handle) in reg.tickers.drain() {
            handle.abort();
        }
    }

    /// Snapshot of the active set in submission order.
    pub fn records(&self) -> Vec<UploadRecord> {
        self.shared.lock().records.clone()
    }

    pub fn get(&self, id: &RecordId) -> Option<UploadRecord> {
        self.shared
            .lock()
            .records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
    }

    /// Records of one category, in submission order.
    pub fn by_category(&self, category: Category) -> Vec<UploadRecord> {
        views::filtered(&self.shared.lock().records, category.into())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn has_completed(&self) -> bool {
        views::has_completed(&self.shared.lock().records)
    }

    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().records.len()
    }

    /// Number of live ticker tasks.
    #[cfg(test)]
    pub fn active_tickers(&self) -> usize {
        self.shared.lock().tickers.len()
    }

    /// Resolve once no record is uploading.
    pub async fn wait_settled(&self) {
        let mut rx = self.shared.in_flight_tx.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

fn unique_id(reg: &Registry) -> RecordId {
    let mut rng = rand::thread_rng();
    loop {
        let raw: String = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        let id = RecordId::new(raw);
        if !reg.records.iter().any(|r| r.id == id) {
            return id;
        }
    }
}
