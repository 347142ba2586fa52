//! Upload command controller.
//!
//! Applies UI commands to the simulator and emits informational events for presentation layers.

use crate::engine::UploadSimulator;
use crate::model::{FileDescriptor, RecordId, UploadEvent};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control the upload center.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Files dropped onto the panel or picked by path.
    Submit(Vec<FileDescriptor>),
    Remove(RecordId),
    Quit,
}

/// Apply UI commands until the UI quits or hangs up, then stop every ticker.
pub(crate) async fn run_controller(
    sim: UploadSimulator,
    event_tx: UnboundedSender<UploadEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::Submit(files) => {
                let outside_hints: Vec<String> = files
                    .iter()
                    .filter(|f| !crate::mime::matches_accept_hint(&f.name))
                    .map(|f| f.name.clone())
                    .collect();
                let records = sim.submit_batch(files);
                if !outside_hints.is_empty() {
                    let _ = event_tx.send(UploadEvent::Info(format!(
                        "Accepted {} (not TIFF/PNG/CSV/JSON)",
                        outside_hints.join(", ")
                    )));
                }
                if records.len() > 1 {
                    let _ = event_tx.send(UploadEvent::Info(format!(
                        "Uploading {} files…",
                        records.len()
                    )));
                }
            }
            UiCommand::Remove(id) => {
                if !sim.remove(&id) {
                    let _ = event_tx.send(UploadEvent::Info(format!("No upload with id {id}")));
                }
            }
            UiCommand::Quit => break,
        }
    }

    // Tickers outlive the UI otherwise; a JoinHandle being dropped doesn't cancel its task.
    sim.shutdown();
    Ok(())
}
