use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque record identifier, unique within the active set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A file-like input as handed over by a drop or a picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size_bytes: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Sensor,
}

impl Category {
    /// Images are anything with an `image/*` MIME type; everything else is sensor data.
    pub fn from_mime(mime_type: &str) -> Self {
        if crate::mime::is_image(mime_type) {
            Category::Image
        } else {
            Category::Sensor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Image => "Image",
            Category::Sensor => "Sensor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Completed,
    /// Simulated upload failure. Terminal and carries no diagnostic payload.
    Error,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, UploadStatus::Uploading)
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Error => "error",
        }
    }
}

/// Result of applying one tick to a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Progress moved (or stayed put on a zero increment) but the upload is still running.
    Progressed(f64),
    /// Progress hit 100 and the record resolved to a terminal status.
    Finished(UploadStatus),
    /// The record was already terminal; nothing changed.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: RecordId,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub category: Category,
    pub status: UploadStatus,
    pub progress: f64,
    #[serde(default)]
    pub submitted_utc: String,
}

pub const PROGRESS_MAX: f64 = 100.0;

impl UploadRecord {
    pub fn new(id: RecordId, file: FileDescriptor) -> Self {
        let category = Category::from_mime(&file.mime_type);
        Self {
            id,
            name: file.name,
            size_bytes: file.size_bytes,
            mime_type: file.mime_type,
            category,
            status: UploadStatus::Uploading,
            progress: 0.0,
            submitted_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
        }
    }

    /// Advance the simulated upload by `increment` percent.
    ///
    /// Progress is capped at 100; reaching the cap stops the upload and the terminal
    /// status is taken from `decide`, which is consulted at most once per record.
    /// Negative or non-finite increments count as zero so progress never goes backwards.
    pub fn advance(
        &mut self,
        increment: f64,
        decide: impl FnOnce() -> UploadStatus,
    ) -> TickOutcome {
        if self.status.is_terminal() {
            return TickOutcome::Ignored;
        }

        let step = if increment.is_finite() {
            increment.max(0.0)
        } else {
            0.0
        };
        let next = (self.progress + step).min(PROGRESS_MAX);

        if next >= PROGRESS_MAX {
            self.progress = PROGRESS_MAX;
            self.status = match decide() {
                // A decider can't keep the record running once it is full.
                UploadStatus::Uploading => UploadStatus::Completed,
                terminal => terminal,
            };
            return TickOutcome::Finished(self.status);
        }

        self.progress = next;
        TickOutcome::Progressed(next)
    }
}

/// Simulation parameters, built from CLI arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Exclusive upper bound of the per-tick progress increment, in percent.
    pub max_increment: f64,
    /// Probability that a record ends in `error` instead of `completed`.
    pub failure_rate: f64,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            max_increment: 20.0,
            failure_rate: 0.1,
            seed: None,
        }
    }
}

/// Events emitted by the simulator and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UploadEvent {
    Submitted {
        // Box to keep UploadEvent small; progress ticks are far more frequent.
        record: Box<UploadRecord>,
    },
    Progress {
        id: RecordId,
        progress: f64,
    },
    Finished {
        id: RecordId,
        status: UploadStatus,
    },
    Removed {
        id: RecordId,
    },
    Info(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, mime: &str) -> UploadRecord {
        UploadRecord::new(RecordId::new("abc123xyz"), FileDescriptor::new(name, 2048, mime))
    }

    #[test]
    fn png_scan_starts_as_uploading_image() {
        let r = record("scan.png", "image/png");
        assert_eq!(r.category, Category::Image);
        assert_eq!(r.status, UploadStatus::Uploading);
        assert_eq!(r.progress, 0.0);
        assert_eq!(r.size_bytes, 2048);
    }

    #[test]
    fn csv_is_sensor_data() {
        assert_eq!(record("sensor.csv", "text/csv").category, Category::Sensor);
        assert_eq!(record("blob", "").category, Category::Sensor);
    }

    #[test]
    fn advance_is_monotonic_and_capped() {
        let mut r = record("scan.png", "image/png");
        assert_eq!(r.advance(15.0, || unreachable!()), TickOutcome::Progressed(15.0));
        assert_eq!(r.advance(-5.0, || unreachable!()), TickOutcome::Progressed(15.0));
        assert_eq!(r.advance(f64::NAN, || unreachable!()), TickOutcome::Progressed(15.0));
        assert_eq!(r.advance(19.5, || unreachable!()), TickOutcome::Progressed(34.5));
        assert_eq!(r.status, UploadStatus::Uploading);
    }

    #[test]
    fn reaching_full_resolves_exactly_once() {
        let mut r = record("scan.png", "image/png");
        r.progress = 95.0;
        let mut calls = 0;
        let outcome = r.advance(12.0, || {
            calls += 1;
            UploadStatus::Error
        });
        assert_eq!(outcome, TickOutcome::Finished(UploadStatus::Error));
        assert_eq!(r.progress, 100.0);
        assert_eq!(calls, 1);

        assert_eq!(r.advance(10.0, || UploadStatus::Completed), TickOutcome::Ignored);
        assert_eq!(r.status, UploadStatus::Error);
        assert_eq!(r.progress, 100.0);
    }

    #[test]
    fn decider_cannot_keep_full_record_uploading() {
        let mut r = record("field.tif", "image/tiff");
        r.progress = 99.0;
        assert_eq!(
            r.advance(1.0, || UploadStatus::Uploading),
            TickOutcome::Finished(UploadStatus::Completed)
        );
    }

    #[test]
    fn statuses_serialize_lowercase() {
        let r = record("scan.png", "image/png");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["category"], "image");
        assert_eq!(v["status"], "uploading");
        assert_eq!(v["id"], "abc123xyz");
    }
}
