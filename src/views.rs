//! Read-only projections over the active upload set.

use crate::model::{Category, UploadRecord, UploadStatus};

/// Which slice of the active set a list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Images,
    Sensor,
}

impl CategoryFilter {
    pub const ALL: [CategoryFilter; 3] = [
        CategoryFilter::All,
        CategoryFilter::Images,
        CategoryFilter::Sensor,
    ];

    pub fn matches(self, record: &UploadRecord) -> bool {
        self.category().map_or(true, |c| record.category == c)
    }

    /// The category this filter keeps, `None` for the unfiltered view.
    pub fn category(self) -> Option<Category> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Images => Some(Category::Image),
            CategoryFilter::Sensor => Some(Category::Sensor),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            CategoryFilter::All => "All Files",
            CategoryFilter::Images => "Images",
            CategoryFilter::Sensor => "Sensor Data",
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        match category {
            Category::Image => CategoryFilter::Images,
            Category::Sensor => CategoryFilter::Sensor,
        }
    }
}

pub fn filtered(records: &[UploadRecord], filter: CategoryFilter) -> Vec<&UploadRecord> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub uploading: usize,
    pub completed: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UploadRecord>) -> Self {
        let mut counts = Self::default();
        for r in records {
            match r.status {
                UploadStatus::Uploading => counts.uploading += 1,
                UploadStatus::Completed => counts.completed += 1,
                UploadStatus::Error => counts.error += 1,
            }
        }
        counts
    }
}

/// Tab label with its record count, e.g. `Images (2)`.
pub fn tab_label(filter: CategoryFilter, count: usize) -> String {
    format!("{} ({})", filter.title(), count)
}

/// Whether any record finished uploading successfully.
pub fn has_completed(records: &[UploadRecord]) -> bool {
    records.iter().any(|r| r.status == UploadStatus::Completed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Active,
    Queued,
}

impl StageState {
    pub fn label(self) -> &'static str {
        match self {
            StageState::Active => "Active",
            StageState::Queued => "Queued",
        }
    }
}

pub const PIPELINE_STAGES: [(&str, StageState); 3] = [
    ("Image Normalization", StageState::Active),
    ("NDVI/EVI Extraction", StageState::Queued),
    ("Sensor Data Cleaning", StageState::Queued),
];

/// Pipeline stages to show, empty while the panel is hidden. The panel only
/// appears once something finished uploading.
pub fn pipeline_stages(any_completed: bool) -> &'static [(&'static str, StageState)] {
    if any_completed {
        &PIPELINE_STAGES
    } else {
        &[]
    }
}

/// Human-readable size in base 1024 with at most two decimals (`1536` → `1.5 KB`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let rounded = format!("{:.2}", size);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit_index])
}
