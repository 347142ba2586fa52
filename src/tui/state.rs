use crate::model::{UploadEvent, UploadRecord, UploadStatus, PROGRESS_MAX};
use crate::views::{self, CategoryFilter};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

pub const HELP_TAB: usize = 3;
pub const TAB_COUNT: usize = 4;

/// Presentation state owned by the UI thread. Mirrors the simulator through events only.
#[derive(Default)]
pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub records: Vec<UploadRecord>,
    /// Index into the records visible under the current tab.
    pub selected: usize,
    /// Path prompt buffer; `Some` while the prompt is open.
    pub input: Option<String>,
}

impl UiState {
    pub fn filter(&self) -> Option<CategoryFilter> {
        CategoryFilter::ALL.get(self.tab).copied()
    }

    pub fn is_help(&self) -> bool {
        self.tab == HELP_TAB
    }

    pub fn visible(&self) -> Vec<&UploadRecord> {
        match self.filter() {
            Some(f) => views::filtered(&self.records, f),
            None => Vec::new(),
        }
    }

    pub fn selected_record(&self) -> Option<&UploadRecord> {
        self.visible().get(self.selected).copied()
    }

    pub fn set_tab(&mut self, tab: usize) {
        self.tab = tab % TAB_COUNT;
        self.selected = 0;
    }

    pub fn next_tab(&mut self) {
        self.set_tab(self.tab + 1);
    }

    pub fn prev_tab(&mut self) {
        self.set_tab(self.tab + TAB_COUNT - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        let len = self.visible().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    pub fn apply_event(&mut self, ev: UploadEvent) {
        match ev {
            UploadEvent::Submitted { record } => {
                self.info = format!("Uploading {}", record.name);
                self.records.push(*record);
            }
            UploadEvent::Progress { id, progress } => {
                if let Some(r) = self.records.iter_mut().find(|r| r.id == id) {
                    if r.status == UploadStatus::Uploading {
                        r.progress = r.progress.max(progress);
                    }
                }
            }
            UploadEvent::Finished { id, status } => {
                if let Some(r) = self.records.iter_mut().find(|r| r.id == id) {
                    r.progress = PROGRESS_MAX;
                    r.status = status;
                    self.info = match status {
                        UploadStatus::Error => format!("Upload failed: {}", r.name),
                        _ => format!("Uploaded {}", r.name),
                    };
                }
            }
            UploadEvent::Removed { id } => {
                if let Some(pos) = self.records.iter().position(|r| r.id == id) {
                    let r = self.records.remove(pos);
                    self.info = format!("Removed {}", r.name);
                }
                self.clamp_selection();
            }
            UploadEvent::Info(msg) => self.info = msg,
        }
    }
}

/// Text progress bar of `width` cells, e.g. `█████░░░░░`.
pub fn progress_bar(progress: f64, width: usize) -> String {
    let ratio = (progress / PROGRESS_MAX).clamp(0.0, 1.0);
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileDescriptor, RecordId};

    fn submitted(id: &str, mime: &str) -> UploadEvent {
        UploadEvent::Submitted {
            record: Box::new(UploadRecord::new(
                RecordId::new(id),
                FileDescriptor::new(format!("{id}.bin"), 1, mime),
            )),
        }
    }

    #[test]
    fn events_drive_the_mirror() {
        let mut s = UiState::default();
        s.apply_event(submitted("a", "image/png"));
        s.apply_event(submitted("b", "text/csv"));
        s.apply_event(UploadEvent::Progress {
            id: RecordId::new("a"),
            progress: 40.0,
        });
        // Stale ticks never move progress backwards.
        s.apply_event(UploadEvent::Progress {
            id: RecordId::new("a"),
            progress: 20.0,
        });
        assert_eq!(s.records[0].progress, 40.0);

        s.apply_event(UploadEvent::Finished {
            id: RecordId::new("b"),
            status: UploadStatus::Error,
        });
        assert_eq!(s.records[1].status, UploadStatus::Error);
        assert_eq!(s.records[1].progress, 100.0);
        assert_eq!(s.info, "Upload failed: b.bin");

        // Nothing moves a terminal record.
        s.apply_event(UploadEvent::Progress {
            id: RecordId::new("b"),
            progress: 10.0,
        });
        assert_eq!(s.records[1].progress, 100.0);
    }

    #[test]
    fn tabs_filter_and_selection_clamps_on_removal() {
        let mut s = UiState::default();
        s.apply_event(submitted("a", "image/png"));
        s.apply_event(submitted("b", "text/csv"));
        s.apply_event(submitted("c", "image/tiff"));

        s.set_tab(1);
        assert_eq!(s.visible().len(), 2);
        s.select_next();
        s.select_next();
        assert_eq!(s.selected_record().unwrap().id.as_str(), "c");

        s.apply_event(UploadEvent::Removed {
            id: RecordId::new("c"),
        });
        assert_eq!(s.selected, 0);
        assert_eq!(s.selected_record().unwrap().id.as_str(), "a");

        s.prev_tab();
        assert_eq!(s.tab, 0);
        s.prev_tab();
        assert!(s.is_help());
        assert!(s.visible().is_empty());
        assert!(s.selected_record().is_none());
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0.0, 4), "░░░░");
        assert_eq!(progress_bar(50.0, 4), "██░░");
        assert_eq!(progress_bar(100.0, 4), "████");
        assert_eq!(progress_bar(250.0, 4), "████");
    }
}
