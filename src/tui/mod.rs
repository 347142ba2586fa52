mod clipboard;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::engine::UploadSimulator;
use crate::model::{Category, UploadEvent, UploadRecord, UploadStatus};
use crate::orchestrator::{self, UiCommand};
use crate::views::{self, CategoryFilter};
use anyhow::{Context, Result};
use clipboard::copy_to_clipboard;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs},
    Terminal,
};
use state::{progress_bar, push_wrapped_status_kv, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const BAR_WIDTH: usize = 20;

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    // Describe launch files before the alternate screen takes over the terminal.
    let initial = crate::cli::initial_files(&args)?;

    // Unbounded channels keep ticker tasks from ever waiting on the UI.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<UploadEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let sim = UploadSimulator::from_config(&cfg, event_tx.clone());
    if !initial.is_empty() {
        let _ = cmd_tx.send(UiCommand::Submit(initial));
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = orchestrator::run_controller(sim, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    mut event_rx: UnboundedReceiver<UploadEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::default();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => {
                    if !handle_key(&mut state, k, &cmd_tx) {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
                Ok(Event::Paste(text)) => handle_paste(&mut state, &text, &cmd_tx),
                _ => {}
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen).ok();
    res
}

/// Submit every path found in `text`. Used for drops and for the path prompt.
fn submit_paths(state: &mut UiState, text: &str, cmd_tx: &UnboundedSender<UiCommand>) {
    let files: Vec<_> = crate::intake::parse_pasted_paths(text)
        .iter()
        .map(|p| crate::intake::describe_path(std::path::Path::new(p)))
        .collect();
    if files.is_empty() {
        state.info = "No files to upload".into();
        return;
    }
    let _ = cmd_tx.send(UiCommand::Submit(files));
}

fn handle_paste(state: &mut UiState, text: &str, cmd_tx: &UnboundedSender<UiCommand>) {
    // Pastes land in the prompt when it is open, otherwise they are file drops.
    if let Some(buf) = state.input.as_mut() {
        buf.push_str(text.trim_end_matches(['\r', '\n']));
        return;
    }
    submit_paths(state, text, cmd_tx);
}

/// Apply a key press. Returns `false` when the UI should quit.
fn handle_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) -> bool {
    if state.input.is_some() {
        match k.code {
            KeyCode::Esc => {
                state.input = None;
                state.info = "Selection cancelled".into();
            }
            KeyCode::Enter => {
                let text = state.input.take().unwrap_or_default();
                submit_paths(state, &text, cmd_tx);
            }
            KeyCode::Backspace => {
                if let Some(buf) = state.input.as_mut() {
                    buf.pop();
                }
            }
            KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Char(c) => {
                if let Some(buf) = state.input.as_mut() {
                    buf.push(c);
                }
            }
            _ => {}
        }
        return true;
    }

    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => return false,
        (_, KeyCode::Char('o')) => {
            state.input = Some(String::new());
            state.info = "Enter file path(s) to upload".into();
        }
        (_, KeyCode::Char('d')) | (_, KeyCode::Delete) => {
            if let Some(r) = state.selected_record() {
                let _ = cmd_tx.send(UiCommand::Remove(r.id.clone()));
            }
        }
        (_, KeyCode::Char('y')) => {
            if let Some(id) = state.selected_record().map(|r| r.id.as_str().to_owned()) {
                state.info = match copy_to_clipboard(&id) {
                    Ok(_) => format!("✓ Copied to clipboard: {id}"),
                    Err(e) => format!("Clipboard copy failed: {e:#}"),
                };
            }
        }
        (_, KeyCode::Tab) => state.next_tab(),
        (_, KeyCode::BackTab) => state.prev_tab(),
        (_, KeyCode::Char('1')) => state.set_tab(0),
        (_, KeyCode::Char('2')) => state.set_tab(1),
        (_, KeyCode::Char('3')) => state.set_tab(2),
        (_, KeyCode::Char('?')) => state.set_tab(state::HELP_TAB),
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.select_prev(),
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.select_next(),
        _ => {}
    }
    true
}

fn tab_title(state: &UiState, filter: CategoryFilter) -> String {
    views::tab_label(filter, views::filtered(&state.records, filter).len())
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let pipeline_height = if views::has_completed(&state.records) {
        5
    } else {
        0
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),               // Tabs
                Constraint::Length(4),               // Drop zone / path prompt
                Constraint::Min(0),                  // Upload list or help
                Constraint::Length(pipeline_height), // Processing pipeline
                Constraint::Length(4),               // Status
            ]
            .as_ref(),
        )
        .split(area);

    let mut titles: Vec<Line> = CategoryFilter::ALL
        .iter()
        .map(|f| Line::from(tab_title(state, *f)))
        .collect();
    titles.push(Line::from("Help"));

    let mut header = vec![Span::raw("Data Upload Center")];
    if !state.records.is_empty() {
        header.push(Span::styled(
            "  ☁ Cloud Storage  ⛁ API Ready",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let tabs = Tabs::new(titles)
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title(Line::from(header)))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    draw_drop_zone(chunks[1], f, state);

    if state.is_help() {
        draw_help(chunks[2], f);
    } else {
        draw_uploads(chunks[2], f, state);
    }

    if pipeline_height > 0 {
        draw_pipeline(chunks[3], f, state);
    }
    draw_status(chunks[4], f, state);
}

fn draw_drop_zone(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let lines = match state.input.as_deref() {
        Some(buf) => vec![
            Line::from(vec![
                Span::styled("Path: ", Style::default().fg(Color::Gray)),
                Span::raw(buf.to_string()),
                Span::styled("▏", Style::default().fg(Color::Yellow)),
            ]),
            Line::from(Span::styled(
                "enter to upload, esc to cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ],
        None => vec![
            Line::from(vec![
                Span::raw("Drag and drop files here or press "),
                Span::styled("o", Style::default().fg(Color::Magenta)),
                Span::raw(" to browse"),
            ]),
            Line::from(Span::styled(
                "Supports: TIFF, PNG (images) • CSV, JSON (sensor data)",
                Style::default().fg(Color::DarkGray),
            )),
        ],
    };
    let border = if state.input.is_some() {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(p, area);
}

fn record_item(r: &UploadRecord) -> ListItem<'static> {
    let (icon, icon_color) = match r.category {
        Category::Image => ("▣", Color::Green),
        Category::Sensor => ("≡", Color::Cyan),
    };

    let mut spans = vec![
        Span::styled(format!("{icon} "), Style::default().fg(icon_color)),
        Span::raw(r.name.clone()),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", r.category.label()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("  {}  ", views::format_file_size(r.size_bytes)),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    match r.status {
        UploadStatus::Uploading => {
            spans.push(Span::styled(
                progress_bar(r.progress, BAR_WIDTH),
                Style::default().fg(Color::Yellow),
            ));
            spans.push(Span::raw(format!(" Uploading... {:.0}%", r.progress)));
        }
        UploadStatus::Completed => {
            spans.push(Span::styled("✓ completed", Style::default().fg(Color::Green)))
        }
        UploadStatus::Error => spans.push(Span::styled("! error", Style::default().fg(Color::Red))),
    }

    ListItem::new(Line::from(spans))
}

fn draw_uploads(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let visible = state.visible();
    let title = state
        .filter()
        .map(|flt| tab_title(state, flt))
        .unwrap_or_default();

    if visible.is_empty() {
        let p = Paragraph::new(Line::from(Span::styled(
            "No files yet",
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, area);
        return;
    }

    let items: Vec<ListItem> = visible.iter().map(|r| record_item(r)).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(Some(state.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_pipeline(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let lines: Vec<Line> = views::pipeline_stages(views::has_completed(&state.records))
        .iter()
        .map(|(name, stage)| {
            let color = match stage {
                views::StageState::Active => Color::Green,
                views::StageState::Queued => Color::Gray,
            };
            Line::from(vec![
                Span::raw(format!("{name:<24}")),
                Span::styled(stage.label(), Style::default().fg(color)),
            ])
        })
        .collect();
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Data Processing Pipeline"),
    );
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    push_wrapped_status_kv(&mut lines, "Info", &state.info, area.width);
    if let Some(r) = state.selected_record() {
        push_wrapped_status_kv(
            &mut lines,
            "Selected",
            &format!("{} {} {}", r.id, r.mime_type, r.submitted_utc),
            area.width,
        );
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
