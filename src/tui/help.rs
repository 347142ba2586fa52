use crate::mime::ACCEPT_HINTS;
use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(keys: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(keys, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let hints = ACCEPT_HINTS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(" ");

    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key_line("q / Ctrl-C", 2, "Quit"),
        key_line("o", 11, "Select files by path"),
        key_line("drop", 8, "Drag files onto the terminal to upload them"),
        key_line("d / Del", 5, "Remove selected file"),
        key_line("y", 11, "Copy selected file id"),
        key_line("↑/↓ j/k", 5, "Navigate"),
        key_line("tab", 9, "Switch tabs"),
        key_line("1 2 3", 7, "All files / Images / Sensor data"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Path prompt:"),
        key_line("enter", 7, "Upload (quote paths containing spaces)"),
        key_line("esc", 9, "Cancel"),
        Line::from(""),
        Line::from(vec![
            Span::raw("Supported: "),
            Span::styled(hints, Style::default().fg(Color::Cyan)),
            Span::raw(" (other files are accepted too)"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
