use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("o", 11, "Open an image (type a path, Enter to load)"),
        key_line("r", 11, "Restore the loaded image"),
        key_line("x", 11, "Reset to the initial state"),
        key_line("d", 11, "Download the restored image"),
        key_line("y", 11, "Copy the downloaded path to clipboard"),
        key_line("Y", 11, "Copy the restored image as a data URI"),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Notices:"),
        Line::from("  Errors open a notice; any key dismisses it."),
        Line::from(""),
        Line::from("While restoring:"),
        Line::from("  Restore and reset are disabled until the server answers."),
        Line::from("  Opening another image cancels the running request."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
