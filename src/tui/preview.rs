use crate::model::Thumbnail;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Upper half block: foreground paints the top pixel, background the bottom one.
const HALF_BLOCK: &str = "▀";

/// Largest size with the thumbnail's aspect ratio that fits `max_w` x `max_h` pixels.
pub fn fit(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width == 0 || height == 0 || max_w == 0 || max_h == 0 {
        return (0, 0);
    }
    let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64).min(1.0);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// Render `thumb` into at most `cols` x `rows` terminal cells, two pixels per cell.
pub fn halfblock_lines(thumb: &Thumbnail, cols: u16, rows: u16) -> Vec<Line<'static>> {
    let (w, h) = fit(thumb.width, thumb.height, cols as u32, rows as u32 * 2);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let sample = |x: u32, y: u32| -> Option<Color> {
        if y >= h {
            return None;
        }
        let sx = (x * thumb.width / w).min(thumb.width - 1);
        let sy = (y * thumb.height / h).min(thumb.height - 1);
        thumb.pixel(sx, sy).map(|(r, g, b)| Color::Rgb(r, g, b))
    };

    (0..h.div_ceil(2))
        .map(|row| {
            let spans: Vec<Span<'static>> = (0..w)
                .map(|x| {
                    let mut style = Style::default();
                    if let Some(top) = sample(x, row * 2) {
                        style = style.fg(top);
                    }
                    if let Some(bottom) = sample(x, row * 2 + 1) {
                        style = style.bg(bottom);
                    }
                    Span::styled(HALF_BLOCK, style)
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Draw one image pane: the image when there is one, otherwise its placeholder.
pub fn draw_pane(
    f: &mut Frame,
    area: Rect,
    title: Line<'static>,
    image: Option<&Thumbnail>,
    placeholder: &str,
    accent: Color,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(accent));
    let inner = block.inner(area);

    match image {
        Some(thumb) => {
            let lines = halfblock_lines(thumb, inner.width, inner.height);
            let p = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(p, area);
        }
        None => {
            // Vertically centre the placeholder text.
            let pad = inner.height.saturating_sub(1) / 2;
            let mut lines: Vec<Line> = (0..pad).map(|_| Line::from("")).collect();
            lines.push(Line::from(Span::styled(
                placeholder.to_string(),
                Style::default().fg(Color::DarkGray),
            )));
            let p = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(p, area);
        }
    }
}
