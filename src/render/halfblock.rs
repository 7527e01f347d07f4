use super::FrameWriter;
use super::canvas::{Canvas, ColorMode, color_to_bg, color_to_fg};

/// Below this brightness a half cell counts as background.
const DARK_THRESHOLD: f64 = 0.02;

fn shaded(canvas: &Canvas, idx: usize) -> crossterm::style::Color {
    let v = canvas.pixels[idx].clamp(0.0, 1.0);
    let (r, g, b) = canvas.colors[idx];
    let scale = |c: u8| (c as f64 * v) as u8;
    canvas.map_color(scale(r), scale(g), scale(b))
}

/// Each terminal cell shows two stacked pixels: top as foreground of '▀',
/// bottom as its background.
pub fn render(canvas: &Canvas) -> String {
    let (cols, rows) = canvas.term_size();
    let mut w = FrameWriter::with_capacity(cols * rows * 10);

    for row in 0..rows {
        for col in 0..cols {
            let top = (row * 2) * canvas.width + col;
            let bottom = (row * 2 + 1) * canvas.width + col;
            let top_lit = canvas.pixels[top] >= DARK_THRESHOLD;
            let bottom_lit = canvas.pixels[bottom] >= DARK_THRESHOLD;

            if canvas.color_mode == ColorMode::Mono {
                w.push(match (top_lit, bottom_lit) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
                continue;
            }
            if !top_lit && !bottom_lit {
                w.reset();
                w.push(' ');
                continue;
            }
            let sgr = format!(
                "{};{}",
                color_to_fg(shaded(canvas, top)),
                color_to_bg(shaded(canvas, bottom))
            );
            w.style(&sgr);
            w.push('▀');
        }
        w.end_row(row);
    }
    w.finish()
}
