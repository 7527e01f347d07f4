use super::FrameWriter;
use super::canvas::{Canvas, ColorMode, color_to_fg};

/// Braille dot bit for each (dx, dy) inside a 2x4 cell:
/// (0,0) (1,0)    dot1 dot4
/// (0,1) (1,1)    dot2 dot5
/// (0,2) (1,2)    dot3 dot6
/// (0,3) (1,3)    dot7 dot8
const DOT_BITS: [[u32; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];
const BRAILLE_BASE: u32 = 0x2800;
const LIT_THRESHOLD: f64 = 0.3;

/// One braille cell: its glyph and the mean color of its lit dots.
fn cell(canvas: &Canvas, col: usize, row: usize) -> (char, Option<(u8, u8, u8)>) {
    let mut bits = 0;
    let mut sum = [0u32; 3];
    let mut lit = 0u32;
    for (dx, column) in DOT_BITS.iter().enumerate() {
        for (dy, &bit) in column.iter().enumerate() {
            let (x, y) = (col * 2 + dx, row * 4 + dy);
            if x >= canvas.width || y >= canvas.height {
                continue;
            }
            let idx = y * canvas.width + x;
            if canvas.pixels[idx] > LIT_THRESHOLD {
                bits |= bit;
                let (r, g, b) = canvas.colors[idx];
                sum[0] += r as u32;
                sum[1] += g as u32;
                sum[2] += b as u32;
                lit += 1;
            }
        }
    }
    let ch = char::from_u32(BRAILLE_BASE + bits).unwrap_or(' ');
    let color = (lit > 0).then(|| ((sum[0] / lit) as u8, (sum[1] / lit) as u8, (sum[2] / lit) as u8));
    (ch, color)
}

pub fn render(canvas: &Canvas) -> String {
    let (cols, rows) = canvas.term_size();
    let mut w = FrameWriter::with_capacity(cols * rows * 12);
    let colored = canvas.color_mode != ColorMode::Mono;

    for row in 0..rows {
        for col in 0..cols {
            let (ch, color) = cell(canvas, col, row);
            if let (true, Some((r, g, b))) = (colored, color) {
                w.style(&color_to_fg(canvas.map_color(r, g, b)));
            }
            w.push(ch);
        }
        w.end_row(row);
    }
    w.finish()
}
