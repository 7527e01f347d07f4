use crossterm::style::Color;

use super::FrameWriter;

/// How to render sub-cell pixels to terminal characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderMode {
    /// Unicode braille characters (2x4 per cell = highest resolution)
    Braille,
    /// Half-block characters ▀▄█ (1x2 per cell)
    HalfBlock,
    /// Plain ASCII characters with density mapping
    Ascii,
}

/// Color output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    /// No color — monochrome
    Mono,
    /// ANSI 16 colors
    Ansi16,
    /// 256-color palette
    Ansi256,
    /// 24-bit true color (RGB)
    TrueColor,
}

/// Text drawn over the pixel grid at a terminal cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub col: usize,
    pub row: usize,
    pub text: String,
    pub rgb: (u8, u8, u8),
}

/// A pixel-level canvas that gets rendered to terminal characters.
/// Coordinates are in "sub-cell" pixel space.
pub struct Canvas {
    /// Width in pixels (sub-cell)
    pub width: usize,
    /// Height in pixels (sub-cell)
    pub height: usize,
    /// Pixel data: brightness 0.0..=1.0
    pub pixels: Vec<f64>,
    pub colors: Vec<(u8, u8, u8)>,
    pub render_mode: RenderMode,
    pub color_mode: ColorMode,
    /// Color quantization step (0 = off, 4/8/16 = round RGB to nearest N).
    pub color_quant: u8,
    labels: Vec<Label>,
}

impl Canvas {
    pub fn new(
        term_cols: usize,
        term_rows: usize,
        render_mode: RenderMode,
        color_mode: ColorMode,
    ) -> Self {
        let (px_w, px_h) = match render_mode {
            RenderMode::Braille => (term_cols * 2, term_rows * 4),
            RenderMode::HalfBlock => (term_cols, term_rows * 2),
            RenderMode::Ascii => (term_cols, term_rows),
        };
        let size = px_w * px_h;
        Canvas {
            width: px_w,
            height: px_h,
            pixels: vec![0.0; size],
            colors: vec![(255, 255, 255); size],
            render_mode,
            color_mode,
            color_quant: 0,
            labels: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0.0);
        self.colors.fill((255, 255, 255));
        self.labels.clear();
    }

    /// Set a pixel with color. Out-of-bounds writes are dropped.
    #[inline]
    pub fn set_colored(&mut self, x: i64, y: i64, brightness: f64, rgb: (u8, u8, u8)) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            if brightness >= self.pixels[idx] {
                self.pixels[idx] = brightness;
                self.colors[idx] = rgb;
            }
        }
    }

    /// Terminal dimensions needed for this canvas
    pub fn term_size(&self) -> (usize, usize) {
        match self.render_mode {
            RenderMode::Braille => (self.width / 2, self.height / 4),
            RenderMode::HalfBlock => (self.width, self.height / 2),
            RenderMode::Ascii => (self.width, self.height),
        }
    }

    /// Height of one pixel relative to its width. Terminal cells are about
    /// twice as tall as wide, so only ASCII mode has non-square pixels.
    pub fn pixel_aspect(&self) -> f64 {
        match self.render_mode {
            RenderMode::Ascii => 2.0,
            RenderMode::Braille | RenderMode::HalfBlock => 1.0,
        }
    }

    /// Terminal cell holding pixel (`x`, `y`).
    pub fn pixel_to_cell(&self, x: usize, y: usize) -> (usize, usize) {
        match self.render_mode {
            RenderMode::Braille => (x / 2, y / 4),
            RenderMode::HalfBlock => (x, y / 2),
            RenderMode::Ascii => (x, y),
        }
    }

    /// Filled disc with a soft edge. `ry` lets callers correct for pixel aspect.
    pub fn fill_ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, rgb: (u8, u8, u8)) {
        let rx = rx.max(0.5);
        let ry = ry.max(0.5);
        let (x0, x1) = ((cx - rx).floor() as i64, (cx + rx).ceil() as i64);
        let (y0, y1) = ((cy - ry).floor() as i64, (cy + ry).ceil() as i64);
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = (px as f64 + 0.5 - cx) / rx;
                let dy = (py as f64 + 0.5 - cy) / ry;
                let d = (dx * dx + dy * dy).sqrt();
                if d <= 1.0 {
                    let brightness = 1.0 - 0.4 * d * d;
                    self.set_colored(px, py, brightness, rgb);
                }
            }
        }
    }

    /// Outline of an ellipse at the given brightness.
    pub fn stroke_ellipse(
        &mut self,
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        brightness: f64,
        rgb: (u8, u8, u8),
    ) {
        let steps = ((rx.max(ry) * 8.0) as usize).max(16);
        for i in 0..steps {
            let angle = std::f64::consts::TAU * i as f64 / steps as f64;
            let px = (cx + angle.cos() * rx).floor() as i64;
            let py = (cy + angle.sin() * ry).floor() as i64;
            self.set_colored(px, py, brightness, rgb);
        }
    }

    /// Queue `text` centered on pixel (`x`, `y`). Clipped to the canvas.
    pub fn put_label(&mut self, x: f64, y: f64, text: &str, rgb: (u8, u8, u8)) {
        if text.is_empty() || x < 0.0 || y < 0.0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return;
        }
        let (cols, _) = self.term_size();
        let (col, row) = self.pixel_to_cell(x, y);
        let len = text.chars().count();
        let start = col.saturating_sub(len / 2);
        let visible: String = text.chars().take(cols.saturating_sub(start)).collect();
        if visible.is_empty() {
            return;
        }
        self.labels.push(Label {
            col: start,
            row,
            text: visible,
            rgb,
        });
    }

    #[cfg(test)]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Render the canvas (pixels then label overlay) to a string buffer
    pub fn render(&self) -> String {
        let body = match self.render_mode {
            RenderMode::Braille => super::braille::render(self),
            RenderMode::HalfBlock => super::halfblock::render(self),
            RenderMode::Ascii => self.render_ascii(),
        };
        if self.labels.is_empty() {
            return body;
        }
        let mut w = FrameWriter::with_capacity(body.len() + self.labels.len() * 32);
        for label in &self.labels {
            let sgr = (self.color_mode != ColorMode::Mono).then(|| {
                let (r, g, b) = label.rgb;
                format!("1;{}", color_to_fg(self.map_color(r, g, b)))
            });
            w.text_at(label.col, label.row, sgr.as_deref(), &label.text);
        }
        body + &w.finish()
    }

    fn render_ascii(&self) -> String {
        const CHARS: &[u8] = b" .:-=+*#%@";
        let (cols, rows) = self.term_size();
        let mut w = FrameWriter::with_capacity(cols * rows * 10);
        let use_color = self.color_mode != ColorMode::Mono;

        for row in 0..rows {
            for col in 0..cols {
                let idx = row * self.width + col;
                let v = self.pixels[idx].clamp(0.0, 1.0);
                let ch = CHARS[(v * (CHARS.len() - 1) as f64) as usize] as char;
                if use_color && ch != ' ' {
                    let (r, g, b) = self.colors[idx];
                    w.style(&color_to_fg(self.map_color(r, g, b)));
                }
                w.push(ch);
            }
            w.end_row(row);
        }
        w.finish()
    }

    pub fn map_color(&self, r: u8, g: u8, b: u8) -> Color {
        let (r, g, b) = if self.color_quant > 1 {
            let q = self.color_quant as u16;
            let quant = |c: u8| ((c as u16 + q / 2) / q * q).min(255) as u8;
            (quant(r), quant(g), quant(b))
        } else {
            (r, g, b)
        };
        match self.color_mode {
            ColorMode::Mono => Color::White,
            ColorMode::TrueColor => Color::Rgb { r, g, b },
            ColorMode::Ansi256 => {
                let idx = 16 + (36 * (r as u16 / 51)) + (6 * (g as u16 / 51)) + (b as u16 / 51);
                Color::AnsiValue(idx as u8)
            }
            ColorMode::Ansi16 => {
                let brightness = (r as u16 + g as u16 + b as u16) / 3;
                let bright = brightness > 180;
                if brightness < 64 {
                    Color::Black
                } else if r > g && r > b {
                    if bright { Color::Red } else { Color::DarkRed }
                } else if g > r && g > b {
                    if bright { Color::Green } else { Color::DarkGreen }
                } else if b > r && b > g {
                    if bright { Color::Blue } else { Color::DarkBlue }
                } else if bright {
                    Color::White
                } else {
                    Color::Grey
                }
            }
        }
    }
}

pub fn color_to_fg(color: Color) -> String {
    match color {
        Color::Rgb { r, g, b } => format!("38;2;{};{};{}", r, g, b),
        Color::AnsiValue(v) => format!("38;5;{}", v),
        Color::Black => "30".into(),
        Color::DarkRed => "31".into(),
        Color::DarkGreen => "32".into(),
        Color::DarkBlue => "34".into(),
        Color::Grey => "37".into(),
        Color::Red => "91".into(),
        Color::Green => "92".into(),
        Color::Blue => "94".into(),
        Color::White => "97".into(),
        _ => "37".into(),
    }
}

pub fn color_to_bg(color: Color) -> String {
    match color {
        Color::Rgb { r, g, b } => format!("48;2;{};{};{}", r, g, b),
        Color::AnsiValue(v) => format!("48;5;{}", v),
        Color::Black => "40".into(),
        Color::DarkRed => "41".into(),
        Color::DarkGreen => "42".into(),
        Color::DarkBlue => "44".into(),
        Color::Grey => "47".into(),
        Color::Red => "101".into(),
        Color::Green => "102".into(),
        Color::Blue => "104".into(),
        Color::White => "107".into(),
        _ => "40".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_dimensions_follow_render_mode() {
        let c = Canvas::new(10, 5, RenderMode::Braille, ColorMode::Mono);
        assert_eq!((c.width, c.height), (20, 20));
        assert_eq!(c.term_size(), (10, 5));
        let c = Canvas::new(10, 5, RenderMode::HalfBlock, ColorMode::Mono);
        assert_eq!((c.width, c.height), (10, 10));
        let c = Canvas::new(10, 5, RenderMode::Ascii, ColorMode::Mono);
        assert_eq!(c.pixel_aspect(), 2.0);
        assert_eq!(c.pixel_to_cell(3, 4), (3, 4));
    }

    #[test]
    fn out_of_bounds_pixels_are_ignored() {
        let mut c = Canvas::new(4, 2, RenderMode::Ascii, ColorMode::Mono);
        c.set_colored(-1, 0, 1.0, (1, 2, 3));
        c.set_colored(0, 99, 1.0, (1, 2, 3));
        assert!(c.pixels.iter().all(|&p| p == 0.0));
        c.set_colored(1, 1, 1.0, (1, 2, 3));
        assert_eq!(c.pixels[c.width + 1], 1.0);
        assert_eq!(c.colors[c.width + 1], (1, 2, 3));
    }

    #[test]
    fn dimmer_pixel_does_not_overwrite_brighter_one() {
        let mut c = Canvas::new(4, 2, RenderMode::Ascii, ColorMode::Mono);
        c.set_colored(0, 0, 1.0, (255, 0, 0));
        c.set_colored(0, 0, 0.2, (0, 0, 255));
        assert_eq!(c.colors[0], (255, 0, 0));
    }

    #[test]
    fn labels_are_centered_and_clipped() {
        let mut c = Canvas::new(10, 4, RenderMode::Ascii, ColorMode::Mono);
        c.put_label(5.0, 1.0, "Bob", (255, 255, 255));
        c.put_label(9.0, 2.0, "Alexander", (255, 255, 255));
        c.put_label(50.0, 2.0, "gone", (255, 255, 255));
        let labels = c.labels();
        assert_eq!(labels.len(), 2);
        assert_eq!((labels[0].col, labels[0].row), (4, 1));
        assert_eq!(labels[1].col, 5);
        assert_eq!(labels[1].text, "Alexa");

        let out = c.render();
        assert!(out.contains("\x1b[2;5HBob"));
        c.clear();
        assert!(c.labels().is_empty());
    }

    #[test]
    fn filled_ellipse_lights_its_center() {
        let mut c = Canvas::new(20, 10, RenderMode::HalfBlock, ColorMode::TrueColor);
        c.fill_ellipse(10.0, 10.0, 3.0, 3.0, (0, 0, 255));
        let idx = 10 * c.width + 10;
        assert!(c.pixels[idx] > 0.9);
        assert_eq!(c.colors[idx], (0, 0, 255));
        assert_eq!(c.pixels[0], 0.0);
    }

    #[test]
    fn ansi16_maps_dominant_channel() {
        let c = Canvas::new(1, 1, RenderMode::Ascii, ColorMode::Ansi16);
        assert_eq!(c.map_color(255, 200, 200), Color::Red);
        assert_eq!(c.map_color(10, 10, 10), Color::Black);
        assert_eq!(c.map_color(60, 60, 230), Color::DarkBlue);
    }
}
