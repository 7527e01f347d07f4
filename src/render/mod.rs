pub mod braille;
pub mod canvas;
pub mod halfblock;

pub use canvas::{Canvas, ColorMode, RenderMode};

/// Builds one frame of terminal output, emitting SGR sequences only when the
/// active style changes.
pub(crate) struct FrameWriter {
    out: String,
    active: String,
}

impl FrameWriter {
    pub fn with_capacity(bytes: usize) -> Self {
        FrameWriter {
            out: String::with_capacity(bytes),
            active: String::new(),
        }
    }

    /// Switch to `sgr` (e.g. "38;2;255;0;0") unless it is already active.
    pub fn style(&mut self, sgr: &str) {
        if sgr == self.active {
            return;
        }
        self.out.push_str("\x1b[");
        self.out.push_str(sgr);
        self.out.push('m');
        self.active.clear();
        self.active.push_str(sgr);
    }

    pub fn reset(&mut self) {
        if !self.active.is_empty() {
            self.out.push_str("\x1b[0m");
            self.active.clear();
        }
    }

    pub fn push(&mut self, ch: char) {
        self.out.push(ch);
    }

    /// End terminal row `row` (0-based) and move to the start of the next one.
    /// Cursor moves instead of newlines keep the last column from wrapping.
    pub fn end_row(&mut self, row: usize) {
        self.reset();
        self.out.push_str("\x1b[");
        self.out.push_str(&(row + 2).to_string());
        self.out.push_str(";1H");
    }

    /// Write `text` starting at terminal cell (`col`, `row`), 0-based.
    pub fn text_at(&mut self, col: usize, row: usize, sgr: Option<&str>, text: &str) {
        self.reset();
        self.out.push_str(&format!("\x1b[{};{}H", row + 1, col + 1));
        if let Some(sgr) = sgr {
            self.style(sgr);
        }
        self.out.push_str(text);
        self.reset();
    }

    pub fn finish(mut self) -> String {
        self.reset();
        self.out
    }
}
