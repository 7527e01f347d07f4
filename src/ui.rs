//! Keyboard form: the electron count field and one field per electron name.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Longest name accepted into a field.
const MAX_NAME_CHARS: usize = 24;

/// Rows given to the confirmed names block; 28 names fit in three columns.
pub const NAMES_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Count,
    Name(usize),
}

/// What the main loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    ConfirmCount(String),
    ConfirmNames(Vec<String>),
    CycleRender,
    CycleColor,
    ToggleStatus,
    Quit,
}

pub struct Form {
    count_input: String,
    name_inputs: Vec<String>,
    focus: Focus,
}

impl Form {
    pub fn new(initial_count: &str) -> Self {
        Form {
            count_input: initial_count.to_string(),
            name_inputs: Vec::new(),
            focus: Focus::Count,
        }
    }

    /// Rebuild the name fields after a count was confirmed.
    pub fn set_name_fields(&mut self, count: usize) {
        self.name_inputs = vec![String::new(); count];
        self.focus = if count > 0 { Focus::Name(0) } else { Focus::Count };
    }

    #[cfg(test)]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn count_input(&self) -> &str {
        &self.count_input
    }

    #[cfg(test)]
    pub fn name_inputs(&self) -> &[String] {
        &self.name_inputs
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind == KeyEventKind::Release {
            return Action::None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::F(2) => Action::CycleRender,
            KeyCode::F(3) => Action::CycleColor,
            KeyCode::F(4) => Action::ToggleStatus,
            KeyCode::Tab | KeyCode::Down => {
                self.focus_next();
                Action::None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_prev();
                Action::None
            }
            KeyCode::Enter => match self.focus {
                Focus::Count => Action::ConfirmCount(self.count_input.clone()),
                Focus::Name(_) => Action::ConfirmNames(self.name_inputs.clone()),
            },
            KeyCode::Backspace => {
                if let Some(field) = self.field_mut() {
                    field.pop();
                }
                Action::None
            }
            KeyCode::Char(ch) => {
                match self.focus {
                    Focus::Count if ch.is_ascii_digit() && self.count_input.len() < 3 => {
                        self.count_input.push(ch);
                    }
                    Focus::Name(i) => {
                        if let Some(field) = self.name_inputs.get_mut(i)
                            && field.chars().count() < MAX_NAME_CHARS
                        {
                            field.push(ch);
                        }
                    }
                    Focus::Count => {}
                }
                Action::None
            }
            _ => Action::None,
        }
    }

    fn field_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Count => Some(&mut self.count_input),
            Focus::Name(i) => self.name_inputs.get_mut(i),
        }
    }

    fn focus_next(&mut self) {
        let n = self.name_inputs.len();
        self.focus = match self.focus {
            Focus::Count if n > 0 => Focus::Name(0),
            Focus::Name(i) if i + 1 < n => Focus::Name(i + 1),
            _ => Focus::Count,
        };
    }

    fn focus_prev(&mut self) {
        let n = self.name_inputs.len();
        self.focus = match self.focus {
            Focus::Count if n > 0 => Focus::Name(n - 1),
            Focus::Name(i) if i > 0 => Focus::Name(i - 1),
            _ => Focus::Count,
        };
    }

    /// Lines for the panel under the atom, at most `width` chars each.
    pub fn panel_lines(&self, width: usize) -> Vec<String> {
        let cursor = |focused: bool| if focused { "_" } else { "" };
        let mut lines = vec![format!(
            "{} Number of Electrons: [{}{}]  (Enter to confirm)",
            marker(self.focus == Focus::Count),
            self.count_input,
            cursor(self.focus == Focus::Count),
        )];
        if let Focus::Name(i) = self.focus {
            lines.push(format!(
                "{} Electron {}/{}: [{}_]  (Tab/arrows move, Enter confirms all names)",
                marker(true),
                i + 1,
                self.name_inputs.len(),
                self.name_inputs.get(i).map(String::as_str).unwrap_or(""),
            ));
        } else if !self.name_inputs.is_empty() {
            lines.push(format!(
                "  {} name fields (Tab to edit)",
                self.name_inputs.len()
            ));
        }
        lines
            .into_iter()
            .map(|l| l.chars().take(width).collect())
            .collect()
    }
}

/// Lay `entries` out column by column in at most `rows` lines of `width` chars.
///
/// Columns are added until everything fits; entries wider than their column
/// are cut short rather than dropped.
pub fn names_panel(entries: &[String], width: usize, rows: usize) -> Vec<String> {
    if entries.is_empty() || width == 0 || rows == 0 {
        return Vec::new();
    }
    let columns = entries.len().div_ceil(rows);
    let col_width = width / columns;
    let used_rows = entries.len().div_ceil(columns);
    (0..used_rows)
        .map(|row| {
            let mut line = String::new();
            for col in 0..columns {
                let Some(entry) = entries.get(col * used_rows + row) else {
                    break;
                };
                let cell: String = entry.chars().take(col_width.saturating_sub(2)).collect();
                if col + 1 < columns {
                    line.push_str(&format!("{cell:<col_width$}"));
                } else {
                    line.push_str(&cell);
                }
            }
            line.trim_end().to_string()
        })
        .collect()
}

fn marker(focused: bool) -> &'static str {
    if focused { ">" } else { " " }
}
