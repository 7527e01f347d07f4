use crate::error::AtomError;

/// Display names for the electrons of the current atom.
///
/// The binding is replaced as a whole: either every electron has a confirmed
/// non-blank name, or the labels fall back to electron numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameBinding {
    names: Vec<String>,
    confirmed: bool,
}

impl NameBinding {
    pub fn new(count: usize) -> Self {
        NameBinding {
            names: vec![String::new(); count],
            confirmed: false,
        }
    }

    /// Forget all names for a freshly confirmed electron count.
    pub fn reset(&mut self, count: usize) {
        self.names = vec![String::new(); count];
        self.confirmed = false;
    }

    /// Replace every name at once. Rejected input leaves the binding untouched.
    pub fn confirm(&mut self, raw: &[String], count: usize) -> Result<(), AtomError> {
        if raw.len() != count {
            return Err(AtomError::InvalidNames);
        }
        let trimmed: Vec<String> = raw.iter().map(|n| n.trim().to_string()).collect();
        if trimmed.iter().any(String::is_empty) {
            return Err(AtomError::InvalidNames);
        }
        self.names = trimmed;
        self.confirmed = true;
        Ok(())
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Text drawn on electron `index`: its name once confirmed, else its 1-based number.
    pub fn label(&self, index: usize) -> String {
        match self.names.get(index) {
            Some(name) if self.confirmed => name.clone(),
            _ => (index + 1).to_string(),
        }
    }

    /// "Electron i: name" lines for the confirmed names panel.
    pub fn summary(&self) -> Vec<String> {
        if !self.confirmed {
            return Vec::new();
        }
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("Electron {}: {}", i + 1, name))
            .collect()
    }
}
