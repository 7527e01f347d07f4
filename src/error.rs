use std::error::Error;
use std::fmt::{Display, Formatter};

/// User-facing input errors. Neither variant changes any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomError {
    /// Count outside [1, 28] or not a number.
    InvalidCount(String),
    /// Wrong number of names or a blank entry.
    InvalidNames,
}

impl AtomError {
    /// Title shown on the modal message bar.
    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidCount(_) => "Invalid Input",
            Self::InvalidNames => "Invalid Names",
        }
    }
}

impl Display for AtomError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCount(reason) => write!(f, "{reason}"),
            Self::InvalidNames => write!(f, "Please fill in names for all electrons"),
        }
    }
}

impl Error for AtomError {}

/// Failure reported by a display sink to the rotation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Surface was torn down; the driver exits quietly.
    Unavailable,
    /// Anything else; the driver logs it and exits.
    Fault(String),
}

impl Display for SinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "display surface is no longer available"),
            Self::Fault(reason) => write!(f, "display fault: {reason}"),
        }
    }
}

impl Error for SinkError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_names_message_matches_dialog_text() {
        assert_eq!(
            AtomError::InvalidNames.to_string(),
            "Please fill in names for all electrons"
        );
        assert_eq!(AtomError::InvalidNames.title(), "Invalid Names");
    }

    #[test]
    fn invalid_count_carries_its_reason() {
        let err = AtomError::InvalidCount("Please enter a valid number".into());
        assert_eq!(err.to_string(), "Please enter a valid number");
        assert_eq!(err.title(), "Invalid Input");
    }
}
