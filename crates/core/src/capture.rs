use crate::error::CaptureError;
use crate::model::Quadrant;

/// Normalized input for capturing a task from any client.
///
/// `text` goes through the free-text parser; the other fields are explicit
/// overrides supplied as flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureInput {
    pub text: Vec<String>,
    pub description: Option<String>,
    pub quadrant: Option<Quadrant>,
    pub tags: Vec<String>,
    pub due: Option<String>,
}

impl CaptureInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: vec![text.into()],
            ..Self::default()
        }
    }

    pub fn require_text(&self) -> Result<(), CaptureError> {
        if self.text.iter().all(|piece| piece.trim().is_empty()) {
            return Err(CaptureError::EmptyText);
        }
        Ok(())
    }
}
