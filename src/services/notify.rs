//! Operator notifications.

use chrono::{DateTime, Utc};

/// A titled, timestamped, multi-line notice for administrators.
#[derive(Debug, Clone)]
pub struct OperatorNotice {
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub lines: Vec<String>,
}

impl OperatorNotice {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            timestamp: Utc::now(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    /// Header line followed by the body, indented.
    pub fn render(&self) -> Vec<String> {
        std::iter::once(format!(
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.title
        ))
        .chain(self.lines.iter().map(|l| format!("  {l}")))
        .collect()
    }
}
