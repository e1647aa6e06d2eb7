//! Append-only diagnostic trail.
//!
//! Entries are never removed, edited or truncated.

use shared_types::{DiagnosticEntry, LogLevel};

#[derive(Debug, Clone, Default)]
pub struct DiagnosticTrail {
    entries: Vec<DiagnosticEntry>,
}

impl DiagnosticTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return a copy of it.
    pub fn push(
        &mut self,
        level: LogLevel,
        text: impl Into<String>,
        at_ms: u64,
    ) -> DiagnosticEntry {
        let entry = DiagnosticEntry {
            level,
            text: text.into(),
            at_ms,
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose text contains `needle`.
    pub fn matching<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a DiagnosticEntry> {
        self.entries.iter().filter(move |e| e.text.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_appends_in_order() {
        let mut trail = DiagnosticTrail::new();
        trail.push(LogLevel::Info, "[Peer] Initialized: a", 1);
        trail.push(LogLevel::Warning, "[Conn] Connection closed: b", 2);

        assert_eq!(trail.len(), 2);
        assert_eq!(trail.entries()[1].level, LogLevel::Warning);
        assert_eq!(trail.matching("[Conn]").count(), 1);
    }
}
