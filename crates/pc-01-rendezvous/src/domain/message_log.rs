//! Message log: deduplicated by id, sorted by timestamp.
//!
//! The sort is stable, so messages with equal timestamps keep arrival order.

use shared_types::{Message, MessageId};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
    seen: HashSet<MessageId>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge messages, skipping ids already present. Returns the messages
    /// that were new, in the order given.
    pub fn merge<'a>(&mut self, messages: impl IntoIterator<Item = &'a Message>) -> Vec<Message> {
        let mut added = Vec::new();
        for message in messages {
            if self.seen.insert(message.id.clone()) {
                self.entries.push(message.clone());
                added.push(message.clone());
            }
        }
        if !added.is_empty() {
            self.entries.sort_by_key(|m| m.timestamp);
        }
        added
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::NodeId;

    fn msg(id: &str, timestamp: u64) -> Message {
        Message {
            id: MessageId::new(id),
            peer_id: NodeId::from("a"),
            text: id.to_string(),
            timestamp,
        }
    }

    fn is_sorted(log: &MessageLog) -> bool {
        log.entries()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut log = MessageLog::new();
        let batch = vec![msg("m1", 10), msg("m2", 20)];

        assert_eq!(log.merge(&batch).len(), 2);
        assert!(log.merge(&batch).is_empty());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_late_arrival_sorted_into_place() {
        let mut log = MessageLog::new();
        log.merge(&[msg("late", 30), msg("mid", 20)]);
        log.merge(&[msg("early", 5)]);

        let ids: Vec<&str> = log.entries().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "mid", "late"]);
        assert!(is_sorted(&log));
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let mut log = MessageLog::new();
        log.merge(&[msg("first", 7)]);
        log.merge(&[msg("second", 7)]);

        assert_eq!(log.entries()[0].id.as_str(), "first");
        assert_eq!(log.entries()[1].id.as_str(), "second");
    }

    #[test]
    fn test_partial_overlap_returns_only_new() {
        let mut log = MessageLog::new();
        log.merge(&[msg("a", 1)]);
        let added = log.merge(&[msg("a", 1), msg("b", 2)]);

        assert_eq!(added, vec![msg("b", 2)]);
        assert!(log.contains(&MessageId::new("a")));
    }

    #[test]
    fn test_sorted_after_every_mutation() {
        let mut log = MessageLog::new();
        for (i, ts) in [50u64, 10, 40, 10, 30, 0].iter().enumerate() {
            log.merge(&[msg(&format!("m{i}"), *ts)]);
            assert!(is_sorted(&log));
        }
    }
}
