use crate::types::ChatMessage;

/// In-memory message buffer with bounded retention.
///
/// Each retrieval strategy exclusively owns one of these; consumers only
/// ever see copies published through the sink.
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    items: Vec<ChatMessage>,
    max_items: usize,
}

impl MessageBuffer {
    /// Create a buffer with an item cap (`max_items >= 1`).
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Vec::new(),
            max_items: max_items.max(1),
        }
    }

    /// Current messages in arrival order.
    pub fn items(&self) -> &[ChatMessage] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the buffer wholesale with a server snapshot.
    ///
    /// Prior state is discarded entirely; the buffer is never a partial
    /// merge of two snapshots.
    pub fn replace(&mut self, messages: Vec<ChatMessage>) {
        self.items = messages;
        self.trim_to_max();
    }

    /// Append a single delivered message.
    pub fn push(&mut self, message: ChatMessage) {
        self.items.push(message);
        self.trim_to_max();
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn trim_to_max(&mut self) {
        if self.items.len() <= self.max_items {
            return;
        }

        let excess = self.items.len() - self.max_items;
        self.items.drain(0..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_owned(),
            user: "alice".to_owned(),
            text: text.to_owned(),
            time: 1_754_000_000_000,
        }
    }

    #[test]
    fn replace_discards_all_prior_state() {
        let mut buffer = MessageBuffer::new(50);
        buffer.replace(vec![message("1", "old"), message("2", "older")]);
        buffer.replace(vec![message("3", "m1"), message("4", "m2")]);

        let ids: Vec<&str> = buffer.items().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4"]);
    }

    #[test]
    fn replace_with_empty_snapshot_empties_the_buffer() {
        let mut buffer = MessageBuffer::new(50);
        buffer.replace(vec![message("1", "hello")]);
        buffer.replace(Vec::new());
        assert!(buffer.is_empty());
    }

    #[test]
    fn push_appends_in_arrival_order() {
        let mut buffer = MessageBuffer::new(50);
        buffer.push(message("1", "first"));
        buffer.push(message("2", "second"));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.items()[0].text, "first");
        assert_eq!(buffer.items()[1].text, "second");
    }

    #[test]
    fn trims_oldest_when_over_max_items() {
        let mut buffer = MessageBuffer::new(2);
        buffer.push(message("1", "one"));
        buffer.push(message("2", "two"));
        buffer.push(message("3", "three"));

        let ids: Vec<&str> = buffer.items().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn oversized_snapshot_is_trimmed_to_the_cap() {
        let mut buffer = MessageBuffer::new(2);
        buffer.replace(vec![
            message("1", "one"),
            message("2", "two"),
            message("3", "three"),
        ]);

        let ids: Vec<&str> = buffer.items().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }
}
