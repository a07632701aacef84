use crate::config::DEFAULT_BUFFER_CAPACITY;
use std::collections::VecDeque;

/// The most recent typed characters.
///
/// When full, the oldest half is dropped before appending so the buffer keeps
/// recent context instead of sliding by one character at a time.
#[derive(Debug, Clone)]
pub struct TypingBuffer {
    chars: VecDeque<char>,
    capacity: usize,
}

impl TypingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            chars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, c: char) {
        if self.chars.len() >= self.capacity {
            let drop = self.capacity / 2;
            self.chars.drain(..drop);
        }
        self.chars.push_back(c);
    }

    pub fn pop(&mut self) -> Option<char> {
        self.chars.pop_back()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }
}

impl Default for TypingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_oldest_half() {
        let mut buffer = TypingBuffer::new(128);
        for i in 0..128 {
            buffer.push(char::from(b'a' + (i % 26) as u8));
        }
        assert_eq!(buffer.len(), 128);

        buffer.push('!');
        assert_eq!(buffer.len(), 65);

        let text = buffer.text();
        // Character 64 of the original sequence is now first.
        assert_eq!(text.chars().next(), Some(char::from(b'a' + (64 % 26) as u8)));
        assert!(text.ends_with('!'));
    }

    #[test]
    fn pop_and_clear() {
        let mut buffer = TypingBuffer::default();
        buffer.push('h');
        buffer.push('i');
        assert_eq!(buffer.pop(), Some('i'));
        assert_eq!(buffer.text(), "h");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.pop(), None);
    }
}
