//! Bounded conversation memory.
//!
//! Holds the most recent `window` question/answer turns for one session.
//! Appending at capacity evicts the oldest turn first. Nothing survives the
//! owning controller; there is no cross-session or on-disk state.

use std::collections::VecDeque;

use crate::models::Turn;

#[derive(Debug)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    window: usize,
}

impl ConversationMemory {
    /// `window` is the maximum number of retained turns and must be >= 1
    /// (enforced at config load).
    pub fn new(window: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        if self.turns.len() == self.window {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Retained turns, oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_oldest_first() {
        let mut memory = ConversationMemory::new(3);
        memory.append(Turn::new("q1", "a1"));
        memory.append(Turn::new("q2", "a2"));

        let history = memory.history();
        assert_eq!(history[0].question, "q1");
        assert_eq!(history[1].question, "q2");
    }

    #[test]
    fn append_beyond_capacity_evicts_oldest() {
        let mut memory = ConversationMemory::new(2);
        memory.append(Turn::new("q1", "a1"));
        memory.append(Turn::new("q2", "a2"));
        memory.append(Turn::new("q3", "a3"));

        assert_eq!(memory.len(), 2);
        let history = memory.history();
        assert_eq!(history[0].question, "q2");
        assert_eq!(history[1].question, "q3");
    }

    #[test]
    fn window_of_one_keeps_only_latest() {
        let mut memory = ConversationMemory::new(1);
        for i in 0..5 {
            memory.append(Turn::new(format!("q{}", i), format!("a{}", i)));
        }
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.history()[0].question, "q4");
    }

    #[test]
    fn clear_empties_the_window() {
        let mut memory = ConversationMemory::new(3);
        memory.append(Turn::new("q1", "a1"));
        memory.clear();
        assert!(memory.is_empty());
    }
}
