//! Order identifier generation
//!
//! Order ids are a fixed prefix followed by a zero-padded sequence number
//! (`TX000001`, `TX000002`, ...). The sequence only moves forward and each
//! candidate is checked against the ids already in use, so an id is never
//! handed out twice even after a snapshot with foreign ids is loaded.

use crate::types::OrderId;

/// Prefix for generated order ids
pub const DEFAULT_ORDER_PREFIX: &str = "TX";

/// Monotonic, collision-checked order id source
#[derive(Debug, Clone)]
pub struct OrderIdGenerator {
    prefix: String,
    next: u64,
}

impl OrderIdGenerator {
    pub fn new(prefix: &str) -> Self {
        OrderIdGenerator {
            prefix: prefix.to_string(),
            next: 1,
        }
    }

    /// Produce the next id for which `is_taken` returns false
    pub fn next_id(&mut self, is_taken: impl Fn(&str) -> bool) -> OrderId {
        loop {
            let candidate = format!("{}{:06}", self.prefix, self.next);
            self.next = self.next.saturating_add(1);
            if !is_taken(&candidate) {
                return candidate;
            }
        }
    }

    /// Move the sequence past an id that is already in use
    ///
    /// Ids without this generator's prefix or without a numeric suffix are
    /// ignored here; `next_id` still skips them through its collision check.
    pub fn observe(&mut self, id: &str) {
        let sequence = id
            .strip_prefix(self.prefix.as_str())
            .and_then(|suffix| suffix.parse::<u64>().ok());

        if let Some(sequence) = sequence {
            if sequence >= self.next {
                self.next = sequence.saturating_add(1);
            }
        }
    }
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_sequence_is_zero_padded_and_increasing() {
        let mut ids = OrderIdGenerator::default();
        assert_eq!(ids.next_id(|_| false), "TX000001");
        assert_eq!(ids.next_id(|_| false), "TX000002");
    }

    #[test]
    fn test_taken_ids_are_skipped() {
        let taken: BTreeSet<&str> = ["TX000001", "TX000002"].into_iter().collect();
        let mut ids = OrderIdGenerator::default();
        assert_eq!(ids.next_id(|id| taken.contains(id)), "TX000003");
    }

    #[test]
    fn test_observe_resumes_after_highest_sequence() {
        let mut ids = OrderIdGenerator::default();
        ids.observe("TX000041");
        ids.observe("TX000007");
        ids.observe("TX4821");
        ids.observe("ORDER-9");
        assert_eq!(ids.next_id(|_| false), "TX004822");
    }
}
