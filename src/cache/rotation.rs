//! Rotation Cursor Module
//!
//! Round-robin selection of the source served to the next request.

use std::sync::atomic::{AtomicUsize, Ordering};

// == Rotation Cursor ==
/// Thread-safe round-robin pointer over a fixed list of source ids.
#[derive(Debug)]
pub struct RotationCursor {
    /// Source ids in configured order
    sources: Vec<String>,
    /// Index of the source returned by the next `advance`
    index: AtomicUsize,
}

impl RotationCursor {
    // == Constructor ==
    /// Creates a cursor positioned at the first source.
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            index: AtomicUsize::new(0),
        }
    }

    // == Advance ==
    /// Returns the current source and moves the cursor to the next one.
    ///
    /// The read-and-increment is a single atomic update, so concurrent callers
    /// each observe a distinct position. Returns `None` for an empty rotation.
    pub fn advance(&self) -> Option<&str> {
        let len = self.sources.len();
        if len == 0 {
            return None;
        }

        let current = self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);

        self.sources.get(current).map(String::as_str)
    }

    // == Position ==
    /// Index of the source the next `advance` will return.
    pub fn position(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    /// Source ids in rotation order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn abc() -> RotationCursor {
        RotationCursor::new(vec!["A".to_string(), "B".to_string(), "C".to_string()])
    }

    #[test]
    fn test_rotation_order_wraps() {
        let cursor = abc();

        let served: Vec<&str> = (0..4).filter_map(|_| cursor.advance()).collect();
        assert_eq!(served, vec!["A", "B", "C", "A"]);
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_single_source_always_returned() {
        let cursor = RotationCursor::new(vec!["only".to_string()]);

        for _ in 0..5 {
            assert_eq!(cursor.advance(), Some("only"));
        }
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_empty_rotation() {
        let cursor = RotationCursor::new(Vec::new());

        assert!(cursor.is_empty());
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn test_concurrent_advances_are_evenly_distributed() {
        let cursor = Arc::new(abc());
        let mut handles = Vec::new();

        for _ in 0..6 {
            let cursor = Arc::clone(&cursor);
            handles.push(std::thread::spawn(move || {
                (0..300)
                    .filter_map(|_| cursor.advance().map(str::to_string))
                    .collect::<Vec<_>>()
            }));
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                *counts.entry(id).or_default() += 1;
            }
        }

        // 1800 serves over 3 sources, each position handed out exactly once
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|c| *c == 600));
        assert_eq!(cursor.position(), 0);
    }
}
