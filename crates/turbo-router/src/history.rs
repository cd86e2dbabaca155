//! In-memory history stack.

use std::cell::RefCell;

use crate::{DocumentLocation, NavigateOptions, Navigator};

/// How an entry got onto the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationType {
    /// A new entry was pushed.
    Push,
    /// The current entry was replaced.
    Replace,
    /// The whole document was reloaded at a new URL.
    Document,
}

/// One entry in the history stack.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Path or absolute URL of the entry.
    pub location: String,
    /// How the entry was created.
    pub kind: NavigationType,
    /// Whether the navigation asked to scroll to the top.
    pub scroll: bool,
}

#[derive(Debug)]
struct HistoryState {
    entries: Vec<HistoryEntry>,
    index: usize,
    log: Vec<HistoryEntry>,
}

/// A history stack held in memory.
///
/// Implements [`Navigator`] and [`DocumentLocation`]. Every navigation is
/// also appended to a log so callers can see what happened in order.
#[derive(Debug)]
pub struct MemoryHistory {
    state: RefCell<HistoryState>,
}

impl MemoryHistory {
    /// Create a history positioned at `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        let entry = HistoryEntry {
            location: initial.into(),
            kind: NavigationType::Push,
            scroll: true,
        };
        Self {
            state: RefCell::new(HistoryState {
                entries: vec![entry],
                index: 0,
                log: Vec::new(),
            }),
        }
    }

    /// The current location.
    pub fn current(&self) -> String {
        let state = self.state.borrow();
        state.entries[state.index].location.clone()
    }

    /// Number of entries in the stack.
    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Whether the stack is empty. Never true, a history always has a current entry.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Every navigation performed, oldest first.
    pub fn log(&self) -> Vec<HistoryEntry> {
        self.state.borrow().log.clone()
    }

    /// Full document navigations performed, oldest first.
    pub fn documents(&self) -> Vec<String> {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|e| e.kind == NavigationType::Document)
            .map(|e| e.location.clone())
            .collect()
    }

    /// Step back one entry. Returns false at the start of the stack.
    pub fn back(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.index == 0 {
            return false;
        }
        state.index -= 1;
        true
    }

    /// Step forward one entry. Returns false at the end of the stack.
    pub fn forward(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.index + 1 >= state.entries.len() {
            return false;
        }
        state.index += 1;
        true
    }
}

impl Navigator for MemoryHistory {
    fn navigate(&self, to: &str, options: NavigateOptions) {
        let mut state = self.state.borrow_mut();
        let kind = if options.replace {
            NavigationType::Replace
        } else {
            NavigationType::Push
        };
        let entry = HistoryEntry {
            location: to.to_string(),
            kind,
            scroll: options.scroll,
        };
        tracing::debug!(to, ?kind, "history navigation");

        if options.replace {
            let index = state.index;
            state.entries[index] = entry.clone();
        } else {
            let next = state.index + 1;
            state.entries.truncate(next);
            state.entries.push(entry.clone());
            state.index = next;
        }
        state.log.push(entry);
    }
}

impl DocumentLocation for MemoryHistory {
    fn assign(&self, href: &str) {
        let mut state = self.state.borrow_mut();
        let entry = HistoryEntry {
            location: href.to_string(),
            kind: NavigationType::Document,
            scroll: true,
        };
        tracing::debug!(href, "document navigation");

        // A document load starts a fresh stack.
        state.entries = vec![entry.clone()];
        state.index = 0;
        state.log.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{push_options, replace_options};

    // === Navigator Tests ===

    #[test]
    fn test_memory_history_push() {
        let history = MemoryHistory::new("/");
        history.navigate("/products", push_options());
        history.navigate("/products/7", push_options());

        assert_eq!(history.current(), "/products/7");
        assert_eq!(history.len(), 3);
        assert!(history.back());
        assert_eq!(history.current(), "/products");
    }

    #[test]
    fn test_memory_history_replace() {
        let history = MemoryHistory::new("/account");
        history.navigate("/login", replace_options());

        assert_eq!(history.current(), "/login");
        assert_eq!(history.len(), 1);
        assert_eq!(history.log()[0].kind, NavigationType::Replace);
    }

    #[test]
    fn test_memory_history_push_truncates_forward_entries() {
        let history = MemoryHistory::new("/");
        history.navigate("/a", push_options());
        history.navigate("/b", push_options());
        history.back();
        history.navigate("/c", push_options());

        assert_eq!(history.len(), 3);
        assert!(!history.forward());
        assert_eq!(history.current(), "/c");
    }

    // === DocumentLocation Tests ===

    #[test]
    fn test_memory_history_assign() {
        let history = MemoryHistory::new("/cart");
        history.assign("https://pay.example.com/checkout");

        assert_eq!(history.current(), "https://pay.example.com/checkout");
        assert_eq!(history.documents(), vec!["https://pay.example.com/checkout"]);
        assert_eq!(history.len(), 1);
        assert!(!history.back());
    }
}
