//! Per-view list state
//!
//! ```text
//! Loading ──snapshot──▶ Ready(list) ──snapshot──▶ Ready(list')
//!    │                      │
//!    └──────failure─────────┴──────▶ Error(message)   (terminal)
//! ```

use serde::Serialize;

/// What a view shows for its live list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ViewState<T> {
    /// No emission received yet
    Loading,
    /// Latest emission, in query order
    Ready(Vec<T>),
    /// Live query failed; only a remount recovers
    Error(String),
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Loading
    }
}

impl<T> ViewState<T> {
    /// Replace the list with a new emission
    ///
    /// Returns false, leaving the state untouched, once in `Error`.
    pub fn apply(&mut self, list: Vec<T>) -> bool {
        if self.is_error() {
            return false;
        }
        *self = ViewState::Ready(list);
        true
    }

    /// Enter the terminal error state
    ///
    /// Returns false if already failed; the first message wins.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_error() {
            return false;
        }
        *self = ViewState::Error(message.into());
        true
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ViewState::Error(_))
    }

    /// The list, if ready
    pub fn items(&self) -> Option<&[T]> {
        match self {
            ViewState::Ready(list) => Some(list),
            _ => None,
        }
    }

    /// The failure message, if failed
    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }
}
