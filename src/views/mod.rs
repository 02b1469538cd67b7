//! Views
//!
//! One controller per page. Each mounts a live list on construction, keeps
//! its form input, and turns user actions into single fire-and-forget store
//! calls.
//!
//! | View | Collection | Actions |
//! |---|---|---|
//! | [`TaskListView`] | `todos` | add, toggle, delete |
//! | [`AppointmentsView`] | `appointments` | book |
//! | [`ChatView`] | `messages` | send |
//!
//! Failures are split by severity: a failed live query blocks the page
//! (`ViewState::Error`), a failed action only sets the page's [`Notice`].

mod appointments;
mod chat;
mod error;
mod form;
mod page;
pub mod render;
pub mod shell;
mod tasks;

pub use appointments::{AppointmentForm, AppointmentsView, MISSING_FIELDS};
pub use chat::{ChatForm, ChatView, EMPTY_MESSAGE};
pub use error::{Notice, ViewError, ViewResult};
pub use form::required;
pub use tasks::{TaskForm, TaskListView, EMPTY_TASK};
