//! Plain-text rendering of view state
//!
//! Blocking states (loading, error) replace the whole page body; notices are
//! appended under the list without hiding it.

use chrono::{Local, NaiveDateTime, TimeZone};
use std::fmt::Write;

use super::error::Notice;
use crate::models::{Appointment, ChatMessage, Task};
use crate::sync::ViewState;

/// Render a page body, delegating the ready list to `rows`
fn page<T>(
    title: &str,
    state: &ViewState<T>,
    notice: Option<&Notice>,
    loading: &str,
    empty: &str,
    rows: impl Fn(&T) -> String,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "-".repeat(title.chars().count()));

    match state {
        ViewState::Loading => {
            let _ = writeln!(out, "{}", loading);
            return out;
        }
        ViewState::Error(message) => {
            let _ = writeln!(out, "Error: {}", message);
            return out;
        }
        ViewState::Ready(items) if items.is_empty() => {
            let _ = writeln!(out, "{}", empty);
        }
        ViewState::Ready(items) => {
            for item in items {
                let _ = writeln!(out, "{}", rows(item));
            }
        }
    }

    if let Some(notice) = notice {
        let _ = writeln!(out);
        let _ = writeln!(out, "! {}", notice.message);
    }
    out
}

pub fn tasks(state: &ViewState<Task>, notice: Option<&Notice>) -> String {
    page(
        "My Task List",
        state,
        notice,
        "Loading tasks...",
        "No tasks yet. Add one!",
        |task| {
            let mark = if task.completed { "x" } else { " " };
            format!("[{}] {}  ({})", mark, task.text, task.id)
        },
    )
}

pub fn appointments(state: &ViewState<Appointment>, notice: Option<&Notice>) -> String {
    page(
        "Booked Appointments",
        state,
        notice,
        "Loading appointments...",
        "No appointments booked yet.",
        |a| format!("{} - {}", a.patient_name, local_time(&a.appointment_time_local)),
    )
}

/// Chat transcript; messages by `author` are marked
pub fn chat(state: &ViewState<ChatMessage>, author: &str, notice: Option<&Notice>) -> String {
    page(
        "Realtime Chat",
        state,
        notice,
        "Loading chat...",
        "No messages yet. Be the first to say hi!",
        |m| {
            let marker = if m.author == author { ">" } else { " " };
            format!("{} {}: {}  {}", marker, m.author, m.text, clock_time(m.created_at))
        },
    )
}

/// Pretty-print a `datetime-local` value, or return it untouched
pub fn local_time(value: &str) -> String {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Wall-clock time of a ms timestamp in the local zone
pub fn clock_time(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}
