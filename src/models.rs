//! Record types shown by the views
//!
//! Field names on the wire follow the existing collections: `todos` uses
//! snake_case, `appointments` and `messages` use camelCase.

use serde::{Deserialize, Serialize};

use crate::sync::Record;

/// Collection names
pub mod collections {
    pub const TODOS: &str = "todos";
    pub const APPOINTMENTS: &str = "appointments";
    pub const MESSAGES: &str = "messages";

    /// Every collection a view mounts
    pub const ALL: [&str; 3] = [TODOS, APPOINTMENTS, MESSAGES];
}

/// Display name used when a chat author leaves theirs blank
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// An entry of the to-do list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "task_text")]
    pub text: String,
    #[serde(rename = "is_completed", default)]
    pub completed: bool,
    /// Client clock, ms since epoch
    pub created_at: i64,
}

impl Task {
    pub const TEXT: &'static str = "task_text";
    pub const COMPLETED: &'static str = "is_completed";
    pub const CREATED_AT: &'static str = "created_at";
}

impl Record for Task {
    const COLLECTION: &'static str = collections::TODOS;
    const ORDER_KEY: &'static str = Task::CREATED_AT;
}

/// A booked appointment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    /// Local date-time exactly as entered, e.g. `2025-06-01T09:30`
    #[serde(rename = "appointmentTime")]
    pub appointment_time_local: String,
    /// Client clock, ms since epoch
    pub created_at: i64,
}

impl Appointment {
    pub const PATIENT_NAME: &'static str = "patientName";
    pub const APPOINTMENT_TIME: &'static str = "appointmentTime";
    pub const CREATED_AT: &'static str = "createdAt";
}

impl Record for Appointment {
    const COLLECTION: &'static str = collections::APPOINTMENTS;
    const ORDER_KEY: &'static str = Appointment::CREATED_AT;
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    #[serde(rename = "user")]
    pub author: String,
    /// Store commit time, ms since epoch
    pub created_at: i64,
}

impl ChatMessage {
    pub const TEXT: &'static str = "text";
    pub const AUTHOR: &'static str = "user";
    pub const CREATED_AT: &'static str = "createdAt";
}

impl Record for ChatMessage {
    const COLLECTION: &'static str = collections::MESSAGES;
    const ORDER_KEY: &'static str = ChatMessage::CREATED_AT;
}
