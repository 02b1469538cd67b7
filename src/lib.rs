//! # Kodigo
//!
//! Realtime productivity views (tasks, appointments, chat) kept in sync with
//! a document store through live queries.
//!
//! ## Features
//!
//! - **Live queries**: every view renders the store's latest ordered result
//!   set, pushed after each commit
//! - **Single source of truth**: mutations never touch view state directly
//! - **In-process or remote**: the same views run on a [`store::MemoryStore`]
//!   or on a [`client::RemoteStore`] talking to `kodigo-api`
//! - **Durability**: optional JSON persistence with background flush
//!
//! ## Modules
//!
//! - [`store`]: Document store trait, in-memory implementation, queries
//! - [`sync`]: Live list synchronizer and view state
//! - [`models`]: Task, Appointment and ChatMessage records
//! - [`views`]: Page controllers, text rendering, navigation shell
//! - [`api`]: HTTP server with Axum
//! - [`websocket`]: Live queries over WebSocket
//! - [`client`]: Remote store client
//! - [`config`]: TOML configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kodigo::store::MemoryStore;
//! use kodigo::sync::ViewState;
//! use kodigo::views::TaskListView;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::in_memory());
//!
//!     let mut view = TaskListView::mount(store).await;
//!     view.add_task("Buy milk").await?;
//!
//!     let state = view
//!         .list_mut()
//!         .wait_for(|s| s.items().map(|t| !t.is_empty()).unwrap_or(false))
//!         .await;
//!     if let ViewState::Ready(tasks) = state {
//!         println!("{} task(s)", tasks.len());
//!     }
//!
//!     view.unmount();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod models;
pub mod store;
pub mod sync;
pub mod views;
pub mod websocket;

pub use store::{
    Direction, Document, DocumentStore, ErrorKind, MemoryStore, MemoryStoreConfig, NewDocument,
    Query, Snapshot, StoreError, StoreResult, Subscription,
};

pub use sync::{LiveList, Record, ViewState};

pub use models::{Appointment, ChatMessage, Task};

pub use views::{AppointmentsView, ChatView, Notice, TaskListView, ViewError};

pub use api::{build_router, serve, ApiError, AppState};

pub use client::{ClientError, RemoteStore};

pub use websocket::{ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage};

pub use config::{Config, ConfigError};
