//! Realtime List Synchronization
//!
//! The one pattern every view repeats: mount a live query, mirror its
//! emissions into an explicit [`ViewState`], issue mutations without
//! predicting their effect, and tear the live query down exactly once.
//!
//! ## Components
//!
//! - **ViewState**: `Loading | Ready(list) | Error(message)`
//! - **LiveList**: owns the live query and publishes state changes
//! - **Record**: binds a record type to its collection and order key

mod live_list;
mod state;

pub use live_list::{LiveList, Record};
pub use state::ViewState;
