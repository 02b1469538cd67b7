//! API Routes
//!
//! Route handlers organized by functionality.

pub mod documents;
pub mod health;
