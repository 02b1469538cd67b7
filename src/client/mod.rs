//! Remote Client
//!
//! [`RemoteStore`] implements [`DocumentStore`](crate::store::DocumentStore)
//! against a running `kodigo-api`, so the same views run in-process or over
//! the network.

mod error;
mod remote;

pub use error::{kind_for_status, ClientError};
pub use remote::RemoteStore;
