//! WebSocket Live Queries
//!
//! Serves store live queries to remote clients.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Tracks connections and the live queries each one opened
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Protocol
//!
//! Clients connect to `/api/v1/ws`, receive `connected`, then open live
//! queries under ids of their choosing. Every open query streams a full
//! `snapshot` now and after each commit to its collection, until the client
//! sends `unsubscribe`, disconnects, or the query fails with
//! `subscription_error`.
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8090/api/v1/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({
//!     type: 'subscribe', query_id: 'chat', collection: 'messages', order_by: 'createdAt'
//!   }));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'snapshot') render(msg.documents);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError, OUTBOUND_BUFFER};
pub use messages::{ClientMessage, ServerMessage};
