//! Network Module
//!
//! TCP server side of the wire protocol.
//!
//! ## Architecture
//! - Single acceptor thread with a connection cap
//! - One handler thread per connection
//! - Requests executed directly against the shared `Store`

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
