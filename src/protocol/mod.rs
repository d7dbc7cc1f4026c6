//! Protocol Module
//!
//! Defines the request/reply model shared by every transport, and the binary
//! framing used when that model travels over TCP.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Kind (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Request Kinds
//! - 0x01: COMMAND - Payload: cmd (1) + argc (4) + { arg_len (4) + arg }*
//! - 0x02: SCRIPT  - Payload: script (1) + keyc (4) + keys + argc (4) + args
//!
//! ## Reply Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │  Tag (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Reply Tags
//! - 0x00: NIL
//! - 0x01: INTEGER - i64 big-endian
//! - 0x02: BULK    - raw bytes
//! - 0x03: ARRAY   - count (4) + nested replies
//! - 0x04: ERROR   - UTF-8 message

mod command;
mod reply;
mod wire;

pub use command::{CommandType, Request, ScriptId};
pub use reply::Reply;
pub use wire::{
    check_frame_size, decode_reply, decode_request, encode_reply, encode_request, read_reply,
    read_request, write_reply, write_request, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};

/// Cursor token that starts a hash scan
pub const CURSOR_INITIAL: &[u8] = b"0";

/// Cursor token a store returns once a hash scan is complete
pub const CURSOR_TERMINAL: &[u8] = b"0";
