//! fourline-protocol
//!
//! The JSON wire contract between clients and the match server:
//! - inbound client commands
//! - outbound match snapshots and error replies
//! - codec helpers (tolerant parsing, encoding)

pub mod json_codec;
pub mod wire_types;

pub use json_codec::{encode_reply, parse_client_line};
pub use wire_types::{ClientCommand, ErrorReply, MatchSnapshot, ServerReply};
