//! JSON codec helpers.
//!
//! Inbound parsing is deliberately tolerant: a frame that is not
//! well-formed JSON, carries an unknown action, or lacks its arguments
//! yields `None` and the server drops it without an error reply.

use crate::wire_types::{ClientCommand, ClientFrame, ServerReply};

/// Parse one inbound text frame into a command, or `None` when the
/// frame should be ignored.
pub fn parse_client_line(line: &str) -> Option<ClientCommand> {
    let frame: ClientFrame = serde_json::from_str(line).ok()?;
    match frame.action.as_deref() {
        Some("drop") => frame.column.map(|column| ClientCommand::Drop { column }),
        _ => None,
    }
}

/// Encode an outbound reply as a JSON text frame.
pub fn encode_reply(reply: &ServerReply) -> serde_json::Result<String> {
    serde_json::to_string(reply)
}
