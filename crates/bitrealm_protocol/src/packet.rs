//! # Response Packets
//!
//! Every response the server sends is wrapped in a [`Packet`]. The packet is
//! what the delivery cache stores, so a resend reproduces the original bytes
//! exactly.

use crate::codec::{escape_ascii, FIELD_SEPARATOR};
use crate::error::ProtocolError;
use crate::types::RequestId;
use serde::{Deserialize, Serialize};

/// An immutable response envelope.
///
/// On the wire a packet is serialized as JSON with the field names clients
/// already understand:
///
/// ```json
/// {"packet_id":"...","packet_code":"BR#","chain":true,"service_type":"BATTLE","content":"@\"{...}\"@"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Request this packet answers
    #[serde(rename = "packet_id")]
    pub request_id: RequestId,

    /// Opcode of the response (terminator included)
    #[serde(rename = "packet_code")]
    pub opcode: String,

    /// Whether the packet is sent through the partitioned transport
    #[serde(rename = "chain")]
    pub chained: bool,

    /// Free-form tag naming the kind of content (e.g. `BATTLE`, `EXP`)
    #[serde(rename = "service_type")]
    pub service_tag: String,

    /// Response body
    pub content: String,
}

impl Packet {
    /// Builds a packet that must go through the partitioned transport.
    ///
    /// The JSON content is wrapped in `@"` / `"@` markers so the client can
    /// locate it after reassembly.
    pub fn chained(
        request_id: RequestId,
        opcode: impl Into<String>,
        service_tag: impl Into<String>,
        content_json: &str,
    ) -> Self {
        Self {
            request_id,
            opcode: opcode.into(),
            chained: true,
            service_tag: service_tag.into(),
            content: format!("@\"{content_json}\"@"),
        }
    }

    /// Builds a packet that is sent as one frame.
    pub fn simple(
        request_id: RequestId,
        opcode: impl Into<String>,
        service_tag: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            opcode: opcode.into(),
            chained: false,
            service_tag: service_tag.into(),
            content: content.into(),
        }
    }

    /// Encodes the packet body: a `?` followed by the packet JSON, escaped
    /// to pure ASCII.
    pub fn encode_body(&self) -> Result<String, ProtocolError> {
        let json = serde_json::to_string(self)?;
        Ok(escape_ascii(&format!("{FIELD_SEPARATOR}{json}")))
    }

    /// Encodes the packet as a single frame: opcode followed by the body.
    pub fn encode_frame(&self) -> Result<String, ProtocolError> {
        Ok(format!("{}{}", self.opcode, self.encode_body()?))
    }
}
