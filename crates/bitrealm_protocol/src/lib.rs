//! # Bitrealm Protocol
//!
//! The application-layer protocol spoken between Bitrealm clients and the game
//! server. Every request is a single newline-terminated line of text:
//!
//! ```text
//! BR#9b0c...-request?3f1e...-account?00001
//! └┬┘└──────────────────── payload ───────┘
//!  opcode (terminated by '#')   fields separated by '?'
//! ```
//!
//! ## Modules
//!
//! - [`codec`] - line decoding, fixed-arity field splitting and the server's
//!   outgoing text escaping
//! - [`packet`] - the [`Packet`] envelope every response travels in
//! - [`partition`] - the partitioned transport that slices oversized responses
//!   into numbered frames, and the client-side [`Reassembler`]
//! - [`delivery`] - the per-account [`DeliveryCache`] backing acknowledgment
//!   (`OK#`) and client-driven resend (`SOS#`)
//! - [`types`] - strongly typed identifiers
//!
//! ## Delivery guarantees
//!
//! Delivery is at-least-once with client-driven acknowledgment. The server
//! never retransmits on its own: a client that detects a missing or broken
//! response asks for it again by request id.

pub mod codec;
pub mod delivery;
pub mod error;
pub mod packet;
pub mod partition;
pub mod types;

pub use codec::{
    decode, escape_ascii, parse_field, parse_reward_matrix, split_fields, Frame,
    FIELD_SEPARATOR, STOP_SENTINEL, TERMINATOR,
};
pub use delivery::DeliveryCache;
pub use error::{DeliveryError, ProtocolError, TransportError};
pub use packet::Packet;
pub use partition::{
    base_opcode, partition_count, partitions, send_frame, send_partitioned, Partition,
    ReassemblyStatus, Reassembler,
};
pub use types::{AccountId, BattleId, RequestId};
