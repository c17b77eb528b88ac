//! # Identifier Types
//!
//! Wrapper types around UUIDs so account, request and battle identifiers can
//! never be mixed up at a call site. All of them serialize as the plain
//! hyphenated UUID string the client sends.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random identifier using UUID v4.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of a player account.
    ///
    /// Delivery cache buckets and profile documents are keyed by this id.
    AccountId
);

uuid_id!(
    /// Client-chosen identifier pairing a request with its response.
    ///
    /// The same id is used to acknowledge (`OK#`) or recover (`SOS#`) the
    /// response later.
    RequestId
);

uuid_id!(
    /// Identifier of an ephemeral battle session.
    BattleId
);
