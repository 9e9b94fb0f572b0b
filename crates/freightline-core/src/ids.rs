//! Newtype identifiers for entities in the data model (§3).
//!
//! Kept as thin wrappers over `String`/`Uuid` rather than bare strings so a
//! `MessageId` can never be passed where a `ChronicleId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(MessageId, "Globally unique, idempotency key for an ingested message (§3).");
string_id!(ThreadId, "Groups messages into a single conversation.");
string_id!(ChronicleId, "Identifies a persisted, fully-extracted chronicle row.");
string_id!(ShipmentId, "Identifies a shipment aggregate.");
string_id!(ActionId, "Identifies a single open/closed action record.");
