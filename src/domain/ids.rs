//! Typed identifiers for records owned by the curriculum store.
//!
//! Every record kind gets its own newtype so that, for example, a fulfillment
//! link id can never be passed where a course id is expected.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID.
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Builds an identifier from a 128-bit integer.
            #[must_use]
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

record_id!(
    /// Identifies a course record.
    CourseId
);

record_id!(
    /// Identifies a requirement node.
    RequirementId
);

record_id!(
    /// Identifies a fulfillment link (a course attached to a requirement).
    FulfillmentId
);

record_id!(
    /// Identifies a reusable basket.
    BasketId
);

record_id!(
    /// Identifies the attachment of a basket to a requirement.
    BasketLinkId
);

record_id!(
    /// Identifies an academic program.
    ProgramId
);

record_id!(
    /// Identifies a validation rule.
    RuleId
);
