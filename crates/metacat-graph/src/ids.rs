//! Entity identifiers
//!
//! One newtype per entity category so foreign keys cannot be mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Raw numeric value
            #[inline]
            #[must_use]
            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            #[inline]
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Paper identifier
    PaperId
);
entity_id!(
    /// Study identifier
    StudyId
);
entity_id!(
    /// Intervention identifier
    InterventionId
);
entity_id!(
    /// Outcome identifier
    OutcomeId
);
entity_id!(
    /// Effect identifier
    EffectId
);
entity_id!(
    /// Sample identifier
    SampleId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&PaperId(7)).unwrap();
        assert_eq!(json, "7");

        let id: EffectId = serde_json::from_str("42").unwrap();
        assert_eq!(id, EffectId::from(42));
        assert_eq!(id.to_string(), "42");
    }
}
