//! Identifiers for sessions and the artifacts they pass between steps.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Log-friendly form: prefix plus the first eight hex digits.
            pub fn short(&self) -> String {
                let simple = self.0.simple().to_string();
                format!("{}-{}", $prefix, &simple[..8])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }
    };
}

id_type!(
    /// One execution context, from selection to terminal state.
    SessionId,
    "session"
);

id_type!(
    /// A file handed to or produced by a step.
    ArtifactId,
    "artifact"
);
