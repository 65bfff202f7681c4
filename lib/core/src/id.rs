//! Strongly-typed identifiers for workflow graph records.
//!
//! Identifiers are opaque strings. Documents produced elsewhere may carry any
//! non-empty string (`"1"`, `"start-node"`), so the types only wrap and
//! compare. Freshly placed records get a ULID-backed token, which is both
//! collision resistant and increases with creation time.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a string-backed ID wrapper.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the ID and returns the owned string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim().is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "identifier is empty".to_string(),
                    });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a node within a workflow graph.
    NodeId
);

define_id!(
    /// Unique identifier for an edge within a workflow graph.
    EdgeId
);

impl NodeId {
    /// Generates a fresh ID of the form `<prefix>-<ulid>`.
    ///
    /// The prefix is normally the node kind, so IDs stay readable in exported
    /// documents.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", Ulid::new()))
    }
}

impl EdgeId {
    /// Derives the canonical ID for a connection between two handles.
    ///
    /// Follows the flow-canvas convention
    /// `xy-edge__<source><sourceHandle>-<target><targetHandle>`, where a
    /// missing handle contributes nothing.
    #[must_use]
    pub fn from_endpoints(
        source: &NodeId,
        source_handle: Option<&str>,
        target: &NodeId,
        target_handle: Option<&str>,
    ) -> Self {
        Self(format!(
            "xy-edge__{}{}-{}{}",
            source,
            source_handle.unwrap_or_default(),
            target,
            target_handle.unwrap_or_default()
        ))
    }
}
