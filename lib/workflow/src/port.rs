//! Handle system for workflow nodes.
//!
//! Handles are the connection points on a node. Every kind except `start`
//! has a single unnamed input handle. Outputs come in three shapes: none
//! (`end`), a single unnamed output, or the two named branches of a
//! condition node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named output of a condition node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchPort {
    /// Taken when the condition holds.
    True,
    /// Taken when the condition does not hold.
    False,
}

impl BranchPort {
    /// Both branch ports, in handle order (top to bottom).
    pub const ALL: [BranchPort; 2] = [BranchPort::True, BranchPort::False];

    /// Returns the wire name of the port.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
        }
    }
}

impl fmt::Display for BranchPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a branch port name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePortError {
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for ParsePortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown branch port '{}' (expected 'true' or 'false')", self.value)
    }
}

impl std::error::Error for ParsePortError {}

impl FromStr for BranchPort {
    type Err = ParsePortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(Self::True),
            "false" => Ok(Self::False),
            other => Err(ParsePortError {
                value: other.to_string(),
            }),
        }
    }
}

/// The output handles a node kind exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputHandles {
    /// No outgoing connections are possible.
    None,
    /// One unnamed output.
    Single,
    /// The named `true` and `false` branches.
    Branch,
}

impl OutputHandles {
    /// Returns whether an edge may leave through `port`.
    #[must_use]
    pub fn accepts(self, port: Option<BranchPort>) -> bool {
        match self {
            Self::None => false,
            Self::Single => port.is_none(),
            Self::Branch => port.is_some(),
        }
    }

    /// Returns every port an edge may leave through.
    #[must_use]
    pub fn ports(self) -> &'static [Option<BranchPort>] {
        match self {
            Self::None => &[],
            Self::Single => &[None],
            Self::Branch => &[Some(BranchPort::True), Some(BranchPort::False)],
        }
    }
}

/// The connection points of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handles {
    /// Whether the node accepts incoming edges.
    pub input: bool,
    /// The node's outputs.
    pub outputs: OutputHandles,
}

/// Which side of a node's box a handle is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Right,
    Bottom,
    Left,
}
