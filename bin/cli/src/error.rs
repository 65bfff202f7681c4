//! Errors surfaced by the `flowsmith` command.

use flowsmith_workflow::{EdgeId, GraphError, NodeId};
use std::fmt;

/// Why a command failed.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The document could not be read, parsed or written.
    Document { message: &'static str, details: String },
    /// `new` would overwrite an existing document.
    DocumentExists { path: String },
    /// The engine refused a change.
    Rejected(GraphError),
    /// No node with this ID exists.
    NodeNotFound { node_id: NodeId },
    /// No edge with this ID exists.
    EdgeNotFound { edge_id: EdgeId },
    /// A select field was given a value outside its options.
    InvalidFieldValue {
        key: String,
        value: String,
        options: &'static [&'static str],
    },
    /// The workflow cannot be simulated.
    Invalid { message: String },
    /// The simulation was interrupted.
    Cancelled,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::Document { message, details } => write!(f, "{message} ({details})"),
            Self::DocumentExists { path } => {
                write!(f, "{path} already exists (use --force to overwrite)")
            }
            Self::Rejected(error) => write!(f, "{error}"),
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
            Self::InvalidFieldValue {
                key,
                value,
                options,
            } => write!(
                f,
                "'{value}' is not a valid {key} (expected one of: {})",
                options.join(", ")
            ),
            Self::Invalid { message } => write!(f, "{message}"),
            Self::Cancelled => write!(f, "simulation cancelled"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<GraphError> for CliError {
    fn from(error: GraphError) -> Self {
        Self::Rejected(error)
    }
}
