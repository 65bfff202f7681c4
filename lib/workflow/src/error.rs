//! Error types for the workflow crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `GraphError`: store mutations and proposed connections (dangling
//!   references, illegal ports, duplicates)
//! - `ValidationError`: structural preconditions checked before simulation
//! - `DocumentError`: reading, parsing and writing workflow documents
//! - `SimulationError`: failures of the simulated run itself
//!
//! Pure graph operations return these enums directly. File I/O returns them
//! wrapped in a `Report` so callers can add their own context.

use crate::port::BranchPort;
use flowsmith_core::{EdgeId, NodeId};
use std::fmt;

/// Errors from graph store mutations and connection checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// A node with this ID already exists.
    DuplicateNode { node_id: NodeId },
    /// An edge with this ID already exists.
    DuplicateEdge { edge_id: EdgeId },
    /// The drag-and-drop payload does not name a node kind.
    UnknownNodeKind { kind: String },
    /// The source node has no output handle (or not the requested one).
    SourceHandleNotFound {
        node_id: NodeId,
        port: Option<BranchPort>,
    },
    /// The target node has no matching input handle.
    TargetHandleNotFound {
        node_id: NodeId,
        handle: Option<String>,
    },
    /// A condition node's branch port already has an outgoing edge.
    PortAlreadyConnected { node_id: NodeId, port: BranchPort },
    /// The edge would start and end on the same node.
    SelfLoop { node_id: NodeId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => {
                write!(f, "node not found: {node_id}")
            }
            Self::DuplicateNode { node_id } => {
                write!(f, "node already exists: {node_id}")
            }
            Self::DuplicateEdge { edge_id } => {
                write!(f, "edge already exists: {edge_id}")
            }
            Self::UnknownNodeKind { kind } => {
                write!(f, "unknown node kind '{kind}'")
            }
            Self::SourceHandleNotFound {
                node_id,
                port: Some(port),
            } => {
                write!(f, "source handle '{port}' not found on node {node_id}")
            }
            Self::SourceHandleNotFound { node_id, port: None } => {
                write!(f, "node {node_id} requires a branch port ('true' or 'false')")
            }
            Self::TargetHandleNotFound {
                node_id,
                handle: Some(handle),
            } => {
                write!(f, "target handle '{handle}' not found on node {node_id}")
            }
            Self::TargetHandleNotFound { node_id, handle: None } => {
                write!(f, "node {node_id} does not accept incoming edges")
            }
            Self::PortAlreadyConnected { node_id, port } => {
                write!(f, "branch '{port}' of node {node_id} is already connected")
            }
            Self::SelfLoop { node_id } => {
                write!(f, "node {node_id} cannot connect to itself")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Structural problems that stop a workflow from being simulated.
///
/// These are user-facing and non-fatal: the workflow stays editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// No node of kind `start` exists.
    MissingStartNode,
    /// No node of kind `end` exists.
    MissingEndNode,
    /// No `end` node can be reached from any `start` node.
    EndUnreachable,
}

impl ValidationError {
    /// Returns the message shown to the person editing the workflow.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingStartNode | Self::MissingEndNode => {
                "Workflow must have a Start and End node."
            }
            Self::EndUnreachable => "No End node is reachable from a Start node.",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStartNode => write!(f, "workflow has no start node"),
            Self::MissingEndNode => write!(f, "workflow has no end node"),
            Self::EndUnreachable => write!(f, "no end node is reachable from a start node"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors while importing or exporting workflow documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The document is not valid JSON or does not have the expected shape.
    Parse { details: String },
    /// The document could not be encoded.
    Encode { details: String },
    /// The file could not be read.
    Read { path: String, details: String },
    /// The file could not be written.
    Write { path: String, details: String },
}

impl DocumentError {
    /// Returns the message shown to the person importing a file.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Parse { .. } | Self::Read { .. } => "Could not load file.",
            Self::Encode { .. } | Self::Write { .. } => "Could not save file.",
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { details } => write!(f, "malformed workflow document: {details}"),
            Self::Encode { details } => write!(f, "failed to encode workflow document: {details}"),
            Self::Read { path, details } => write!(f, "failed to read {path}: {details}"),
            Self::Write { path, details } => write!(f, "failed to write {path}: {details}"),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Errors from a simulated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationError {
    /// The caller cancelled the run before it resolved.
    Cancelled,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "simulation cancelled"),
        }
    }
}

impl std::error::Error for SimulationError {}
