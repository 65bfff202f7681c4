//! Workflow graph engine for flowsmith.
//!
//! This crate provides everything behind the workflow canvas:
//!
//! - **Graph Store**: node and edge records with invariant-checked mutations
//! - **Node Kinds**: start, end, condition and the action integrations, with
//!   default data, handles, edit forms and card rendering per kind
//! - **Connections**: rules for proposed edges, including the two-branch
//!   condition outputs
//! - **Layout**: deterministic layered positions, top-to-bottom or left-to-right
//! - **Documents**: JSON import and export with load-time repair
//! - **Simulation**: structural validation and a delayed, cancellable run log

pub mod config;
pub mod connection;
pub mod document;
pub mod edge;
pub mod editor;
pub mod error;
pub mod graph;
pub mod layout;
pub mod node;
pub mod port;
pub mod simulation;

pub use config::{ConnectionPolicy, EngineConfig, LayoutConfig, SimulationConfig};
pub use connection::{Connection, ConnectionValidator};
pub use document::{DEFAULT_FILE_NAME, FlowDocument, LoadReport, LoadedDocument, Viewport};
pub use edge::Edge;
pub use editor::WorkflowEditor;
pub use error::{DocumentError, GraphError, SimulationError, ValidationError};
pub use flowsmith_core::{EdgeId, NodeId};
pub use graph::WorkflowGraph;
pub use layout::{Direction, Layout, NodePlacement, compute_layout};
pub use node::{Node, NodeData, NodeKind, Position};
pub use port::{BranchPort, HandleSide, Handles, OutputHandles};
pub use simulation::{MockBackend, SimulationReport, WorkflowBackend, simulate, validate};
