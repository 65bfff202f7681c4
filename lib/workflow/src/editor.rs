//! Editing sessions.
//!
//! A [`WorkflowEditor`] is the single owned value a front end holds while a
//! workflow is open: the graph store, the canvas viewport and the engine
//! configuration. Every change goes through one of its methods, which in
//! turn go through the store's checks.

use crate::config::EngineConfig;
use crate::connection::{Connection, ConnectionValidator};
use crate::document::{FlowDocument, LoadReport, Viewport};
use crate::edge::Edge;
use crate::error::{DocumentError, GraphError, SimulationError, ValidationError};
use crate::graph::WorkflowGraph;
use crate::layout::{Direction, Layout, compute_layout};
use crate::node::{Node, NodeData, NodeKind, Position};
use crate::simulation::{self, SimulationReport, WorkflowBackend};
use flowsmith_core::{EdgeId, NodeId};
use serde_json::Value as JsonValue;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// ID of the start node a new workflow begins with.
pub const SEED_NODE_ID: &str = "1";

/// Returns the graph a new workflow begins with: a single start node.
#[must_use]
pub fn seed_graph() -> WorkflowGraph {
    let mut data = NodeData::new();
    data.set("label", "Start Workflow");
    WorkflowGraph::with_node(Node::new(
        SEED_NODE_ID,
        NodeKind::Start,
        Position::new(500.0, 100.0),
        data,
    ))
}

/// An open workflow.
#[derive(Debug, Clone)]
pub struct WorkflowEditor {
    graph: WorkflowGraph,
    viewport: Viewport,
    config: EngineConfig,
}

impl WorkflowEditor {
    /// Opens a new workflow holding the seed start node.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            graph: seed_graph(),
            viewport: Viewport::default(),
            config,
        }
    }

    /// Opens a saved document. Invalid records are dropped and reported.
    #[must_use]
    pub fn from_document(document: FlowDocument, config: EngineConfig) -> (Self, LoadReport) {
        let loaded = document.into_graph();
        let editor = Self {
            graph: loaded.graph,
            viewport: loaded.viewport,
            config,
        };
        (editor, loaded.report)
    }

    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Places a node of `kind` with its default data.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated ID collides with an existing node.
    pub fn place_node(&mut self, kind: NodeKind, position: Position) -> Result<NodeId, GraphError> {
        self.graph.place_node(kind, position)
    }

    /// Places a node from a drag-and-drop payload.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNodeKind`] if the payload names no kind.
    pub fn drop_node(&mut self, payload: &str, position: Position) -> Result<NodeId, GraphError> {
        self.graph.place_dropped(payload, position)
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        self.graph.remove_node(node_id)
    }

    /// Sets one attribute of a node. Unknown nodes are ignored.
    pub fn update_node_data(&mut self, node_id: &NodeId, key: &str, value: impl Into<JsonValue>) -> bool {
        self.graph.update_node_data(node_id, key, value)
    }

    /// Moves a node, as a manual drag would.
    pub fn move_node(&mut self, node_id: &NodeId, position: Position) -> bool {
        self.graph.set_position(node_id, position)
    }

    /// Validates a proposed connection and adds the tagged edge.
    ///
    /// # Errors
    ///
    /// Returns the reason the connection was refused; the graph is unchanged.
    pub fn connect(&mut self, connection: &Connection) -> Result<EdgeId, GraphError> {
        ConnectionValidator::new(self.config.connection.clone()).connect(&mut self.graph, connection)
    }

    /// Removes an edge.
    pub fn disconnect(&mut self, edge_id: &EdgeId) -> Option<Edge> {
        self.graph.remove_edge(edge_id)
    }

    /// Recomputes every node position.
    ///
    /// Uses the configured direction when `direction` is `None`. All
    /// positions are replaced in one step.
    pub fn layout(&mut self, direction: Option<Direction>) -> Layout {
        let direction = direction.unwrap_or(self.config.layout.direction);
        let layout = compute_layout(
            self.graph.nodes(),
            self.graph.edges(),
            direction,
            &self.config.layout,
        );
        self.graph.apply_placements(&layout.placements);
        layout
    }

    /// Checks the structural preconditions for simulation.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        simulation::validate_with(self.graph.nodes(), self.graph.edges(), &self.config.simulation)
    }

    /// Simulates a run of the current workflow.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Cancelled`] if `cancel` fires first.
    pub async fn simulate(&self, cancel: &CancellationToken) -> Result<SimulationReport, SimulationError> {
        simulation::simulate(
            self.graph.nodes(),
            self.graph.edges(),
            &self.config.simulation,
            cancel,
        )
        .await
    }

    /// Runs the current workflow on `backend`.
    ///
    /// # Errors
    ///
    /// Returns whatever the backend reports.
    pub async fn run_on(
        &self,
        backend: &dyn WorkflowBackend,
        cancel: &CancellationToken,
    ) -> Result<SimulationReport, SimulationError> {
        backend.simulate(&self.graph, cancel).await
    }

    /// Captures the workflow as a document.
    #[must_use]
    pub fn export(&self) -> FlowDocument {
        FlowDocument::from_graph(&self.graph, self.viewport)
    }

    /// Replaces the workflow with a document's contents.
    pub fn load_document(&mut self, document: FlowDocument) -> LoadReport {
        let loaded = document.into_graph();
        self.graph = loaded.graph;
        self.viewport = loaded.viewport;
        loaded.report
    }

    /// Replaces the workflow with a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Parse`] if the text is malformed; the open
    /// workflow is left untouched.
    pub fn load_json(&mut self, text: &str) -> Result<LoadReport, DocumentError> {
        let document = FlowDocument::from_json(text)?;
        Ok(self.load_document(document))
    }

    /// Replaces the workflow with a document file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed; the open
    /// workflow is left untouched.
    pub fn load_file(&mut self, path: &Path) -> flowsmith_core::Result<LoadReport, DocumentError> {
        let document = FlowDocument::read_from_path(path)?;
        Ok(self.load_document(document))
    }

    /// Writes the workflow to a document file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_file(&self, path: &Path) -> flowsmith_core::Result<(), DocumentError> {
        self.export().write_to_path(path)
    }
}

impl Default for WorkflowEditor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionPolicy;
    use crate::port::{BranchPort, HandleSide};

    #[test]
    fn new_editor_holds_seed_start_node() {
        let editor = WorkflowEditor::default();
        let nodes = editor.graph().nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id.as_str(), "1");
        assert_eq!(nodes[0].kind, NodeKind::Start);
        assert_eq!(nodes[0].position, Position::new(500.0, 100.0));
        assert_eq!(nodes[0].label(), "Start Workflow");
        assert_eq!(editor.viewport(), Viewport::default());
    }

    #[test]
    fn malformed_json_leaves_workflow_untouched() {
        let mut editor = WorkflowEditor::default();
        editor
            .drop_node("email", Position::new(1.0, 2.0))
            .expect("placed");
        let before = editor.graph().clone();
        let err = editor.load_json("not json").unwrap_err();
        assert_eq!(err.user_message(), "Could not load file.");
        assert_eq!(editor.graph(), &before);
    }

    #[test]
    fn load_replaces_workflow_and_reports_repairs() {
        let mut editor = WorkflowEditor::default();
        let report = editor
            .load_json(
                r#"{
                    "nodes": [{"id": "a", "type": "end", "position": {"x": 1, "y": 2}, "data": {}}],
                    "edges": [{"id": "x", "source": "a", "target": "missing"}],
                    "viewport": {"zoom": 2}
                }"#,
            )
            .expect("parse");
        assert_eq!(report.dropped_edges.len(), 1);
        assert_eq!(editor.graph().node_count(), 1);
        assert!(!editor.graph().contains_node(&NodeId::from("1")));
        assert_eq!(editor.viewport().zoom, 2.0);
    }

    #[test]
    fn connect_follows_configured_policy() {
        let mut editor = WorkflowEditor::default();
        let api = editor
            .place_node(NodeKind::Api, Position::default())
            .expect("placed");
        assert!(matches!(
            editor.connect(&Connection::new(api.clone(), api.clone())),
            Err(GraphError::SelfLoop { .. })
        ));

        let config = EngineConfig {
            connection: ConnectionPolicy {
                allow_self_loops: true,
            },
            ..EngineConfig::default()
        };
        let mut editor = WorkflowEditor::new(config);
        let api = editor
            .place_node(NodeKind::Api, Position::default())
            .expect("placed");
        editor
            .connect(&Connection::new(api.clone(), api))
            .expect("self-loop allowed");
    }

    #[test]
    fn layout_applies_positions_and_handle_sides() {
        let mut editor = WorkflowEditor::default();
        let condition = editor
            .place_node(NodeKind::Condition, Position::new(900.0, 900.0))
            .expect("placed");
        let end = editor
            .place_node(NodeKind::End, Position::new(-5.0, -5.0))
            .expect("placed");
        editor
            .connect(&Connection::new(SEED_NODE_ID, condition.clone()))
            .expect("start -> condition");
        editor
            .connect(&Connection::branch(condition.clone(), BranchPort::False, end.clone()))
            .expect("condition -> end");

        let layout = editor.layout(Some(Direction::LeftToRight));
        assert_eq!(layout.rank_count(), 3);
        let end_node = editor.graph().get_node(&end).expect("exists");
        assert_eq!(end_node.position, Position::new(444.0, 0.0));
        assert_eq!(end_node.target_position, Some(HandleSide::Left));
        assert_eq!(end_node.source_position, Some(HandleSide::Right));
    }

    #[test]
    fn export_and_reopen_round_trip() {
        let mut editor = WorkflowEditor::default();
        let end = editor
            .place_node(NodeKind::End, Position::new(10.0, 20.0))
            .expect("placed");
        editor
            .connect(&Connection::new(SEED_NODE_ID, end))
            .expect("connected");
        editor.set_viewport(Viewport {
            x: 3.0,
            y: 4.0,
            zoom: 1.5,
        });

        let (reopened, report) = WorkflowEditor::from_document(editor.export(), EngineConfig::default());
        assert!(report.is_clean());
        assert_eq!(reopened.graph(), editor.graph());
        assert_eq!(reopened.viewport(), editor.viewport());
    }

    #[test]
    fn file_load_failure_leaves_workflow_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").expect("write");
        let mut editor = WorkflowEditor::default();
        let before = editor.graph().clone();
        assert!(editor.load_file(&path).is_err());
        assert_eq!(editor.graph(), &before);
    }

    #[tokio::test(start_paused = true)]
    async fn seed_workflow_fails_simulation_until_end_added() {
        let mut editor = WorkflowEditor::default();
        let cancel = CancellationToken::new();
        let report = editor.simulate(&cancel).await.expect("not cancelled");
        assert!(!report.success);
        assert_eq!(editor.validate(), Err(ValidationError::MissingEndNode));

        editor
            .place_node(NodeKind::End, Position::default())
            .expect("placed");
        let report = editor.simulate(&cancel).await.expect("not cancelled");
        assert!(report.success);
        assert_eq!(
            report.logs.as_ref().and_then(|logs| logs.first()).map(String::as_str),
            Some("Executed start node: \"Start Workflow\"")
        );
    }
}
