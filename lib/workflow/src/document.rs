//! Workflow documents.
//!
//! A document is the portable form of a workflow: every node and edge record
//! plus the canvas viewport, as JSON. Loading is forgiving about shape
//! (missing arrays and viewport fields take defaults, unknown fields are
//! ignored) but never admits a record that breaks a graph invariant. Such
//! records are dropped, logged and listed in a [`LoadReport`].

use crate::edge::Edge;
use crate::error::{DocumentError, GraphError};
use crate::graph::WorkflowGraph;
use crate::node::Node;
use flowsmith_core::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name used when exporting without an explicit path.
pub const DEFAULT_FILE_NAME: &str = "workflow-data.json";

/// Canvas pan and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: default_zoom(),
        }
    }
}

/// The serialized form of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub viewport: Viewport,
}

/// Records dropped while turning a document into a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Nodes rejected by the store, with the reason.
    pub dropped_nodes: Vec<(NodeId, GraphError)>,
    /// Edges rejected by the store, with the reason.
    pub dropped_edges: Vec<(EdgeId, GraphError)>,
}

impl LoadReport {
    /// Returns whether every record was kept.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped_nodes.is_empty() && self.dropped_edges.is_empty()
    }

    /// Returns the number of dropped records.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped_nodes.len() + self.dropped_edges.len()
    }
}

/// A graph restored from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub graph: WorkflowGraph,
    pub viewport: Viewport,
    pub report: LoadReport,
}

impl FlowDocument {
    /// Captures the graph's records, in store order, with a viewport.
    #[must_use]
    pub fn from_graph(graph: &WorkflowGraph, viewport: Viewport) -> Self {
        Self {
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
            viewport,
        }
    }

    /// Rebuilds a graph from the document's records.
    ///
    /// Nodes are added first, then edges, each through the store's checks.
    /// A node whose ID is already taken is dropped, so the first occurrence
    /// wins. An edge that is dangling, duplicated or uses an illegal or
    /// already wired port is dropped.
    #[must_use]
    pub fn into_graph(self) -> LoadedDocument {
        let mut graph = WorkflowGraph::new();
        let mut report = LoadReport::default();

        for node in self.nodes {
            let node_id = node.id.clone();
            if let Err(reason) = graph.add_node(node) {
                tracing::warn!(node_id = %node_id, error = %reason, "dropping node from document");
                report.dropped_nodes.push((node_id, reason));
            }
        }
        for edge in self.edges {
            let edge_id = edge.id.clone();
            if let Err(reason) = graph.add_edge(edge) {
                tracing::warn!(edge_id = %edge_id, error = %reason, "dropping edge from document");
                report.dropped_edges.push((edge_id, reason));
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dropped = report.dropped(),
            "document loaded"
        );
        LoadedDocument {
            graph,
            viewport: self.viewport,
            report,
        }
    }

    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Parse`] if the text is not JSON or does not
    /// have the document shape.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(text).map_err(|e| DocumentError::Parse {
            details: e.to_string(),
        })
    }

    /// Encodes the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Encode`] if a value cannot be represented.
    /// JSON has no NaN or infinity, so a non-finite coordinate or viewport
    /// value is refused here rather than written as `null`.
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        if let Some(node) = self.nodes.iter().find(|node| !node.position.is_finite()) {
            return Err(DocumentError::Encode {
                details: format!(
                    "node {} has a non-finite position ({}, {})",
                    node.id, node.position.x, node.position.y
                ),
            });
        }
        let Viewport { x, y, zoom } = self.viewport;
        if !(x.is_finite() && y.is_finite() && zoom.is_finite()) {
            return Err(DocumentError::Encode {
                details: format!("viewport is not finite (x={x}, y={y}, zoom={zoom})"),
            });
        }
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::Encode {
            details: e.to_string(),
        })
    }

    /// Reads and parses a document file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read_from_path(path: &Path) -> flowsmith_core::Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        Ok(Self::from_json(&text)?)
    }

    /// Writes the document as pretty-printed JSON, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_to_path(&self, path: &Path) -> flowsmith_core::Result<(), DocumentError> {
        let text = self.to_json_pretty()?;
        std::fs::write(path, text).map_err(|e| DocumentError::Write {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), nodes = self.nodes.len(), "document written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, Position};
    use crate::port::BranchPort;
    use serde_json::json;

    fn sample_graph() -> WorkflowGraph {
        let mut data = NodeKind::Issue.default_data();
        data.set("custom", json!({"kept": true}));
        WorkflowGraph::from_parts(
            vec![
                Node::new("s", NodeKind::Start, Position::new(500.0, 100.0), NodeKind::Start.default_data()),
                Node::new("c", NodeKind::Condition, Position::new(10.5, -3.25), NodeKind::Condition.default_data()),
                Node::new("i", NodeKind::Issue, Position::default(), data),
                Node::new("e", NodeKind::End, Position::default(), NodeKind::End.default_data()),
            ],
            vec![
                Edge::new("s", None, "c").tagged(),
                Edge::new("c", Some(BranchPort::True), "i").tagged(),
                Edge::new("c", Some(BranchPort::False), "e"),
                Edge::new("i", None, "e").with_id("custom-id"),
            ],
        )
        .expect("valid graph")
    }

    #[test]
    fn json_round_trip_preserves_graph_and_viewport() {
        let graph = sample_graph();
        let viewport = Viewport {
            x: -40.0,
            y: 12.5,
            zoom: 0.75,
        };
        let text = FlowDocument::from_graph(&graph, viewport)
            .to_json_pretty()
            .expect("encode");
        let loaded = FlowDocument::from_json(&text).expect("parse").into_graph();
        assert_eq!(loaded.graph, graph);
        assert_eq!(loaded.viewport, viewport);
        assert!(loaded.report.is_clean());
    }

    #[test]
    fn awkward_coordinates_round_trip_exactly() {
        let nodes = (1..=200u32)
            .map(|step| {
                let x = 11_467.0 * f64::from(step) / 7.0;
                let y = -(182.787_456_578_654 * f64::from(step)) / 3.0;
                Node::new(
                    format!("n{step}"),
                    NodeKind::Api,
                    Position::new(x, y),
                    NodeKind::Api.default_data(),
                )
            })
            .collect();
        let graph = WorkflowGraph::from_parts(nodes, Vec::new()).expect("valid graph");
        let viewport = Viewport {
            x: 1.0 / 3.0,
            y: -0.1 - 0.2,
            zoom: 2.0 / 3.0,
        };
        let text = FlowDocument::from_graph(&graph, viewport)
            .to_json_pretty()
            .expect("encode");
        let loaded = FlowDocument::from_json(&text).expect("parse").into_graph();
        assert_eq!(loaded.graph, graph);
        assert_eq!(loaded.viewport, viewport);
    }

    #[test]
    fn non_finite_values_are_not_encoded() {
        let mut graph = sample_graph();
        assert!(graph.set_position(&NodeId::from("i"), Position::new(f64::NAN, 0.0)));
        let err = FlowDocument::from_graph(&graph, Viewport::default())
            .to_json_pretty()
            .unwrap_err();
        assert!(matches!(err, DocumentError::Encode { .. }));
        assert_eq!(err.user_message(), "Could not save file.");

        let viewport = Viewport {
            zoom: f64::INFINITY,
            ..Viewport::default()
        };
        let err = FlowDocument::from_graph(&sample_graph(), viewport)
            .to_json_pretty()
            .unwrap_err();
        assert!(matches!(err, DocumentError::Encode { .. }));
    }

    #[test]
    fn non_finite_save_keeps_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(DEFAULT_FILE_NAME);
        let mut graph = sample_graph();
        FlowDocument::from_graph(&graph, Viewport::default())
            .write_to_path(&path)
            .expect("write");

        assert!(graph.set_position(&NodeId::from("c"), Position::new(0.0, f64::NEG_INFINITY)));
        assert!(
            FlowDocument::from_graph(&graph, Viewport::default())
                .write_to_path(&path)
                .is_err()
        );
        let loaded = FlowDocument::read_from_path(&path).expect("still readable").into_graph();
        assert_eq!(loaded.graph, sample_graph());
    }

    #[test]
    fn missing_sections_take_defaults() {
        let loaded = FlowDocument::from_json("{}").expect("parse").into_graph();
        assert_eq!(loaded.graph.node_count(), 0);
        assert_eq!(loaded.graph.edge_count(), 0);
        assert_eq!(loaded.viewport, Viewport::default());

        let document = FlowDocument::from_json(r#"{"viewport": {"x": 5}}"#).expect("parse");
        assert_eq!(
            document.viewport,
            Viewport {
                x: 5.0,
                y: 0.0,
                zoom: 1.0
            }
        );
    }

    #[test]
    fn canvas_fields_are_ignored() {
        let document: FlowDocument = serde_json::from_value(json!({
            "nodes": [{
                "id": "1",
                "type": "start",
                "position": {"x": 500, "y": 100},
                "data": {"label": "Start Workflow"},
                "width": 150,
                "selected": true
            }]
        }))
        .expect("deserialize");
        assert_eq!(document.nodes[0].label(), "Start Workflow");
    }

    #[test]
    fn dangling_edge_is_dropped_and_reported() {
        let document: FlowDocument = serde_json::from_value(json!({
            "nodes": [
                {"id": "s", "type": "start", "position": {"x": 0, "y": 0}, "data": {}},
                {"id": "e", "type": "end", "position": {"x": 0, "y": 0}, "data": {}}
            ],
            "edges": [
                {"id": "ok", "source": "s", "target": "e"},
                {"id": "bad", "source": "s", "target": "ghost"}
            ]
        }))
        .expect("deserialize");
        let loaded = document.into_graph();
        assert_eq!(loaded.graph.edge_count(), 1);
        assert_eq!(loaded.report.dropped_edges.len(), 1);
        let (edge_id, reason) = &loaded.report.dropped_edges[0];
        assert_eq!(edge_id.as_str(), "bad");
        assert_eq!(
            reason,
            &GraphError::NodeNotFound {
                node_id: NodeId::from("ghost")
            }
        );
    }

    #[test]
    fn duplicate_node_keeps_first_occurrence() {
        let document: FlowDocument = serde_json::from_value(json!({
            "nodes": [
                {"id": "1", "type": "start", "data": {"label": "first"}},
                {"id": "1", "type": "end", "data": {"label": "second"}}
            ]
        }))
        .expect("deserialize");
        let loaded = document.into_graph();
        assert_eq!(loaded.graph.node_count(), 1);
        assert_eq!(loaded.graph.nodes()[0].label(), "first");
        assert_eq!(loaded.report.dropped_nodes.len(), 1);
    }

    #[test]
    fn condition_edge_without_port_is_dropped() {
        let document: FlowDocument = serde_json::from_value(json!({
            "nodes": [
                {"id": "c", "type": "condition"},
                {"id": "e", "type": "end"}
            ],
            "edges": [{"id": "x", "source": "c", "target": "e"}]
        }))
        .expect("deserialize");
        let loaded = document.into_graph();
        assert_eq!(loaded.graph.edge_count(), 0);
        assert_eq!(loaded.report.dropped(), 1);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = FlowDocument::from_json("{ nodes: ").unwrap_err();
        assert!(matches!(err, DocumentError::Parse { .. }));
        assert_eq!(err.user_message(), "Could not load file.");

        let err = FlowDocument::from_json(r#"{"nodes": [{"id": "1", "type": "webhook"}]}"#).unwrap_err();
        assert!(matches!(err, DocumentError::Parse { .. }));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(DEFAULT_FILE_NAME);
        let graph = sample_graph();

        FlowDocument::from_graph(&graph, Viewport::default())
            .write_to_path(&path)
            .expect("write");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains('\n'), "export is pretty-printed");
        assert!(text.contains("\"sourceHandle\": \"true\""));

        let loaded = FlowDocument::read_from_path(&path).expect("read").into_graph();
        assert_eq!(loaded.graph, graph);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(FlowDocument::read_from_path(&dir.path().join("absent.json")).is_err());
    }
}
