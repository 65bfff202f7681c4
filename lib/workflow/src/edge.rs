//! Edge types for workflow graphs.
//!
//! An edge runs from a source node's output handle to a target node's input
//! handle. Only condition nodes have named outputs, so the source port is a
//! typed [`BranchPort`] rather than a free-form string. The drawing tags
//! (`type`, `animated`, `style`, `markerEnd`, `label`) carry no meaning for
//! the engine but are kept so a document survives a load and save intact.

use crate::port::BranchPort;
use flowsmith_core::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// Default edge colour.
pub const EDGE_COLOR: &str = "#22d3ee";
/// Colour of edges leaving a `true` branch.
pub const TRUE_BRANCH_COLOR: &str = "#4ade80";
/// Colour of edges leaving a `false` branch.
pub const FALSE_BRANCH_COLOR: &str = "#f87171";

/// Stroke settings for an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub stroke: String,
    pub stroke_width: f64,
}

/// Arrow drawn at the end of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMarker {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// An edge connecting two nodes in a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique identifier for this edge within the graph.
    pub id: EdgeId,
    /// The node the edge leaves.
    pub source: NodeId,
    /// The branch the edge leaves through; only set for condition sources.
    #[serde(
        rename = "sourceHandle",
        alias = "sourcePort",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_port: Option<BranchPort>,
    /// The node the edge enters.
    pub target: NodeId,
    /// Named input handle; no node kind has one, so valid edges leave it unset.
    #[serde(
        rename = "targetHandle",
        alias = "targetPort",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_port: Option<String>,
    /// Canvas edge renderer (e.g. `smoothstep`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<EdgeStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<EdgeMarker>,
}

impl Edge {
    /// Creates an untagged edge with the canonical derived ID.
    #[must_use]
    pub fn new(source: impl Into<NodeId>, source_port: Option<BranchPort>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        let id = EdgeId::from_endpoints(&source, source_port.map(BranchPort::as_str), &target, None);
        Self {
            id,
            source,
            source_port,
            target,
            target_port: None,
            edge_type: None,
            animated: false,
            label: None,
            style: None,
            marker_end: None,
        }
    }

    /// Replaces the edge ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = id.into();
        self
    }

    /// Applies the standard canvas tags: animated smooth-step line with a
    /// closed arrow, coloured by branch.
    #[must_use]
    pub fn tagged(mut self) -> Self {
        let color = match self.source_port {
            Some(BranchPort::True) => TRUE_BRANCH_COLOR,
            Some(BranchPort::False) => FALSE_BRANCH_COLOR,
            None => EDGE_COLOR,
        };
        self.edge_type = Some("smoothstep".to_string());
        self.animated = true;
        self.label = self.source_port.map(|port| port.as_str().to_string());
        self.style = Some(EdgeStyle {
            stroke: color.to_string(),
            stroke_width: 3.0,
        });
        self.marker_end = Some(EdgeMarker {
            kind: "arrowclosed".to_string(),
            color: Some(color.to_string()),
        });
        self
    }

    /// Returns whether the edge touches `node_id` at either end.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }

    /// Returns whether the edge starts and ends on the same node.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
