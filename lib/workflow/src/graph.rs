//! Workflow graph store.
//!
//! The store owns the canonical node and edge records and is the only place
//! they are mutated. Every mutation checks the graph invariants before it
//! commits:
//! - node IDs are unique
//! - edge IDs are unique and both endpoints exist
//! - only condition nodes name a source port, and each branch port has at
//!   most one outgoing edge
//! - no edge names a target port
//!
//! Nodes and edges are kept in insertion order, which is the order documents
//! are written in and the order the simulator logs nodes in.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::layout::NodePlacement;
use crate::node::{Node, NodeKind, Position};
use crate::port::BranchPort;
use flowsmith_core::{EdgeId, NodeId};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// The nodes and edges of one workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// Map from NodeId to position in `nodes` for O(1) lookup.
    node_index_map: HashMap<NodeId, usize>,
    /// Map from EdgeId to position in `edges`.
    edge_index_map: HashMap<EdgeId, usize>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph holding a single node.
    #[must_use]
    pub fn with_node(node: Node) -> Self {
        let mut node_index_map = HashMap::new();
        node_index_map.insert(node.id.clone(), 0);
        Self {
            nodes: vec![node],
            edges: Vec::new(),
            node_index_map,
            edge_index_map: HashMap::new(),
        }
    }

    /// Builds a graph from records, failing on the first invariant violation.
    ///
    /// # Errors
    ///
    /// Returns the error of the first node or edge that cannot be added.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        for edge in edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    /// Adds a node to the graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] if the ID is already taken.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.node_index_map.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { node_id: node.id });
        }
        let node_id = node.id.clone();
        tracing::debug!(node_id = %node_id, kind = %node.kind, "node added");
        self.node_index_map.insert(node_id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(node_id)
    }

    /// Places a new node of `kind` at `position` with the kind's default data.
    ///
    /// # Errors
    ///
    /// Returns an error only if the generated ID collides with an existing node.
    pub fn place_node(&mut self, kind: NodeKind, position: Position) -> Result<NodeId, GraphError> {
        self.add_node(Node::placed(kind, position))
    }

    /// Places a node from a drag-and-drop payload naming its kind.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNodeKind`] if the payload is not a kind name.
    pub fn place_dropped(&mut self, payload: &str, position: Position) -> Result<NodeId, GraphError> {
        let kind = payload
            .trim()
            .parse::<NodeKind>()
            .map_err(|e| GraphError::UnknownNodeKind { kind: e.value })?;
        self.place_node(kind, position)
    }

    /// Removes a node from the graph.
    ///
    /// Also removes every edge that starts or ends at this node.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        let index = self.node_index_map.remove(node_id)?;
        let node = self.nodes.remove(index);
        let before = self.edges.len();
        self.edges.retain(|edge| !edge.touches(node_id));
        tracing::debug!(
            node_id = %node_id,
            removed_edges = before - self.edges.len(),
            "node removed"
        );
        self.rebuild_index_map();
        Some(node)
    }

    /// Sets `key` in a node's data, keeping the other keys.
    ///
    /// Unknown node IDs are ignored. Returns whether anything changed, so a
    /// repeated identical call returns `false`.
    pub fn update_node_data(
        &mut self,
        node_id: &NodeId,
        key: &str,
        value: impl Into<JsonValue>,
    ) -> bool {
        let Some(node) = self.get_node_mut(node_id) else {
            tracing::debug!(node_id = %node_id, key, "ignoring data update for unknown node");
            return false;
        };
        node.data.set(key, value)
    }

    /// Moves a node. Unknown node IDs are ignored.
    pub fn set_position(&mut self, node_id: &NodeId, position: Position) -> bool {
        match self.get_node_mut(node_id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Applies a computed layout to every placed node in one step.
    pub fn apply_placements(&mut self, placements: &[NodePlacement]) {
        for placement in placements {
            if let Some(node) = self.get_node_mut(&placement.node_id) {
                node.position = placement.position;
                node.source_position = Some(placement.source_side);
                node.target_position = Some(placement.target_side);
            }
        }
    }

    /// Adds an edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge would break a graph invariant; see
    /// [`WorkflowGraph::check_edge`].
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        self.check_edge(&edge)?;
        let edge_id = edge.id.clone();
        tracing::debug!(
            edge_id = %edge_id,
            source = %edge.source,
            target = %edge.target,
            "edge added"
        );
        self.edge_index_map.insert(edge_id.clone(), self.edges.len());
        self.edges.push(edge);
        Ok(edge_id)
    }

    /// Checks whether `edge` could be added without breaking an invariant.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An edge with the same ID exists
    /// - The source or target node doesn't exist
    /// - A condition source has no branch port, or another source has one
    /// - The edge names a target port
    /// - The condition branch already has an outgoing edge
    pub fn check_edge(&self, edge: &Edge) -> Result<(), GraphError> {
        if self.edge_index_map.contains_key(&edge.id) {
            return Err(GraphError::DuplicateEdge {
                edge_id: edge.id.clone(),
            });
        }

        let source = self.get_node(&edge.source).ok_or_else(|| GraphError::NodeNotFound {
            node_id: edge.source.clone(),
        })?;
        if !self.node_index_map.contains_key(&edge.target) {
            return Err(GraphError::NodeNotFound {
                node_id: edge.target.clone(),
            });
        }

        let port_shape_ok = match source.kind {
            NodeKind::Condition => edge.source_port.is_some(),
            _ => edge.source_port.is_none(),
        };
        if !port_shape_ok {
            return Err(GraphError::SourceHandleNotFound {
                node_id: edge.source.clone(),
                port: edge.source_port,
            });
        }

        if let Some(handle) = &edge.target_port {
            return Err(GraphError::TargetHandleNotFound {
                node_id: edge.target.clone(),
                handle: Some(handle.clone()),
            });
        }

        if let Some(port) = edge.source_port
            && self.branch_edge(&edge.source, port).is_some()
        {
            return Err(GraphError::PortAlreadyConnected {
                node_id: edge.source.clone(),
                port,
            });
        }

        Ok(())
    }

    /// Removes an edge from the graph.
    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Option<Edge> {
        let index = self.edge_index_map.remove(edge_id)?;
        let edge = self.edges.remove(index);
        tracing::debug!(edge_id = %edge_id, "edge removed");
        self.rebuild_index_map();
        Some(edge)
    }

    /// Replaces the whole graph.
    ///
    /// The new records are validated as a unit; on error the graph is left
    /// exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation among the new records.
    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<(), GraphError> {
        *self = Self::from_parts(nodes, edges)?;
        Ok(())
    }

    /// Returns all nodes, in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all edges, in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn get_node(&self, node_id: &NodeId) -> Option<&Node> {
        let index = self.node_index_map.get(node_id)?;
        self.nodes.get(*index)
    }

    fn get_node_mut(&mut self, node_id: &NodeId) -> Option<&mut Node> {
        let index = self.node_index_map.get(node_id)?;
        self.nodes.get_mut(*index)
    }

    /// Returns a reference to an edge by its ID.
    #[must_use]
    pub fn get_edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        let index = self.edge_index_map.get(edge_id)?;
        self.edges.get(*index)
    }

    /// Returns whether a node with this ID exists.
    #[must_use]
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.node_index_map.contains_key(node_id)
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the edges leaving a node.
    pub fn outgoing<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| &edge.source == node_id)
    }

    /// Returns the edges entering a node.
    pub fn incoming<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| &edge.target == node_id)
    }

    /// Returns the edge leaving a condition node through `port`, if wired.
    #[must_use]
    pub fn branch_edge(&self, node_id: &NodeId, port: BranchPort) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|edge| &edge.source == node_id && edge.source_port == Some(port))
    }

    /// Rebuilds the ID lookup maps after records moved.
    fn rebuild_index_map(&mut self) {
        self.node_index_map = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        self.edge_index_map = self
            .edges
            .iter()
            .enumerate()
            .map(|(index, edge)| (edge.id.clone(), index))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeData;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node::new(id, kind, Position::default(), kind.default_data())
    }

    fn branching_graph() -> WorkflowGraph {
        WorkflowGraph::from_parts(
            vec![
                node("s", NodeKind::Start),
                node("c", NodeKind::Condition),
                node("m", NodeKind::Email),
                node("e", NodeKind::End),
            ],
            vec![
                Edge::new("s", None, "c"),
                Edge::new("c", Some(BranchPort::True), "m"),
                Edge::new("c", Some(BranchPort::False), "e"),
                Edge::new("m", None, "e"),
            ],
        )
        .expect("valid graph")
    }

    #[test]
    fn with_node_indexes_its_node() {
        let mut graph = WorkflowGraph::with_node(node("s", NodeKind::Start));
        assert!(graph.contains_node(&NodeId::from("s")));
        assert!(graph.add_node(node("s", NodeKind::End)).is_err());
        graph.add_node(node("e", NodeKind::End)).expect("added");
        graph.add_edge(Edge::new("s", None, "e")).expect("connected");
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn add_and_get_node() {
        let mut graph = WorkflowGraph::new();
        let id = graph.add_node(node("1", NodeKind::Start)).expect("added");
        assert_eq!(graph.get_node(&id).map(Node::label), Some("New start"));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn duplicate_node_id_rejected() {
        let mut graph = WorkflowGraph::new();
        graph.add_node(node("1", NodeKind::Start)).expect("added");
        let err = graph.add_node(node("1", NodeKind::End)).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateNode {
                node_id: NodeId::from("1")
            }
        );
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn place_dropped_parses_payload() {
        let mut graph = WorkflowGraph::new();
        let id = graph
            .place_dropped("issue", Position::new(40.0, 60.0))
            .expect("placed");
        let placed = graph.get_node(&id).expect("exists");
        assert_eq!(placed.kind, NodeKind::Issue);
        assert_eq!(placed.position, Position::new(40.0, 60.0));

        let err = graph.place_dropped("fax", Position::default()).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNodeKind { .. }));
    }

    #[test]
    fn remove_node_cascades_edges() {
        let mut graph = branching_graph();
        let removed = graph.remove_node(&NodeId::from("c")).expect("removed");
        assert_eq!(removed.kind, NodeKind::Condition);
        assert_eq!(graph.edge_count(), 1);
        assert!(
            graph
                .edges()
                .iter()
                .all(|edge| graph.contains_node(&edge.source) && graph.contains_node(&edge.target))
        );
        // Lookups still work after indices shift.
        assert!(graph.get_node(&NodeId::from("e")).is_some());
        assert!(graph.get_edge(&EdgeId::from("xy-edge__m-e")).is_some());
    }

    #[test]
    fn insertion_order_survives_removal() {
        let mut graph = branching_graph();
        graph.remove_node(&NodeId::from("s"));
        let ids: Vec<_> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "m", "e"]);
    }

    #[test]
    fn update_node_data_is_idempotent() {
        let mut graph = branching_graph();
        let id = NodeId::from("m");
        assert!(graph.update_node_data(&id, "label", "X"));
        assert!(!graph.update_node_data(&id, "label", "X"));
        let data = &graph.get_node(&id).expect("exists").data;
        assert_eq!(data.label(), Some("X"));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn update_node_data_unknown_node_is_noop() {
        let mut graph = branching_graph();
        let before = graph.clone();
        assert!(!graph.update_node_data(&NodeId::from("ghost"), "label", "X"));
        assert_eq!(graph, before);
    }

    #[test]
    fn dangling_edge_rejected() {
        let mut graph = branching_graph();
        let err = graph.add_edge(Edge::new("m", None, "ghost")).unwrap_err();
        assert_eq!(
            err,
            GraphError::NodeNotFound {
                node_id: NodeId::from("ghost")
            }
        );
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn condition_edge_requires_port() {
        let mut graph = WorkflowGraph::new();
        graph.add_node(node("c", NodeKind::Condition)).expect("added");
        graph.add_node(node("a", NodeKind::Api)).expect("added");
        let err = graph.add_edge(Edge::new("c", None, "a")).unwrap_err();
        assert!(matches!(err, GraphError::SourceHandleNotFound { port: None, .. }));
    }

    #[test]
    fn plain_node_rejects_port() {
        let mut graph = branching_graph();
        let err = graph
            .add_edge(Edge::new("m", Some(BranchPort::True), "c"))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::SourceHandleNotFound {
                port: Some(BranchPort::True),
                ..
            }
        ));
    }

    #[test]
    fn branch_port_allows_one_edge() {
        let mut graph = branching_graph();
        graph.add_node(node("x", NodeKind::Slack)).expect("added");
        let err = graph
            .add_edge(Edge::new("c", Some(BranchPort::True), "x"))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::PortAlreadyConnected {
                port: BranchPort::True,
                ..
            }
        ));
    }

    #[test]
    fn named_target_port_rejected() {
        let mut graph = branching_graph();
        let mut edge = Edge::new("s", None, "m");
        edge.target_port = Some("left".to_string());
        assert!(matches!(
            graph.add_edge(edge),
            Err(GraphError::TargetHandleNotFound { .. })
        ));
    }

    #[test]
    fn fan_in_and_fan_out_are_allowed() {
        let mut graph = branching_graph();
        graph.add_node(node("x", NodeKind::Slack)).expect("added");
        graph.add_edge(Edge::new("s", None, "x")).expect("fan-out");
        graph.add_edge(Edge::new("x", None, "e")).expect("fan-in");
        assert_eq!(graph.incoming(&NodeId::from("e")).count(), 3);
    }

    #[test]
    fn remove_edge_by_id() {
        let mut graph = branching_graph();
        let id = EdgeId::from("xy-edge__ctrue-m");
        assert!(graph.remove_edge(&id).is_some());
        assert!(graph.branch_edge(&NodeId::from("c"), BranchPort::True).is_none());
        assert!(graph.remove_edge(&id).is_none());
    }

    #[test]
    fn replace_all_is_atomic() {
        let mut graph = branching_graph();
        let before = graph.clone();
        let result = graph.replace_all(
            vec![node("only", NodeKind::Start)],
            vec![Edge::new("only", None, "missing")],
        );
        assert!(result.is_err());
        assert_eq!(graph, before);

        graph
            .replace_all(vec![node("only", NodeKind::Start)], Vec::new())
            .expect("valid");
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn branch_edge_outlives_the_lookup_key() {
        let graph = branching_graph();
        let wired = graph.branch_edge(&NodeId::from("c"), BranchPort::False);
        assert_eq!(wired.map(|edge| edge.target.as_str()), Some("e"));
        assert!(graph.branch_edge(&NodeId::from("m"), BranchPort::True).is_none());
    }

    #[test]
    fn set_position_moves_node() {
        let mut graph = WorkflowGraph::new();
        let id = graph
            .add_node(Node::new("n", NodeKind::Api, Position::default(), NodeData::new()))
            .expect("added");
        assert!(graph.set_position(&id, Position::new(3.0, 4.0)));
        assert_eq!(graph.get_node(&id).map(|n| n.position), Some(Position::new(3.0, 4.0)));
        assert!(!graph.set_position(&NodeId::from("ghost"), Position::default()));
    }
}
