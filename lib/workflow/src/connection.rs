//! Connection validation.
//!
//! The canvas proposes a connection whenever a handle is dragged onto another
//! node. A proposal is accepted only if both nodes exist, the source exposes
//! the requested output, the target exposes an input, and the graph
//! invariants still hold afterwards. Accepted connections become tagged edges.

use crate::config::ConnectionPolicy;
use crate::edge::Edge;
use crate::error::GraphError;
use crate::graph::WorkflowGraph;
use crate::port::BranchPort;
use flowsmith_core::{EdgeId, NodeId};

/// A connection proposed by the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source: NodeId,
    /// Output handle on the source; required for condition nodes.
    pub source_port: Option<BranchPort>,
    pub target: NodeId,
    /// Named input handle on the target; no kind has one.
    pub target_port: Option<String>,
}

impl Connection {
    /// Proposes a connection from `source`'s single output.
    #[must_use]
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            source_port: None,
            target: target.into(),
            target_port: None,
        }
    }

    /// Proposes a connection leaving a condition node through `port`.
    #[must_use]
    pub fn branch(source: impl Into<NodeId>, port: BranchPort, target: impl Into<NodeId>) -> Self {
        Self {
            source_port: Some(port),
            ..Self::new(source, target)
        }
    }
}

/// Decides whether proposed connections are legal.
#[derive(Debug, Clone, Default)]
pub struct ConnectionValidator {
    policy: ConnectionPolicy,
}

impl ConnectionValidator {
    #[must_use]
    pub fn new(policy: ConnectionPolicy) -> Self {
        Self { policy }
    }

    /// Checks a proposal and returns the tagged edge it would create.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either endpoint is unknown
    /// - The proposal is a self-loop and the policy forbids them
    /// - The source has no output matching `source_port` (an `end` node, a
    ///   condition without a port, or a plain node with one)
    /// - The target accepts no input (a `start` node) or a named input is requested
    /// - The resulting edge would duplicate an existing one or reuse a wired branch
    pub fn accept(&self, graph: &WorkflowGraph, connection: &Connection) -> Result<Edge, GraphError> {
        let source = graph
            .get_node(&connection.source)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: connection.source.clone(),
            })?;
        let target = graph
            .get_node(&connection.target)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: connection.target.clone(),
            })?;

        if source.id == target.id && !self.policy.allow_self_loops {
            return Err(GraphError::SelfLoop {
                node_id: source.id.clone(),
            });
        }

        if !source.handles().outputs.accepts(connection.source_port) {
            return Err(GraphError::SourceHandleNotFound {
                node_id: source.id.clone(),
                port: connection.source_port,
            });
        }

        if !target.handles().input || connection.target_port.is_some() {
            return Err(GraphError::TargetHandleNotFound {
                node_id: target.id.clone(),
                handle: connection.target_port.clone(),
            });
        }

        let edge = Edge::new(
            connection.source.clone(),
            connection.source_port,
            connection.target.clone(),
        )
        .tagged();
        graph.check_edge(&edge)?;
        Ok(edge)
    }

    /// Validates a proposal and adds the resulting edge to the graph.
    ///
    /// # Errors
    ///
    /// See [`ConnectionValidator::accept`]. The graph is unchanged on error.
    pub fn connect(&self, graph: &mut WorkflowGraph, connection: &Connection) -> Result<EdgeId, GraphError> {
        let edge = self.accept(graph, connection).inspect_err(|e| {
            tracing::debug!(
                source = %connection.source,
                target = %connection.target,
                error = %e,
                "connection rejected"
            );
        })?;
        graph.add_edge(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::TRUE_BRANCH_COLOR;
    use crate::node::{Node, NodeKind, Position};

    fn graph() -> WorkflowGraph {
        let nodes = [
            ("s", NodeKind::Start),
            ("c", NodeKind::Condition),
            ("a", NodeKind::Automated),
            ("e", NodeKind::End),
        ]
        .into_iter()
        .map(|(id, kind)| Node::new(id, kind, Position::default(), kind.default_data()))
        .collect();
        WorkflowGraph::from_parts(nodes, Vec::new()).expect("valid graph")
    }

    #[test]
    fn condition_without_port_is_rejected() {
        let mut graph = graph();
        let validator = ConnectionValidator::default();
        let err = validator
            .connect(&mut graph, &Connection::new("c", "a"))
            .unwrap_err();
        assert!(matches!(err, GraphError::SourceHandleNotFound { port: None, .. }));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn condition_with_true_port_is_accepted_and_tagged() {
        let mut graph = graph();
        let validator = ConnectionValidator::default();
        let id = validator
            .connect(&mut graph, &Connection::branch("c", BranchPort::True, "a"))
            .expect("accepted");
        let edge = graph.get_edge(&id).expect("stored");
        assert_eq!(edge.source_port, Some(BranchPort::True));
        assert_eq!(edge.label.as_deref(), Some("true"));
        assert_eq!(edge.edge_type.as_deref(), Some("smoothstep"));
        assert_eq!(
            edge.style.as_ref().map(|s| s.stroke.as_str()),
            Some(TRUE_BRANCH_COLOR)
        );
    }

    #[test]
    fn both_branches_may_be_wired_once() {
        let mut graph = graph();
        let validator = ConnectionValidator::default();
        validator
            .connect(&mut graph, &Connection::branch("c", BranchPort::True, "a"))
            .expect("true branch");
        validator
            .connect(&mut graph, &Connection::branch("c", BranchPort::False, "e"))
            .expect("false branch");
        let err = validator
            .connect(&mut graph, &Connection::branch("c", BranchPort::False, "a"))
            .unwrap_err();
        assert!(matches!(err, GraphError::PortAlreadyConnected { .. }));
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let graph = graph();
        let err = ConnectionValidator::default()
            .accept(&graph, &Connection::new("s", "ghost"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::NodeNotFound {
                node_id: NodeId::from("ghost")
            }
        );
    }

    #[test]
    fn end_cannot_be_a_source_and_start_cannot_be_a_target() {
        let graph = graph();
        let validator = ConnectionValidator::default();
        assert!(matches!(
            validator.accept(&graph, &Connection::new("e", "a")),
            Err(GraphError::SourceHandleNotFound { .. })
        ));
        assert!(matches!(
            validator.accept(&graph, &Connection::new("a", "s")),
            Err(GraphError::TargetHandleNotFound { handle: None, .. })
        ));
    }

    #[test]
    fn self_loops_follow_policy() {
        let mut graph = graph();
        let strict = ConnectionValidator::default();
        assert!(matches!(
            strict.accept(&graph, &Connection::new("a", "a")),
            Err(GraphError::SelfLoop { .. })
        ));

        let permissive = ConnectionValidator::new(ConnectionPolicy {
            allow_self_loops: true,
        });
        permissive
            .connect(&mut graph, &Connection::new("a", "a"))
            .expect("self-loop allowed");
        assert!(graph.edges()[0].is_self_loop());
    }

    #[test]
    fn repeated_connection_is_a_duplicate() {
        let mut graph = graph();
        let validator = ConnectionValidator::default();
        validator
            .connect(&mut graph, &Connection::new("s", "a"))
            .expect("first");
        let err = validator
            .connect(&mut graph, &Connection::new("s", "a"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateEdge { .. }));
    }
}
