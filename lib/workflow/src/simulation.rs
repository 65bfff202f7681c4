//! Workflow validation and simulated runs.
//!
//! A workflow is structurally valid when it has at least one `start` and one
//! `end` node. Simulation does not execute anything: after an artificial
//! delay it reports one log line per node, in store order. Reachability is
//! not part of the default check and must be enabled through
//! [`SimulationConfig::require_path`].

use crate::config::SimulationConfig;
use crate::edge::Edge;
use crate::error::{SimulationError, ValidationError};
use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeKind};
use async_trait::async_trait;
use flowsmith_core::NodeId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Outcome of a simulated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub success: bool,
    /// One line per node, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
    /// Why the run failed, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SimulationReport {
    #[must_use]
    pub fn succeeded(logs: Vec<String>) -> Self {
        Self {
            success: true,
            logs: Some(logs),
            message: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            logs: None,
            message: Some(message.into()),
        }
    }
}

/// Checks that at least one `start` and one `end` node exist.
///
/// # Errors
///
/// Returns [`ValidationError::MissingStartNode`] or
/// [`ValidationError::MissingEndNode`].
pub fn validate(nodes: &[Node], edges: &[Edge]) -> Result<(), ValidationError> {
    validate_with(nodes, edges, &SimulationConfig::default())
}

/// Like [`validate`], additionally requiring a path from some `start` node
/// to some `end` node when `config.require_path` is set.
///
/// # Errors
///
/// Returns the first structural problem found.
pub fn validate_with(
    nodes: &[Node],
    edges: &[Edge],
    config: &SimulationConfig,
) -> Result<(), ValidationError> {
    if !nodes.iter().any(|node| node.kind == NodeKind::Start) {
        return Err(ValidationError::MissingStartNode);
    }
    if !nodes.iter().any(|node| node.kind == NodeKind::End) {
        return Err(ValidationError::MissingEndNode);
    }
    if config.require_path && !end_reachable(nodes, edges) {
        return Err(ValidationError::EndUnreachable);
    }
    Ok(())
}

/// Returns whether any `end` node is reachable from any `start` node.
fn end_reachable(nodes: &[Node], edges: &[Edge]) -> bool {
    let mut graph = DiGraph::<NodeKind, ()>::with_capacity(nodes.len(), edges.len());
    let index_of: HashMap<&NodeId, NodeIndex> = nodes
        .iter()
        .map(|node| (&node.id, graph.add_node(node.kind)))
        .collect();
    for edge in edges {
        if let (Some(&source), Some(&target)) = (index_of.get(&edge.source), index_of.get(&edge.target)) {
            graph.add_edge(source, target, ());
        }
    }

    let mut dfs = Dfs::empty(&graph);
    dfs.stack.extend(
        graph
            .node_indices()
            .filter(|&ix| graph[ix] == NodeKind::Start),
    );
    while let Some(ix) = dfs.next(&graph) {
        if graph[ix] == NodeKind::End {
            return true;
        }
    }
    false
}

/// Returns the log a successful run reports: one line per node, in order.
#[must_use]
pub fn execution_log(nodes: &[Node]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| format!("Executed {} node: \"{}\"", node.kind, node.label()))
        .collect()
}

/// Validates the workflow and resolves with a report after the configured
/// latency.
///
/// The report is built from the records as they are when the call starts.
/// Nothing is written anywhere, so dropping the future or cancelling has no
/// side effect.
///
/// # Errors
///
/// Returns [`SimulationError::Cancelled`] if `cancel` fires before the
/// delay elapses.
#[instrument(skip_all, fields(nodes = nodes.len(), edges = edges.len()))]
pub async fn simulate(
    nodes: &[Node],
    edges: &[Edge],
    config: &SimulationConfig,
    cancel: &CancellationToken,
) -> Result<SimulationReport, SimulationError> {
    let report = match validate_with(nodes, edges, config) {
        Ok(()) => SimulationReport::succeeded(execution_log(nodes)),
        Err(e) => {
            tracing::debug!(error = %e, "workflow failed validation");
            SimulationReport::failed(e.user_message())
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::info!("simulation cancelled");
            Err(SimulationError::Cancelled)
        }
        () = tokio::time::sleep(config.latency()) => {
            tracing::info!(success = report.success, "simulation finished");
            Ok(report)
        }
    }
}

/// Something that can run a workflow.
///
/// The engine ships only [`MockBackend`]; a real executor would implement
/// this trait.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Runs the workflow and reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is cancelled.
    async fn simulate(
        &self,
        graph: &WorkflowGraph,
        cancel: &CancellationToken,
    ) -> Result<SimulationReport, SimulationError>;
}

/// Backend that validates and produces the naive store-order log.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    config: SimulationConfig,
}

impl MockBackend {
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WorkflowBackend for MockBackend {
    async fn simulate(
        &self,
        graph: &WorkflowGraph,
        cancel: &CancellationToken,
    ) -> Result<SimulationReport, SimulationError> {
        simulate(graph.nodes(), graph.edges(), &self.config, cancel).await
    }
}
