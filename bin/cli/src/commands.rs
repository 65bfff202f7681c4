//! Subcommands. Each mutating command loads the document, applies one engine
//! operation and writes the document back.

use crate::config::CliConfig;
use crate::error::CliError;
use clap::Subcommand;
use flowsmith_workflow::node::FieldWidget;
use flowsmith_workflow::{
    BranchPort, Connection, Direction, EdgeId, FlowDocument, NodeId, Position, SimulationError,
    WorkflowEditor,
};
use rootcause::prelude::Report;
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a new workflow holding only the start node
    New {
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },
    /// Print nodes and edges
    Show,
    /// Place a node of the given kind (start, end, condition, slack, issue, api, automated, email)
    Add {
        kind: String,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f64,
    },
    /// Set one attribute of a node
    Set {
        node: NodeId,
        key: String,
        value: String,
    },
    /// Move a node
    Move {
        node: NodeId,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },
    /// Connect two nodes
    Connect {
        source: NodeId,
        target: NodeId,
        /// Branch of a condition source (true or false)
        #[arg(long)]
        port: Option<BranchPort>,
    },
    /// Remove an edge
    Disconnect { edge: EdgeId },
    /// Remove a node and its edges
    Remove { node: NodeId },
    /// Recompute node positions
    Layout {
        /// TB (top to bottom) or LR (left to right); defaults to the configured direction
        #[arg(long)]
        direction: Option<Direction>,
    },
    /// Check that the workflow can be simulated
    Validate,
    /// Simulate a run and print the log (Ctrl-C cancels)
    Simulate,
}

/// Runs one subcommand against the document at `path`.
pub async fn run(command: Command, path: &Path, config: &CliConfig) -> Result<(), Report<CliError>> {
    match command {
        Command::New { force } => create(path, config, force),
        Command::Show => {
            show(&open(path, config)?);
            Ok(())
        }
        Command::Add { kind, x, y } => edit(path, config, |editor| {
            let node_id = editor
                .drop_node(&kind, Position::new(x, y))
                .map_err(CliError::from)?;
            println!("{node_id}");
            Ok(())
        }),
        Command::Set { node, key, value } => edit(path, config, |editor| set_field(editor, &node, &key, value)),
        Command::Move { node, x, y } => edit(path, config, |editor| {
            if !editor.move_node(&node, Position::new(x, y)) {
                return Err(CliError::NodeNotFound { node_id: node }.into());
            }
            Ok(())
        }),
        Command::Connect { source, target, port } => edit(path, config, |editor| {
            let connection = Connection {
                source,
                source_port: port,
                target,
                target_port: None,
            };
            let edge_id = editor.connect(&connection).map_err(CliError::from)?;
            println!("{edge_id}");
            Ok(())
        }),
        Command::Disconnect { edge } => edit(path, config, |editor| {
            if editor.disconnect(&edge).is_none() {
                return Err(CliError::EdgeNotFound { edge_id: edge }.into());
            }
            Ok(())
        }),
        Command::Remove { node } => edit(path, config, |editor| {
            if editor.remove_node(&node).is_none() {
                return Err(CliError::NodeNotFound { node_id: node }.into());
            }
            Ok(())
        }),
        Command::Layout { direction } => edit(path, config, |editor| {
            let layout = editor.layout(direction);
            println!(
                "Placed {} nodes in {} ranks ({}).",
                layout.placements.len(),
                layout.rank_count(),
                layout.direction
            );
            Ok(())
        }),
        Command::Validate => {
            open(path, config)?
                .validate()
                .map_err(|e| CliError::Invalid {
                    message: e.user_message().to_string(),
                })?;
            println!("Workflow is valid.");
            Ok(())
        }
        Command::Simulate => simulate(&open(path, config)?).await,
    }
}

fn create(path: &Path, config: &CliConfig, force: bool) -> Result<(), Report<CliError>> {
    if path.exists() && !force {
        return Err(CliError::DocumentExists {
            path: path.display().to_string(),
        }
        .into());
    }
    save(&WorkflowEditor::new(config.engine()), path)
}

fn open(path: &Path, config: &CliConfig) -> Result<WorkflowEditor, Report<CliError>> {
    let document = FlowDocument::read_from_path(path).map_err(|report| CliError::Document {
        message: "Could not load file.",
        details: report.to_string(),
    })?;
    let (editor, report) = WorkflowEditor::from_document(document, config.engine());
    if !report.is_clean() {
        tracing::warn!(
            dropped = report.dropped(),
            "document contained invalid records; they will not be saved back"
        );
    }
    Ok(editor)
}

fn save(editor: &WorkflowEditor, path: &Path) -> Result<(), Report<CliError>> {
    editor.save_file(path).map_err(|report| CliError::Document {
        message: "Could not save file.",
        details: report.to_string(),
    })?;
    Ok(())
}

fn edit<F>(path: &Path, config: &CliConfig, apply: F) -> Result<(), Report<CliError>>
where
    F: FnOnce(&mut WorkflowEditor) -> Result<(), Report<CliError>>,
{
    let mut editor = open(path, config)?;
    apply(&mut editor)?;
    save(&editor, path)
}

fn set_field(editor: &mut WorkflowEditor, node_id: &NodeId, key: &str, value: String) -> Result<(), Report<CliError>> {
    let node = editor
        .graph()
        .get_node(node_id)
        .ok_or_else(|| CliError::NodeNotFound {
            node_id: node_id.clone(),
        })?;
    if let Some(field) = node.kind.field(key)
        && !field.accepts(&value)
    {
        let options = match field.widget {
            FieldWidget::Select(options) => options,
            FieldWidget::Text | FieldWidget::TextArea => &[],
        };
        return Err(CliError::InvalidFieldValue {
            key: key.to_string(),
            value,
            options,
        }
        .into());
    }
    if !editor.update_node_data(node_id, key, value) {
        println!("{node_id}.{key} unchanged");
    }
    Ok(())
}

fn show(editor: &WorkflowEditor) {
    let graph = editor.graph();
    let viewport = editor.viewport();
    println!(
        "viewport: x={} y={} zoom={}",
        viewport.x, viewport.y, viewport.zoom
    );
    println!("nodes ({}):", graph.node_count());
    for node in graph.nodes() {
        let card = node.card();
        println!(
            "  {} [{}] at ({}, {})",
            node.id, card.title, node.position.x, node.position.y
        );
        for line in card.lines {
            println!("      {line}");
        }
    }
    println!("edges ({}):", graph.edge_count());
    for edge in graph.edges() {
        match edge.source_port {
            Some(port) => println!("  {}: {} --{port}--> {}", edge.id, edge.source, edge.target),
            None => println!("  {}: {} --> {}", edge.id, edge.source, edge.target),
        }
    }
}

async fn simulate(editor: &WorkflowEditor) -> Result<(), Report<CliError>> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            cancel.cancel();
        })
    };

    let result = editor.simulate(&cancel).await;
    watcher.abort();

    match result {
        Ok(report) if report.success => {
            for line in report.logs.unwrap_or_default() {
                println!("{line}");
            }
            Ok(())
        }
        Ok(report) => Err(CliError::Invalid {
            message: report.message.unwrap_or_default(),
        }
        .into()),
        Err(SimulationError::Cancelled) => Err(CliError::Cancelled.into()),
    }
}
