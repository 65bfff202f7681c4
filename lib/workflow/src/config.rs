//! Engine configuration.
//!
//! Plain deserializable settings with defaults for every field. Binaries
//! compose [`EngineConfig`] into their own configuration and load it from
//! files or the environment.

use crate::layout::Direction;
use serde::Deserialize;
use std::time::Duration;

/// Settings for every engine component.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Layered layout settings.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Rules for new connections.
    #[serde(default)]
    pub connection: ConnectionPolicy,

    /// Validator and simulator settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Spacing and orientation of the layered layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayoutConfig {
    /// Default direction when the caller does not pick one.
    #[serde(default)]
    pub direction: Direction,

    /// Width of a node's box.
    #[serde(default = "default_node_width")]
    pub node_width: f64,

    /// Height of a node's box.
    #[serde(default = "default_node_height")]
    pub node_height: f64,

    /// Gap between consecutive ranks.
    #[serde(default = "default_separation")]
    pub rank_sep: f64,

    /// Gap between neighbouring nodes in the same rank.
    #[serde(default = "default_separation")]
    pub node_sep: f64,

    /// Horizontal offset of the whole drawing.
    #[serde(default)]
    pub margin_x: f64,

    /// Vertical offset of the whole drawing.
    #[serde(default)]
    pub margin_y: f64,
}

fn default_node_width() -> f64 {
    172.0
}

fn default_node_height() -> f64 {
    80.0
}

fn default_separation() -> f64 {
    50.0
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            node_width: default_node_width(),
            node_height: default_node_height(),
            rank_sep: default_separation(),
            node_sep: default_separation(),
            margin_x: 0.0,
            margin_y: 0.0,
        }
    }
}

/// Rules applied to connections proposed from the canvas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionPolicy {
    /// Whether a node may connect to itself.
    #[serde(default)]
    pub allow_self_loops: bool,
}

/// Validator and simulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Artificial delay before a simulated run resolves, in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Also require an `end` node reachable from a `start` node.
    #[serde(default)]
    pub require_path: bool,
}

fn default_latency_ms() -> u64 {
    1000
}

impl SimulationConfig {
    /// Returns the artificial delay as a `Duration`.
    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            require_path: false,
        }
    }
}
