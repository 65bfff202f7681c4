//! Layered layout for workflow graphs.
//!
//! Positions are computed in four phases:
//! 1. Cycle breaking: a depth-first search from the source nodes marks back
//!    edges, which are ignored when ranking.
//! 2. Ranking: longest path over the remaining acyclic graph, so every node
//!    sits at least one rank below each of its predecessors.
//! 3. Ordering: per weakly connected component, long edges are split into
//!    virtual nodes and each rank is reordered by barycenter sweeps, keeping
//!    the order with the fewest crossings.
//! 4. Coordinates: rank and order indices are scaled by the node box size
//!    plus separation; each rank is centred within its component and
//!    components are placed side by side.
//!
//! The result depends only on the node and edge sequences, the direction and
//! the spacing, so identical inputs always yield identical positions.

use crate::config::LayoutConfig;
use crate::edge::Edge;
use crate::node::{Node, Position};
use crate::port::HandleSide;
use flowsmith_core::NodeId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Upper bound on barycenter sweep iterations per component.
const MAX_SWEEPS: usize = 8;

/// Which way ranks advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Ranks grow downwards; inputs on top, outputs on the bottom.
    #[default]
    #[serde(rename = "TB")]
    TopToBottom,
    /// Ranks grow rightwards; inputs on the left, outputs on the right.
    #[serde(rename = "LR")]
    LeftToRight,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopToBottom => "TB",
            Self::LeftToRight => "LR",
        }
    }

    /// Side of the node box output handles are drawn on.
    #[must_use]
    pub const fn source_side(self) -> HandleSide {
        match self {
            Self::TopToBottom => HandleSide::Bottom,
            Self::LeftToRight => HandleSide::Right,
        }
    }

    /// Side of the node box the input handle is drawn on.
    #[must_use]
    pub const fn target_side(self) -> HandleSide {
        match self {
            Self::TopToBottom => HandleSide::Top,
            Self::LeftToRight => HandleSide::Left,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a layout direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDirectionError {
    pub value: String,
}

impl fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown layout direction '{}' (expected TB or LR)", self.value)
    }
}

impl std::error::Error for ParseDirectionError {}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("TB") {
            Ok(Self::TopToBottom)
        } else if s.eq_ignore_ascii_case("LR") {
            Ok(Self::LeftToRight)
        } else {
            Err(ParseDirectionError {
                value: s.to_string(),
            })
        }
    }
}

/// Where the layout put one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePlacement {
    pub node_id: NodeId,
    /// Layer index; 0 for nodes without (non-back) incoming edges.
    pub rank: usize,
    /// Index among the real nodes of the same rank and component.
    pub order: usize,
    /// Top-left corner of the node's box.
    pub position: Position,
    pub source_side: HandleSide,
    pub target_side: HandleSide,
}

/// A computed layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub direction: Direction,
    /// One placement per node, in store order.
    pub placements: Vec<NodePlacement>,
    /// Edge crossings left between adjacent ranks after ordering.
    pub crossings: usize,
}

impl Layout {
    /// Returns the placement of `node_id`.
    #[must_use]
    pub fn get(&self, node_id: &NodeId) -> Option<&NodePlacement> {
        self.placements.iter().find(|p| &p.node_id == node_id)
    }

    /// Returns the number of ranks used.
    #[must_use]
    pub fn rank_count(&self) -> usize {
        self.placements
            .iter()
            .map(|p| p.rank + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Computes a layered layout for `nodes` and `edges`.
///
/// Self-loops and edges with unknown endpoints are ignored. Cycles are
/// tolerated; their back edges do not constrain ranks.
#[must_use]
pub fn compute_layout(
    nodes: &[Node],
    edges: &[Edge],
    direction: Direction,
    config: &LayoutConfig,
) -> Layout {
    let index_of: HashMap<&NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (&node.id, index))
        .collect();
    let links: Vec<(usize, usize)> = edges
        .iter()
        .filter_map(|edge| Some((*index_of.get(&edge.source)?, *index_of.get(&edge.target)?)))
        .filter(|(source, target)| source != target)
        .collect();

    let ranks = assign_ranks(nodes.len(), &links);

    let mut slots = vec![(0usize, 0.0f64); nodes.len()];
    let mut offset = 0.0;
    let mut crossings = 0;
    for component in weak_components(nodes.len(), &links) {
        let component = order_component(&component.members, &component.links, &ranks);
        crossings += component.crossings;
        let width = component
            .ranks
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        for rank in &component.ranks {
            let shift = (width - rank.len()) as f64 / 2.0;
            for (order, &index) in rank.iter().enumerate() {
                slots[index] = (order, offset + shift + order as f64);
            }
        }
        offset += width as f64;
    }

    let placements = nodes
        .iter()
        .zip(ranks.iter().zip(slots))
        .map(|(node, (&rank, (order, slot)))| NodePlacement {
            node_id: node.id.clone(),
            rank,
            order,
            position: box_position(config, direction, rank, slot),
            source_side: direction.source_side(),
            target_side: direction.target_side(),
        })
        .collect();

    let layout = Layout {
        direction,
        placements,
        crossings,
    };
    tracing::info!(
        nodes = nodes.len(),
        edges = edges.len(),
        ranks = layout.rank_count(),
        crossings,
        direction = %direction,
        "layout computed"
    );
    layout
}

/// Returns the top-left corner of a box whose centre is the anchor for
/// (`rank`, `slot`).
fn box_position(config: &LayoutConfig, direction: Direction, rank: usize, slot: f64) -> Position {
    let half_width = config.node_width / 2.0;
    let half_height = config.node_height / 2.0;
    let rank = rank as f64;
    let (center_x, center_y) = match direction {
        Direction::TopToBottom => (
            config.margin_x + half_width + slot * (config.node_width + config.node_sep),
            config.margin_y + half_height + rank * (config.node_height + config.rank_sep),
        ),
        Direction::LeftToRight => (
            config.margin_x + half_width + rank * (config.node_width + config.rank_sep),
            config.margin_y + half_height + slot * (config.node_height + config.node_sep),
        ),
    };
    Position::new(center_x - half_width, center_y - half_height)
}

/// Longest-path ranks with DFS back edges removed.
fn assign_ranks(node_count: usize, links: &[(usize, usize)]) -> Vec<usize> {
    let mut graph = DiGraph::<(), ()>::with_capacity(node_count, links.len());
    for _ in 0..node_count {
        graph.add_node(());
    }
    for &(source, target) in links {
        graph.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
    }

    // Roots first so a cycle is entered from its natural entry point.
    let roots = graph.node_indices().filter(|&ix| {
        graph
            .neighbors_directed(ix, petgraph::Direction::Incoming)
            .next()
            .is_none()
    });
    let starts: Vec<NodeIndex> = roots.chain(graph.node_indices()).collect();
    let cycle_edges = back_edges(&graph, starts);

    let mut dag = DiGraph::<(), ()>::with_capacity(node_count, links.len());
    for _ in 0..node_count {
        dag.add_node(());
    }
    for &(source, target) in links {
        if !cycle_edges.contains(&(source, target)) {
            dag.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
        }
    }

    let order = toposort(&dag, None).unwrap_or_else(|cycle| {
        tracing::warn!(
            node = cycle.node_id().index(),
            "cycle left after back edge removal; ranking in store order"
        );
        dag.node_indices().collect()
    });

    let mut ranks = vec![0usize; node_count];
    for ix in order {
        let next = ranks[ix.index()] + 1;
        for succ in dag.neighbors_directed(ix, petgraph::Direction::Outgoing) {
            let rank = &mut ranks[succ.index()];
            *rank = (*rank).max(next);
        }
    }
    ranks
}

/// Edges that reach a node still on the depth-first path, walking from each
/// unvisited entry of `starts` in turn.
///
/// The walk keeps its own stack so long chains cannot exhaust the thread's
/// call stack.
fn back_edges(graph: &DiGraph<(), ()>, starts: Vec<NodeIndex>) -> HashSet<(usize, usize)> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnPath,
        Finished,
    }

    let mut marks = vec![Mark::Unvisited; graph.node_count()];
    let mut back = HashSet::new();
    let mut path = Vec::new();
    for start in starts {
        if marks[start.index()] != Mark::Unvisited {
            continue;
        }
        marks[start.index()] = Mark::OnPath;
        path.push((start, graph.neighbors(start)));
        while let Some((node, successors)) = path.last_mut() {
            let node = *node;
            let Some(next) = successors.next() else {
                marks[node.index()] = Mark::Finished;
                path.pop();
                continue;
            };
            match marks[next.index()] {
                Mark::Unvisited => {
                    marks[next.index()] = Mark::OnPath;
                    path.push((next, graph.neighbors(next)));
                }
                Mark::OnPath => {
                    back.insert((node.index(), next.index()));
                }
                Mark::Finished => {}
            }
        }
    }
    back
}

/// Store indices of one weakly connected component and the links among them.
struct Component {
    members: Vec<usize>,
    links: Vec<(usize, usize)>,
}

/// Groups nodes into weakly connected components, each listed in store order
/// and ordered by first member. Every link lands in exactly one component.
fn weak_components(node_count: usize, links: &[(usize, usize)]) -> Vec<Component> {
    let mut sets = UnionFind::<usize>::new(node_count);
    for &(source, target) in links {
        sets.union(source, target);
    }
    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Component> = Vec::new();
    for index in 0..node_count {
        let root = sets.find(index);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            components.push(Component {
                members: Vec::new(),
                links: Vec::new(),
            });
            components.len() - 1
        });
        components[slot].members.push(index);
    }
    for &(source, target) in links {
        if let Some(&slot) = slot_of_root.get(&sets.find(source)) {
            components[slot].links.push((source, target));
        }
    }
    components
}

/// Rank-by-rank order of one component's real nodes.
struct ComponentOrder {
    /// Store indices per rank, left to right (or top to bottom).
    ranks: Vec<Vec<usize>>,
    crossings: usize,
}

/// Orders the ranks of one component by barycenter sweeps. `links` must
/// only join members of the component.
fn order_component(members: &[usize], links: &[(usize, usize)], ranks: &[usize]) -> ComponentOrder {
    // Vertices are the members followed by virtual nodes on long edges.
    let mut local: HashMap<usize, usize> = HashMap::new();
    let mut real: Vec<Option<usize>> = Vec::with_capacity(members.len());
    let mut level: Vec<usize> = Vec::with_capacity(members.len());
    for &index in members {
        local.insert(index, real.len());
        real.push(Some(index));
        level.push(ranks[index]);
    }
    let mut down: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
    let mut up: Vec<Vec<usize>> = vec![Vec::new(); members.len()];

    for &(source, target) in links {
        let (Some(&a), Some(&b)) = (local.get(&source), local.get(&target)) else {
            continue;
        };
        // Back edges point upwards; orient every link from lower to higher rank.
        let (upper, lower) = match level[a].cmp(&level[b]) {
            std::cmp::Ordering::Less => (a, b),
            std::cmp::Ordering::Greater => (b, a),
            std::cmp::Ordering::Equal => continue,
        };
        let mut previous = upper;
        for rank in level[upper] + 1..level[lower] {
            let dummy = real.len();
            real.push(None);
            level.push(rank);
            down.push(Vec::new());
            up.push(Vec::new());
            down[previous].push(dummy);
            up[dummy].push(previous);
            previous = dummy;
        }
        down[previous].push(lower);
        up[lower].push(previous);
    }

    let rank_total = level.iter().copied().max().map_or(0, |max| max + 1);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); rank_total];
    for (vertex, &rank) in level.iter().enumerate() {
        layers[rank].push(vertex);
    }
    let mut position = vec![0usize; real.len()];
    for layer in &layers {
        index_layer(layer, &mut position);
    }

    let mut best_crossings = total_crossings(&layers, &down, &position);
    let mut best = layers.clone();
    for _ in 0..MAX_SWEEPS {
        if best_crossings == 0 {
            break;
        }
        for rank in 1..layers.len() {
            sweep(&mut layers[rank], &up, &mut position);
        }
        for rank in (0..layers.len().saturating_sub(1)).rev() {
            sweep(&mut layers[rank], &down, &mut position);
        }
        let crossings = total_crossings(&layers, &down, &position);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        } else {
            break;
        }
    }

    ComponentOrder {
        ranks: best
            .into_iter()
            .map(|layer| layer.into_iter().filter_map(|vertex| real[vertex]).collect())
            .collect(),
        crossings: best_crossings,
    }
}

fn index_layer(layer: &[usize], position: &mut [usize]) {
    for (index, &vertex) in layer.iter().enumerate() {
        position[vertex] = index;
    }
}

/// Reorders `layer` by the mean position of each vertex's neighbours in the
/// adjacent fixed layer. Vertices without neighbours keep their slot.
fn sweep(layer: &mut Vec<usize>, neighbors: &[Vec<usize>], position: &mut [usize]) {
    let mut keyed: Vec<(f64, usize)> = layer
        .iter()
        .map(|&vertex| {
            let adjacent = &neighbors[vertex];
            let key = if adjacent.is_empty() {
                position[vertex] as f64
            } else {
                adjacent.iter().map(|&n| position[n] as f64).sum::<f64>() / adjacent.len() as f64
            };
            (key, vertex)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    *layer = keyed.into_iter().map(|(_, vertex)| vertex).collect();
    index_layer(layer, position);
}

fn total_crossings(layers: &[Vec<usize>], down: &[Vec<usize>], position: &[usize]) -> usize {
    layers
        .windows(2)
        .map(|pair| count_crossings(&pair[0], pair[1].len(), down, position))
        .sum()
}

/// Counts crossings between `upper` and the layer below it by counting
/// inversions of the lower endpoints with a Fenwick tree.
fn count_crossings(upper: &[usize], lower_len: usize, down: &[Vec<usize>], position: &[usize]) -> usize {
    struct Fenwick {
        tree: Vec<usize>,
    }

    impl Fenwick {
        fn new(size: usize) -> Self {
            Self {
                tree: vec![0; size + 1],
            }
        }

        fn add(&mut self, index: usize) {
            let mut i = index + 1;
            while i < self.tree.len() {
                self.tree[i] += 1;
                i += i & i.wrapping_neg();
            }
        }

        /// Count of entries in `[0, end)`.
        fn prefix(&self, end: usize) -> usize {
            let mut total = 0;
            let mut i = end.min(self.tree.len() - 1);
            while i > 0 {
                total += self.tree[i];
                i &= i - 1;
            }
            total
        }
    }

    let mut tree = Fenwick::new(lower_len);
    let mut seen = 0;
    let mut crossings = 0;
    for &vertex in upper {
        // Edges sharing an upper endpoint never cross each other.
        let targets: Vec<usize> = down[vertex].iter().map(|&t| position[t]).collect();
        for &target in &targets {
            crossings += seen - tree.prefix(target + 1);
        }
        for &target in &targets {
            tree.add(target);
            seen += 1;
        }
    }
    crossings
}
