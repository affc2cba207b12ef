//! Visibility mesh construction
//!
//! Builds an undirected graph whose nodes are the start point, the goal
//! point, and the vertices of every inflated obstacle, and whose edges
//! connect node pairs that can see each other along a straight segment
//! clear of all inflated-obstacle interiors. The mesh is a pure value
//! built per planning request and discarded after use.

use itertools::Itertools;
use log::debug;

use crate::common::{NavResult, Point2D, Rect};
use crate::geometry::{segment_crosses_interior, Polygon};

pub type NodeId = usize;

/// A mesh vertex: identifier plus field position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshNode {
    pub id: NodeId,
    pub position: Point2D,
}

/// Undirected visibility graph with Euclidean edge costs.
///
/// Simple graph: at most one edge per node pair, no self loops. May be
/// disconnected; connectivity failures surface during path search.
#[derive(Debug, Clone, Default)]
pub struct MeshGraph {
    nodes: Vec<MeshNode>,
    adjacency: Vec<Vec<(NodeId, f64)>>,
    edge_count: usize,
}

impl MeshGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, position: Point2D) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(MeshNode { id, position });
        self.adjacency.push(Vec::new());
        id
    }

    /// Add an undirected edge with Euclidean cost. Self loops and
    /// duplicate edges are ignored.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) {
        if a == b || self.adjacency[a].iter().any(|&(n, _)| n == b) {
            return;
        }
        let cost = self.nodes[a].position.distance(&self.nodes[b].position);
        self.adjacency[a].push((b, cost));
        self.adjacency[b].push((a, cost));
        self.edge_count += 1;
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn position(&self, id: NodeId) -> Point2D {
        self.nodes[id].position
    }

    pub fn neighbors(&self, id: NodeId) -> &[(NodeId, f64)] {
        &self.adjacency[id]
    }

    pub fn nodes(&self) -> &[MeshNode] {
        &self.nodes
    }

    /// True when an edge connects `a` and `b`.
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency[a].iter().any(|&(n, _)| n == b)
    }
}

/// Configuration for visibility mesh construction.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// Effective robot radius used to inflate obstacles.
    pub robot_radius: f64,
    /// Extra clearance added on top of the robot radius.
    pub safety_margin: f64,
    /// Chords per rounded inflation corner.
    pub arc_segments: usize,
    /// Optional field bounds; obstacle vertices outside are dropped.
    pub bounds: Option<Rect>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            robot_radius: 0.0,
            safety_margin: 0.0,
            arc_segments: 4,
            bounds: None,
        }
    }
}

impl MeshConfig {
    pub fn with_radius(robot_radius: f64) -> Self {
        Self {
            robot_radius,
            ..Default::default()
        }
    }
}

/// Result of a mesh build: the graph, the start/goal node ids, and the
/// inflated obstacles the graph was tested against (the trajectory stage
/// reuses them for avoidance constraints).
#[derive(Debug, Clone)]
pub struct VisibilityMesh {
    pub graph: MeshGraph,
    pub start: NodeId,
    pub goal: NodeId,
    pub inflated: Vec<Polygon>,
}

/// Build the visibility mesh for one planning request.
///
/// If a collision-free path exists between start and goal under the
/// given inflation, the mesh contains at least one path realizing it.
/// Pair enumeration is quadratic in node count, which is fine at
/// field scale (tens of obstacles, not thousands).
pub fn build_visibility_mesh(
    obstacles: &[Polygon],
    start: Point2D,
    goal: Point2D,
    config: &MeshConfig,
) -> NavResult<VisibilityMesh> {
    let inflation = config.robot_radius + config.safety_margin;
    let inflated: Vec<Polygon> = obstacles
        .iter()
        .map(|polygon| polygon.inflate_with(inflation, config.arc_segments))
        .collect::<Result<_, _>>()?;

    let mut graph = MeshGraph::new();
    let start_id = graph.add_node(start);
    let goal_id = graph.add_node(goal);

    for (i, polygon) in inflated.iter().enumerate() {
        for &vertex in polygon.vertices() {
            if let Some(bounds) = config.bounds {
                if !bounds.contains(vertex) {
                    continue;
                }
            }
            // A vertex buried inside another inflated obstacle can never
            // anchor a usable edge.
            let buried = inflated
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.contains(vertex));
            if !buried {
                graph.add_node(vertex);
            }
        }
    }

    let ids: Vec<NodeId> = (0..graph.node_count()).collect();
    for (&a, &b) in ids.iter().tuple_combinations() {
        let (pa, pb) = (graph.position(a), graph.position(b));
        let blocked = inflated
            .iter()
            .any(|polygon| segment_crosses_interior(pa, pb, polygon));
        if !blocked {
            graph.add_edge(a, b);
        }
    }

    debug!(
        "visibility mesh: {} nodes, {} edges, {} obstacles inflated by {:.3}",
        graph.node_count(),
        graph.edge_count(),
        inflated.len(),
        inflation
    );

    Ok(VisibilityMesh {
        graph,
        start: start_id,
        goal: goal_id,
        inflated,
    })
}
