//! Graph search over the visibility mesh
//!
//! A* with a Euclidean heuristic. Ties on f-cost break toward the node
//! discovered first, so repeated searches over the same mesh always
//! return the same path even when several are equally short.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::debug;
use ordered_float::OrderedFloat;

use crate::common::{NavError, NavResult, Path2D};
use crate::meshing::{MeshGraph, NodeId};

/// Search strategy over a visibility mesh.
pub trait Pathfinder {
    fn find_path(&self, mesh: &MeshGraph, start: NodeId, goal: NodeId) -> NavResult<Path2D>;
}

/// A* with straight-line distance to the goal as the heuristic.
///
/// Euclidean distance never overestimates the remaining cost on a
/// Euclidean-weighted graph, so the first path popped at the goal is
/// optimal.
#[derive(Debug, Clone, Default)]
pub struct AStar;

impl AStar {
    pub fn new() -> Self {
        Self
    }
}

struct FrontierEntry {
    f: OrderedFloat<f64>,
    /// Monotone discovery sequence number, used as the tie-break.
    seq: usize,
    node: NodeId,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for FrontierEntry {}

impl Ord for FrontierEntry {
    // BinaryHeap is a max-heap; invert so the pop yields the lowest f,
    // and among equal f the earliest-discovered entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Pathfinder for AStar {
    fn find_path(&self, mesh: &MeshGraph, start: NodeId, goal: NodeId) -> NavResult<Path2D> {
        let n = mesh.node_count();
        let goal_position = mesh.position(goal);
        let heuristic = |id: NodeId| mesh.position(id).distance(&goal_position);

        let mut g_score = vec![f64::INFINITY; n];
        let mut parent: Vec<Option<NodeId>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut frontier = BinaryHeap::new();
        let mut seq = 0usize;

        g_score[start] = 0.0;
        frontier.push(FrontierEntry {
            f: OrderedFloat(heuristic(start)),
            seq,
            node: start,
        });

        while let Some(FrontierEntry { node, .. }) = frontier.pop() {
            if closed[node] {
                continue;
            }
            closed[node] = true;

            if node == goal {
                let path = reconstruct(mesh, &parent, goal);
                debug!(
                    "path found: {} nodes, length {:.3}",
                    path.points.len(),
                    g_score[goal]
                );
                return Ok(path);
            }

            for &(neighbor, cost) in mesh.neighbors(node) {
                let tentative = g_score[node] + cost;
                if tentative < g_score[neighbor] {
                    g_score[neighbor] = tentative;
                    parent[neighbor] = Some(node);
                    seq += 1;
                    frontier.push(FrontierEntry {
                        f: OrderedFloat(tentative + heuristic(neighbor)),
                        seq,
                        node: neighbor,
                    });
                }
            }
        }

        Err(NavError::NoPathFound)
    }
}

fn reconstruct(mesh: &MeshGraph, parent: &[Option<NodeId>], goal: NodeId) -> Path2D {
    let mut ids = vec![goal];
    let mut current = goal;
    while let Some(previous) = parent[current] {
        ids.push(previous);
        current = previous;
    }
    ids.reverse();
    Path2D::from_points(ids.into_iter().map(|id| mesh.position(id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Point2D;

    fn grid_graph() -> MeshGraph {
        // 0 -(1)- 1 -(1)- 2
        // |               |
        // (5)            (1)
        // |               |
        // 3 ----(10)----- 4
        let mut graph = MeshGraph::new();
        let positions = [
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (0.0, -5.0),
            (2.0, -1.0),
        ];
        for &(x, y) in &positions {
            graph.add_node(Point2D::new(x, y));
        }
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        graph.add_edge(0, 3);
        graph.add_edge(2, 4);
        graph.add_edge(3, 4);
        graph
    }

    #[test]
    fn test_single_edge_path() {
        let mut graph = MeshGraph::new();
        let a = graph.add_node(Point2D::new(0.0, 0.0));
        let b = graph.add_node(Point2D::new(3.0, 4.0));
        graph.add_edge(a, b);
        let path = AStar::new().find_path(&graph, a, b).unwrap();
        assert_eq!(path.points.len(), 2);
        assert!((path.total_length() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_start_equals_goal() {
        let mut graph = MeshGraph::new();
        let a = graph.add_node(Point2D::new(1.0, 1.0));
        let path = AStar::new().find_path(&graph, a, a).unwrap();
        assert_eq!(path.points.len(), 1);
        assert_eq!(path.total_length(), 0.0);
    }

    #[test]
    fn test_prefers_shorter_route() {
        let graph = grid_graph();
        let path = AStar::new().find_path(&graph, 0, 4).unwrap();
        // Top route costs 2 + 1 = 3, bottom route 5 + 10 = 15
        let expected = [0, 1, 2, 4]
            .iter()
            .map(|&id| graph.position(id))
            .collect::<Vec<_>>();
        assert_eq!(path.points, expected);
    }

    #[test]
    fn test_matches_exhaustive_search() {
        let graph = grid_graph();
        let best = exhaustive_shortest(&graph, 0, 4);
        let path = AStar::new().find_path(&graph, 0, 4).unwrap();
        assert!((path.total_length() - best).abs() < 1e-9);
    }

    #[test]
    fn test_no_path_on_disconnected_graph() {
        let mut graph = MeshGraph::new();
        let a = graph.add_node(Point2D::new(0.0, 0.0));
        let b = graph.add_node(Point2D::new(1.0, 0.0));
        let c = graph.add_node(Point2D::new(5.0, 5.0));
        graph.add_edge(a, b);
        let result = AStar::new().find_path(&graph, a, c);
        assert!(matches!(result, Err(NavError::NoPathFound)));
    }

    #[test]
    fn test_repeat_searches_identical() {
        let graph = grid_graph();
        let first = AStar::new().find_path(&graph, 0, 4).unwrap();
        for _ in 0..5 {
            let again = AStar::new().find_path(&graph, 0, 4).unwrap();
            assert_eq!(again.points, first.points);
        }
    }

    fn exhaustive_shortest(graph: &MeshGraph, start: NodeId, goal: NodeId) -> f64 {
        fn visit(
            graph: &MeshGraph,
            node: NodeId,
            goal: NodeId,
            cost: f64,
            seen: &mut Vec<bool>,
            best: &mut f64,
        ) {
            if node == goal {
                *best = best.min(cost);
                return;
            }
            for &(next, edge_cost) in graph.neighbors(node) {
                if !seen[next] {
                    seen[next] = true;
                    visit(graph, next, goal, cost + edge_cost, seen, best);
                    seen[next] = false;
                }
            }
        }
        let mut seen = vec![false; graph.node_count()];
        seen[start] = true;
        let mut best = f64::INFINITY;
        visit(graph, start, goal, 0.0, &mut seen, &mut best);
        best
    }
}
