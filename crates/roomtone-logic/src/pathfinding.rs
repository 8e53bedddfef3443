//! Sound path graph and A* search.
//!
//! `PathGraph` is an arena of nodes addressed by stable [`NodeId`]s. Each node
//! is anchored to a world position and carries an extra travel cost (portals
//! use this for their obstruction). Edges are undirected and stored as id
//! lists on both endpoints, so connectivity is always symmetric.
//!
//! Removed nodes leave a dead slot that is recycled by the next `add_node`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Stable handle to a node in a [`PathGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A point in the traversal graph.
#[derive(Debug, Clone)]
pub struct PathNode {
    pub position: Vec3,
    /// Cost added to any step onto this node. Never negative.
    pub additional_travel_cost: f32,
    connections: Vec<NodeId>,
}

impl PathNode {
    pub fn connections(&self) -> &[NodeId] {
        &self.connections
    }
}

/// Result of a shortest-path query.
///
/// `nodes` runs from the first step after the start up to and including the
/// target. An empty path means the target is unreachable (or is the start).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub cost: f32,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Mutable graph of positioned nodes with undirected edges.
#[derive(Debug, Clone, Default)]
pub struct PathGraph {
    nodes: Vec<Option<PathNode>>,
    free_slots: Vec<u32>,
}

impl PathGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unconnected node at `position`.
    pub fn add_node(&mut self, position: Vec3) -> NodeId {
        let node = PathNode {
            position,
            additional_travel_cost: 0.0,
            connections: Vec::new(),
        };
        if let Some(slot) = self.free_slots.pop() {
            self.nodes[slot as usize] = Some(node);
            NodeId(slot)
        } else {
            self.nodes.push(Some(node));
            NodeId((self.nodes.len() - 1) as u32)
        }
    }

    /// Remove a node and every edge touching it. No-op for dead ids.
    pub fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        for other in node.connections {
            if let Some(Some(n)) = self.nodes.get_mut(other.index()) {
                n.connections.retain(|&c| c != id);
            }
        }
        self.free_slots.push(id.0);
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&PathNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut PathNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        self.node(id).map(|n| n.position)
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) {
        if let Some(n) = self.node_mut(id) {
            n.position = position;
        }
    }

    pub fn travel_cost(&self, id: NodeId) -> f32 {
        self.node(id).map_or(0.0, |n| n.additional_travel_cost)
    }

    pub fn set_travel_cost(&mut self, id: NodeId, cost: f32) {
        if let Some(n) = self.node_mut(id) {
            n.additional_travel_cost = if cost.is_finite() { cost.max(0.0) } else { 0.0 };
        }
    }

    /// Connect two nodes. Idempotent; self-loops and dead ids are ignored.
    /// Returns true if a new edge was created.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) || self.is_connected(a, b) {
            return false;
        }
        if let Some(n) = self.node_mut(a) {
            n.connections.push(b);
        }
        if let Some(n) = self.node_mut(b) {
            n.connections.push(a);
        }
        true
    }

    /// Disconnect two nodes. Idempotent. Returns true if an edge was removed.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let mut removed = false;
        if let Some(n) = self.node_mut(a) {
            let before = n.connections.len();
            n.connections.retain(|&c| c != b);
            removed = n.connections.len() != before;
        }
        if let Some(n) = self.node_mut(b) {
            n.connections.retain(|&c| c != a);
        }
        removed
    }

    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.node(a).is_some_and(|n| n.connections.contains(&b))
    }

    /// Neighbors of a node (empty for dead ids).
    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.connections.as_slice()).unwrap_or(&[])
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .map(|n| n.connections.len())
            .sum::<usize>()
            / 2
    }

    /// Iterate live node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Cost of stepping from `from` onto `to`.
    fn step_cost(&self, from: &PathNode, to: &PathNode, discount_distance: bool) -> f32 {
        if discount_distance {
            to.additional_travel_cost
        } else {
            from.position.distance(&to.position) + to.additional_travel_cost
        }
    }

    /// A* search from `start` to `target`.
    ///
    /// The heuristic is straight-line distance to the target. With
    /// `skip_first_edge_cost`, steps out of the start node cost only the
    /// neighbor's travel cost, as if the start sat on that neighbor.
    ///
    /// Returns an empty path with cost 0 when the target is unreachable.
    pub fn find_shortest_path(
        &self,
        start: NodeId,
        target: NodeId,
        skip_first_edge_cost: bool,
    ) -> Path {
        let (Some(start_node), Some(target_node)) = (self.node(start), self.node(target)) else {
            return Path::default();
        };
        let target_pos = target_node.position;

        let mut scratch = vec![Scratch::default(); self.nodes.len()];
        let mut open = BinaryHeap::new();

        let h = start_node.position.distance(&target_pos);
        scratch[start.index()] = Scratch {
            g: 0.0,
            h,
            parent: None,
            state: SearchState::Open,
        };
        open.push(OpenEntry { f: h, h, node: start });

        while let Some(entry) = open.pop() {
            let current = entry.node;
            let slot = &mut scratch[current.index()];
            // Stale heap entry: the node was already closed or improved.
            if slot.state == SearchState::Closed || entry.f > slot.g + slot.h {
                continue;
            }
            slot.state = SearchState::Closed;

            if current == target {
                return retrace(&scratch, start, target);
            }

            let Some(current_node) = self.node(current) else {
                continue;
            };
            let current_g = scratch[current.index()].g;
            let discount = skip_first_edge_cost && current == start;

            for &neighbor in &current_node.connections {
                let Some(neighbor_node) = self.node(neighbor) else {
                    continue;
                };
                let slot = &mut scratch[neighbor.index()];
                if slot.state == SearchState::Closed {
                    continue;
                }
                let g = current_g + self.step_cost(current_node, neighbor_node, discount);
                if slot.state == SearchState::Unvisited || g < slot.g {
                    let h = neighbor_node.position.distance(&target_pos);
                    *slot = Scratch {
                        g,
                        h,
                        parent: Some(current),
                        state: SearchState::Open,
                    };
                    open.push(OpenEntry {
                        f: g + h,
                        h,
                        node: neighbor,
                    });
                }
            }
        }

        Path::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum SearchState {
    #[default]
    Unvisited,
    Open,
    Closed,
}

/// Per-query search bookkeeping, indexed by node slot.
#[derive(Debug, Clone, Copy, Default)]
struct Scratch {
    g: f32,
    h: f32,
    parent: Option<NodeId>,
    state: SearchState,
}

/// Min-heap entry: lowest f first, ties broken by lowest h.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f32,
    h: f32,
    node: NodeId,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the cheapest entry pops first.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.node.cmp(&self.node))
    }
}

fn retrace(scratch: &[Scratch], start: NodeId, target: NodeId) -> Path {
    let mut nodes = Vec::new();
    let mut current = target;
    while current != start {
        nodes.push(current);
        match scratch[current.index()].parent {
            Some(parent) => current = parent,
            None => break,
        }
    }
    nodes.reverse();
    Path {
        nodes,
        cost: scratch[target.index()].g,
    }
}
