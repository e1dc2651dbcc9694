//! Graph model: nodes and directed, labeled edges
//!
//! The model owns topology and node kinematics only. Physics lives in
//! [`crate::simulation`], the camera in [`crate::camera`].

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{Boundaries, Point};

/// Radius given to every node at creation
pub const DEFAULT_NODE_RADIUS: f64 = 30.0;

/// A node with position and velocity
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Caller-assigned unique identifier
    pub id: String,
    /// Human-readable label; nodes sharing a label cluster together
    pub label: String,
    /// Model-space position
    pub x: f64,
    pub y: f64,
    /// Velocity, in model units per tick
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
}

impl Node {
    fn new(id: String, label: String, x: f64, y: f64) -> Self {
        Self {
            id,
            label,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius: DEFAULT_NODE_RADIUS,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A directed edge between two node ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// May be empty
    pub label: String,
}

impl Edge {
    /// Whether this edge joins `a` and `b`, in either direction
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// Insertion-ordered set of nodes plus an ordered edge list
#[derive(Debug, Clone)]
pub struct GraphModel {
    nodes: Vec<Node>,
    /// Mapping from node ID to index in `nodes`
    node_id_to_index: HashMap<String, usize>,
    edges: Vec<Edge>,
    rng: StdRng,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphModel {
    /// Create an empty model with an entropy-seeded placement RNG
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an empty model whose random placement is reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            nodes: Vec::new(),
            node_id_to_index: HashMap::new(),
            edges: Vec::new(),
            rng,
        }
    }

    /// Add a node, or relabel an existing one.
    ///
    /// A new node is placed uniformly at random inside `spawn_area` with zero
    /// velocity. Re-adding an existing id overwrites its label only; position,
    /// velocity and enumeration order are kept.
    pub fn add_node(&mut self, id: impl ToString, label: impl ToString, spawn_area: &Boundaries) {
        let id = id.to_string();
        let label = label.to_string();

        if let Some(&index) = self.node_id_to_index.get(&id) {
            self.nodes[index].label = label;
            return;
        }

        let x = spawn_area.left + self.rng.r#gen::<f64>() * spawn_area.width().max(0.0);
        let y = spawn_area.top + self.rng.r#gen::<f64>() * spawn_area.height().max(0.0);

        self.node_id_to_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node::new(id, label, x, y));
    }

    /// Add a directed edge.
    ///
    /// Permissive contract: if either endpoint is unknown nothing is inserted
    /// and no error is raised. Returns whether the edge was inserted.
    pub fn add_edge(
        &mut self,
        source: impl ToString,
        target: impl ToString,
        label: impl ToString,
    ) -> bool {
        let source = source.to_string();
        let target = target.to_string();

        if !self.node_id_to_index.contains_key(&source)
            || !self.node_id_to_index.contains_key(&target)
        {
            return false;
        }

        self.edges.push(Edge {
            source,
            target,
            label: label.to_string(),
        });
        true
    }

    /// Remove every node and edge
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.node_id_to_index.clear();
        self.edges.clear();
    }

    /// True iff some edge joins `a` and `b` in either direction. O(E).
    pub fn connected(&self, a: &str, b: &str) -> bool {
        self.edges.iter().any(|edge| edge.joins(a, b))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index(id).map(|index| &self.nodes[index])
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_id_to_index.get(id).copied()
    }

    /// Move a node directly. Returns false for unknown ids.
    pub fn set_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        match self.node_index(id) {
            Some(index) => {
                self.nodes[index].x = x;
                self.nodes[index].y = y;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
