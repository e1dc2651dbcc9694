//! Force-directed layout engine
//!
//! One tick sums forces into node velocities, then integrates with
//! semi-implicit Euler: label-centroid gravity, a central pull/push, pairwise
//! repulsion, edge springs, damping, boundary clamp.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry::{Boundaries, Point};
use crate::model::GraphModel;

/// Extra separation added to the sum of radii before overlap repulsion kicks in
const OVERLAP_PADDING: f64 = 60.0;
/// Length scale of the exponential overlap boost
const OVERLAP_FALLOFF: f64 = 20.0;
/// Repulsion multiplier for pairs not joined by an edge
const DISCONNECTED_REPULSION: f64 = 1.2;
/// Spring strength multiplier for edges between differently labeled nodes
const CROSS_LABEL_SPRING: f64 = 0.02;

/// Tunable simulation parameters. Changes affect subsequent ticks only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationParams {
    /// Spring rest length
    pub spring_length: f64,
    pub spring_strength: f64,
    /// Inverse-square repulsion numerator
    pub repulsion: f64,
    /// Velocity retained per tick
    pub damping: f64,
    pub center_force: f64,
    /// Pull towards the centroid of nodes sharing a label
    pub label_force: f64,
    /// Inset from the boundaries where new nodes may spawn
    pub boundary_padding: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Total movement at or below which the layout counts as settled
    pub stop_threshold: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            spring_length: 100.0,
            spring_strength: 0.1,
            repulsion: 1000.0,
            damping: 0.5,
            center_force: 0.1,
            label_force: 0.2,
            boundary_padding: 50.0,
            min_scale: 0.1,
            max_scale: 5.0,
            stop_threshold: 0.1,
        }
    }
}

impl SimulationParams {
    /// Repair scale limits so that `0 < min_scale <= max_scale`.
    ///
    /// Runtime updates are clamped rather than rejected.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            self.min_scale = defaults.min_scale;
        }
        if !self.max_scale.is_finite() {
            self.max_scale = defaults.max_scale;
        }
        if self.max_scale < self.min_scale {
            self.max_scale = self.min_scale;
        }
        self
    }
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A node is being dragged; nothing moved
    Suspended,
    /// Movement above the stop threshold; another tick is wanted
    Moving { total_movement: f64 },
    /// Movement at or below the stop threshold
    Settled { total_movement: f64 },
}

impl TickOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, TickOutcome::Settled { .. })
    }
}

/// Result of [`LayoutEngine::run_to_convergence`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    pub ticks: usize,
    pub settled: bool,
    pub total_movement: f64,
}

/// Centroid of all nodes sharing one label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCenter {
    pub label: String,
    pub position: Point,
    pub count: usize,
}

/// Magnitude of the repulsive force between two nodes `distance` apart.
///
/// Monotonically non-increasing in `distance`. Zero distance counts as 1.
pub fn repulsion_force(distance: f64, r1: f64, r2: f64, connected: bool, repulsion: f64) -> f64 {
    let distance = distance.max(1.0);
    let min_distance = r1 + r2 + OVERLAP_PADDING;

    let mut force = repulsion / (distance * distance);
    if !connected {
        force *= DISCONNECTED_REPULSION;
    }
    if distance < min_distance {
        force *= ((min_distance - distance) / OVERLAP_FALLOFF).exp();
    }
    force.min(repulsion * 2.0)
}

/// CPU force simulation over a [`GraphModel`]
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    pub params: SimulationParams,
    label_centers: Vec<LabelCenter>,
}

impl LayoutEngine {
    pub fn new(params: SimulationParams) -> Self {
        Self {
            params,
            label_centers: Vec::new(),
        }
    }

    /// Label centroids computed by the most recent tick, in first-seen order
    pub fn label_centers(&self) -> &[LabelCenter] {
        &self.label_centers
    }

    /// Forget label centroids (after the model is cleared)
    pub fn reset(&mut self) {
        self.label_centers.clear();
    }

    /// Run one simulation tick.
    ///
    /// While `dragging` the whole force pass is skipped so the dragged node
    /// follows the pointer exactly.
    pub fn tick(
        &mut self,
        model: &mut GraphModel,
        boundaries: &Boundaries,
        dragging: bool,
    ) -> TickOutcome {
        if dragging {
            return TickOutcome::Suspended;
        }

        reset_non_finite(model, boundaries.center());
        self.compute_label_centers(model);
        self.apply_central_forces(model, boundaries);
        self.apply_many_body_force(model);
        self.apply_link_force(model);
        let total_movement = self.integrate(model, boundaries);

        let outcome = if total_movement > self.params.stop_threshold {
            TickOutcome::Moving { total_movement }
        } else {
            TickOutcome::Settled { total_movement }
        };
        trace!(nodes = model.len(), total_movement, ?outcome, "layout tick");
        outcome
    }

    /// Tick until settled or `max_ticks` is reached
    pub fn run_to_convergence(
        &mut self,
        model: &mut GraphModel,
        boundaries: &Boundaries,
        max_ticks: usize,
    ) -> Convergence {
        let mut result = Convergence {
            ticks: 0,
            settled: false,
            total_movement: 0.0,
        };

        for _ in 0..max_ticks {
            result.ticks += 1;
            match self.tick(model, boundaries, false) {
                TickOutcome::Settled { total_movement } => {
                    result.total_movement = total_movement;
                    result.settled = true;
                    break;
                }
                TickOutcome::Moving { total_movement } => {
                    result.total_movement = total_movement;
                }
                TickOutcome::Suspended => break,
            }
        }
        result
    }

    fn compute_label_centers(&mut self, model: &GraphModel) {
        self.label_centers.clear();
        let mut by_label: HashMap<&str, usize> = HashMap::new();

        for node in model.nodes() {
            let index = *by_label.entry(node.label.as_str()).or_insert_with(|| {
                self.label_centers.push(LabelCenter {
                    label: node.label.clone(),
                    position: Point::default(),
                    count: 0,
                });
                self.label_centers.len() - 1
            });
            let center = &mut self.label_centers[index];
            center.position.x += node.x;
            center.position.y += node.y;
            center.count += 1;
        }

        for center in &mut self.label_centers {
            center.position.x /= center.count as f64;
            center.position.y /= center.count as f64;
        }
    }

    /// Centre gravity, centre repulsion and label-cluster gravity
    fn apply_central_forces(&self, model: &mut GraphModel, boundaries: &Boundaries) {
        let center = boundaries.center();
        let centers: HashMap<&str, Point> = self
            .label_centers
            .iter()
            .map(|c| (c.label.as_str(), c.position))
            .collect();
        let center_force = self.params.center_force;
        let label_force = self.params.label_force;

        // Snapshot the label pull before borrowing nodes mutably
        let label_pulls: Vec<(f64, f64)> = model
            .nodes()
            .iter()
            .map(|node| match centers.get(node.label.as_str()) {
                Some(target) => (
                    (target.x - node.x) * label_force,
                    (target.y - node.y) * label_force,
                ),
                None => (0.0, 0.0),
            })
            .collect();

        for (node, (pull_x, pull_y)) in model.nodes_mut().iter_mut().zip(label_pulls) {
            let dx = center.x - node.x;
            let dy = center.y - node.y;
            let dist = (dx * dx + dy * dy).sqrt().max(1.0);

            let gravity = center_force * dist / 100.0;
            let push = center_force * 1000.0 / (dist * dist);
            let net = gravity - push;

            node.vx += dx / dist * net;
            node.vy += dy / dist * net;

            // Linear spring: unit vector times label_force * distance
            node.vx += pull_x;
            node.vy += pull_y;
        }
    }

    /// Apply repulsion between all node pairs
    fn apply_many_body_force(&self, model: &mut GraphModel) {
        let connected = connected_pairs(model);
        let repulsion = self.params.repulsion;
        let nodes = model.nodes_mut();
        let n = nodes.len();

        for i in 0..n {
            for j in (i + 1)..n {
                let mut dx = nodes[j].x - nodes[i].x;
                let mut dy = nodes[j].y - nodes[i].y;
                let mut dist = (dx * dx + dy * dy).sqrt();

                // Coincident nodes: push apart along x
                if dist == 0.0 {
                    dx = 1.0;
                    dy = 0.0;
                    dist = 1.0;
                }

                let force = repulsion_force(
                    dist,
                    nodes[i].radius,
                    nodes[j].radius,
                    connected.contains(&(i, j)),
                    repulsion,
                );

                let fx = dx / dist * force;
                let fy = dy / dist * force;

                nodes[i].vx -= fx;
                nodes[i].vy -= fy;
                nodes[j].vx += fx;
                nodes[j].vy += fy;
            }
        }
    }

    /// Apply spring force between connected nodes
    fn apply_link_force(&self, model: &mut GraphModel) {
        let links: Vec<(usize, usize)> = model
            .edges()
            .iter()
            .filter_map(|edge| Some((model.node_index(&edge.source)?, model.node_index(&edge.target)?)))
            .collect();
        let nodes = model.nodes_mut();

        for (source, target) in links {
            let dx = nodes[target].x - nodes[source].x;
            let dy = nodes[target].y - nodes[source].y;
            let dist = (dx * dx + dy * dy).sqrt().max(1.0);

            let mut strength = self.params.spring_strength;
            if nodes[source].label != nodes[target].label {
                strength *= CROSS_LABEL_SPRING;
            }

            // Hooke's law: F = k * (x - x0)
            let force = (dist - self.params.spring_length) * strength;
            let fx = dx / dist * force;
            let fy = dy / dist * force;

            nodes[source].vx += fx;
            nodes[source].vy += fy;
            nodes[target].vx -= fx;
            nodes[target].vy -= fy;
        }
    }

    /// Damp, move and clamp every node. Returns total movement.
    fn integrate(&self, model: &mut GraphModel, boundaries: &Boundaries) -> f64 {
        let mut total_movement = 0.0;

        for node in model.nodes_mut() {
            node.vx *= self.params.damping;
            node.vy *= self.params.damping;
            if !(node.vx.is_finite() && node.vy.is_finite()) {
                node.vx = 0.0;
                node.vy = 0.0;
            }
            node.x += node.vx;
            node.y += node.vy;

            total_movement += node.vx.abs() + node.vy.abs();

            let (x, y) = boundaries.clamp_circle(node.x, node.y, node.radius);
            node.x = x;
            node.y = y;
        }

        total_movement
    }
}

/// Move nodes with a non-finite position to `center` and zero any
/// non-finite velocity
fn reset_non_finite(model: &mut GraphModel, center: Point) {
    for node in model.nodes_mut() {
        if !(node.x.is_finite() && node.y.is_finite()) {
            node.x = center.x;
            node.y = center.y;
            node.vx = 0.0;
            node.vy = 0.0;
        }
        if !(node.vx.is_finite() && node.vy.is_finite()) {
            node.vx = 0.0;
            node.vy = 0.0;
        }
    }
}

/// Index pairs `(low, high)` joined by at least one edge, computed once per tick
fn connected_pairs(model: &GraphModel) -> HashSet<(usize, usize)> {
    model
        .edges()
        .iter()
        .filter_map(|edge| {
            let a = model.node_index(&edge.source)?;
            let b = model.node_index(&edge.target)?;
            Some((a.min(b), a.max(b)))
        })
        .collect()
}
