//! Frozen frames handed to external collaborators
//!
//! The core never draws or touches UI. Each redraw builds a [`RenderSnapshot`]
//! for the [`Renderer`]; structural and filter changes build
//! [`InspectorTables`] for the [`UiShell`].

use std::fmt;

use serde::Serialize;

use crate::camera::{ViewTransform, Viewport};
use crate::geometry::{Boundaries, Point};
use crate::inspector::InspectorTables;
use crate::model::GraphModel;
use crate::simulation::LabelCenter;

/// Which node and/or edge is hovered in the inspector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HighlightState {
    pub node: Option<String>,
    /// Index into the edge list
    pub edge: Option<usize>,
}

impl HighlightState {
    pub fn clear(&mut self) {
        self.node = None;
        self.edge = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    /// Model space
    pub position: Point,
    pub radius: f64,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
    pub index: usize,
    pub source: String,
    pub target: String,
    pub label: String,
    pub from: Point,
    pub to: Point,
    pub highlighted: bool,
}

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub transform: ViewTransform,
    pub boundaries: Boundaries,
    pub label_centers: Vec<LabelCenter>,
    pub highlight: HighlightState,
}

impl RenderSnapshot {
    /// Freeze the current state. An edge is highlighted when it is the
    /// hovered edge or touches the hovered node.
    pub fn capture(
        model: &GraphModel,
        viewport: &Viewport,
        label_centers: &[LabelCenter],
        highlight: &HighlightState,
    ) -> Self {
        let hovered_node = highlight.node.as_deref();

        let nodes = model
            .nodes()
            .iter()
            .map(|node| NodeView {
                id: node.id.clone(),
                label: node.label.clone(),
                position: node.position(),
                radius: node.radius,
                highlighted: hovered_node == Some(node.id.as_str()),
            })
            .collect();

        let edges = model
            .edges()
            .iter()
            .enumerate()
            .filter_map(|(index, edge)| {
                let from = model.node(&edge.source)?.position();
                let to = model.node(&edge.target)?.position();
                let touches_hovered = hovered_node
                    .is_some_and(|id| edge.source == id || edge.target == id);
                Some(EdgeView {
                    index,
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    label: edge.label.clone(),
                    from,
                    to,
                    highlighted: highlight.edge == Some(index) || touches_hovered,
                })
            })
            .collect();

        Self {
            nodes,
            edges,
            transform: viewport.transform(),
            boundaries: *viewport.boundaries(),
            label_centers: label_centers.to_vec(),
            highlight: highlight.clone(),
        }
    }
}

/// Draws frames. Implementations must not keep state between frames that
/// the snapshot already carries.
pub trait Renderer {
    fn render(&mut self, frame: &RenderSnapshot);
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NotificationLevel::Success => write!(f, "{}", self.message),
            NotificationLevel::Error => write!(f, "error: {}", self.message),
        }
    }
}

/// Inspector tables and user notifications
pub trait UiShell {
    fn show_tables(&mut self, tables: &InspectorTables);
    fn notify(&mut self, notification: &Notification);
}
