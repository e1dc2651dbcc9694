//! Pointer/wheel state machine
//!
//! Arbitrates between dragging a node, panning the canvas and zooming. Wheel
//! events zoom in every state; drag and pan are mutually exclusive.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::Viewport;
use crate::geometry::Point;
use crate::model::GraphModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Keyboard modifiers held during a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { alt: false };

    pub const ALT: Modifiers = Modifiers { alt: true };
}

/// Raw input, positions in canvas-relative screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown {
        position: Point,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        position: Point,
    },
    PointerUp {
        button: PointerButton,
    },
    Wheel {
        delta_y: f64,
        position: Point,
    },
}

/// Interaction behaviour switches
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionConfig {
    /// Pan with a plain primary-button drag on empty canvas
    pub pan_on_background: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    DraggingNode {
        node_id: String,
        /// Pointer minus node centre at grab time, model space
        grab_offset: Point,
    },
    Panning {
        /// Last pointer position, screen space
        last: Point,
    },
}

/// What the caller must do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Response {
    pub redraw: bool,
    /// Topology, scale or a dropped node changed what the layout should do
    pub wake_layout: bool,
}

impl Response {
    const NONE: Response = Response {
        redraw: false,
        wake_layout: false,
    };

    const REDRAW: Response = Response {
        redraw: true,
        wake_layout: false,
    };
}

/// Drag/pan/zoom controller
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    config: InteractionConfig,
    state: InteractionState,
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            state: InteractionState::Idle,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Id of the node being dragged, if any
    pub fn dragged_node(&self) -> Option<&str> {
        match &self.state {
            InteractionState::DraggingNode { node_id, .. } => Some(node_id),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged_node().is_some()
    }

    /// Drop any gesture in progress (the model was rebuilt underneath it)
    pub fn cancel(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Feed one input event through the state machine
    pub fn handle(
        &mut self,
        event: InputEvent,
        model: &mut GraphModel,
        viewport: &mut Viewport,
    ) -> Response {
        match event {
            InputEvent::Wheel { delta_y, position } => {
                let changed = viewport.zoom(delta_y, position);
                Response {
                    redraw: changed,
                    wake_layout: changed,
                }
            }
            InputEvent::PointerDown {
                position,
                button,
                modifiers,
            } => self.pointer_down(position, button, modifiers, model, viewport),
            InputEvent::PointerMove { position } => self.pointer_move(position, model, viewport),
            InputEvent::PointerUp { .. } => self.pointer_up(),
        }
    }

    fn pointer_down(
        &mut self,
        position: Point,
        button: PointerButton,
        modifiers: Modifiers,
        model: &GraphModel,
        viewport: &Viewport,
    ) -> Response {
        if self.state != InteractionState::Idle {
            return Response::NONE;
        }

        let pan = match button {
            PointerButton::Middle => true,
            PointerButton::Primary if modifiers.alt => true,
            PointerButton::Primary => {
                let pointer = viewport.screen_to_model(position);
                if let Some(index) = node_at(model, pointer) {
                    let node = &model.nodes()[index];
                    debug!(node = %node.id, "drag start");
                    self.state = InteractionState::DraggingNode {
                        node_id: node.id.clone(),
                        grab_offset: Point::new(pointer.x - node.x, pointer.y - node.y),
                    };
                    return Response::NONE;
                }
                self.config.pan_on_background
            }
            PointerButton::Secondary => false,
        };

        if pan {
            self.state = InteractionState::Panning { last: position };
        }
        Response::NONE
    }

    fn pointer_move(
        &mut self,
        position: Point,
        model: &mut GraphModel,
        viewport: &mut Viewport,
    ) -> Response {
        match &mut self.state {
            InteractionState::Idle => Response::NONE,
            InteractionState::DraggingNode {
                node_id,
                grab_offset,
            } => {
                let pointer = viewport.screen_to_model(position);
                model.set_position(node_id, pointer.x - grab_offset.x, pointer.y - grab_offset.y);
                Response::REDRAW
            }
            InteractionState::Panning { last } => {
                viewport.pan(position.x - last.x, position.y - last.y);
                *last = position;
                Response::REDRAW
            }
        }
    }

    fn pointer_up(&mut self) -> Response {
        match std::mem::take(&mut self.state) {
            InteractionState::DraggingNode { node_id, .. } => {
                debug!(node = %node_id, "drag end");
                Response {
                    redraw: true,
                    wake_layout: true,
                }
            }
            // Boundaries followed the pan; let the layout re-confine nodes
            InteractionState::Panning { .. } => Response {
                redraw: false,
                wake_layout: true,
            },
            InteractionState::Idle => Response::NONE,
        }
    }
}

/// First node, in enumeration order, whose hit circle contains `pointer`
pub fn node_at(model: &GraphModel, pointer: Point) -> Option<usize> {
    model
        .nodes()
        .iter()
        .position(|node| pointer.distance_sq(node.position()) < node.radius * node.radius)
}
