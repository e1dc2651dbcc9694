//! nodeviz - An interactive node/edge graph visualizer core.
//!
//! This crate owns the graph model, a force-directed layout, the viewport and
//! pointer interaction, and graph persistence. Drawing and UI are delegated to
//! [`snapshot::Renderer`] and [`snapshot::UiShell`] implementations.

pub mod camera;
pub mod config;
pub mod geometry;
pub mod headless;
pub mod inspector;
pub mod interaction;
pub mod io;
pub mod model;
pub mod scheduler;
pub mod simulation;
pub mod snapshot;
pub mod visualizer;
