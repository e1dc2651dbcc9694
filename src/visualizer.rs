//! The visualizer facade
//!
//! Owns the graph, layout engine, viewport, interaction controller and
//! scheduler, and is the only thing that calls the renderer and UI shell.
//! All mutation flows through here on a single logical thread; callers pass
//! the current `Instant` so timing stays deterministic.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::camera::Viewport;
use crate::config::AppConfig;
use crate::geometry::Boundaries;
use crate::inspector::InspectorTables;
use crate::interaction::{InputEvent, InteractionController};
use crate::io::{FormatRegistry, GraphRecord, IoResult, LoadSummary};
use crate::model::{DEFAULT_NODE_RADIUS, GraphModel};
use crate::scheduler::{Due, SimulationScheduler};
use crate::simulation::{LayoutEngine, SimulationParams, TickOutcome};
use crate::snapshot::{HighlightState, Notification, RenderSnapshot, Renderer, UiShell};

pub struct Visualizer<R: Renderer, S: UiShell> {
    model: GraphModel,
    engine: LayoutEngine,
    viewport: Viewport,
    interaction: InteractionController,
    scheduler: SimulationScheduler,
    formats: FormatRegistry,
    highlight: HighlightState,
    filter: String,
    renderer: R,
    shell: S,
}

impl<R: Renderer, S: UiShell> Visualizer<R, S> {
    /// Build a visualizer and start its auto-update timer at `now`
    pub fn new(config: &AppConfig, renderer: R, shell: S, now: Instant) -> Self {
        let params = config.simulation.clone().sanitized();
        let viewport = Viewport::new(
            config.canvas.width,
            config.canvas.height,
            params.min_scale,
            params.max_scale,
        );
        let model = match config.seed {
            Some(seed) => GraphModel::with_seed(seed),
            None => GraphModel::new(),
        };

        let mut visualizer = Self {
            model,
            engine: LayoutEngine::new(params),
            viewport,
            interaction: InteractionController::new(config.interaction.clone()),
            scheduler: SimulationScheduler::new(&config.scheduler),
            formats: FormatRegistry::with_defaults(),
            highlight: HighlightState::default(),
            filter: String::new(),
            renderer,
            shell,
        };
        visualizer.refresh_tables();
        visualizer.scheduler.start_auto_update(now);
        visualizer.scheduler.request_redraw(now);
        visualizer
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn params(&self) -> &SimulationParams {
        &self.engine.params
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// True once a tick has settled and nothing has woken the layout since
    pub fn is_settled(&self) -> bool {
        !self.scheduler.is_awake()
    }

    pub fn has_pending_redraw(&self) -> bool {
        self.scheduler.has_pending_redraw()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Region new nodes are placed in: the visible area inset by the padding
    /// plus one node radius
    pub fn spawn_area(&self) -> Boundaries {
        self.viewport
            .boundaries()
            .deflate(self.engine.params.boundary_padding + DEFAULT_NODE_RADIUS)
    }

    pub fn add_node(&mut self, id: impl ToString, label: impl ToString, now: Instant) {
        let spawn_area = self.spawn_area();
        self.model.add_node(id, label, &spawn_area);
        self.structure_changed(now);
    }

    /// Returns false (and changes nothing) if either endpoint is unknown
    pub fn add_edge(
        &mut self,
        source: impl ToString,
        target: impl ToString,
        label: impl ToString,
        now: Instant,
    ) -> bool {
        let inserted = self.model.add_edge(source, target, label);
        if inserted {
            self.structure_changed(now);
        }
        inserted
    }

    /// Remove everything and restart the simulation
    pub fn clear(&mut self, now: Instant) {
        self.scheduler.stop_auto_update();
        self.model.clear();
        self.reset_transient_state();
        self.structure_changed(now);
        self.scheduler.start_auto_update(now);
        info!("graph cleared");
    }

    /// Route one input event through the interaction controller
    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        let response = self
            .interaction
            .handle(event, &mut self.model, &mut self.viewport);
        if response.wake_layout {
            self.scheduler.wake();
        }
        if response.redraw {
            self.scheduler.request_redraw(now);
        }
    }

    /// Run whatever the scheduler says is due at `now`.
    ///
    /// A redraw requested by this call's tick is delivered on a later poll.
    pub fn poll(&mut self, now: Instant) -> Due {
        let due = self.scheduler.poll(now);

        if due.tick {
            let outcome = self.engine.tick(
                &mut self.model,
                self.viewport.boundaries(),
                self.interaction.is_dragging(),
            );
            match outcome {
                TickOutcome::Moving { .. } => {
                    self.viewport.recompute_boundaries();
                    self.scheduler.request_redraw(now);
                }
                TickOutcome::Settled { total_movement } => {
                    debug!(total_movement, "layout settled");
                    self.scheduler.sleep();
                    self.scheduler.request_redraw(now);
                }
                TickOutcome::Suspended => {}
            }
        }

        if due.redraw {
            let frame = self.snapshot();
            self.renderer.render(&frame);
        }

        due
    }

    /// Replace the simulation parameters. Scale limits are sanitized and the
    /// current scale is clamped into them.
    pub fn update_params(&mut self, params: SimulationParams, now: Instant) {
        let params = params.sanitized();
        self.viewport
            .set_scale_limits(params.min_scale, params.max_scale);
        debug!(?params, "simulation parameters updated");
        self.engine.params = params;
        self.scheduler.wake();
        self.scheduler.request_redraw(now);
    }

    pub fn resize(&mut self, width: f64, height: f64, now: Instant) {
        self.viewport.resize(width, height);
        self.scheduler.wake();
        self.scheduler.request_redraw(now);
    }

    /// Hover a node row (or leave it with `None`)
    pub fn hover_node(&mut self, id: Option<&str>, now: Instant) {
        self.highlight.node = id.map(str::to_string);
        self.scheduler.request_redraw(now);
    }

    /// Hover an edge row by index (or leave it with `None`)
    pub fn hover_edge(&mut self, index: Option<usize>, now: Instant) {
        self.highlight.edge = index;
        self.scheduler.request_redraw(now);
    }

    /// Filter the inspector tables. The filter survives table rebuilds.
    pub fn set_filter(&mut self, query: &str) {
        self.filter = query.to_string();
        self.refresh_tables();
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::capture(
            &self.model,
            &self.viewport,
            self.engine.label_centers(),
            &self.highlight,
        )
    }

    pub fn tables(&self) -> InspectorTables {
        InspectorTables::build(&self.model, &self.filter)
    }

    pub fn save_record(&self) -> GraphRecord {
        GraphRecord::from_model(&self.model)
    }

    /// Save the graph; the format follows the file extension
    pub fn save_to(&mut self, path: &Path) -> IoResult<()> {
        let record = self.save_record();
        match self.formats.write_graph(path, &record) {
            Ok(()) => {
                info!(path = %path.display(), nodes = record.nodes.len(), "graph saved");
                self.shell.notify(&Notification::success("Graph saved"));
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "save failed");
                self.shell
                    .notify(&Notification::error(format!("Error saving graph: {e}")));
                Err(e)
            }
        }
    }

    /// Replace the graph with `record` and restart the simulation
    pub fn load_record(&mut self, record: &GraphRecord, now: Instant) -> LoadSummary {
        self.scheduler.stop_auto_update();
        let spawn_area = self.spawn_area();
        let summary = record.load_into(&mut self.model, &spawn_area);
        self.reset_transient_state();
        self.structure_changed(now);
        self.scheduler.start_auto_update(now);

        if summary.dropped_edges > 0 {
            warn!(dropped = summary.dropped_edges, "edges with unknown endpoints dropped");
        }
        info!(%summary, "graph loaded");
        self.shell
            .notify(&Notification::success(format!("Graph loaded: {summary}")));
        summary
    }

    /// Load a graph file. On error the current graph is left untouched.
    pub fn load_from(&mut self, path: &Path, now: Instant) -> IoResult<LoadSummary> {
        match self.formats.read_graph(path) {
            Ok(record) => Ok(self.load_record(&record, now)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "load failed");
                self.shell
                    .notify(&Notification::error(format!("Error loading graph: {e}")));
                Err(e)
            }
        }
    }

    fn reset_transient_state(&mut self) {
        self.engine.reset();
        self.interaction.cancel();
        self.highlight.clear();
    }

    fn structure_changed(&mut self, now: Instant) {
        self.scheduler.wake();
        self.refresh_tables();
        self.scheduler.request_redraw(now);
    }

    fn refresh_tables(&mut self) {
        let tables = self.tables();
        self.shell.show_tables(&tables);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::headless::{FrameLog, LogShell};
    use crate::interaction::{Modifiers, PointerButton};
    use crate::snapshot::NotificationLevel;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn visualizer(t0: Instant) -> Visualizer<FrameLog, LogShell> {
        let config = AppConfig {
            seed: Some(11),
            ..Default::default()
        };
        Visualizer::new(&config, FrameLog::default(), LogShell::default(), t0)
    }

    fn triangle(vis: &mut Visualizer<FrameLog, LogShell>, now: Instant) {
        vis.add_node("a", "Person", now);
        vis.add_node("b", "Person", now);
        vis.add_node("c", "Company", now);
        vis.add_edge("a", "b", "knows", now);
        vis.add_edge("b", "c", "works_at", now);
    }

    #[test]
    fn starts_running_with_empty_tables() {
        let t0 = Instant::now();
        let vis = visualizer(t0);

        assert!(vis.is_running());
        assert!(!vis.is_settled());
        let tables = vis.shell().last_tables().unwrap();
        assert!(tables.nodes.is_empty());
    }

    #[test]
    fn new_nodes_spawn_inside_padded_visible_area() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);

        let area = vis.spawn_area();
        assert_eq!(area, Boundaries::new(80.0, 720.0, 80.0, 520.0));
        for node in vis.model().nodes() {
            assert!(area.contains_circle(node.x, node.y, 0.0));
        }
    }

    #[test]
    fn structural_changes_refresh_tables() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);

        let tables = vis.shell().last_tables().unwrap();
        assert_eq!(tables.nodes.len(), 3);
        assert_eq!(tables.edges.len(), 2);
        assert!(!vis.add_edge("a", "missing", "x", t0));
    }

    #[test]
    fn poll_ticks_and_renders() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);
        let before = vis.model().node("a").unwrap().position();

        let first = vis.poll(t0);
        assert!(first.redraw && !first.tick);
        assert_eq!(vis.renderer().frames(), 1);

        let second = vis.poll(t0 + ms(100));
        assert!(second.tick);
        assert_ne!(vis.model().node("a").unwrap().position(), before);
        assert!(vis.has_pending_redraw());

        vis.poll(t0 + ms(101));
        assert_eq!(vis.renderer().frames(), 2);
        assert_eq!(vis.renderer().last_frame().unwrap().nodes.len(), 3);
    }

    #[test]
    fn layout_settles_and_sleeps_until_woken() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);

        let mut now = t0;
        for _ in 0..20_000 {
            now += ms(100);
            vis.poll(now);
            if vis.is_settled() {
                break;
            }
        }
        assert!(vis.is_settled());
        assert!(vis.is_running());

        let frozen = vis.model().node("a").unwrap().position();
        vis.poll(now + ms(100));
        assert_eq!(vis.model().node("a").unwrap().position(), frozen);

        vis.add_node("d", "Person", now);
        assert!(!vis.is_settled());
    }

    #[test]
    fn clear_resets_state_and_keeps_timer_running() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);
        vis.hover_node(Some("a"), t0);
        vis.set_filter("person");

        vis.clear(t0 + ms(5));
        vis.clear(t0 + ms(6));

        assert!(vis.model().is_empty());
        assert_eq!(vis.model().edge_count(), 0);
        assert_eq!(*vis.highlight(), HighlightState::default());
        assert!(vis.is_running());
        assert!(!vis.is_settled());
        assert!(vis.tables().nodes.is_empty());
    }

    #[test]
    fn drag_suspends_layout_and_release_wakes_it() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        vis.add_node("a", "A", t0);
        vis.add_node("b", "A", t0);
        vis.model.set_position("a", 200.0, 200.0);
        vis.model.set_position("b", 500.0, 300.0);

        vis.handle_input(
            InputEvent::PointerDown {
                position: Point::new(200.0, 200.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            },
            t0,
        );
        vis.handle_input(
            InputEvent::PointerMove {
                position: Point::new(250.0, 220.0),
            },
            t0,
        );
        let b_before = vis.model().node("b").unwrap().position();
        vis.poll(t0 + ms(100));

        assert_eq!(vis.model().node("a").unwrap().position(), Point::new(250.0, 220.0));
        assert_eq!(vis.model().node("b").unwrap().position(), b_before);

        vis.handle_input(
            InputEvent::PointerUp {
                button: PointerButton::Primary,
            },
            t0 + ms(150),
        );
        assert!(!vis.interaction().is_dragging());
        assert!(!vis.is_settled());
    }

    #[test]
    fn panned_view_confines_the_layout_to_what_is_visible() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);

        let mut now = t0;
        for _ in 0..20_000 {
            now += ms(100);
            vis.poll(now);
            if vis.is_settled() {
                break;
            }
        }
        assert!(vis.is_settled());

        vis.handle_input(
            InputEvent::PointerDown {
                position: Point::new(100.0, 300.0),
                button: PointerButton::Middle,
                modifiers: Modifiers::NONE,
            },
            now,
        );
        vis.handle_input(
            InputEvent::PointerMove {
                position: Point::new(500.0, 300.0),
            },
            now,
        );
        vis.handle_input(
            InputEvent::PointerUp {
                button: PointerButton::Middle,
            },
            now,
        );

        let visible = Boundaries::new(-400.0, 400.0, 0.0, 600.0);
        assert_eq!(*vis.viewport().boundaries(), visible);
        assert_eq!(vis.snapshot().boundaries, visible);
        assert!(!vis.is_settled());

        vis.add_node("d", "Person", now);
        for _ in 0..5 {
            now += ms(100);
            vis.poll(now);
        }
        for node in vis.model().nodes() {
            assert!(
                visible.contains_circle(node.x, node.y, node.radius),
                "{} at ({}, {})",
                node.id,
                node.x,
                node.y
            );
        }
    }

    #[test]
    fn wheel_zoom_respects_updated_limits() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);

        vis.update_params(
            SimulationParams {
                min_scale: 0.0,
                max_scale: 1.5,
                ..Default::default()
            },
            t0,
        );
        assert_eq!(vis.params().min_scale, 0.1);

        for _ in 0..50 {
            vis.handle_input(
                InputEvent::Wheel {
                    delta_y: -1.0,
                    position: Point::new(400.0, 300.0),
                },
                t0,
            );
        }
        assert_eq!(vis.viewport().scale(), 1.5);
    }

    #[test]
    fn hover_highlights_reach_the_renderer() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);

        vis.hover_node(Some("c"), t0);
        vis.poll(t0);
        let frame = vis.renderer().last_frame().unwrap();
        assert!(frame.nodes[2].highlighted);
        assert!(frame.edges[1].highlighted);

        vis.hover_node(None, t0);
        vis.hover_edge(Some(0), t0);
        assert_eq!(vis.snapshot().highlight.edge, Some(0));
        assert!(vis.snapshot().edges[0].highlighted);
    }

    #[test]
    fn filter_survives_structural_changes() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);

        vis.set_filter("company");
        vis.add_node("d", "Company", t0);

        let tables = vis.shell().last_tables().unwrap();
        let visible: Vec<_> = tables.visible_nodes().map(|row| row.id.as_str()).collect();
        assert_eq!(visible, ["c", "d"]);
        assert_eq!(vis.model().len(), 4);
    }

    #[test]
    fn save_and_load_round_trip_through_files() {
        let t0 = Instant::now();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);
        vis.save_to(&path).unwrap();
        let saved = vis.save_record();

        let mut other = visualizer(t0);
        let summary = other.load_from(&path, t0).unwrap();

        assert_eq!(summary.nodes, 3);
        assert_eq!(other.save_record(), saved);
        assert!(other.is_running());
        let note = other.shell().notifications().last().unwrap();
        assert_eq!(note.level, NotificationLevel::Success);
    }

    #[test]
    fn failed_load_keeps_current_graph_and_notifies() {
        let t0 = Instant::now();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"nodes\": [{\"id\": ").unwrap();

        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);
        let before = vis.save_record();

        assert!(vis.load_from(&path, t0).is_err());

        assert_eq!(vis.save_record(), before);
        assert!(vis.is_running());
        let note = vis.shell().notifications().last().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
    }

    #[test]
    fn non_finite_coordinates_are_rejected_on_load() {
        let t0 = Instant::now();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nan.yaml");
        std::fs::write(&path, "nodes:\n  - id: a\n    x: .nan\n    y: 10\n").unwrap();

        let mut vis = visualizer(t0);
        triangle(&mut vis, t0);
        let before = vis.save_record();

        assert!(vis.load_from(&path, t0).is_err());

        assert_eq!(vis.save_record(), before);
        let note = vis.shell().notifications().last().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
    }

    #[test]
    fn resize_moves_spawn_area() {
        let t0 = Instant::now();
        let mut vis = visualizer(t0);

        vis.resize(1000.0, 1000.0, t0);

        assert_eq!(vis.spawn_area(), Boundaries::new(80.0, 920.0, 80.0, 920.0));
    }
}
