//! Collaborators for running without a display
//!
//! [`FrameLog`] and [`LogShell`] keep the last frame and tables and report
//! through `tracing`. [`run_until_settled`] drives a visualizer on tokio
//! timers.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::inspector::InspectorTables;
use crate::snapshot::{Notification, NotificationLevel, RenderSnapshot, Renderer, UiShell};
use crate::visualizer::Visualizer;

/// Renderer that counts frames and keeps the latest one
#[derive(Debug, Default)]
pub struct FrameLog {
    frames: usize,
    last: Option<RenderSnapshot>,
}

impl FrameLog {
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn last_frame(&self) -> Option<&RenderSnapshot> {
        self.last.as_ref()
    }
}

impl Renderer for FrameLog {
    fn render(&mut self, frame: &RenderSnapshot) {
        self.frames += 1;
        debug!(
            frame = self.frames,
            nodes = frame.nodes.len(),
            edges = frame.edges.len(),
            scale = frame.transform.scale,
            "render"
        );
        self.last = Some(frame.clone());
    }
}

/// UI shell that logs notifications and keeps the latest tables
#[derive(Debug, Default)]
pub struct LogShell {
    tables: Option<InspectorTables>,
    notifications: Vec<Notification>,
}

impl LogShell {
    pub fn last_tables(&self) -> Option<&InspectorTables> {
        self.tables.as_ref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }
}

impl UiShell for LogShell {
    fn show_tables(&mut self, tables: &InspectorTables) {
        debug!(
            nodes = tables.nodes.len(),
            edges = tables.edges.len(),
            "tables updated"
        );
        self.tables = Some(tables.clone());
    }

    fn notify(&mut self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Success => info!("{}", notification.message),
            NotificationLevel::Error => warn!("{}", notification.message),
        }
        self.notifications.push(notification.clone());
    }
}

/// Poll `visualizer` on its own deadlines until the layout settles and the
/// final frame is drawn, or `limit` elapses. Returns whether it settled.
pub async fn run_until_settled<R: Renderer, S: UiShell>(
    visualizer: &mut Visualizer<R, S>,
    limit: Duration,
) -> bool {
    let deadline = Instant::now() + limit;

    loop {
        let now = Instant::now();
        visualizer.poll(now);

        if visualizer.is_settled() && !visualizer.has_pending_redraw() {
            return true;
        }
        if now >= deadline {
            return false;
        }

        let wake_at = visualizer
            .next_deadline()
            .map_or(deadline, |next| next.min(deadline));
        tokio::time::sleep_until(tokio::time::Instant::from_std(wake_at)).await;
    }
}
