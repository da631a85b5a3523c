//! Services the viewer host provides to the panel.
//!
//! The host owns rendering, tools, and annotation display; the panel reaches
//! them only through these traits, injected once at construction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::ImageTransform;
use crate::models::SegmentationMask;

// ─── Notifications ─────────────────────────────────────────

/// Severity of a transient user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
    Success,
}

/// Transient notifications, rendered by the host.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: MessageLevel, message: &str);
}

// ─── Viewport ──────────────────────────────────────────────

/// The host viewer's grouping of images belonging to one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySet {
    /// Stable identifier the host uses to address this series.
    pub uid: String,
    /// Identifier of the same volume on the annotation server.
    pub image_id: String,
    /// Voxel counts per axis, fastest-varying axis first.
    pub shape: [usize; 3],
    pub transform: ImageTransform,
}

/// Read access to the host's viewport state.
pub trait ViewportProvider: Send + Sync {
    fn active_display_set(&self) -> Option<DisplaySet>;
}

// ─── Commands ──────────────────────────────────────────────

/// Commands the panel dispatches into the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    /// Arm the host's point-probe tool so clicks reach the panel.
    ActivateProbeTool,
    DeactivateProbeTool,
    /// Remove every probe annotation from the host's annotation store.
    ClearProbeAnnotations,
    /// Load a mask into the display set's segmentation state. Ownership of
    /// the buffer transfers to the host.
    LoadSegmentation {
        display_set_uid: String,
        mask: SegmentationMask,
    },
    TriggerRender,
}

impl HostCommand {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ActivateProbeTool => "activate_probe_tool",
            Self::DeactivateProbeTool => "deactivate_probe_tool",
            Self::ClearProbeAnnotations => "clear_probe_annotations",
            Self::LoadSegmentation { .. } => "load_segmentation",
            Self::TriggerRender => "trigger_render",
        }
    }
}

/// Host command dispatch.
pub trait CommandSink: Send + Sync {
    fn run(&self, command: HostCommand) -> Result<()>;
}

// ─── HostContext ───────────────────────────────────────────

/// Host services injected at construction. Never reached via globals.
#[derive(Clone)]
pub struct HostContext {
    pub notifier: Arc<dyn Notifier>,
    pub viewport: Arc<dyn ViewportProvider>,
    pub commands: Arc<dyn CommandSink>,
}

impl HostContext {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        viewport: Arc<dyn ViewportProvider>,
        commands: Arc<dyn CommandSink>,
    ) -> Self {
        Self {
            notifier,
            viewport,
            commands,
        }
    }

    pub fn notify(&self, level: MessageLevel, message: &str) {
        self.notifier.notify(level, message);
    }

    pub fn run(&self, command: HostCommand) -> Result<()> {
        self.commands.run(command)
    }

    pub fn active_display_set(&self) -> Option<DisplaySet> {
        self.viewport.active_display_set()
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext").finish_non_exhaustive()
    }
}
