use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use labelscope_client::LabelServerClient;
use labelscope_core::models::{Segment, SegmentDescriptor, SegmentationMask, ServerInfo};
use labelscope_core::{AppConfig, HostContext, PointSession};

pub mod auto_seg;
pub mod smart_edit;

pub use auto_seg::AutoSegmentationTab;
pub use smart_edit::SmartEditTab;

// ─── Events ───────────────────────────────────────────────────────────────────

/// Identifier for an action tab in the controller's dispatch map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TabId {
    AutoSegmentation,
    SmartEdit,
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoSegmentation => write!(f, "auto segmentation"),
            Self::SmartEdit => write!(f, "smart edit"),
        }
    }
}

/// Segment lifecycle notifications fanned out by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    Created(Segment),
    Updated(Segment),
    Deleted(u32),
    Selected(u32),
}

/// A point-probe click delivered by the host's active tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeEvent {
    pub world: [f64; 3],
    /// Segment the host attributes the click to.
    pub segment_id: u32,
}

/// What a tab produced from one event.
#[derive(Debug)]
pub enum TabOutcome {
    None,
    /// A decoded mask ready for the host's segmentation loader.
    Mask(SegmentationMask),
}

// ─── Contract ─────────────────────────────────────────────────────────────────

/// Everything a tab may touch while handling an event, borrowed from the
/// controller for the duration of one dispatch. The session reference is the
/// only mutable state a tab sees.
pub struct TabContext<'a> {
    pub host: &'a HostContext,
    pub client: &'a LabelServerClient,
    pub session: &'a mut PointSession,
    pub info: Option<&'a ServerInfo>,
    pub model: Option<&'a str>,
    pub config: &'a AppConfig,
}

/// Polymorphic action-tab contract.
///
/// The controller guarantees that at most one tab is active and that
/// `on_leave` of the previous tab runs before `on_enter` of the next.
#[async_trait]
pub trait ActionTab: Send {
    fn id(&self) -> TabId;

    async fn on_enter(&mut self, cx: &mut TabContext<'_>) -> Result<()>;

    async fn on_leave(&mut self, cx: &mut TabContext<'_>) -> Result<()>;

    async fn on_segment_event(
        &mut self,
        _event: &SegmentEvent,
        _cx: &mut TabContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_select_model(&mut self, _model: &str, _cx: &mut TabContext<'_>) -> Result<()> {
        Ok(())
    }

    /// A probe click while this tab is active.
    async fn on_probe(
        &mut self,
        _event: ProbeEvent,
        _cx: &mut TabContext<'_>,
    ) -> Result<TabOutcome> {
        Ok(TabOutcome::None)
    }

    /// Explicit run request, the toolbar-button analogue.
    async fn on_run(&mut self, _cx: &mut TabContext<'_>) -> Result<TabOutcome> {
        Ok(TabOutcome::None)
    }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

/// Display descriptors for the labels a model emits, with the session's
/// active segment flagged. Falls back to the session's own segments when the
/// catalog has no labels for the model.
pub(crate) fn segment_descriptors(
    info: Option<&ServerInfo>,
    model: &str,
    session: &PointSession,
) -> Vec<SegmentDescriptor> {
    let active_id = session.active_segment().map(|s| s.id);

    let labels = info
        .and_then(|i| i.model(model))
        .map(|m| m.labels.entries())
        .unwrap_or_default();

    if labels.is_empty() {
        return session
            .segments()
            .map(|s| SegmentDescriptor {
                label: s.id,
                name: s.name.clone(),
                color: s.color,
                active: active_id == Some(s.id),
            })
            .collect();
    }

    labels
        .into_iter()
        .map(|(id, name)| {
            let color = session
                .segments()
                .find(|s| s.name == name)
                .map(|s| s.color)
                .unwrap_or_else(|| Segment::new(id, name.clone()).color);
            SegmentDescriptor {
                label: id,
                name,
                color,
                active: active_id == Some(id),
            }
        })
        .collect()
}
