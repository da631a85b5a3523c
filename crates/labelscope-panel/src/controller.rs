//! Top-level panel controller: owns connection settings, the model catalog,
//! the tab registry, and the point session.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use labelscope_client::LabelServerClient;
use labelscope_core::host::{HostCommand, HostContext, MessageLevel};
use labelscope_core::models::{Segment, SegmentationMask, ServerInfo};
use labelscope_core::{AppConfig, PointSession};

use crate::tabs::{
    ActionTab, AutoSegmentationTab, ProbeEvent, SegmentEvent, SmartEditTab, TabContext, TabId,
    TabOutcome,
};

/// Borrows the context fields of the controller without touching the tab
/// registry, so a tab can be dispatched while the context is alive.
macro_rules! tab_context {
    ($self:ident) => {
        TabContext {
            host: &$self.host,
            client: &$self.client,
            session: &mut $self.session,
            info: $self.info.as_ref(),
            model: $self.selected_model.as_deref(),
            config: &$self.config,
        }
    };
}

pub struct PanelController {
    host: HostContext,
    client: LabelServerClient,
    config: AppConfig,
    info: Option<ServerInfo>,
    info_fetched_at: Option<DateTime<Utc>>,
    selected_model: Option<String>,
    session: PointSession,
    tabs: BTreeMap<TabId, Box<dyn ActionTab>>,
    active_tab: Option<TabId>,
}

impl PanelController {
    /// Controller with the default tab registry.
    pub fn new(config: AppConfig, host: HostContext) -> Result<Self> {
        Self::with_tabs(
            config,
            host,
            vec![
                Box::new(AutoSegmentationTab::new()),
                Box::new(SmartEditTab::new()),
            ],
        )
    }

    /// Controller with an explicit tab registry.
    pub fn with_tabs(
        config: AppConfig,
        host: HostContext,
        tabs: Vec<Box<dyn ActionTab>>,
    ) -> Result<Self> {
        let client = LabelServerClient::with_params(
            &config.server.url,
            Duration::from_secs(config.server.timeout_secs),
        )?;
        let tabs = tabs.into_iter().map(|tab| (tab.id(), tab)).collect();

        Ok(Self {
            host,
            client,
            config,
            info: None,
            info_fetched_at: None,
            selected_model: None,
            session: PointSession::new(),
            tabs,
            active_tab: None,
        })
    }

    // ─── State access ─────────────────────────────────────

    pub fn server_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn info(&self) -> Option<&ServerInfo> {
        self.info.as_ref()
    }

    pub fn info_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.info_fetched_at
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    pub fn session(&self) -> &PointSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PointSession {
        &mut self.session
    }

    // ─── Connection ───────────────────────────────────────

    /// Fetch the server's capability metadata. A failed fetch leaves the
    /// current catalog untouched; the outcome surfaces as a notification.
    pub async fn connect(&mut self) {
        self.host.notify(
            MessageLevel::Info,
            &format!("Connecting to {}", self.client.base_url()),
        );

        match self.client.info().await {
            Ok(info) => {
                let models = info.models.len();
                self.info = Some(info);
                self.info_fetched_at = Some(Utc::now());
                self.host.notify(
                    MessageLevel::Success,
                    &format!("Connected: {models} models available"),
                );
            }
            Err(err) => {
                warn!(server = self.client.base_url(), error = %err, "info fetch failed");
                self.host.notify(
                    MessageLevel::Error,
                    &format!("Failed to reach annotation server: {err}"),
                );
            }
        }
    }

    // ─── Tab lifecycle ────────────────────────────────────

    /// Activate a tab. The previous tab's leave hook always runs before the
    /// new tab's enter hook; selecting the active tab again is a no-op.
    pub async fn select_tab(&mut self, id: TabId) -> Result<()> {
        if !self.tabs.contains_key(&id) {
            bail!("unknown tab: {id}");
        }
        if self.active_tab == Some(id) {
            return Ok(());
        }

        if let Some(previous) = self.active_tab.take() {
            self.dispatch_leave(previous).await?;
        }
        self.dispatch_enter(id).await?;
        self.active_tab = Some(id);
        Ok(())
    }

    /// Leave the active tab without entering another (panel unmount).
    pub async fn leave_active_tab(&mut self) -> Result<()> {
        if let Some(previous) = self.active_tab.take() {
            self.dispatch_leave(previous).await?;
        }
        Ok(())
    }

    async fn dispatch_enter(&mut self, id: TabId) -> Result<()> {
        let Some(tab) = self.tabs.get_mut(&id) else {
            bail!("unknown tab: {id}");
        };
        let mut cx = tab_context!(self);
        tab.on_enter(&mut cx).await
    }

    async fn dispatch_leave(&mut self, id: TabId) -> Result<()> {
        let Some(tab) = self.tabs.get_mut(&id) else {
            bail!("unknown tab: {id}");
        };
        let mut cx = tab_context!(self);
        tab.on_leave(&mut cx).await
    }

    // ─── Segment lifecycle ────────────────────────────────

    pub async fn on_segment_created(&mut self, segment: Segment) -> Result<()> {
        self.session.upsert_segment(segment.clone());
        self.forward_segment_event(SegmentEvent::Created(segment))
            .await
    }

    pub async fn on_segment_updated(&mut self, segment: Segment) -> Result<()> {
        self.session.upsert_segment(segment.clone());
        self.forward_segment_event(SegmentEvent::Updated(segment))
            .await
    }

    /// Deleting a segment also drops its collected points.
    pub async fn on_segment_deleted(&mut self, id: u32) -> Result<()> {
        self.session.remove_segment(id);
        self.forward_segment_event(SegmentEvent::Deleted(id)).await
    }

    pub async fn on_segment_selected(&mut self, id: u32) -> Result<()> {
        if self.session.set_active_segment(id).is_err() {
            self.host
                .notify(MessageLevel::Warning, &format!("Unknown segment: {id}"));
            return Ok(());
        }
        self.forward_segment_event(SegmentEvent::Selected(id)).await
    }

    async fn forward_segment_event(&mut self, event: SegmentEvent) -> Result<()> {
        let Some(active) = self.active_tab else {
            return Ok(());
        };
        let Some(tab) = self.tabs.get_mut(&active) else {
            return Ok(());
        };
        let mut cx = tab_context!(self);
        tab.on_segment_event(&event, &mut cx).await
    }

    // ─── Model selection ──────────────────────────────────

    /// Select a model, validated against the fetched catalog, and inform
    /// the active tab.
    pub async fn on_select_model(&mut self, model: &str) -> Result<()> {
        match &self.info {
            Some(info) if info.model(model).is_some() => {}
            Some(_) => {
                self.host
                    .notify(MessageLevel::Warning, &format!("Unknown model: {model}"));
                return Ok(());
            }
            None => {
                self.host.notify(
                    MessageLevel::Warning,
                    "Not connected to an annotation server",
                );
                return Ok(());
            }
        }

        self.selected_model = Some(model.to_string());

        let Some(active) = self.active_tab else {
            return Ok(());
        };
        let Some(tab) = self.tabs.get_mut(&active) else {
            return Ok(());
        };
        let mut cx = tab_context!(self);
        tab.on_select_model(model, &mut cx).await
    }

    // ─── Probe & run ──────────────────────────────────────

    /// Route a probe click from the host's tool to the active tab.
    pub async fn on_probe(&mut self, event: ProbeEvent) -> Result<()> {
        let Some(active) = self.active_tab else {
            debug!("probe event with no active tab");
            return Ok(());
        };
        let outcome = {
            let Some(tab) = self.tabs.get_mut(&active) else {
                return Ok(());
            };
            let mut cx = tab_context!(self);
            tab.on_probe(event, &mut cx).await?
        };
        self.apply_outcome(outcome)
    }

    /// Trigger the active tab's explicit run action.
    pub async fn run_active_tab(&mut self) -> Result<()> {
        let Some(active) = self.active_tab else {
            self.host
                .notify(MessageLevel::Warning, "No action tab is active");
            return Ok(());
        };
        let outcome = {
            let Some(tab) = self.tabs.get_mut(&active) else {
                return Ok(());
            };
            let mut cx = tab_context!(self);
            tab.on_run(&mut cx).await?
        };
        self.apply_outcome(outcome)
    }

    fn apply_outcome(&mut self, outcome: TabOutcome) -> Result<()> {
        match outcome {
            TabOutcome::None => Ok(()),
            TabOutcome::Mask(mask) => self.load_mask(mask),
        }
    }

    // ─── Host hand-off ────────────────────────────────────

    /// Hand a decoded mask to the host's segmentation loader and request a
    /// render. Ownership of the buffer transfers to the host.
    pub fn load_mask(&mut self, mask: SegmentationMask) -> Result<()> {
        let Some(display_set) = self.host.active_display_set() else {
            self.host.notify(
                MessageLevel::Warning,
                "No active display set to load the segmentation into",
            );
            return Ok(());
        };

        debug!(display_set = %display_set.uid, voxels = mask.buffer.len(), "loading segmentation");
        self.host.run(HostCommand::LoadSegmentation {
            display_set_uid: display_set.uid,
            mask,
        })?;
        self.host.run(HostCommand::TriggerRender)?;
        Ok(())
    }

    /// Drop all collected points, host-side probe annotations included.
    pub fn clear_points(&mut self) -> Result<()> {
        self.session.clear_points();
        self.host.run(HostCommand::ClearProbeAnnotations)?;
        self.host.run(HostCommand::TriggerRender)?;
        Ok(())
    }
}
