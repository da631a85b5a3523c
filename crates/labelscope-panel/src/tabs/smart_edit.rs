//! Interactive point-based segmentation: user clicks guide the model, one
//! inference request per collected click.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use labelscope_core::host::{DisplaySet, HostCommand, MessageLevel};

use super::{
    ActionTab, ProbeEvent, TabContext, TabId, TabOutcome, segment_descriptors,
};

pub struct SmartEditTab {
    active: bool,
    /// Run inference automatically after every collected click.
    auto_run: bool,
}

impl SmartEditTab {
    pub fn new() -> Self {
        Self {
            active: false,
            auto_run: true,
        }
    }

    /// Collect clicks without firing inference; the user runs explicitly.
    pub fn manual() -> Self {
        Self {
            active: false,
            auto_run: false,
        }
    }

    /// Whether the probe tool is currently armed for this tab.
    pub fn is_active(&self) -> bool {
        self.active
    }

    async fn run_inference(
        &self,
        cx: &mut TabContext<'_>,
        display_set: &DisplaySet,
    ) -> Result<TabOutcome> {
        let Some(model) = cx.model else {
            cx.host
                .notify(MessageLevel::Warning, "Select a model before running inference");
            return Ok(TabOutcome::None);
        };

        let partition = cx.session.partition(&display_set.transform)?;
        if partition.foreground.is_empty() {
            // nothing to guide the model with; no request leaves the panel
            cx.host.notify(
                MessageLevel::Warning,
                "Place at least one point on the active segment",
            );
            return Ok(TabOutcome::None);
        }

        let params = cx.config.params_for(model)?;
        let response = cx
            .client
            .infer_with_points(
                model,
                &display_set.image_id,
                &partition.foreground,
                &partition.background,
                &params,
            )
            .await;

        match response {
            Ok(result) => {
                let segments = segment_descriptors(cx.info, model, cx.session);
                Ok(TabOutcome::Mask(result.into_mask(segments)))
            }
            Err(err) => {
                warn!(model, error = %err, "interactive inference failed");
                cx.host
                    .notify(MessageLevel::Error, &format!("Inference failed: {err}"));
                Ok(TabOutcome::None)
            }
        }
    }
}

#[async_trait]
impl ActionTab for SmartEditTab {
    fn id(&self) -> TabId {
        TabId::SmartEdit
    }

    async fn on_enter(&mut self, cx: &mut TabContext<'_>) -> Result<()> {
        cx.host.run(HostCommand::ActivateProbeTool)?;
        self.active = true;
        Ok(())
    }

    async fn on_leave(&mut self, cx: &mut TabContext<'_>) -> Result<()> {
        cx.host.run(HostCommand::DeactivateProbeTool)?;
        if cx.config.session.clear_points_on_leave && cx.session.total_points() > 0 {
            cx.session.clear_points();
            cx.host.run(HostCommand::ClearProbeAnnotations)?;
        }
        self.active = false;
        Ok(())
    }

    async fn on_select_model(&mut self, model: &str, cx: &mut TabContext<'_>) -> Result<()> {
        if let Some(info) = cx.info
            && let Some(descriptor) = info.model(model)
            && !descriptor.model_type.is_interactive()
        {
            cx.host.notify(
                MessageLevel::Warning,
                &format!("{model} does not accept click guidance"),
            );
        }
        Ok(())
    }

    async fn on_probe(&mut self, event: ProbeEvent, cx: &mut TabContext<'_>) -> Result<TabOutcome> {
        let Some(display_set) = cx.host.active_display_set() else {
            cx.host.notify(MessageLevel::Warning, "No active display set");
            return Ok(TabOutcome::None);
        };

        cx.session.add_point(event.segment_id, event.world)?;
        if !self.auto_run {
            return Ok(TabOutcome::None);
        }
        self.run_inference(cx, &display_set).await
    }

    async fn on_run(&mut self, cx: &mut TabContext<'_>) -> Result<TabOutcome> {
        let Some(display_set) = cx.host.active_display_set() else {
            cx.host.notify(MessageLevel::Warning, "No active display set");
            return Ok(TabOutcome::None);
        };
        self.run_inference(cx, &display_set).await
    }
}

impl Default for SmartEditTab {
    fn default() -> Self {
        Self::new()
    }
}
