//! One-shot full-volume segmentation with a non-interactive model.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use labelscope_core::host::MessageLevel;

use super::{ActionTab, TabContext, TabId, TabOutcome, segment_descriptors};

pub struct AutoSegmentationTab {
    active: bool,
}

impl AutoSegmentationTab {
    pub fn new() -> Self {
        Self { active: false }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[async_trait]
impl ActionTab for AutoSegmentationTab {
    fn id(&self) -> TabId {
        TabId::AutoSegmentation
    }

    // no interactive tool to arm; the tab only reacts to explicit runs
    async fn on_enter(&mut self, _cx: &mut TabContext<'_>) -> Result<()> {
        self.active = true;
        Ok(())
    }

    async fn on_leave(&mut self, _cx: &mut TabContext<'_>) -> Result<()> {
        self.active = false;
        Ok(())
    }

    async fn on_select_model(&mut self, model: &str, cx: &mut TabContext<'_>) -> Result<()> {
        if let Some(info) = cx.info
            && let Some(descriptor) = info.model(model)
            && descriptor.model_type.is_interactive()
        {
            cx.host.notify(
                MessageLevel::Warning,
                &format!("{model} expects click guidance; use the smart edit tab"),
            );
        }
        Ok(())
    }

    async fn on_run(&mut self, cx: &mut TabContext<'_>) -> Result<TabOutcome> {
        let Some(display_set) = cx.host.active_display_set() else {
            cx.host.notify(MessageLevel::Warning, "No active display set");
            return Ok(TabOutcome::None);
        };
        let Some(model) = cx.model else {
            cx.host
                .notify(MessageLevel::Warning, "Select a model before running inference");
            return Ok(TabOutcome::None);
        };

        let params = cx.config.params_for(model)?;
        match cx.client.infer(model, &display_set.image_id, &params).await {
            Ok(result) => {
                let segments = segment_descriptors(cx.info, model, cx.session);
                Ok(TabOutcome::Mask(result.into_mask(segments)))
            }
            Err(err) => {
                warn!(model, error = %err, "segmentation failed");
                cx.host
                    .notify(MessageLevel::Error, &format!("Segmentation failed: {err}"));
                Ok(TabOutcome::None)
            }
        }
    }
}

impl Default for AutoSegmentationTab {
    fn default() -> Self {
        Self::new()
    }
}
