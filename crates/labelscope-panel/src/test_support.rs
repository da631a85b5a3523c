//! Doubles for the host bridge and the tab contract.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use labelscope_core::ImageTransform;
use labelscope_core::host::{
    CommandSink, DisplaySet, HostCommand, HostContext, MessageLevel, Notifier, ViewportProvider,
};
use labelscope_core::models::SegmentationMask;

use crate::tabs::{ActionTab, TabContext, TabId, TabOutcome};

/// Host double that records every interaction.
#[derive(Default)]
pub struct RecordingHost {
    pub notifications: Mutex<Vec<(MessageLevel, String)>>,
    pub commands: Mutex<Vec<HostCommand>>,
    pub display_set: Mutex<Option<DisplaySet>>,
}

impl RecordingHost {
    pub fn with_display_set(image_id: &str) -> Arc<Self> {
        let host = Arc::new(Self::default());
        *host.display_set.lock().unwrap() = Some(DisplaySet {
            uid: "ds-1".to_string(),
            image_id: image_id.to_string(),
            shape: [64, 64, 32],
            transform: ImageTransform::identity(),
        });
        host
    }

    pub fn context(self: &Arc<Self>) -> HostContext {
        HostContext::new(self.clone(), self.clone(), self.clone())
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(HostCommand::type_name)
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.command_names().iter().filter(|n| **n == name).count()
    }
}

impl Notifier for RecordingHost {
    fn notify(&self, level: MessageLevel, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

impl ViewportProvider for RecordingHost {
    fn active_display_set(&self) -> Option<DisplaySet> {
        self.display_set.lock().unwrap().clone()
    }
}

impl CommandSink for RecordingHost {
    fn run(&self, command: HostCommand) -> labelscope_core::Result<()> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

/// Tab double that logs its lifecycle hooks in call order.
pub struct RecordingTab {
    id: TabId,
    log: Arc<Mutex<Vec<String>>>,
    run_outcome: Option<SegmentationMask>,
}

impl RecordingTab {
    pub fn new(id: TabId, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            id,
            log,
            run_outcome: None,
        }
    }

    /// Have `on_run` hand back a fixed mask.
    pub fn with_run_outcome(mut self, mask: SegmentationMask) -> Self {
        self.run_outcome = Some(mask);
        self
    }
}

#[async_trait]
impl ActionTab for RecordingTab {
    fn id(&self) -> TabId {
        self.id
    }

    async fn on_enter(&mut self, _cx: &mut TabContext<'_>) -> Result<()> {
        self.log.lock().unwrap().push(format!("enter:{}", self.id));
        Ok(())
    }

    async fn on_leave(&mut self, _cx: &mut TabContext<'_>) -> Result<()> {
        self.log.lock().unwrap().push(format!("leave:{}", self.id));
        Ok(())
    }

    async fn on_run(&mut self, _cx: &mut TabContext<'_>) -> Result<TabOutcome> {
        self.log.lock().unwrap().push(format!("run:{}", self.id));
        Ok(match self.run_outcome.clone() {
            Some(mask) => TabOutcome::Mask(mask),
            None => TabOutcome::None,
        })
    }
}
