pub mod controller;
pub mod tabs;

pub use controller::PanelController;
pub use tabs::{
    ActionTab, AutoSegmentationTab, ProbeEvent, SegmentEvent, SmartEditTab, TabContext, TabId,
    TabOutcome,
};

#[cfg(test)]
mod test_support;
