pub mod config;
pub mod error;
pub mod geometry;
pub mod host;
pub mod models;
pub mod session;

pub use config::{AppConfig, ServerConfig, SessionConfig};
pub use error::{CoreError, Result};
pub use geometry::ImageTransform;
pub use host::{CommandSink, DisplaySet, HostCommand, HostContext, MessageLevel, Notifier, ViewportProvider};
pub use models::*;
pub use session::{PointPartition, PointSession};
