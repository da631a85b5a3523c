pub mod client;
pub mod error;
pub mod http;
pub mod multipart;
pub mod nrrd;

pub use client::{InferenceResult, LabelServerClient, SampleResult};
pub use error::{ClientError, Result};
pub use nrrd::NrrdVolume;
