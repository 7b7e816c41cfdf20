//! Live camera feature feed.
//!
//! Captures frames from a local camera, runs a pretrained vision transformer
//! over each one and turns its output into a global descriptor plus a grid of
//! per-region descriptors. Each result is drawn onto the frame for a local
//! viewer and posted as JSON to a consumer on the same machine.
//!
//! # Module Structure
//!
//! - `ingest`: Frame sources (V4L2 camera, image directories, synthetic stub)
//! - `frame`: Owned RGB/BGR frames
//! - `preprocess`: Resize and normalize into the model input tensor
//! - `extract`: Feature extractor boundary and backends
//! - `features`: Descriptor types and the published event
//! - `overlay`, `display`: On-frame summary and the local window
//! - `publish`: Best-effort JSON delivery
//! - `pipeline`: The capture loop tying it all together

pub mod config;
pub mod display;
pub mod error;
pub mod extract;
pub mod features;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod pipeline;
pub mod preprocess;
pub mod publish;
pub mod shutdown;
pub mod stats;
pub mod ui;

pub use config::{CameraSettings, ModelSettings, PipelineConfig, PublishSettings};
pub use display::FrameSink;
#[cfg(feature = "window")]
pub use display::WindowSink;
pub use error::{PipelineError, EXIT_DEVICE_UNAVAILABLE};
pub use extract::{load_extractor, FeatureExtractor, ModelOutput, StubExtractor};
#[cfg(feature = "backend-tract")]
pub use extract::TractExtractor;
pub use features::{ExtractedFeatures, FeatureEvent, GlobalDescriptor, RegionGrid};
pub use frame::{ChannelOrder, Frame};
pub use ingest::{CameraSource, DirectorySource, FrameSource, SyntheticCamera};
pub use overlay::{OverlayRenderer, TextOverlay};
pub use pipeline::{
    ExitReason, FrameCounters, Pipeline, PipelineOptions, PipelineState, Presentation, RunSummary,
};
pub use preprocess::{prepare, InputTensor, INPUT_SIZE};
pub use publish::{FeaturePublisher, HttpPublisher};
pub use shutdown::ShutdownSignal;
pub use stats::{FeatureStats, FpsMeter};
