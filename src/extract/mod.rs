//! Feature extraction boundary.
//!
//! The pretrained model is opaque: everything downstream only sees the
//! `FeatureExtractor` trait and the `ExtractedFeatures` it returns.

mod backends;
mod extractor;
pub mod layout;

use anyhow::Result;

use crate::config::ModelSettings;

pub use backends::StubExtractor;
#[cfg(feature = "backend-tract")]
pub use backends::TractExtractor;
pub use extractor::FeatureExtractor;
pub use layout::ModelOutput;

/// Load the extractor used for the whole process lifetime.
///
/// With the `backend-tract` feature this loads and warms up the ONNX model at
/// `settings.path`; a missing or unloadable model is an error. Without it the
/// deterministic stub is used.
pub fn load_extractor(settings: &ModelSettings) -> Result<Box<dyn FeatureExtractor>> {
    #[cfg(feature = "backend-tract")]
    {
        let mut extractor =
            TractExtractor::new(&settings.path, settings.input_size, settings.patch_size)?;
        extractor.warm_up()?;
        log::info!(
            "feature extractor '{}' loaded from {}",
            extractor.name(),
            settings.path.display()
        );
        Ok(Box::new(extractor))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        log::warn!(
            "built without backend-tract; using the stub extractor instead of {}",
            settings.path.display()
        );
        Ok(Box::new(StubExtractor::new(
            settings.patch_size as usize,
            settings.embedding_dim,
        )))
    }
}
