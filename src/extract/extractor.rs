use anyhow::Result;

use crate::features::ExtractedFeatures;
use crate::preprocess::InputTensor;

/// Feature extractor trait.
///
/// Implementations wrap a pretrained vision transformer (or a stand-in) and map
/// one preprocessed tensor to a global descriptor plus a region grid taken from
/// the same forward pass. The model is loaded once and reused for every frame.
///
/// An `Err` from `extract` is a per-frame inference failure: the caller drops
/// that frame and keeps going.
pub trait FeatureExtractor {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the model on one tensor.
    ///
    /// Must be deterministic for a fixed tensor and fixed weights.
    fn extract(&mut self, input: &InputTensor) -> Result<ExtractedFeatures>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
