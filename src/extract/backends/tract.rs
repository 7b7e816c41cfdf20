#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::extract::extractor::FeatureExtractor;
use crate::extract::layout::{assemble, ModelOutput};
use crate::features::ExtractedFeatures;
use crate::preprocess::InputTensor;

/// Tract-based backend for an ONNX export of a ViT feature model.
///
/// The model is loaded and optimized once for a fixed `[1, 3, S, S]` input.
/// One forward pass per frame supplies both the global descriptor and the
/// region grid (see `extract::layout`). Runs on CPU only.
pub struct TractExtractor {
    model: TypedRunnableModel<TypedModel>,
    input_size: usize,
    grid: usize,
}

impl TractExtractor {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32, patch_size: u32) -> Result<Self> {
        if patch_size == 0 || input_size % patch_size != 0 {
            return Err(anyhow!(
                "input size {} is not divisible by patch size {}",
                input_size,
                patch_size
            ));
        }
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size: side,
            grid: (input_size / patch_size) as usize,
        })
    }

    fn build_input(&self, input: &InputTensor) -> Result<Tensor> {
        let shape = input.shape();
        if shape != [1, 3, self.input_size, self.input_size] {
            return Err(anyhow!(
                "tensor shape {:?} does not match model input [1, 3, {}, {}]",
                shape,
                self.input_size,
                self.input_size
            ));
        }
        let values = input
            .as_array()
            .as_slice()
            .ok_or_else(|| anyhow!("input tensor is not contiguous"))?;
        Tensor::from_shape(&shape, values).context("failed to build model input")
    }

    fn collect_outputs(outputs: TVec<TValue>) -> Result<Vec<ModelOutput>> {
        outputs
            .iter()
            .map(|output| {
                let view = output
                    .to_array_view::<f32>()
                    .context("model output tensor was not f32")?;
                ModelOutput::new(view.shape().to_vec(), view.iter().copied().collect())
            })
            .collect()
    }
}

impl FeatureExtractor for TractExtractor {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn extract(&mut self, input: &InputTensor) -> Result<ExtractedFeatures> {
        let tensor = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        let outputs = Self::collect_outputs(outputs)?;
        assemble(&outputs, self.grid, self.grid)
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size;
        let zeros = InputTensor::new(ndarray::Array4::zeros((1, 3, side, side)));
        self.extract(&zeros).map(|_| ())
    }
}
