//! Mapping raw model outputs onto `GlobalDescriptor` + `RegionGrid`.
//!
//! ViT exports differ in what they return. Supported layouts:
//!
//! - global: the first output, either pooled `[1, D]` or a token sequence
//!   `[1, T, D]` whose token 0 is the CLS token
//! - regions: the last output, either a token sequence `[1, T, D]` (leading
//!   CLS/register tokens are dropped, the trailing `H * W` tokens are the
//!   patches) or an already spatial `[1, H, W, D]` map
//!
//! When the model returns several outputs the region grid is always read from
//! the final one.

use anyhow::{anyhow, Result};

use crate::features::{ExtractedFeatures, GlobalDescriptor, RegionGrid};

/// Backend-neutral copy of one output tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOutput {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl ModelOutput {
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(anyhow!(
                "output shape {:?} does not match {} values",
                shape,
                values.len()
            ));
        }
        Ok(Self { shape, values })
    }
}

/// Build features from a model's output list for a `grid_h x grid_w` patch grid.
pub fn assemble(outputs: &[ModelOutput], grid_h: usize, grid_w: usize) -> Result<ExtractedFeatures> {
    let first = outputs
        .first()
        .ok_or_else(|| anyhow!("model produced no outputs"))?;
    let last = outputs
        .last()
        .ok_or_else(|| anyhow!("model produced no outputs"))?;

    let global = global_descriptor(first)?;
    let grid = region_grid(last, grid_h, grid_w)?;
    ExtractedFeatures::new(global, grid)
}

pub fn global_descriptor(output: &ModelOutput) -> Result<GlobalDescriptor> {
    match output.shape.as_slice() {
        [1, dim] if *dim > 0 => Ok(GlobalDescriptor::new(output.values.clone())),
        [1, tokens, dim] if *tokens > 0 && *dim > 0 => {
            Ok(GlobalDescriptor::new(output.values[..*dim].to_vec()))
        }
        other => Err(anyhow!("unsupported global output shape {:?}", other)),
    }
}

pub fn region_grid(output: &ModelOutput, grid_h: usize, grid_w: usize) -> Result<RegionGrid> {
    let regions = grid_h * grid_w;
    match output.shape.as_slice() {
        [1, tokens, dim] => {
            if *tokens < regions {
                return Err(anyhow!(
                    "model returned {} tokens, expected at least {} patches ({}x{})",
                    tokens,
                    regions,
                    grid_h,
                    grid_w
                ));
            }
            let prefix = tokens - regions;
            let values = output.values[prefix * dim..].to_vec();
            RegionGrid::new(grid_h, grid_w, *dim, values)
        }
        [1, h, w, dim] if *h == grid_h && *w == grid_w => {
            RegionGrid::new(grid_h, grid_w, *dim, output.values.clone())
        }
        other => Err(anyhow!(
            "unsupported region output shape {:?} for a {}x{} grid",
            other,
            grid_h,
            grid_w
        )),
    }
}
