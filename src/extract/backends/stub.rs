use anyhow::{anyhow, Result};

use crate::extract::extractor::FeatureExtractor;
use crate::features::{ExtractedFeatures, GlobalDescriptor, RegionGrid};
use crate::preprocess::InputTensor;

/// Deterministic CPU stand-in for a ViT.
///
/// Each `patch x patch` cell of the input becomes one region descriptor: the
/// three channel means spread over `dim` values with a fixed cosine basis. The
/// global descriptor is the mean over all regions. Useful for tests and for
/// running the pipeline without model weights.
pub struct StubExtractor {
    patch_size: usize,
    dim: usize,
}

impl StubExtractor {
    pub fn new(patch_size: usize, dim: usize) -> Self {
        Self {
            patch_size: patch_size.max(1),
            dim: dim.max(1),
        }
    }

    fn project(&self, means: [f32; 3], out: &mut [f32]) {
        for (k, slot) in out.iter_mut().enumerate() {
            let basis = ((k / 3) as f32 * 0.05).cos();
            *slot = means[k % 3] * basis;
        }
    }
}

impl Default for StubExtractor {
    fn default() -> Self {
        Self::new(14, 384)
    }
}

impl FeatureExtractor for StubExtractor {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn extract(&mut self, input: &InputTensor) -> Result<ExtractedFeatures> {
        let [batch, channels, height, width] = input.shape();
        if batch != 1 || channels != 3 {
            return Err(anyhow!(
                "expected a [1, 3, H, W] tensor, got {:?}",
                input.shape()
            ));
        }
        if height % self.patch_size != 0 || width % self.patch_size != 0 {
            return Err(anyhow!(
                "input {}x{} is not divisible by patch size {}",
                height,
                width,
                self.patch_size
            ));
        }

        let arr = input.as_array();
        let grid_h = height / self.patch_size;
        let grid_w = width / self.patch_size;
        let area = (self.patch_size * self.patch_size) as f32;

        let mut values = vec![0.0f32; grid_h * grid_w * self.dim];
        let mut global = vec![0.0f32; self.dim];
        for gy in 0..grid_h {
            for gx in 0..grid_w {
                let mut means = [0.0f32; 3];
                for (c, mean) in means.iter_mut().enumerate() {
                    let mut sum = 0.0f32;
                    for y in gy * self.patch_size..(gy + 1) * self.patch_size {
                        for x in gx * self.patch_size..(gx + 1) * self.patch_size {
                            sum += arr[[0, c, y, x]];
                        }
                    }
                    *mean = sum / area;
                }
                let start = (gy * grid_w + gx) * self.dim;
                let region = &mut values[start..start + self.dim];
                self.project(means, region);
                for (g, v) in global.iter_mut().zip(region.iter()) {
                    *g += *v;
                }
            }
        }
        let regions = (grid_h * grid_w) as f32;
        for g in global.iter_mut() {
            *g /= regions;
        }

        let grid = RegionGrid::new(grid_h, grid_w, self.dim, values)?;
        ExtractedFeatures::new(GlobalDescriptor::new(global), grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn stub_extractor_matches_patch_grid() -> Result<()> {
        let mut extractor = StubExtractor::new(14, 8);
        let input = InputTensor::new(Array4::from_elem((1, 3, 28, 42), 0.5));
        let features = extractor.extract(&input)?;
        assert_eq!(features.grid().shape(), [2, 3, 8]);
        assert_eq!(features.global().len(), features.grid().dim());
        assert!((features.global().values()[0] - 0.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn stub_extractor_rejects_bad_shapes() {
        let mut extractor = StubExtractor::new(14, 8);
        let input = InputTensor::new(Array4::zeros((1, 3, 20, 28)));
        assert!(extractor.extract(&input).is_err());
        let input = InputTensor::new(Array4::zeros((2, 3, 28, 28)));
        assert!(extractor.extract(&input).is_err());
    }
}
