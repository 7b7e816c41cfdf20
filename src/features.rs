//! Feature data model.
//!
//! - `GlobalDescriptor`: one pooled vector for the whole frame (CLS token).
//! - `RegionGrid`: `[height, width, dim]` patch descriptors.
//! - `ExtractedFeatures`: both of the above, guaranteed to share one embedding space.
//! - `FeatureEvent`: extracted features plus a timestamp, the unit handed to publishers.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// Single descriptor summarising the whole frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GlobalDescriptor(Vec<f32>);

impl GlobalDescriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }
}

/// Per-region descriptors laid out row-major as `[height, width, dim]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionGrid {
    height: usize,
    width: usize,
    dim: usize,
    values: Vec<f32>,
}

impl RegionGrid {
    pub fn new(height: usize, width: usize, dim: usize, values: Vec<f32>) -> Result<Self> {
        if height == 0 || width == 0 || dim == 0 {
            return Err(anyhow!(
                "region grid dimensions must be non-zero ({}x{}x{})",
                height,
                width,
                dim
            ));
        }
        let expected = height
            .checked_mul(width)
            .and_then(|v| v.checked_mul(dim))
            .ok_or_else(|| anyhow!("region grid dimensions overflow"))?;
        if values.len() != expected {
            return Err(anyhow!(
                "region grid length mismatch: expected {}, got {}",
                expected,
                values.len()
            ));
        }
        Ok(Self {
            height,
            width,
            dim,
            values,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Descriptor length of each region.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, self.dim]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Descriptor of the region at row `y`, column `x`.
    pub fn region(&self, y: usize, x: usize) -> Option<&[f32]> {
        if y >= self.height || x >= self.width {
            return None;
        }
        let start = (y * self.width + x) * self.dim;
        Some(&self.values[start..start + self.dim])
    }

    fn row(&self, y: usize) -> &[f32] {
        let stride = self.width * self.dim;
        &self.values[y * stride..(y + 1) * stride]
    }
}

// Serialized as nested arrays: [[[f32; dim]; width]; height].
impl Serialize for RegionGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut rows = serializer.serialize_seq(Some(self.height))?;
        for y in 0..self.height {
            rows.serialize_element(&GridRow {
                values: self.row(y),
                dim: self.dim,
            })?;
        }
        rows.end()
    }
}

struct GridRow<'a> {
    values: &'a [f32],
    dim: usize,
}

impl Serialize for GridRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut cells = serializer.serialize_seq(Some(self.values.len() / self.dim))?;
        for region in self.values.chunks_exact(self.dim) {
            cells.serialize_element(region)?;
        }
        cells.end()
    }
}

/// Output of one successful extraction.
///
/// The global descriptor length always equals the grid's descriptor length.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedFeatures {
    global: GlobalDescriptor,
    grid: RegionGrid,
}

impl ExtractedFeatures {
    pub fn new(global: GlobalDescriptor, grid: RegionGrid) -> Result<Self> {
        if global.len() != grid.dim() {
            return Err(anyhow!(
                "descriptor dimension mismatch: global {} vs region {}",
                global.len(),
                grid.dim()
            ));
        }
        // JSON has no encoding for NaN or infinities.
        if let Some(pos) = global.values().iter().position(|v| !v.is_finite()) {
            return Err(anyhow!("global descriptor value {} is not finite", pos));
        }
        if let Some(pos) = grid.values().iter().position(|v| !v.is_finite()) {
            return Err(anyhow!("region grid value {} is not finite", pos));
        }
        Ok(Self { global, grid })
    }

    pub fn global(&self) -> &GlobalDescriptor {
        &self.global
    }

    pub fn grid(&self) -> &RegionGrid {
        &self.grid
    }

    /// Shared embedding dimension.
    pub fn dim(&self) -> usize {
        self.global.len()
    }
}

/// Immutable per-frame event delivered to feature consumers.
#[derive(Clone, Debug, Serialize)]
pub struct FeatureEvent {
    #[serde(rename = "clsFeatures")]
    global: GlobalDescriptor,
    #[serde(rename = "patchFeatures")]
    grid: RegionGrid,
    /// Seconds since the Unix epoch.
    timestamp: f64,
}

impl FeatureEvent {
    pub fn new(features: ExtractedFeatures, timestamp: f64) -> Self {
        let ExtractedFeatures { global, grid } = features;
        Self {
            global,
            grid,
            timestamp,
        }
    }

    /// Stamp with the current wall-clock time.
    pub fn now(features: ExtractedFeatures) -> Self {
        Self::new(features, epoch_seconds())
    }

    pub fn global(&self) -> &GlobalDescriptor {
        &self.global
    }

    pub fn grid(&self) -> &RegionGrid {
        &self.grid
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(dim: usize) -> ExtractedFeatures {
        let global = GlobalDescriptor::new((0..dim).map(|i| i as f32).collect());
        let grid = RegionGrid::new(2, 3, dim, (0..2 * 3 * dim).map(|i| i as f32).collect())
            .expect("grid");
        ExtractedFeatures::new(global, grid).expect("features")
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let global = GlobalDescriptor::new(vec![0.0; 4]);
        let grid = RegionGrid::new(1, 1, 3, vec![0.0; 3]).unwrap();
        assert!(ExtractedFeatures::new(global, grid).is_err());
    }

    #[test]
    fn rejects_non_finite_values() {
        let global = GlobalDescriptor::new(vec![f32::NAN, 1.0]);
        let grid = RegionGrid::new(1, 1, 2, vec![0.0, 0.0]).unwrap();
        assert!(ExtractedFeatures::new(global, grid).is_err());

        let global = GlobalDescriptor::new(vec![0.5, 1.0]);
        let grid = RegionGrid::new(1, 1, 2, vec![f32::INFINITY, 0.0]).unwrap();
        let err = ExtractedFeatures::new(global, grid).unwrap_err();
        assert!(err.to_string().contains("region grid value 0"));
    }

    #[test]
    fn grid_indexing_is_row_major() {
        let f = features(2);
        assert_eq!(f.grid().region(0, 0), Some(&[0.0, 1.0][..]));
        assert_eq!(f.grid().region(1, 2), Some(&[10.0, 11.0][..]));
        assert_eq!(f.grid().region(2, 0), None);
    }

    #[test]
    fn event_json_uses_consumer_field_names() -> Result<()> {
        let event = FeatureEvent::new(features(2), 1_700_000_000.5);
        let value: serde_json::Value = serde_json::from_str(&event.to_json()?)?;

        assert_eq!(value["clsFeatures"], serde_json::json!([0.0, 1.0]));
        let patches = value["patchFeatures"].as_array().unwrap();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].as_array().unwrap().len(), 3);
        assert_eq!(value["patchFeatures"][1][2], serde_json::json!([10.0, 11.0]));
        assert_eq!(value["timestamp"], serde_json::json!(1_700_000_000.5));
        Ok(())
    }
}
