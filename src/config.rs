use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::preprocess::INPUT_SIZE;

const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_MODEL_PATH: &str = "models/dinov2_vits14.onnx";
const DEFAULT_PATCH_SIZE: u32 = 14;
const DEFAULT_EMBEDDING_DIM: usize = 384;
const DEFAULT_PUBLISH_ENDPOINT: &str = "http://localhost:8080/features";
const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_STATS_INTERVAL_SECS: u64 = 5;
const DEFAULT_WINDOW_TITLE: &str = "Webcam Feed";

/// Run-time configuration of the feature feed.
///
/// Built from compiled defaults plus the two command-line switches; nothing is
/// read from files or the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub camera: CameraSettings,
    pub model: ModelSettings,
    pub publish: PublishSettings,
    pub window_title: String,
    pub display_enabled: bool,
    pub publish_enabled: bool,
    pub stats_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Device node, `stub://...` for a synthetic camera, or a directory of images.
    pub device: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub input_size: u32,
    pub patch_size: u32,
    pub embedding_dim: usize,
}

impl ModelSettings {
    /// Patches per side of the region grid.
    pub fn grid_side(&self) -> u32 {
        self.input_size / self.patch_size
    }
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings {
                device: DEFAULT_CAMERA_DEVICE.to_string(),
                width: DEFAULT_CAPTURE_WIDTH,
                height: DEFAULT_CAPTURE_HEIGHT,
            },
            model: ModelSettings {
                path: PathBuf::from(DEFAULT_MODEL_PATH),
                input_size: INPUT_SIZE,
                patch_size: DEFAULT_PATCH_SIZE,
                embedding_dim: DEFAULT_EMBEDDING_DIM,
            },
            publish: PublishSettings {
                endpoint: DEFAULT_PUBLISH_ENDPOINT.to_string(),
                timeout: Duration::from_millis(DEFAULT_PUBLISH_TIMEOUT_MS),
            },
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            display_enabled: true,
            publish_enabled: true,
            stats_interval: Duration::from_secs(DEFAULT_STATS_INTERVAL_SECS),
        }
    }
}

impl PipelineConfig {
    /// Defaults with the `--no-window` / `--no-ui` switches applied.
    pub fn from_flags(no_window: bool, no_ui: bool) -> Result<Self> {
        let mut cfg = Self::default();
        cfg.display_enabled = !no_window;
        cfg.publish_enabled = !no_ui;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("capture size must be greater than zero"));
        }
        if self.model.patch_size == 0 || self.model.input_size % self.model.patch_size != 0 {
            return Err(anyhow!(
                "model input {} must be a multiple of patch size {}",
                self.model.input_size,
                self.model.patch_size
            ));
        }
        if self.model.embedding_dim == 0 {
            return Err(anyhow!("embedding dimension must be greater than zero"));
        }
        if self.stats_interval.is_zero() {
            return Err(anyhow!("stats interval must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_small_vit_at_518() -> Result<()> {
        let cfg = PipelineConfig::from_flags(false, false)?;
        assert!(cfg.display_enabled);
        assert!(cfg.publish_enabled);
        assert_eq!(cfg.model.input_size, 518);
        assert_eq!(cfg.model.grid_side(), 37);
        assert_eq!(cfg.model.embedding_dim, 384);
        assert_eq!(cfg.publish.endpoint, "http://localhost:8080/features");
        Ok(())
    }

    #[test]
    fn flags_disable_window_and_publishing() -> Result<()> {
        let cfg = PipelineConfig::from_flags(true, true)?;
        assert!(!cfg.display_enabled);
        assert!(!cfg.publish_enabled);
        Ok(())
    }

    #[test]
    fn rejects_indivisible_patch_size() {
        let mut cfg = PipelineConfig::default();
        cfg.model.patch_size = 16;
        assert!(cfg.validate().is_err());
    }
}
