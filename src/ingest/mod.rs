//! Frame sources.
//!
//! - V4L2 devices (feature: camera-v4l2)
//! - Local directories of still images, replayed in name order
//! - Synthetic `stub://` camera (testing)
//!
//! A source is opened exactly once. After that, every `read` either yields a
//! `Frame` or reports that the stream is over; the caller does not retry.
//! Device handles are released when the source is dropped.

pub mod directory;
#[cfg(any(feature = "camera-v4l2", test))]
mod normalize;
pub mod synthetic;
#[cfg(feature = "camera-v4l2")]
pub mod v4l2;

use anyhow::Result;
#[cfg(not(feature = "camera-v4l2"))]
use anyhow::anyhow;

use crate::config::CameraSettings;
use crate::frame::Frame;

pub use directory::DirectorySource;
pub use synthetic::SyntheticCamera;
#[cfg(feature = "camera-v4l2")]
pub use v4l2::V4l2Camera;

/// Producer of raw frames.
pub trait FrameSource {
    /// Acquire the underlying device. Called once, before any `read`.
    fn open(&mut self) -> Result<()>;

    /// Block until the next frame is available. An error means the stream ended.
    fn read(&mut self) -> Result<Frame>;

    /// Human-readable identifier for logs.
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Camera source selected from the configured device string.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    Directory(DirectorySource),
    #[cfg(feature = "camera-v4l2")]
    Device(V4l2Camera),
}

impl CameraSource {
    pub fn new(settings: &CameraSettings) -> Result<Self> {
        let device = settings.device.as_str();
        let backend = if device.starts_with("stub://") {
            CameraBackend::Synthetic(SyntheticCamera::new(settings.width, settings.height))
        } else if std::path::Path::new(device).is_dir() {
            CameraBackend::Directory(DirectorySource::new(device))
        } else {
            #[cfg(feature = "camera-v4l2")]
            {
                CameraBackend::Device(V4l2Camera::new(device, settings.width, settings.height))
            }
            #[cfg(not(feature = "camera-v4l2"))]
            {
                return Err(anyhow!(
                    "camera device {} requires the camera-v4l2 feature",
                    device
                ));
            }
        };
        Ok(Self { backend })
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.open(),
            CameraBackend::Directory(source) => source.open(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.open(),
        }
    }

    fn read(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.read(),
            CameraBackend::Directory(source) => source.read(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.read(),
        }
    }

    fn describe(&self) -> String {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.describe(),
            CameraBackend::Directory(source) => source.describe(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_device_selects_synthetic_camera() -> Result<()> {
        let settings = CameraSettings {
            device: "stub://test".to_string(),
            width: 64,
            height: 48,
        };
        let mut source = CameraSource::new(&settings)?;
        source.open()?;
        let frame = source.read()?;
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert!(source.describe().contains("stub://"));
        Ok(())
    }

    #[cfg(not(feature = "camera-v4l2"))]
    #[test]
    fn device_path_without_v4l2_support_is_rejected() {
        let settings = CameraSettings {
            device: "/dev/video-does-not-exist".to_string(),
            width: 64,
            height: 48,
        };
        assert!(CameraSource::new(&settings).is_err());
    }
}
