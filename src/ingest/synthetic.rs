//! Synthetic camera (`stub://`) for tests and dry runs.
//!
//! Frames are produced in BGR order, the native order of most capture stacks,
//! so the preprocessor's channel reorder is exercised.

use anyhow::{anyhow, Result};

use super::FrameSource;
use crate::frame::{ChannelOrder, Frame};

pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    frame_count: u64,
    opened: bool,
    /// Simulated scene state, advanced every 50 frames.
    scene_state: u8,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_limit: None,
            frame_count: 0,
            opened: false,
            scene_state: 0,
        }
    }

    /// End the stream after `limit` frames.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.width as usize) * (self.height as usize) * 3;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticCamera {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        log::info!("SyntheticCamera: opened ({}x{})", self.width, self.height);
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        if !self.opened {
            return Err(anyhow!("synthetic camera not opened"));
        }
        if self.frame_limit.is_some_and(|limit| self.frame_count >= limit) {
            return Err(anyhow!(
                "synthetic stream ended after {} frames",
                self.frame_count
            ));
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::from_raw(self.width, self.height, pixels, ChannelOrder::Bgr)
    }

    fn describe(&self) -> String {
        format!("stub://synthetic ({}x{})", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_camera_ends_after_limit() -> Result<()> {
        let mut camera = SyntheticCamera::new(32, 24).with_frame_limit(2);
        camera.open()?;
        assert_eq!(camera.read()?.order(), ChannelOrder::Bgr);
        camera.read()?;
        assert!(camera.read().is_err());
        assert_eq!(camera.frames_captured(), 2);
        Ok(())
    }

    #[test]
    fn synthetic_frames_change_over_time() -> Result<()> {
        let mut camera = SyntheticCamera::new(8, 8);
        camera.open()?;
        let a = camera.read()?;
        let b = camera.read()?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn read_before_open_fails() {
        let mut camera = SyntheticCamera::new(8, 8);
        assert!(camera.read().is_err());
    }
}
