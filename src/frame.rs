//! Captured frame container.
//!
//! A `Frame` is one height x width x 3 image with 8-bit samples, row-major, as
//! delivered by a frame source. It is owned by the loop iteration that read it
//! and dropped when that iteration completes.
//!
//! Sources keep their native channel order; the preprocessor reorders to the
//! order the model was trained on.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// Channel order of the samples inside a `Frame`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// Fixed-layout 3-channel image.
///
/// Pixels are stored in an `RgbImage` buffer regardless of `order`; the buffer
/// type only fixes the layout (3 interleaved u8 samples per pixel). When
/// `order` is `Bgr` the first sample of each pixel is blue.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
    order: ChannelOrder,
}

impl Frame {
    /// Wrap raw interleaved samples. Fails on zero dimensions or a length mismatch.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>, order: ChannelOrder) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero ({}x{})", width, height));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("frame buffer rejected ({}x{})", width, height))?;
        Ok(Self { image, order })
    }

    /// Wrap an already-decoded image. Zero-sized images are rejected.
    pub fn from_image(image: RgbImage, order: ChannelOrder) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(anyhow!("frame dimensions must be non-zero"));
        }
        Ok(Self { image, order })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Interleaved samples in `order`.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Write one pixel given in RGB, honouring the frame's channel order.
    /// Out-of-bounds coordinates are ignored.
    pub fn put_rgb(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let sample = match self.order {
            ChannelOrder::Rgb => rgb,
            ChannelOrder::Bgr => [rgb[2], rgb[1], rgb[0]],
        };
        self.image.put_pixel(x as u32, y as u32, image::Rgb(sample));
    }

    /// Read one pixel back as RGB.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let pixel = self.image.get_pixel_checked(x, y)?.0;
        Some(match self.order {
            ChannelOrder::Rgb => pixel,
            ChannelOrder::Bgr => [pixel[2], pixel[1], pixel[0]],
        })
    }

    /// Copy of this frame with samples reordered to RGB.
    pub fn to_rgb(&self) -> RgbImage {
        match self.order {
            ChannelOrder::Rgb => self.image.clone(),
            ChannelOrder::Bgr => {
                let mut out = self.image.clone();
                for pixel in out.pixels_mut() {
                    pixel.0.swap(0, 2);
                }
                out
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_length_mismatch() {
        assert!(Frame::from_raw(2, 2, vec![0u8; 11], ChannelOrder::Rgb).is_err());
        assert!(Frame::from_raw(0, 2, vec![], ChannelOrder::Rgb).is_err());
    }

    #[test]
    fn bgr_frames_reorder_to_rgb() -> Result<()> {
        let frame = Frame::from_raw(1, 1, vec![10, 20, 30], ChannelOrder::Bgr)?;
        assert_eq!(frame.rgb_at(0, 0), Some([30, 20, 10]));
        assert_eq!(frame.to_rgb().as_raw(), &vec![30, 20, 10]);
        Ok(())
    }

    #[test]
    fn put_rgb_respects_order_and_bounds() -> Result<()> {
        let mut frame = Frame::from_raw(2, 1, vec![0u8; 6], ChannelOrder::Bgr)?;
        frame.put_rgb(1, 0, [1, 2, 3]);
        frame.put_rgb(5, 0, [9, 9, 9]);
        frame.put_rgb(-1, 0, [9, 9, 9]);
        assert_eq!(frame.as_bytes(), &[0, 0, 0, 3, 2, 1]);
        Ok(())
    }
}
