//! Frame -> model input tensor.
//!
//! The steps are fixed and must not drift, since any change moves the feature
//! space away from what downstream consumers were built against:
//!
//! 1. reorder channels to RGB
//! 2. resize to 518x518 with a triangle (bilinear) filter
//! 3. scale to [0, 1] and normalize per channel with the ImageNet mean/std
//! 4. lay out as `[1, 3, H, W]`

use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::frame::Frame;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 518;

/// Per-channel mean in RGB order.
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviation in RGB order.
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Normalized `[1, 3, H, W]` float tensor, consumed by an extractor.
#[derive(Clone, Debug, PartialEq)]
pub struct InputTensor(Array4<f32>);

impl InputTensor {
    pub fn new(array: Array4<f32>) -> Self {
        Self(array)
    }

    pub fn shape(&self) -> [usize; 4] {
        let dim = self.0.dim();
        [dim.0, dim.1, dim.2, dim.3]
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

    pub fn into_array(self) -> Array4<f32> {
        self.0
    }
}

/// Prepare a frame for inference at the fixed model resolution.
pub fn prepare(frame: &Frame) -> InputTensor {
    prepare_with_size(frame, INPUT_SIZE)
}

pub(crate) fn prepare_with_size(frame: &Frame, size: u32) -> InputTensor {
    let rgb = frame.to_rgb();
    let resized = if rgb.dimensions() == (size, size) {
        rgb
    } else {
        imageops::resize(&rgb, size, size, RESIZE_FILTER)
    };

    let side = size as usize;
    let array = Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
        let sample = resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0;
        (sample - MEAN[c]) / STD[c]
    });
    InputTensor(array)
}
