use anyhow::{anyhow, Result};

use crate::frame::{ChannelOrder, Frame};

/// Capture formats accepted from devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Bgr24,
    Yuyv,
    Nv12,
}

impl PixelFormat {
    #[cfg(feature = "camera-v4l2")]
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(Self::Rgb24),
            b"BGR3" => Some(Self::Bgr24),
            b"YUYV" => Some(Self::Yuyv),
            b"NV12" => Some(Self::Nv12),
            _ => None,
        }
    }
}

/// Convert one captured buffer into a `Frame`.
///
/// Packed 24-bit formats keep their native channel order; YUV formats are
/// converted to RGB.
pub(crate) fn to_frame(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Frame> {
    match format {
        PixelFormat::Rgb24 => Frame::from_raw(width, height, pixels.to_vec(), ChannelOrder::Rgb),
        PixelFormat::Bgr24 => Frame::from_raw(width, height, pixels.to_vec(), ChannelOrder::Bgr),
        PixelFormat::Yuyv => {
            Frame::from_raw(width, height, yuyv_to_rgb(pixels, width, height)?, ChannelOrder::Rgb)
        }
        PixelFormat::Nv12 => {
            Frame::from_raw(width, height, nv12_to_rgb(pixels, width, height)?, ChannelOrder::Rgb)
        }
    }
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    if w % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even, got {}", w));
    }
    let expected = w
        .checked_mul(h)
        .and_then(|v| v.checked_mul(2))
        .ok_or_else(|| anyhow!("YUYV frame dimensions overflow"))?;
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(w * h * 3);
    for chunk in pixels[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            rgb.extend_from_slice(&yuv_to_rgb(y as f32, u, v));
        }
    }
    Ok(rgb)
}

fn nv12_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(anyhow!("NV12 frame has zero size"));
    }
    let w = width as usize;
    let luma_len = w
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("NV12 {}x{} is too large", width, height))?;
    let chroma_len = luma_len / 2;
    if pixels.len() != luma_len + chroma_len {
        return Err(anyhow!(
            "NV12 buffer holds {} bytes, {}x{} needs {}",
            pixels.len(),
            width,
            height,
            luma_len + chroma_len
        ));
    }
    let (luma, chroma) = pixels.split_at(luma_len);

    let mut rgb = Vec::with_capacity(luma_len * 3);
    for (row, luma_row) in luma.chunks_exact(w).enumerate() {
        // One interleaved UV row serves two luma rows.
        let uv_row = &chroma[(row / 2) * w..];
        for (col, &y) in luma_row.iter().enumerate() {
            let uv = &uv_row[col & !1..];
            let (u, v) = (uv[0] as f32 - 128.0, uv[1] as f32 - 128.0);
            rgb.extend_from_slice(&yuv_to_rgb(y as f32, u, v));
        }
    }
    Ok(rgb)
}

/// BT.601 full-range YCbCr to RGB; `u` and `v` are already centred on zero.
fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [u8; 3] {
    let channel = |value: f32| value.round().clamp(0.0, 255.0) as u8;
    [
        channel(y + 1.402 * v),
        channel(y - 0.344_136 * u - 0.714_136 * v),
        channel(y + 1.772 * u),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_nv12_chroma_gives_gray_pixels() -> Result<()> {
        let nv12 = [vec![128u8; 4], vec![128u8; 2]].concat();
        let frame = to_frame(&nv12, 2, 2, PixelFormat::Nv12)?;
        assert_eq!(frame.as_bytes(), &[128u8; 12][..]);
        Ok(())
    }

    #[test]
    fn yuyv_conversion_produces_gray() -> Result<()> {
        let yuyv = [90u8, 128, 90, 128];
        let frame = to_frame(&yuyv, 2, 1, PixelFormat::Yuyv)?;
        assert_eq!(frame.as_bytes(), &[90u8; 6][..]);
        assert_eq!(frame.order(), ChannelOrder::Rgb);
        Ok(())
    }

    #[test]
    fn bgr_keeps_native_order_and_validates_length() -> Result<()> {
        let frame = to_frame(&[1, 2, 3], 1, 1, PixelFormat::Bgr24)?;
        assert_eq!(frame.order(), ChannelOrder::Bgr);
        assert!(to_frame(&[1, 2], 1, 1, PixelFormat::Rgb24).is_err());
        Ok(())
    }
}
