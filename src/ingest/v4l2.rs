//! V4L2 camera source.
//!
//! Opens a local device node (e.g. /dev/video0), negotiates a capture format
//! and streams frames through an mmap buffer ring. The device is closed when
//! the source is dropped.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::normalize::{to_frame, PixelFormat};
use super::FrameSource;
use crate::frame::Frame;

const STREAM_BUFFERS: u32 = 4;

pub struct V4l2Camera {
    device: String,
    width: u32,
    height: u32,
    state: Option<DeviceState>,
    format: Option<PixelFormat>,
    frame_count: u64,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub fn new(device: &str, width: u32, height: u32) -> Self {
        Self {
            device: device.to_string(),
            width,
            height,
            state: None,
            format: None,
            frame_count: 0,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

impl FrameSource for V4l2Camera {
    fn open(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.device)
            .with_context(|| format!("open v4l2 device {}", self.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.width;
        format.height = self.height;
        format.fourcc = v4l::FourCC::new(b"YUYV");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Camera: failed to set format on {}: {}",
                    self.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "unsupported capture format {} on {}",
                format.fourcc,
                self.device
            )
        })?;

        self.width = format.width;
        self.height = format.height;
        self.format = Some(pixel_format);

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "V4l2Camera: opened {} ({}x{} {:?})",
            self.device,
            self.width,
            self.height,
            pixel_format
        );
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let format = self.format.context("v4l2 device not opened")?;
        let state = self.state.as_mut().context("v4l2 device not opened")?;
        let (width, height) = (self.width, self.height);
        let frame = state.with_mut(|fields| -> Result<Frame> {
            let (buf, meta) = fields.stream.next().context("capture v4l2 frame")?;
            let used = (meta.bytesused as usize).min(buf.len());
            let payload = if used == 0 { buf } else { &buf[..used] };
            to_frame(payload, width, height, format)
        })?;

        self.frame_count += 1;
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("v4l2://{}", self.device)
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        if self.state.take().is_some() {
            log::info!(
                "V4l2Camera: released {} after {} frames",
                self.device,
                self.frame_count
            );
        }
    }
}
