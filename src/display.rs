//! Local display sinks.

use anyhow::Result;

use crate::frame::Frame;

/// Destination for annotated frames.
pub trait FrameSink {
    /// Present one frame.
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// True once the viewer asked to quit (key press or window closed).
    fn quit_requested(&self) -> bool;
}

/// Pack a frame into 0RGB `u32` pixels.
pub fn frame_to_argb(frame: &Frame) -> Vec<u32> {
    let order = frame.order();
    frame
        .as_bytes()
        .chunks_exact(3)
        .map(|px| {
            let (r, g, b) = match order {
                crate::frame::ChannelOrder::Rgb => (px[0], px[1], px[2]),
                crate::frame::ChannelOrder::Bgr => (px[2], px[1], px[0]),
            };
            ((r as u32) << 16) | ((g as u32) << 8) | b as u32
        })
        .collect()
}

#[cfg(feature = "window")]
pub use window::WindowSink;

#[cfg(feature = "window")]
mod window {
    use anyhow::{Context, Result};
    use minifb::{Key, Window, WindowOptions};

    use super::{frame_to_argb, FrameSink};
    use crate::frame::Frame;

    /// Desktop window backed by `minifb`.
    ///
    /// The window is created at the size of the first frame. `q`, `Escape` or
    /// closing the window requests quit.
    pub struct WindowSink {
        title: String,
        window: Option<Window>,
        size: (usize, usize),
    }

    impl WindowSink {
        pub fn new(title: &str) -> Self {
            Self {
                title: title.to_string(),
                window: None,
                size: (0, 0),
            }
        }
    }

    impl FrameSink for WindowSink {
        fn show(&mut self, frame: &Frame) -> Result<()> {
            let size = (frame.width() as usize, frame.height() as usize);
            if self.window.is_none() || self.size != size {
                let window = Window::new(&self.title, size.0, size.1, WindowOptions::default())
                    .with_context(|| format!("create window '{}'", self.title))?;
                log::info!("display window opened ({}x{})", size.0, size.1);
                self.window = Some(window);
                self.size = size;
            }
            let Some(window) = self.window.as_mut() else {
                return Ok(());
            };
            window
                .update_with_buffer(&frame_to_argb(frame), size.0, size.1)
                .context("update display window")
        }

        fn quit_requested(&self) -> bool {
            match &self.window {
                Some(window) => {
                    !window.is_open()
                        || window.is_key_down(Key::Q)
                        || window.is_key_down(Key::Escape)
                }
                None => false,
            }
        }
    }

    impl Drop for WindowSink {
        fn drop(&mut self) {
            if self.window.take().is_some() {
                log::info!("display window closed");
            }
        }
    }
}
