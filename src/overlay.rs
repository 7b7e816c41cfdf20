//! On-frame feature summary.
//!
//! Three lines of text are burned into the frame at fixed positions:
//! descriptor size, region grid shape and the first global values.

use font8x8::{UnicodeFonts, BASIC_FONTS};

use crate::features::{GlobalDescriptor, RegionGrid};
use crate::frame::Frame;

const TEXT_COLOR: [u8; 3] = [0, 255, 0];
const GLYPH_SIZE: i64 = 8;
const TEXT_SCALE: i64 = 2;
const LEFT_MARGIN: i64 = 10;
/// Top edge of each line, matching the 30/70/110 px baselines of the classic overlay.
const LINE_TOPS: [i64; 3] = [14, 54, 94];

/// Draws feature summaries onto frames.
pub trait OverlayRenderer {
    fn render(&mut self, frame: &mut Frame, global: &GlobalDescriptor, grid: &RegionGrid);
}

/// Bitmap-font text overlay.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextOverlay;

impl TextOverlay {
    pub fn new() -> Self {
        Self
    }
}

impl OverlayRenderer for TextOverlay {
    fn render(&mut self, frame: &mut Frame, global: &GlobalDescriptor, grid: &RegionGrid) {
        for (line, top) in summary_lines(global, grid).iter().zip(LINE_TOPS) {
            draw_text(frame, line, LEFT_MARGIN, top, TEXT_SCALE, TEXT_COLOR);
        }
    }
}

/// The three annotation strings, top to bottom.
pub fn summary_lines(global: &GlobalDescriptor, grid: &RegionGrid) -> [String; 3] {
    let first: Vec<String> = global
        .values()
        .iter()
        .take(3)
        .map(|v| format!("{:.3}", v))
        .collect();
    [
        format!("CLS Features: {} dims", global.len()),
        format!(
            "Patches: {} x {} x {} dims",
            grid.height(),
            grid.width(),
            grid.dim()
        ),
        format!("First 3: [{}]", first.join(", ")),
    ]
}

/// Draw `text` with its top-left corner at (`x`, `y`). Pixels outside the frame are clipped.
pub fn draw_text(frame: &mut Frame, text: &str, x: i64, y: i64, scale: i64, color: [u8; 3]) {
    let advance = GLYPH_SIZE * scale;
    for (index, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let origin_x = x + index as i64 * advance;
        if origin_x >= frame.width() as i64 {
            break;
        }
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = origin_x + col * scale;
                let py = y + row as i64 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        frame.put_rgb(px + dx, py + dy, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ChannelOrder;

    fn features() -> (GlobalDescriptor, RegionGrid) {
        let global = GlobalDescriptor::new(vec![0.12345, -1.5, 2.0, 9.0]);
        let grid = RegionGrid::new(37, 37, 4, vec![0.0; 37 * 37 * 4]).unwrap();
        (global, grid)
    }

    #[test]
    fn summary_lines_are_human_readable() {
        let (global, grid) = features();
        let lines = summary_lines(&global, &grid);
        assert_eq!(lines[0], "CLS Features: 4 dims");
        assert_eq!(lines[1], "Patches: 37 x 37 x 4 dims");
        assert_eq!(lines[2], "First 3: [0.123, -1.500, 2.000]");
    }

    #[test]
    fn render_draws_green_text_in_the_top_left() {
        let (global, grid) = features();
        let mut frame = Frame::from_raw(640, 480, vec![0u8; 640 * 480 * 3], ChannelOrder::Bgr)
            .unwrap();
        TextOverlay::new().render(&mut frame, &global, &grid);

        let mut lit_in_band = 0;
        for y in 0..130 {
            for x in 0..640 {
                if frame.rgb_at(x, y) == Some(TEXT_COLOR) {
                    lit_in_band += 1;
                }
            }
        }
        assert!(lit_in_band > 0);
        for y in 130..480 {
            for x in 0..640 {
                assert_eq!(frame.rgb_at(x, y), Some([0, 0, 0]));
            }
        }
    }

    #[test]
    fn tiny_frames_are_clipped_without_panicking() {
        let (global, grid) = features();
        let mut frame = Frame::from_raw(4, 4, vec![0u8; 48], ChannelOrder::Rgb).unwrap();
        TextOverlay::new().render(&mut frame, &global, &grid);
    }
}
