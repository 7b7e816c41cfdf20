//! Still-image directory source.
//!
//! Replays the decodable image files of a local directory in lexical order,
//! one per `read`, then reports end of stream. Files that fail to decode are
//! skipped with a warning.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::FrameSource;
use crate::frame::{ChannelOrder, Frame};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct DirectorySource {
    root: PathBuf,
    pending: Vec<PathBuf>,
    next: usize,
    opened: bool,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            pending: Vec::new(),
            next: 0,
            opened: false,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for DirectorySource {
    fn open(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("open image directory {}", self.root.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("list image directory {}", self.root.display()))?
                .path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", self.root.display()));
        }
        log::info!(
            "DirectorySource: opened {} ({} images)",
            self.root.display(),
            files.len()
        );
        self.pending = files;
        self.next = 0;
        self.opened = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        if !self.opened {
            return Err(anyhow!("image directory not opened"));
        }
        while let Some(path) = self.pending.get(self.next) {
            self.next += 1;
            match image::open(path) {
                Ok(decoded) => return Frame::from_image(decoded.to_rgb8(), ChannelOrder::Rgb),
                Err(err) => log::warn!("DirectorySource: skipping {}: {}", path.display(), err),
            }
        }
        Err(anyhow!(
            "image directory {} exhausted after {} files",
            self.root.display(),
            self.pending.len()
        ))
    }

    fn describe(&self) -> String {
        format!("dir://{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn replays_images_in_name_order_then_ends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        RgbImage::from_pixel(4, 2, Rgb([200, 0, 0])).save(dir.path().join("b.png"))?;
        RgbImage::from_pixel(2, 2, Rgb([0, 200, 0])).save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("notes.txt"), b"ignored")?;

        let mut source = DirectorySource::new(dir.path());
        source.open()?;
        assert_eq!(source.len(), 2);

        let first = source.read()?;
        assert_eq!(first.rgb_at(0, 0), Some([0, 200, 0]));
        let second = source.read()?;
        assert_eq!((second.width(), second.height()), (4, 2));
        assert!(source.read().is_err());
        Ok(())
    }

    #[test]
    fn empty_directory_fails_to_open() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = DirectorySource::new(dir.path());
        assert!(source.open().is_err());
        Ok(())
    }
}
