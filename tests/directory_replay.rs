use anyhow::Result;
use image::{Rgb, RgbImage};
use tempfile::tempdir;

use vit_feature_feed::{
    CameraSettings, CameraSource, ExitReason, FrameSource, Pipeline, PipelineConfig, StubExtractor,
};

fn write_png(dir: &std::path::Path, name: &str, shade: u8) -> Result<()> {
    let img = RgbImage::from_pixel(40, 30, Rgb([shade, 255 - shade, 128]));
    img.save(dir.join(name))?;
    Ok(())
}

#[test]
fn directory_of_images_replays_as_a_finite_stream() -> Result<()> {
    let dir = tempdir()?;
    write_png(dir.path(), "b.png", 200)?;
    write_png(dir.path(), "a.png", 10)?;
    std::fs::write(dir.path().join("notes.txt"), "ignored")?;

    let settings = CameraSettings {
        device: dir.path().display().to_string(),
        ..PipelineConfig::default().camera
    };
    let source = CameraSource::new(&settings)?;
    assert!(source.describe().starts_with("dir://"));

    let mut extractor = StubExtractor::new(14, 8);
    let summary = Pipeline::new(Box::new(source), &mut extractor).run()?;

    assert_eq!(summary.exit_reason, ExitReason::StreamEnded);
    assert_eq!(summary.counters.frames_captured, 2);
    assert_eq!(summary.counters.events_extracted, 2);
    Ok(())
}

#[test]
fn empty_directory_cannot_be_opened() -> Result<()> {
    let dir = tempdir()?;
    let settings = CameraSettings {
        device: dir.path().display().to_string(),
        width: 640,
        height: 480,
    };
    let mut extractor = StubExtractor::new(14, 8);
    let err = Pipeline::new(Box::new(CameraSource::new(&settings)?), &mut extractor)
        .run()
        .err();
    assert!(err.is_some_and(|e| e.is_fatal()));
    Ok(())
}
