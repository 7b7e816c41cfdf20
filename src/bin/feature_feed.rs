//! feature_feed - live camera to ViT feature stream
//!
//! This binary:
//! 1. Opens the local camera
//! 2. Loads the feature extractor once
//! 3. Extracts global and per-region descriptors from every frame
//! 4. Posts each result as JSON to the local consumer (unless --no-ui)
//! 5. Shows the annotated frame in a window (unless --no-window)
//!
//! Exit status: 0 when the stream ends or quit is requested, 2 when the camera
//! cannot be opened, 1 on any other startup failure.

use anyhow::{Context, Result};
use clap::Parser;

use vit_feature_feed::{
    load_extractor,
    ui::Ui,
    CameraSource, FeaturePublisher, HttpPublisher, Pipeline, PipelineConfig, PipelineError,
    PipelineOptions, Presentation, ShutdownSignal,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream ViT features from a local camera")]
struct Args {
    /// Do not open the display window.
    #[arg(long)]
    no_window: bool,
    /// Do not publish features to the local consumer.
    #[arg(long)]
    no_ui: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = PipelineConfig::from_flags(args.no_window, args.no_ui)?;
    let ui = Ui::detect();

    let shutdown = ShutdownSignal::new();
    shutdown.install_handler()?;

    let source = {
        let stage = ui.stage("open camera");
        match CameraSource::new(&cfg.camera) {
            Ok(source) => source,
            Err(err) => {
                stage.fail();
                exit_with(PipelineError::DeviceUnavailable(err));
            }
        }
    };

    let mut extractor = {
        let _stage = ui.stage("load feature extractor");
        load_extractor(&cfg.model).context("load feature extractor")?
    };

    let options = PipelineOptions::from(&cfg);

    let publish = cfg.publish.clone();
    let title = cfg.window_title.clone();
    let pipeline = Pipeline::from_options(
        &options,
        Box::new(source),
        extractor.as_mut(),
        move || -> Box<dyn FeaturePublisher> {
            log::info!("publishing features to {}", publish.endpoint);
            Box::new(HttpPublisher::new(&publish.endpoint, publish.timeout))
        },
        move || make_presentation(&title),
    )
    .with_shutdown(shutdown);

    match pipeline.run() {
        Ok(summary) => {
            log::info!(
                "done: {} events from {} frames",
                summary.counters.events_extracted,
                summary.counters.frames_captured
            );
            std::process::exit(summary.exit_code());
        }
        Err(err) => exit_with(err),
    }
}

#[cfg(feature = "window")]
fn make_presentation(title: &str) -> Option<Presentation> {
    Some(Presentation::new(
        Box::new(vit_feature_feed::TextOverlay::new()),
        Box::new(vit_feature_feed::WindowSink::new(title)),
    ))
}

#[cfg(not(feature = "window"))]
fn make_presentation(_title: &str) -> Option<Presentation> {
    log::warn!("built without the window feature");
    None
}

fn exit_with(err: PipelineError) -> ! {
    log::error!("{}", err);
    std::process::exit(err.exit_code());
}
