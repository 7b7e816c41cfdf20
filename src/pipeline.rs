//! Pipeline driver.
//!
//! One synchronous loop per process:
//!
//! ```text
//! Idle -> Capturing -> Preprocessing -> Extracting -> Publishing/Rendering -> Capturing ...
//!   \________________________ any state ________________________/-> Terminating
//! ```
//!
//! Frames are never buffered: a slow stage simply delays the next capture.
//! Quit requests (signal or display key) are checked once at the top of each
//! iteration. The frame source and display are owned by the pipeline and are
//! released when `run` returns, on every exit path.

use std::time::{Duration, Instant};

use crate::config::PipelineConfig;
use crate::display::FrameSink;
use crate::error::PipelineError;
use crate::extract::FeatureExtractor;
use crate::features::FeatureEvent;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::overlay::OverlayRenderer;
use crate::preprocess;
use crate::publish::FeaturePublisher;
use crate::shutdown::ShutdownSignal;
use crate::stats::{FeatureStats, FpsMeter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Capturing,
    Preprocessing,
    Extracting,
    Publishing,
    Rendering,
    Terminating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The frame source reported end of stream.
    StreamEnded,
    /// A signal or the display asked to quit.
    QuitRequested,
}

/// Run-time switches.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub display: bool,
    pub publish: bool,
    pub stats_interval: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            display: true,
            publish: true,
            stats_interval: Duration::from_secs(5),
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            display: cfg.display_enabled,
            publish: cfg.publish_enabled,
            stats_interval: cfg.stats_interval,
        }
    }
}

/// Overlay renderer plus the sink that shows its output.
pub struct Presentation {
    pub renderer: Box<dyn OverlayRenderer>,
    pub sink: Box<dyn FrameSink>,
}

impl Presentation {
    pub fn new(renderer: Box<dyn OverlayRenderer>, sink: Box<dyn FrameSink>) -> Self {
        Self { renderer, sink }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCounters {
    pub frames_captured: u64,
    pub events_extracted: u64,
    pub frames_dropped: u64,
    pub events_published: u64,
    pub publish_failures: u64,
    pub frames_rendered: u64,
    pub status_reports: u64,
}

/// Outcome of a completed run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub counters: FrameCounters,
    pub exit_reason: ExitReason,
    pub final_state: PipelineState,
    pub last_stats: Option<FeatureStats>,
}

impl RunSummary {
    /// Graceful endings always exit with status 0.
    pub fn exit_code(&self) -> i32 {
        0
    }
}

pub struct Pipeline<'m> {
    source: Box<dyn FrameSource>,
    extractor: &'m mut dyn FeatureExtractor,
    publisher: Option<Box<dyn FeaturePublisher>>,
    presentation: Option<Presentation>,
    shutdown: ShutdownSignal,
    stats_interval: Duration,
    state: PipelineState,
    counters: FrameCounters,
    publish_failure_streak: u64,
    fps: FpsMeter,
    last_stats: Option<FeatureStats>,
}

impl<'m> Pipeline<'m> {
    /// Pipeline with neither publishing nor display.
    pub fn new(source: Box<dyn FrameSource>, extractor: &'m mut dyn FeatureExtractor) -> Self {
        Self {
            source,
            extractor,
            publisher: None,
            presentation: None,
            shutdown: ShutdownSignal::new(),
            stats_interval: PipelineOptions::default().stats_interval,
            state: PipelineState::Idle,
            counters: FrameCounters::default(),
            publish_failure_streak: 0,
            fps: FpsMeter::default(),
            last_stats: None,
        }
    }

    /// Build a pipeline from run-time options.
    ///
    /// The publisher and display factories are only called when the matching
    /// option is enabled, so a disabled stage never exists inside the loop. A
    /// display factory returning `None` leaves the pipeline headless.
    pub fn from_options<P, D>(
        options: &PipelineOptions,
        source: Box<dyn FrameSource>,
        extractor: &'m mut dyn FeatureExtractor,
        make_publisher: P,
        make_presentation: D,
    ) -> Self
    where
        P: FnOnce() -> Box<dyn FeaturePublisher>,
        D: FnOnce() -> Option<Presentation>,
    {
        let mut pipeline = Self::new(source, extractor).with_stats_interval(options.stats_interval);
        if options.publish {
            pipeline.publisher = Some(make_publisher());
        }
        if options.display {
            pipeline.presentation = make_presentation();
            if pipeline.presentation.is_none() {
                log::warn!("no display available; running headless");
            }
        }
        pipeline
    }

    pub fn with_publisher(mut self, publisher: Box<dyn FeaturePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = Some(presentation);
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn publishing_enabled(&self) -> bool {
        self.publisher.is_some()
    }

    pub fn display_enabled(&self) -> bool {
        self.presentation.is_some()
    }

    /// Open the source and process frames until the stream ends or quit is requested.
    ///
    /// Only a source that fails to open is returned as an error.
    pub fn run(mut self) -> Result<RunSummary, PipelineError> {
        log::info!(
            "opening frame source {} (extractor={}, publish={}, display={})",
            self.source.describe(),
            self.extractor.name(),
            self.publishing_enabled(),
            self.display_enabled()
        );
        if let Err(err) = self.source.open() {
            self.enter(PipelineState::Terminating);
            return Err(PipelineError::DeviceUnavailable(err));
        }

        let mut last_status = Instant::now();
        let exit_reason = loop {
            if self.quit_requested() {
                log::info!("quit requested");
                break ExitReason::QuitRequested;
            }

            self.enter(PipelineState::Capturing);
            let mut frame = match self.source.read() {
                Ok(frame) => frame,
                Err(err) => {
                    log::info!("{}", PipelineError::StreamEnded(err));
                    break ExitReason::StreamEnded;
                }
            };
            self.counters.frames_captured += 1;
            self.fps.tick();

            self.enter(PipelineState::Preprocessing);
            let tensor = preprocess::prepare(&frame);

            self.enter(PipelineState::Extracting);
            match self.extractor.extract(&tensor) {
                Ok(features) => {
                    self.counters.events_extracted += 1;
                    let event = FeatureEvent::now(features);
                    self.last_stats = Some(FeatureStats::compute(event.global(), event.grid()));

                    self.publish(&event);
                    self.render(&mut frame, &event);
                }
                Err(err) => {
                    self.counters.frames_dropped += 1;
                    log::warn!(
                        "frame {} dropped: {}",
                        self.counters.frames_captured,
                        PipelineError::InferenceFailure(err)
                    );
                }
            }

            // Dropped frames still count toward the status cadence.
            if last_status.elapsed() >= self.stats_interval {
                self.log_status();
                last_status = Instant::now();
            }
        };

        self.enter(PipelineState::Terminating);
        let summary = RunSummary {
            counters: self.counters,
            exit_reason,
            final_state: self.state,
            last_stats: self.last_stats,
        };
        log::info!(
            "pipeline terminated ({:?}): captured={} extracted={} dropped={} published={} publish_failures={} rendered={}",
            summary.exit_reason,
            summary.counters.frames_captured,
            summary.counters.events_extracted,
            summary.counters.frames_dropped,
            summary.counters.events_published,
            summary.counters.publish_failures,
            summary.counters.frames_rendered
        );
        Ok(summary)
    }

    fn enter(&mut self, next: PipelineState) {
        log::trace!("pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn quit_requested(&self) -> bool {
        if self.shutdown.is_requested() {
            return true;
        }
        self.presentation
            .as_ref()
            .is_some_and(|p| p.sink.quit_requested())
    }

    fn publish(&mut self, event: &FeatureEvent) {
        if self.publisher.is_none() {
            return;
        }
        self.enter(PipelineState::Publishing);
        let Some(publisher) = self.publisher.as_mut() else {
            return;
        };
        match publisher.publish(event) {
            Ok(()) => {
                if self.publish_failure_streak > 0 {
                    log::info!(
                        "publishing recovered after {} lost events",
                        self.publish_failure_streak
                    );
                }
                self.publish_failure_streak = 0;
                self.counters.events_published += 1;
            }
            Err(err) => {
                self.counters.publish_failures += 1;
                self.publish_failure_streak += 1;
                let err = PipelineError::PublishFailure(err);
                if self.publish_failure_streak == 1 {
                    log::warn!("{} (further failures logged at debug)", err);
                } else {
                    log::debug!("{}", err);
                }
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, event: &FeatureEvent) {
        if self.presentation.is_none() {
            return;
        }
        self.enter(PipelineState::Rendering);
        let Some(presentation) = self.presentation.as_mut() else {
            return;
        };
        presentation
            .renderer
            .render(frame, event.global(), event.grid());
        match presentation.sink.show(frame) {
            Ok(()) => self.counters.frames_rendered += 1,
            Err(err) => {
                log::warn!("display disabled for the rest of the run: {:#}", err);
                self.presentation = None;
            }
        }
    }

    fn log_status(&mut self) {
        self.counters.status_reports += 1;
        let c = &self.counters;
        match &self.last_stats {
            Some(stats) => log::info!(
                "fps={:.1} captured={} extracted={} dropped={} published={} publish_failures={} features(min={:.3} max={:.3} mean={:.3} std={:.3})",
                self.fps.fps(),
                c.frames_captured,
                c.events_extracted,
                c.frames_dropped,
                c.events_published,
                c.publish_failures,
                stats.min,
                stats.max,
                stats.mean,
                stats.std
            ),
            None => log::info!(
                "fps={:.1} captured={} extracted={} dropped={}",
                self.fps.fps(),
                c.frames_captured,
                c.events_extracted,
                c.frames_dropped
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::StubExtractor;
    use crate::ingest::SyntheticCamera;

    #[test]
    fn starts_idle_with_stages_off() {
        let mut extractor = StubExtractor::new(14, 4);
        let pipeline = Pipeline::new(Box::new(SyntheticCamera::new(8, 8)), &mut extractor);
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(!pipeline.publishing_enabled());
        assert!(!pipeline.display_enabled());
    }

    #[test]
    fn options_follow_config_flags() -> anyhow::Result<()> {
        let cfg = PipelineConfig::from_flags(true, false)?;
        let options = PipelineOptions::from(&cfg);
        assert!(!options.display);
        assert!(options.publish);
        assert_eq!(options.stats_interval, cfg.stats_interval);
        Ok(())
    }
}
