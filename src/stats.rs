//! Throughput and feature-value statistics for periodic status logs.

use std::time::{Duration, Instant};

use crate::features::{GlobalDescriptor, RegionGrid};

/// Summary over every global and region value of one event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeatureStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub std: f32,
}

impl FeatureStats {
    pub fn compute(global: &GlobalDescriptor, grid: &RegionGrid) -> Self {
        let values = || global.values().iter().chain(grid.values().iter()).copied();
        let count = global.len() + grid.values().len();
        if count == 0 {
            return Self::default();
        }

        let (min, max, sum) = values().fold(
            (f32::INFINITY, f32::NEG_INFINITY, 0.0f64),
            |(lo, hi, sum), v| (lo.min(v), hi.max(v), sum + v as f64),
        );
        let mean = sum / count as f64;
        let variance = values()
            .map(|v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64;

        Self {
            min,
            max,
            mean: mean as f32,
            std: variance.sqrt() as f32,
        }
    }
}

/// Frames-per-second over consecutive windows.
#[derive(Debug)]
pub struct FpsMeter {
    window: Duration,
    window_start: Instant,
    frames_in_window: u32,
    fps: f32,
}

impl FpsMeter {
    pub fn new(window: Duration) -> Self {
        Self::starting_at(window, Instant::now())
    }

    pub fn starting_at(window: Duration, start: Instant) -> Self {
        Self {
            window,
            window_start: start,
            frames_in_window: 0,
            fps: 0.0,
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Count one frame at `now`, closing the window when it has elapsed.
    pub fn tick_at(&mut self, now: Instant) {
        self.frames_in_window += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= self.window {
            self.fps = self.frames_in_window as f32 / elapsed.as_secs_f32();
            self.frames_in_window = 0;
            self.window_start = now;
        }
    }

    /// Rate measured over the last completed window.
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_cover_global_and_regions() {
        let global = GlobalDescriptor::new(vec![1.0, 3.0]);
        let grid = RegionGrid::new(1, 1, 2, vec![-1.0, 5.0]).unwrap();
        let stats = FeatureStats::compute(&global, &grid);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 5.0);
        assert!((stats.mean - 2.0).abs() < 1e-6);
        assert!((stats.std - 5.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn fps_meter_reports_completed_windows() {
        let start = Instant::now();
        let mut meter = FpsMeter::starting_at(Duration::from_secs(1), start);
        for i in 1..=9 {
            meter.tick_at(start + Duration::from_millis(100 * i));
        }
        assert_eq!(meter.fps(), 0.0);
        meter.tick_at(start + Duration::from_secs(1));
        assert!((meter.fps() - 10.0).abs() < 1e-3);
    }
}
