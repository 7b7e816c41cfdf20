//! Pipeline error taxonomy.

use thiserror::Error;

/// Failures the pipeline driver distinguishes.
///
/// Only `DeviceUnavailable` is fatal. `StreamEnded` ends the run gracefully;
/// the remaining variants drop one frame or one event and the loop continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The frame source could not be opened at startup.
    #[error("camera unavailable: {0:#}")]
    DeviceUnavailable(anyhow::Error),

    /// The frame source stopped delivering frames.
    #[error("frame stream ended: {0:#}")]
    StreamEnded(anyhow::Error),

    /// The extractor failed on one frame.
    #[error("inference failed: {0:#}")]
    InferenceFailure(anyhow::Error),

    /// Delivering one event to the consumer failed.
    #[error("publish failed: {0:#}")]
    PublishFailure(anyhow::Error),
}

/// Exit status used when the camera cannot be opened.
pub const EXIT_DEVICE_UNAVAILABLE: i32 = 2;

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::DeviceUnavailable(_))
    }

    /// Process exit status for errors that end the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::DeviceUnavailable(_) => EXIT_DEVICE_UNAVAILABLE,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn only_device_errors_are_fatal() {
        assert!(PipelineError::DeviceUnavailable(anyhow!("no camera")).is_fatal());
        assert!(!PipelineError::StreamEnded(anyhow!("eof")).is_fatal());
        assert!(!PipelineError::InferenceFailure(anyhow!("shape")).is_fatal());
        assert!(!PipelineError::PublishFailure(anyhow!("refused")).is_fatal());
    }

    #[test]
    fn display_includes_context_chain() {
        let err = anyhow!("ENOENT").context("open /dev/video0");
        let msg = PipelineError::DeviceUnavailable(err).to_string();
        assert_eq!(msg, "camera unavailable: open /dev/video0: ENOENT");
        assert_eq!(
            PipelineError::DeviceUnavailable(anyhow!("x")).exit_code(),
            EXIT_DEVICE_UNAVAILABLE
        );
    }
}
