//! Error types for the voice-to-MIDI pipeline

use std::fmt;

/// Broad classification of a [`TranscribeError`], used by callers to decide
/// how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input itself is unusable (unreadable, empty, unsupported).
    Input,
    /// The audio was processed but contained nothing transcribable.
    /// The user can retry with a clearer recording.
    Rejection,
    /// An internal stage failed for this invocation.
    Fatal,
}

/// Custom error type for voice-to-MIDI processing
#[derive(Debug, Clone)]
pub enum TranscribeError {
    /// E001: Invalid audio format (e.g., non-PCM WAV)
    InvalidAudioFormat(String),
    /// E002: Unsupported sample rate
    UnsupportedSampleRate(u32),
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: Input validation error (empty waveform, bad duration)
    InputValidationError(String),
    /// E005: Audio file I/O error
    AudioFileError(String),
    /// E006: Pitch extraction and stabilization produced no notes
    NoPitchDetected,
    /// E007: No onsets or durations could be derived
    NoRhythmDetected,
    /// E008: An injected estimator (pitch, onset or tempo) failed
    EstimatorFailure {
        estimator: &'static str,
        message: String,
    },
    /// E009: MIDI assembly or serialization failed
    MidiExportError(String),
    /// E010: Analysis export error
    AnalysisExportError(String),
    /// E011: QA artifact generation error
    QaGenerationError(String),
    /// E012: Processing pipeline error
    ProcessingPipelineError(String),
}

impl TranscribeError {
    /// Category used to separate content rejections from real failures
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranscribeError::InvalidAudioFormat(_)
            | TranscribeError::UnsupportedSampleRate(_)
            | TranscribeError::ConfigValidationFailed(_)
            | TranscribeError::InputValidationError(_)
            | TranscribeError::AudioFileError(_) => ErrorCategory::Input,
            TranscribeError::NoPitchDetected | TranscribeError::NoRhythmDetected => {
                ErrorCategory::Rejection
            }
            TranscribeError::EstimatorFailure { .. }
            | TranscribeError::MidiExportError(_)
            | TranscribeError::AnalysisExportError(_)
            | TranscribeError::QaGenerationError(_)
            | TranscribeError::ProcessingPipelineError(_) => ErrorCategory::Fatal,
        }
    }

    /// True for user-correctable content rejections
    pub fn is_rejection(&self) -> bool {
        self.category() == ErrorCategory::Rejection
    }

    /// Message suitable for showing to the person who made the recording
    pub fn user_message(&self) -> String {
        match self {
            TranscribeError::NoPitchDetected => {
                "No musical notes detected in the audio. Please try recording again with clearer audio."
                    .to_string()
            }
            TranscribeError::NoRhythmDetected => {
                "Could not detect timing information. Please try recording again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TranscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscribeError::InvalidAudioFormat(msg) => {
                write!(f, "E001: Invalid audio format - {}", msg)
            }
            TranscribeError::UnsupportedSampleRate(sr) => {
                write!(f, "E002: Unsupported sample rate {} Hz", sr)
            }
            TranscribeError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            TranscribeError::InputValidationError(msg) => {
                write!(f, "E004: Input validation error - {}", msg)
            }
            TranscribeError::AudioFileError(msg) => {
                write!(f, "E005: Audio file I/O error - {}", msg)
            }
            TranscribeError::NoPitchDetected => {
                write!(f, "E006: No pitched notes detected")
            }
            TranscribeError::NoRhythmDetected => {
                write!(f, "E007: No onsets or note durations detected")
            }
            TranscribeError::EstimatorFailure { estimator, message } => {
                write!(f, "E008: {} estimator failed - {}", estimator, message)
            }
            TranscribeError::MidiExportError(msg) => {
                write!(f, "E009: MIDI export error - {}", msg)
            }
            TranscribeError::AnalysisExportError(msg) => {
                write!(f, "E010: Analysis export error - {}", msg)
            }
            TranscribeError::QaGenerationError(msg) => {
                write!(f, "E011: QA artifact generation error - {}", msg)
            }
            TranscribeError::ProcessingPipelineError(msg) => {
                write!(f, "E012: Processing pipeline error - {}", msg)
            }
        }
    }
}

impl std::error::Error for TranscribeError {}

// From implementations for common error types
impl From<std::io::Error> for TranscribeError {
    fn from(err: std::io::Error) -> Self {
        TranscribeError::AudioFileError(format!("File I/O error: {}", err))
    }
}

impl From<hound::Error> for TranscribeError {
    fn from(err: hound::Error) -> Self {
        TranscribeError::AudioFileError(err.to_string())
    }
}

impl From<serde_json::Error> for TranscribeError {
    fn from(err: serde_json::Error) -> Self {
        TranscribeError::AnalysisExportError(format!("JSON serialization error: {}", err))
    }
}

impl From<anyhow::Error> for TranscribeError {
    fn from(err: anyhow::Error) -> Self {
        TranscribeError::ProcessingPipelineError(format!("Generic error: {}", err))
    }
}

/// Result type alias for voice-to-MIDI operations
pub type Result<T> = std::result::Result<T, TranscribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_are_distinct_from_failures() {
        assert!(TranscribeError::NoPitchDetected.is_rejection());
        assert!(TranscribeError::NoRhythmDetected.is_rejection());

        let failure = TranscribeError::EstimatorFailure {
            estimator: "pitch",
            message: "model unavailable".to_string(),
        };
        assert!(!failure.is_rejection());
        assert_eq!(failure.category(), ErrorCategory::Fatal);
        assert_eq!(
            TranscribeError::MidiExportError("x".to_string()).category(),
            ErrorCategory::Fatal
        );
        assert_eq!(
            TranscribeError::InputValidationError("empty".to_string()).category(),
            ErrorCategory::Input
        );
    }

    #[test]
    fn test_display_codes() {
        let err = TranscribeError::UnsupportedSampleRate(4000);
        assert_eq!(err.to_string(), "E002: Unsupported sample rate 4000 Hz");

        let err = TranscribeError::EstimatorFailure {
            estimator: "onset",
            message: "boom".to_string(),
        };
        assert!(err.to_string().starts_with("E008: onset estimator failed"));
    }

    #[test]
    fn test_user_message_for_rejections() {
        assert!(TranscribeError::NoPitchDetected
            .user_message()
            .contains("clearer audio"));
        assert!(TranscribeError::NoRhythmDetected
            .user_message()
            .contains("timing"));
    }
}
