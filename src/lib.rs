//! Voice-to-MIDI Transcription System
//!
//! Converts a monophonic recording (typically a sung or hummed melody) into
//! a single-track MIDI file. The pitch path estimates a frame-level pitch
//! track and stabilizes it into discrete notes; the rhythm path independently
//! finds note onsets, durations and tempo. The two are then reconciled into
//! timed notes.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod note;
pub mod onset;
pub mod passes;
pub mod pitch;
pub mod qa;
pub mod spectral;
pub mod tempo;

pub use analysis::{ReconciliationReport, TimedNote};
pub use audio::{AudioState, Waveform};
pub use config::Config;
pub use error::{ErrorCategory, Result as TranscribeResult, TranscribeError};
pub use note::NoteSymbol;
pub use onset::OnsetDetector;
pub use passes::pass_5::{AlignmentStrategy, TruncateToShortest};
pub use pitch::PitchEstimator;
pub use tempo::TempoEstimator;

use analysis::{PitchAnalysis, RhythmAnalysis};
use pitch::YinPitchEstimator;
use std::path::Path;
use tempo::IntervalTempoEstimator;

/// Result of one transcription
#[derive(Debug, Clone)]
pub struct Transcription {
    pub notes: Vec<TimedNote>,
    pub tempo_bpm: f64,
    /// Standard MIDI File bytes
    pub midi: Vec<u8>,
    pub report: ReconciliationReport,
}

/// Main processing pipeline for voice-to-MIDI conversion
pub struct VoiceToMidi {
    config: Config,
    pitch_estimator: Box<dyn PitchEstimator>,
    onset_detector: Box<dyn OnsetDetector>,
    tempo_estimator: Box<dyn TempoEstimator>,
    alignment: Box<dyn AlignmentStrategy>,
}

impl VoiceToMidi {
    /// Create a new processor with the built-in estimators selected by `config`
    pub fn new(config: Config) -> Self {
        let pitch_estimator = Box::new(YinPitchEstimator::new(config.pitch.yin.clone()));
        let onset_detector = onset::detector_from_config(&config.onset);
        let tempo_estimator = Box::new(IntervalTempoEstimator::new(
            config.onset.clone(),
            &config.rhythm,
        ));

        Self {
            config,
            pitch_estimator,
            onset_detector,
            tempo_estimator,
            alignment: Box::new(TruncateToShortest),
        }
    }

    pub fn with_pitch_estimator(mut self, estimator: impl PitchEstimator + 'static) -> Self {
        self.pitch_estimator = Box::new(estimator);
        self
    }

    pub fn with_onset_detector(mut self, detector: impl OnsetDetector + 'static) -> Self {
        self.onset_detector = Box::new(detector);
        self
    }

    pub fn with_tempo_estimator(mut self, estimator: impl TempoEstimator + 'static) -> Self {
        self.tempo_estimator = Box::new(estimator);
        self
    }

    pub fn with_alignment(mut self, strategy: impl AlignmentStrategy + 'static) -> Self {
        self.alignment = Box::new(strategy);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process an audio file and write MIDI and analysis output
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: Q,
    ) -> TranscribeResult<Transcription> {
        log::info!("Processing {}", input_path.as_ref().display());

        // Load audio
        let mut state = AudioState::load(input_path, &self.config)?;

        // Run all passes
        let transcription = self.transcribe_state(&mut state)?;

        // Export results
        self.export_results(&state, &transcription, output_dir.as_ref())?;

        Ok(transcription)
    }

    /// Transcribe an already decoded waveform without writing anything
    pub fn transcribe(&self, waveform: Waveform) -> TranscribeResult<Transcription> {
        let mut state = AudioState::from_waveform(waveform, &self.config);
        self.transcribe_state(&mut state)
    }

    fn transcribe_state(&self, state: &mut AudioState) -> TranscribeResult<Transcription> {
        self.run_pipeline(state)?;

        let midi = midi::assemble_midi(
            &state.timed_notes,
            state.rhythm.tempo_bpm,
            &self.config.midi,
        )?;

        Ok(Transcription {
            notes: state.timed_notes.clone(),
            tempo_bpm: state.rhythm.tempo_bpm,
            midi,
            report: state.reconciliation.clone(),
        })
    }

    /// Execute the complete multi-pass pipeline
    pub fn run_pipeline(&self, state: &mut AudioState) -> TranscribeResult<()> {
        config::validate_config(&self.config)?;

        // Pass 0: Preflight & Envelope
        passes::pass_0::run(state, &self.config)?;

        // Passes 1-4: pitch and rhythm analyses
        self.analyze(state)?;

        check_transcribable(state)?;

        // Pass 5: Note-Timing Reconciliation
        let (timed_notes, report) = passes::pass_5::run(
            &state.pitch.stabilized_notes,
            &state.rhythm.onsets,
            &state.rhythm.durations,
            self.config.midi.velocity,
            self.alignment.as_ref(),
        );
        state.timed_notes = timed_notes;
        state.reconciliation = report;

        Ok(())
    }

    /// Run the pitch path and the rhythm path, concurrently if configured
    fn analyze(&self, state: &mut AudioState) -> TranscribeResult<()> {
        let AudioState {
            waveform,
            analysis_waveform,
            envelope,
            pitch,
            rhythm,
            ..
        } = state;

        let waveform: &Waveform = waveform;
        let envelope: &[f32] = envelope;
        let analysis = analysis_waveform.as_ref().ok_or_else(|| {
            TranscribeError::ProcessingPipelineError(
                "rhythm analysis requires preflight to run first".to_string(),
            )
        })?;

        let pitch_path = || self.pitch_path(waveform);
        let rhythm_path = || self.rhythm_path(analysis, envelope);

        let (pitch_result, rhythm_result) = if self.config.pipeline.parallel_analysis {
            rayon::join(pitch_path, rhythm_path)
        } else {
            (pitch_path(), rhythm_path())
        };

        *pitch = pitch_result?;
        *rhythm = rhythm_result?;
        Ok(())
    }

    fn pitch_path(&self, waveform: &Waveform) -> TranscribeResult<PitchAnalysis> {
        let note_frames =
            passes::pass_1::run(waveform, &self.config.pitch, self.pitch_estimator.as_ref())?;
        Ok(passes::pass_2::run(note_frames, &self.config.stabilizer))
    }

    fn rhythm_path(
        &self,
        analysis: &Waveform,
        envelope: &[f32],
    ) -> TranscribeResult<RhythmAnalysis> {
        let (onsets, durations) =
            passes::pass_3::run(analysis, envelope, &self.config, self.onset_detector.as_ref())?;
        let (raw_tempo_bpm, tempo_bpm) =
            passes::pass_4::run(analysis, &self.config.rhythm, self.tempo_estimator.as_ref())?;

        Ok(RhythmAnalysis {
            onsets,
            durations,
            raw_tempo_bpm,
            tempo_bpm,
        })
    }

    /// Export MIDI and analysis results
    fn export_results(
        &self,
        state: &AudioState,
        transcription: &Transcription,
        output_dir: &Path,
    ) -> TranscribeResult<()> {
        midi::export_midi(&transcription.midi, output_dir, &self.config.export.midi_filename)?;
        if self.config.export.write_analysis {
            analysis::export_analysis(state, output_dir)?;
        }
        if self.config.export.generate_plots {
            qa::generate_artifacts(state, output_dir)?;
        }
        Ok(())
    }
}

/// Reject audio that produced no notes, or no timing, before reconciliation
fn check_transcribable(state: &AudioState) -> TranscribeResult<()> {
    if state.pitch.stabilized_notes.is_empty() {
        log::warn!("No pitched notes detected");
        return Err(TranscribeError::NoPitchDetected);
    }
    if state.rhythm.onsets.is_empty() || state.rhythm.durations.is_empty() {
        log::warn!("No onsets or durations detected");
        return Err(TranscribeError::NoRhythmDetected);
    }
    Ok(())
}

/// Validate configuration and input files
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> TranscribeResult<()> {
    // Check input file exists and is valid audio
    audio::validate_audio_file(input_path, config)?;

    // Validate configuration
    config::validate_config(config)?;

    Ok(())
}
