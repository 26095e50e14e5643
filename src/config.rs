//! Configuration system for the voice-to-MIDI processor

use crate::error::{Result as TranscribeResult, TranscribeError};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub audio: AudioConfig,
    pub envelope: EnvelopeConfig,
    pub pitch: PitchConfig,
    pub stabilizer: StabilizerConfig,
    pub onset: OnsetConfig,
    pub rhythm: RhythmConfig,
    pub midi: MidiConfig,
    pub pipeline: PipelineConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            audio: AudioConfig::default(),
            envelope: EnvelopeConfig::default(),
            pitch: PitchConfig::default(),
            stabilizer: StabilizerConfig::default(),
            onset: OnsetConfig::default(),
            rhythm: RhythmConfig::default(),
            midi: MidiConfig::default(),
            pipeline: PipelineConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Audio input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate the rhythm analysis runs at
    pub analysis_sample_rate: u32,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    pub max_duration_sec: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            analysis_sample_rate: 44100,
            min_sample_rate: 8000,
            max_sample_rate: 192000,
            max_duration_sec: 3600.0,
        }
    }
}

/// RMS amplitude envelope configuration (used for note decay detection)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub frame_size: usize,
    pub hop_length: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_length: 512,
        }
    }
}

/// Pitch frame extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub confidence_threshold: f32,
    pub chunk_size: usize,
    /// Add each chunk's start offset to its frame times before sorting.
    /// When false, frame times stay relative to their chunk.
    pub globalize_chunk_times: bool,
    pub yin: YinConfig,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.74,
            chunk_size: 1024 * 10,
            globalize_chunk_times: true,
            yin: YinConfig::default(),
        }
    }
}

/// Parameters for the built-in YIN pitch estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YinConfig {
    pub frame_length: usize,
    pub hop_length: usize,
    pub fmin_hz: f32,
    pub fmax_hz: f32,
    /// Absolute threshold on the cumulative mean normalized difference
    pub threshold: f32,
    /// Frames quieter than this RMS are reported as unvoiced
    pub silence_rms: f32,
}

impl Default for YinConfig {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            hop_length: 512,
            fmin_hz: 65.0,
            fmax_hz: 2000.0,
            threshold: 0.15,
            silence_rms: 0.01,
        }
    }
}

/// Pitch stabilizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    pub window_size: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self { window_size: 5 }
    }
}

/// Onset strength signal used by the built-in detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnsetMethod {
    /// Rectified difference of the RMS envelope
    EnergyFlux,
    /// Positive spectral flux of the STFT magnitude in frames of rising energy
    SpectralFlux,
}

/// Onset detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    pub method: OnsetMethod,
    pub frame_size: usize,
    pub hop_length: usize,
    pub n_fft: usize,
    pub adaptive_window_sec: f32,
    pub k_global: f32,
    /// Peaks weaker than this fraction of the strongest peak are ignored
    pub min_relative_strength: f32,
    pub refractory_ms: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            method: OnsetMethod::EnergyFlux,
            frame_size: 1024,
            hop_length: 512,
            n_fft: 2048,
            adaptive_window_sec: 0.15,
            k_global: 1.4,
            min_relative_strength: 0.3,
            refractory_ms: 50.0,
        }
    }
}

/// Duration and tempo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Envelope level below which a note is considered to have decayed
    pub decay_threshold: f32,
    pub min_duration_sec: f64,
    pub default_tempo_bpm: f64,
    pub tempo_range_bpm: [f64; 2],
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            decay_threshold: 0.025,
            min_duration_sec: 0.05,
            default_tempo_bpm: 120.0,
            tempo_range_bpm: [60.0, 200.0],
        }
    }
}

/// MIDI output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    pub velocity: u8,
    /// General MIDI program (0 = Acoustic Grand Piano)
    pub program: u8,
    pub channel: u8,
    pub ticks_per_quarter: u16,
    pub track_name: String,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            velocity: 100,
            program: 0,
            channel: 0,
            ticks_per_quarter: 960,
            track_name: "Acoustic Grand Piano".to_string(),
        }
    }
}

/// Pipeline execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the pitch and rhythm analyses concurrently
    pub parallel_analysis: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel_analysis: true,
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub midi_filename: String,
    pub write_analysis: bool,
    pub generate_plots: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            midi_filename: "transcription.mid".to_string(),
            write_analysis: true,
            generate_plots: true,
        }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> TranscribeResult<()> {
    let fail = |msg: &str| Err(TranscribeError::ConfigValidationFailed(msg.to_string()));

    if config.audio.analysis_sample_rate == 0 {
        return fail("audio.analysis_sample_rate must be > 0");
    }
    if config.audio.min_sample_rate > config.audio.max_sample_rate {
        return fail("audio.min_sample_rate must be <= max_sample_rate");
    }
    if config.envelope.frame_size == 0 || config.envelope.hop_length == 0 {
        return fail("envelope frame_size and hop_length must be > 0");
    }
    if !(0.0..=1.0).contains(&config.pitch.confidence_threshold) {
        return fail("pitch.confidence_threshold must be within [0, 1]");
    }
    if config.pitch.chunk_size == 0 {
        return fail("pitch.chunk_size must be > 0");
    }
    let yin = &config.pitch.yin;
    if yin.frame_length < 4 || yin.hop_length == 0 {
        return fail("pitch.yin frame_length must be >= 4 and hop_length > 0");
    }
    if yin.fmin_hz <= 0.0 || yin.fmin_hz >= yin.fmax_hz {
        return fail("pitch.yin fmin_hz must be > 0 and < fmax_hz");
    }
    if config.stabilizer.window_size == 0 {
        return fail("stabilizer.window_size must be > 0");
    }
    if config.onset.frame_size == 0 || config.onset.hop_length == 0 || config.onset.n_fft < 2 {
        return fail("onset frame_size, hop_length and n_fft must be positive");
    }
    if config.rhythm.min_duration_sec <= 0.0 {
        return fail("rhythm.min_duration_sec must be > 0");
    }
    if config.rhythm.default_tempo_bpm <= 0.0 {
        return fail("rhythm.default_tempo_bpm must be > 0");
    }
    if config.rhythm.tempo_range_bpm[0] <= 0.0
        || config.rhythm.tempo_range_bpm[0] >= config.rhythm.tempo_range_bpm[1]
    {
        return fail("rhythm.tempo_range_bpm min must be > 0 and < max");
    }
    if config.midi.velocity > 127 || config.midi.program > 127 || config.midi.channel > 15 {
        return fail("midi velocity/program must be <= 127 and channel <= 15");
    }
    if config.midi.ticks_per_quarter == 0 || config.midi.ticks_per_quarter > 0x7FFF {
        return fail("midi.ticks_per_quarter must be within 1..=32767");
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = Config::default();
        assert_eq!(config.pitch.confidence_threshold, 0.74);
        assert_eq!(config.pitch.chunk_size, 10240);
        assert_eq!(config.stabilizer.window_size, 5);
        assert_eq!(config.envelope.hop_length, 512);
        assert_eq!(config.rhythm.decay_threshold, 0.025);
        assert_eq!(config.rhythm.min_duration_sec, 0.05);
        assert_eq!(config.rhythm.default_tempo_bpm, 120.0);
        assert_eq!(config.midi.velocity, 100);
        assert_eq!(config.audio.analysis_sample_rate, 44100);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "pitch": { "confidence_threshold": 0.5 }, "onset": { "method": "spectral_flux" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.pitch.confidence_threshold, 0.5);
        assert_eq!(config.pitch.chunk_size, 10240);
        assert_eq!(config.onset.method, OnsetMethod::SpectralFlux);
        assert_eq!(config.stabilizer.window_size, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.stabilizer.window_size = 0;
        assert!(matches!(
            validate_config(&config),
            Err(TranscribeError::ConfigValidationFailed(_))
        ));

        let mut config = Config::default();
        config.rhythm.tempo_range_bpm = [200.0, 60.0];
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.pitch.confidence_threshold = 1.5;
        assert!(validate_config(&config).is_err());
    }
}
