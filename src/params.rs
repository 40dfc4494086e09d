//! Parameter definitions with documented units and semantics.
//!
//! All magic numbers of the visualizer live here with:
//! - Units (milliseconds, layout units, slots)
//! - Documented ranges and meanings
//! - Validation for the combinations that must hold

/// Ring visualizer tuning parameters
#[derive(Debug, Clone)]
pub struct VisualizerTuning {
    /// Number of visible bar slots in one rotation of the ring
    pub bar_count: usize,

    /// Length of the amplitude array pulled from the spectrum source
    /// (only the first `bar_count` entries are consulted)
    pub source_bins: usize,

    /// How many slots the rotation offset advances per refresh
    pub index_step: usize,

    /// Angular repetitions of the full ring, 360°/rounds apart
    pub rounds: usize,

    /// Bar length in layout units at amplitude 1.0
    pub bar_max_length: f32,

    /// Fraction of bar amplitude lost per millisecond of decay
    pub decay_per_ms: f32,

    /// Additive decay bias so bars reach zero in finite time instead of
    /// stalling asymptotically (~3% of full scale)
    pub decay_bias: f32,

    /// Milliseconds between amplitude refreshes (wall clock, not frames)
    pub refresh_interval_ms: f32,

    /// Attack scale outside kiai sections (kiai sections attack at 1.0)
    pub quiet_attack_scale: f32,
}

impl Default for VisualizerTuning {
    fn default() -> Self {
        Self {
            bar_count: 200,
            source_bins: 256,
            index_step: 5,
            rounds: 5,
            bar_max_length: 600.0,
            decay_per_ms: 0.0024,
            decay_bias: 0.03,
            refresh_interval_ms: 50.0,
            quiet_attack_scale: 0.5,
        }
    }
}

impl VisualizerTuning {
    /// Quads emitted per frame (constant regardless of amplitudes)
    pub fn quad_count(&self) -> usize {
        self.bar_count * self.rounds
    }

    /// Validate parameter combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.bar_count == 0 {
            return Err("bar count must be > 0".to_string());
        }
        if self.bar_count > self.source_bins {
            return Err(format!(
                "bar count {} exceeds source bins {}",
                self.bar_count, self.source_bins
            ));
        }
        if self.index_step == 0 {
            return Err("index step must be > 0".to_string());
        }
        if self.rounds == 0 {
            return Err("rounds must be > 0".to_string());
        }
        if self.refresh_interval_ms <= 0.0 {
            return Err("refresh interval must be > 0".to_string());
        }
        Ok(())
    }
}

/// Spectrum analysis configuration
#[derive(Debug, Clone)]
pub struct SpectrumConfig {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: usize,

    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// Analysis update interval (milliseconds)
    pub update_interval_ms: u64,

    /// Number of magnitude bins published to the visualizer
    pub bins: usize,

    /// Gain applied to normalized magnitudes before the [0, 1] clamp
    pub magnitude_gain: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            fft_size: 1024,
            update_interval_ms: 50,
            bins: 256,
            magnitude_gain: 6.0,
        }
    }
}

impl SpectrumConfig {
    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.sample_rate_hz == 0 {
            return Err("Sample rate must be > 0".to_string());
        }
        if self.bins > self.fft_size / 2 {
            return Err(format!(
                "{} bins exceed the {} usable FFT bins",
                self.bins,
                self.fft_size / 2
            ));
        }
        Ok(())
    }
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Side length of the square the bar ring is inscribed in (layout units);
    /// bars extrude up to `bar_max_length` beyond it
    pub ring_size: f32,

    /// Accent color applied to every bar, drawn additively
    pub accent_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 900,
            window_height: 900,
            ring_size: 520.0,
            accent_color: [1.0, 1.0, 1.0, 0.2],
        }
    }
}

impl RenderConfig {
    /// Side length of the full drawable square: the ring plus maximum bar
    /// extrusion on both sides
    pub fn view_extent(&self, tuning: &VisualizerTuning) -> f32 {
        self.ring_size + 2.0 * tuning.bar_max_length
    }
}

/// Audio constants (compile-time, match the Glicol engine setup)
pub mod audio_constants {
    /// Audio block size (samples per buffer)
    pub const BLOCK_SIZE: usize = 128;
}

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Duration to record (seconds)
    pub duration_secs: f32,

    /// Output directory for frames and audio
    pub output_dir: String,

    /// Frame rate (FPS)
    pub fps: u32,
}

impl RecordingConfig {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration_secs,
            output_dir: "recording".to_string(),
            fps: 60,
        }
    }

    /// Total number of frames to capture
    pub fn total_frames(&self) -> usize {
        (self.duration_secs * self.fps as f32).ceil() as usize
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> String {
        format!("{}/frames", self.output_dir)
    }

    /// Audio file path
    pub fn audio_path(&self) -> String {
        format!("{}/audio.wav", self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_is_valid() {
        let tuning = VisualizerTuning::default();
        assert!(tuning.validate().is_ok());
        assert_eq!(tuning.quad_count(), 1000);
    }

    #[test]
    fn test_tuning_rejects_bar_count_above_source_bins() {
        let tuning = VisualizerTuning {
            bar_count: 300,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_tuning_rejects_zero_step() {
        let tuning = VisualizerTuning {
            index_step: 0,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_spectrum_config_rejects_non_power_of_two() {
        let config = SpectrumConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_spectrum_config_rejects_too_many_bins() {
        let config = SpectrumConfig {
            bins: 1024,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_view_extent_covers_extruded_bars() {
        let tuning = VisualizerTuning::default();
        let config = RenderConfig::default();

        // 520 + 600 on each side
        assert_eq!(config.view_extent(&tuning), 1720.0);
    }

    #[test]
    fn test_recording_config_frame_count() {
        let config = RecordingConfig::new(2.5);
        assert_eq!(config.total_frames(), 150);
        assert_eq!(config.frames_dir(), "recording/frames");
    }
}
