//! Command-line argument parsing.

use clap::Parser;

use crate::params::RecordingConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Pulsering")]
#[command(about = "Circular audio-spectrum visualizer", long_about = None)]
pub struct Args {
    /// Record the session to PNG frames plus a WAV track (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,

    /// Start with playback paused (shows the idle afterglow ripple)
    #[arg(long)]
    pub paused: bool,

    /// Accent color opacity override
    #[arg(long, value_name = "ALPHA")]
    pub alpha: Option<f32>,
}

impl Args {
    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> Option<RecordingConfig> {
        self.record.map(|duration| {
            let config = RecordingConfig::new(duration);

            // Create output directories
            std::fs::create_dir_all(config.frames_dir())
                .expect("Failed to create frames directory");
            std::fs::create_dir_all(&config.output_dir).expect("Failed to create output directory");

            config
        })
    }
}
