//! Procedural track playback and spectrum analysis.
//!
//! A Glicol composition plays through cpal while an analysis thread runs a
//! windowed FFT over the output, publishing a normalized per-bin amplitude
//! array for the visualizer to pull on its own schedule.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glicol::Engine;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::params::{audio_constants::BLOCK_SIZE, RecordingConfig, SpectrumConfig};

/// Glicol composition (procedural music code)
const GLICOL_COMPOSITION: &str = r#"
~gate: speed 2.0 >> seq 48 _48 _~note 36
~note: choose 48 48 60 72 0 0 0
~env: ~gate >> envperc 0.002 0.12
~pitch: ~gate >> mul 220.0
~lead: squ ~pitch >> mul ~env >> lpf ~sweep 4.0 >> mul 0.12
~sweep: sin 0.25 >> mul 1200 >> add 1500
o: ~lead >> plate 0.08
"#;

/// Audio system managing synthesis, playback state, and spectrum analysis
pub struct AudioSystem {
    /// Latest spectrum frame (None until the analyzer produces one)
    spectrum: Arc<Mutex<Option<Vec<f32>>>>,

    /// Playback flag shared with the output callback
    playing: Arc<AtomicBool>,

    /// Local clock used for effect lookups
    epoch: Instant,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,

    /// Analysis thread handle (kept for lifetime)
    _analysis_thread: Option<thread::JoinHandle<()>>,
}

impl AudioSystem {
    /// Create and start the audio system with the given configuration
    pub fn new(
        config: SpectrumConfig,
        recording_config: Option<RecordingConfig>,
    ) -> Result<Self, String> {
        config
            .validate()
            .map_err(|e| format!("Invalid spectrum config: {}", e))?;

        // Create WAV writer if recording
        let wav_writer: Option<Arc<Mutex<hound::WavWriter<std::io::BufWriter<std::fs::File>>>>> =
            match recording_config.as_ref() {
                Some(rec) => {
                    let spec = hound::WavSpec {
                        channels: 2,
                        sample_rate: config.sample_rate_hz as u32,
                        bits_per_sample: 32,
                        sample_format: hound::SampleFormat::Float,
                    };
                    let writer = hound::WavWriter::create(rec.audio_path(), spec)
                        .map_err(|e| format!("Failed to create WAV writer: {}", e))?;
                    Some(Arc::new(Mutex::new(writer)))
                }
                None => None,
            };

        // Create Glicol engine
        let mut engine = Engine::<BLOCK_SIZE>::new();
        engine.set_sr(config.sample_rate_hz);
        engine.update_with_code(GLICOL_COMPOSITION);
        engine
            .update()
            .map_err(|e| format!("Glicol engine init failed: {:?}", e))?;

        // Shared state between the output callback and the analysis thread
        let engine = Arc::new(Mutex::new(engine));
        let engine_cb = Arc::clone(&engine);

        let sample_tap = Arc::new(Mutex::new(Vec::<f32>::new()));
        let sample_tap_cb = Arc::clone(&sample_tap);

        let spectrum = Arc::new(Mutex::new(None));
        let spectrum_analysis = Arc::clone(&spectrum);

        let playing = Arc::new(AtomicBool::new(true));
        let playing_cb = Arc::clone(&playing);

        // Setup audio output device
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("No audio output device found")?;

        let stream_config = device
            .default_output_config()
            .map_err(|e| format!("Failed to get audio config: {}", e))?;

        log::info!(
            "Audio: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            stream_config.sample_rate().0
        );

        // Build audio output stream
        let stream = device
            .build_output_stream(
                &stream_config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Paused playback renders silence; the engine holds its
                    // position so resume continues the track.
                    if !playing_cb.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    let mut engine = engine_cb.lock().unwrap();
                    let mut tap = sample_tap_cb.lock().unwrap();

                    let frames_needed = data.len() / 2; // Stereo frames
                    let mut frame_idx = 0;

                    // Generate multiple blocks if needed to fill the buffer
                    while frame_idx < frames_needed {
                        let (buffers, _) = engine.next_block(vec![]);

                        let samples_to_copy = (frames_needed - frame_idx).min(BLOCK_SIZE);

                        for i in 0..samples_to_copy {
                            // Safety limiter: hard clip to ±0.5
                            let left = buffers[0][i].clamp(-0.5, 0.5);
                            let right = buffers[1][i].clamp(-0.5, 0.5);

                            let out_idx = (frame_idx + i) * 2;
                            data[out_idx] = left;
                            data[out_idx + 1] = right;

                            tap.push(left); // Accumulate for spectrum analysis

                            if let Some(ref writer) = wav_writer {
                                if let Ok(mut w) = writer.lock() {
                                    let _ = w.write_sample(left);
                                    let _ = w.write_sample(right);
                                }
                            }
                        }

                        frame_idx += samples_to_copy;
                    }
                },
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| format!("Failed to build audio stream: {}", e))?;

        stream
            .play()
            .map_err(|e| format!("Failed to start audio stream: {}", e))?;

        let analysis_thread = spawn_analysis_thread(config, sample_tap, spectrum_analysis);

        Ok(Self {
            spectrum,
            playing,
            epoch: Instant::now(),
            _stream: stream,
            _analysis_thread: Some(analysis_thread),
        })
    }

    /// Latest spectrum amplitudes, or None if analysis has not produced a
    /// frame yet
    pub fn current_amplitudes(&self) -> Option<Vec<f32>> {
        self.spectrum.lock().unwrap().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    pub fn toggle_playing(&self) -> bool {
        let now_playing = !self.is_playing();
        self.set_playing(now_playing);
        now_playing
    }

    /// Milliseconds since the system started; drives effect lookups
    pub fn current_time_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Spawn the spectrum analysis thread
fn spawn_analysis_thread(
    config: SpectrumConfig,
    sample_tap: Arc<Mutex<Vec<f32>>>,
    spectrum: Arc<Mutex<Option<Vec<f32>>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let mut scratch = vec![Complex::new(0.0, 0.0); config.fft_size];

        loop {
            thread::sleep(Duration::from_millis(config.update_interval_ms));

            let mut tap = sample_tap.lock().unwrap();
            if tap.len() < config.fft_size {
                continue;
            }

            // Apply Hann window
            for (i, slot) in scratch.iter_mut().enumerate() {
                *slot = Complex::new(tap[i] * hann_window(i, config.fft_size), 0.0);
            }

            // 50% overlap (drain half the window)
            tap.drain(0..config.fft_size / 2);
            drop(tap);

            fft.process(&mut scratch);

            // Low-frequency magnitude bins, normalized into [0, 1]
            let norm = config.magnitude_gain / config.fft_size as f32;
            let bins: Vec<f32> = scratch[..config.bins]
                .iter()
                .map(|c| (c.norm() * norm).clamp(0.0, 1.0))
                .collect();

            *spectrum.lock().unwrap() = Some(bins);
        }
    })
}

/// Hann window function for spectrum analysis
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
