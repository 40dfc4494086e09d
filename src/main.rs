//! Pulsering - a circular audio-spectrum visualizer.
//!
//! A procedural track plays while 200 amplitude bars radiate from a ring,
//! attacking with the music on a fixed refresh cadence and decaying
//! continuously between refreshes.

mod audio;
mod cli;
mod geometry;
mod params;
mod rendering;
mod track;
mod visualizer;

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use glam::{Mat4, Vec2, Vec3};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use audio::AudioSystem;
use cli::Args;
use geometry::BarBatch;
use params::{RecordingConfig, RenderConfig, SpectrumConfig, VisualizerTuning};
use rendering::{RenderSystem, Uniforms};
use track::EffectTimeline;
use visualizer::{RefreshClock, RefreshInput, SpectrumRing};

/// Length of one kiai/quiet span in the demo effect timeline (milliseconds)
const KIAI_SPAN_MS: f64 = 8000.0;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Playback
    audio: Option<AudioSystem>,
    effects: EffectTimeline,

    // Visualizer state
    visualizer: SpectrumRing,
    refresh_clock: RefreshClock,
    batch: BarBatch,

    // Configuration
    tuning: VisualizerTuning,
    render_config: RenderConfig,
    recording: Option<RecordingConfig>,
    start_paused: bool,

    // Time tracking
    local_clock: Instant,
    last_frame: Option<Instant>,
    frame_num: usize,
}

impl App {
    fn new(args: &Args) -> Result<Self, String> {
        let tuning = VisualizerTuning::default();
        let mut render_config = RenderConfig::default();
        if let Some(alpha) = args.alpha {
            render_config.accent_color[3] = alpha.clamp(0.0, 1.0);
        }

        let visualizer = SpectrumRing::new(tuning.clone())?;
        let refresh_clock = RefreshClock::new(tuning.refresh_interval_ms);
        let batch = BarBatch::new(&tuning);

        Ok(Self {
            window: None,
            render_system: None,
            audio: None,
            effects: EffectTimeline::alternating(KIAI_SPAN_MS, 64),
            visualizer,
            refresh_clock,
            batch,
            tuning,
            render_config,
            recording: args.create_recording_config(),
            start_paused: args.paused,
            local_clock: Instant::now(),
            last_frame: None,
            frame_num: 0,
        })
    }

    /// Milliseconds of track (or local) time for effect lookups
    fn playback_time_ms(&self) -> f64 {
        match self.audio {
            Some(ref audio) => audio.current_time_ms(),
            None => self.local_clock.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        let now = Instant::now();
        let elapsed_ms = self
            .last_frame
            .map(|t| now.duration_since(t).as_secs_f32() * 1000.0)
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        // Periodic amplitude refresh, decoupled from the frame rate
        for _ in 0..self.refresh_clock.tick(elapsed_ms) {
            let amplitudes = self.audio.as_ref().and_then(|a| a.current_amplitudes());
            let input = RefreshInput {
                amplitudes: amplitudes.as_deref(),
                playing: self.audio.as_ref().is_some_and(|a| a.is_playing()),
                kiai: self.effects.kiai_at(self.playback_time_ms()),
            };
            self.visualizer.refresh(&input);
        }

        // Per-frame decay runs whether or not a refresh fired
        self.visualizer.decay(elapsed_ms);

        // Logic update is complete; capture the immutable draw payload
        let snapshot = self
            .visualizer
            .snapshot(self.render_config.ring_size, self.render_config.accent_color);

        let extent = self.render_config.view_extent(&self.tuning);
        let margin = self.tuning.bar_max_length;
        let inv_scale = Vec2::new(
            extent / self.render_config.window_width as f32,
            extent / self.render_config.window_height as f32,
        );

        self.batch.rebuild(&snapshot, inv_scale);

        // GPU resources not resolved yet: skip drawing this frame, the next
        // one supersedes it
        let Some(ref mut render_system) = self.render_system else {
            return;
        };

        let transform = Mat4::orthographic_rh(0.0, extent, extent, 0.0, -1.0, 1.0)
            * Mat4::from_translation(Vec3::new(margin, margin, 0.0));
        render_system.update_uniforms(&Uniforms {
            transform: transform.to_cols_array_2d(),
            accent: snapshot.accent,
        });
        render_system.update_bars(self.batch.vertices());

        if let Err(e) = render_system.render(self.frame_num) {
            log::error!("Render error: {:?}", e);
        }
        self.frame_num += 1;
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        // Amplitudes animate continuously, so every frame needs a redraw
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Pulsering")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.batch.vertices().len(),
            self.recording.clone(),
        ))
        .unwrap();

        // The visualizer runs without audio (idle ripple only), so a failed
        // audio init is logged and skipped rather than fatal
        match AudioSystem::new(SpectrumConfig::default(), self.recording.clone()) {
            Ok(audio) => {
                audio.set_playing(!self.start_paused);
                self.audio = Some(audio);
            }
            Err(e) => log::error!("Failed to initialize audio system: {}", e),
        }

        log::info!("Pulsering is running (Space pauses playback, ESC quits)");

        self.window = Some(window);
        self.render_system = Some(render_system);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => {
                    if let Some(ref audio) = self.audio {
                        let playing = audio.toggle_playing();
                        log::info!("Playback {}", if playing { "resumed" } else { "paused" });
                    }
                }
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                self.render_frame();

                if let Some(ref recording) = self.recording {
                    if self.frame_num >= recording.total_frames() {
                        log::info!("Recording finished ({} frames)", self.frame_num);
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut app = match App::new(&args) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let event_loop = EventLoop::new().unwrap();
    let _ = event_loop.run_app(&mut app);
}
