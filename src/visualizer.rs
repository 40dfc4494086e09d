//! Ring amplitude state: attack-only refresh, per-frame decay, snapshots.
//!
//! The bar amplitudes rise instantly with the music (bounded by the refresh
//! sampling period) and fall continuously with frame-rate decay. The two run
//! on independent clocks: refresh fires on a fixed wall-clock period driven
//! by [`RefreshClock`], decay runs every rendered frame.

use crate::params::VisualizerTuning;

/// Inputs pulled from the playback side for one refresh cycle.
///
/// `amplitudes` is `None` when the spectrum source has not produced a frame;
/// the refresh substitutes silence for that cycle.
pub struct RefreshInput<'a> {
    pub amplitudes: Option<&'a [f32]>,
    pub playing: bool,
    pub kiai: bool,
}

/// Immutable per-frame bundle handed across the update/draw boundary.
///
/// Carries a copy of the bar values so the draw stage never aliases the live
/// amplitude array, even if rendering moves off-thread.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub bars: Vec<f32>,
    pub size: f32,
    pub accent: [f32; 4],
}

/// Owned amplitude history for one bar ring.
pub struct SpectrumRing {
    amplitudes: Vec<f32>,
    index_offset: usize,
    tuning: VisualizerTuning,
}

impl SpectrumRing {
    pub fn new(tuning: VisualizerTuning) -> Result<Self, String> {
        tuning.validate()?;
        Ok(Self {
            amplitudes: vec![0.0; tuning.source_bins],
            index_offset: 0,
            tuning,
        })
    }

    /// Pull one refresh cycle from the playback side.
    ///
    /// While a track plays, each slot attacks toward the kiai-scaled source
    /// sample at a rotating index; attack only ever raises a slot, decay is
    /// the only thing that lowers one. While stopped, each slot copies a
    /// rotating neighbor forward instead, producing the idle afterglow
    /// ripple rather than snapping to silence.
    pub fn refresh(&mut self, input: &RefreshInput) {
        let bars = self.tuning.bar_count;
        let step = self.tuning.index_step;

        if input.playing {
            let silence;
            let source = match input.amplitudes {
                Some(samples) if samples.len() >= bars => samples,
                _ => {
                    silence = vec![0.0; bars];
                    &silence
                }
            };

            let scale = if input.kiai {
                1.0
            } else {
                self.tuning.quiet_attack_scale
            };

            for i in 0..bars {
                let index = (i + self.index_offset) % bars;
                let sample = source[index] * scale;
                if sample > self.amplitudes[i] {
                    self.amplitudes[i] = sample;
                }
            }
        } else {
            for i in 0..bars {
                let mirror = self.amplitudes[(i + step) % bars];
                if mirror > self.amplitudes[i] {
                    self.amplitudes[i] = mirror;
                }
            }
        }

        self.index_offset = (self.index_offset + step) % bars;
    }

    /// Decay every bar toward zero, proportional to elapsed time.
    ///
    /// The additive bias keeps near-empty bars reaching zero in finite time
    /// instead of stalling asymptotically.
    pub fn decay(&mut self, elapsed_ms: f32) {
        let factor = elapsed_ms * self.tuning.decay_per_ms;
        let bias = self.tuning.decay_bias;

        for value in &mut self.amplitudes[..self.tuning.bar_count] {
            *value -= factor * (*value + bias);
            if *value < 0.0 {
                *value = 0.0;
            }
        }
    }

    /// Current bar values, read-only.
    pub fn bars(&self) -> &[f32] {
        &self.amplitudes[..self.tuning.bar_count]
    }

    /// Current rotation offset into the source array.
    pub fn index_offset(&self) -> usize {
        self.index_offset
    }

    /// Capture the immutable per-frame bundle for the draw stage.
    pub fn snapshot(&self, size: f32, accent: [f32; 4]) -> FrameSnapshot {
        FrameSnapshot {
            bars: self.bars().to_vec(),
            size,
            accent,
        }
    }
}

/// Fixed-period ticker the host event loop drives.
///
/// Accumulates frame deltas and reports how many refresh periods elapsed;
/// the fractional remainder carries over, so refresh cadence stays locked to
/// wall clock regardless of frame rate. Runs for the component's lifetime.
pub struct RefreshClock {
    interval_ms: f32,
    accum_ms: f32,
}

impl RefreshClock {
    pub fn new(interval_ms: f32) -> Self {
        Self {
            interval_ms,
            accum_ms: 0.0,
        }
    }

    /// Advance by one frame delta; returns the number of due refreshes.
    pub fn tick(&mut self, elapsed_ms: f32) -> usize {
        self.accum_ms += elapsed_ms;
        let mut fired = 0;
        while self.accum_ms >= self.interval_ms {
            self.accum_ms -= self.interval_ms;
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> SpectrumRing {
        SpectrumRing::new(VisualizerTuning::default()).unwrap()
    }

    fn playing(samples: &[f32], kiai: bool) -> RefreshInput<'_> {
        RefreshInput {
            amplitudes: Some(samples),
            playing: true,
            kiai,
        }
    }

    #[test]
    fn test_decay_matches_formula() {
        let mut ring = ring();
        ring.refresh(&playing(&[1.0; 256], true));

        ring.decay(100.0);

        // v - t * 0.0024 * (v + 0.03) with v = 1.0, t = 100
        let expected = 1.0 - 100.0 * 0.0024 * (1.0 + 0.03);
        assert!((ring.bars()[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_decay_never_increases_and_never_goes_negative() {
        let mut ring = ring();
        ring.refresh(&playing(&[0.004; 256], true));
        let before = ring.bars().to_vec();

        ring.decay(5000.0);

        for (after, before) in ring.bars().iter().zip(&before) {
            assert!(after <= before);
            assert!(*after >= 0.0);
        }
        // A long stall drags even the bias-only tail to exactly zero
        assert_eq!(ring.bars()[0], 0.0);
    }

    #[test]
    fn test_decay_with_zero_elapsed_is_identity() {
        let mut ring = ring();
        ring.refresh(&playing(&[0.8; 256], true));
        let before = ring.bars().to_vec();

        ring.decay(0.0);

        assert_eq!(ring.bars(), &before[..]);
    }

    #[test]
    fn test_refresh_attack_is_monotonic_and_bounded_outside_kiai() {
        let mut ring = ring();
        let samples = [0.9; 256];

        ring.refresh(&playing(&samples, false));
        let first = ring.bars().to_vec();

        for (i, value) in first.iter().enumerate() {
            assert!(*value <= 0.5 * samples[i] + 1e-6);
        }

        // A quieter sample never lowers a bar
        ring.refresh(&playing(&[0.1; 256], false));
        for (after, before) in ring.bars().iter().zip(&first) {
            assert!(after >= before);
        }
    }

    #[test]
    fn test_kiai_attacks_at_full_scale() {
        let mut ring = ring();
        let samples = [0.9; 256];

        ring.refresh(&playing(&samples, true));

        for value in ring.bars() {
            assert!((value - 0.9).abs() < 1e-6);
        }
    }

    #[test]
    fn test_offset_advances_by_step_and_wraps_after_forty_refreshes() {
        let mut ring = ring();
        let samples = [0.0; 256];

        ring.refresh(&playing(&samples, false));
        assert_eq!(ring.index_offset(), 5);

        for _ in 0..39 {
            ring.refresh(&playing(&samples, false));
        }
        assert_eq!(ring.index_offset(), 0);
    }

    #[test]
    fn test_missing_source_substitutes_silence() {
        let mut ring = ring();
        ring.refresh(&playing(&[0.6; 256], true));
        let before = ring.bars().to_vec();

        ring.refresh(&RefreshInput {
            amplitudes: None,
            playing: true,
            kiai: false,
        });

        // Zero attack is a no-op, but the offset still advances
        assert_eq!(ring.bars(), &before[..]);
        assert_eq!(ring.index_offset(), 10);
    }

    #[test]
    fn test_idle_refresh_of_silence_stays_silent() {
        let mut ring = ring();

        for _ in 0..50 {
            ring.refresh(&RefreshInput {
                amplitudes: None,
                playing: false,
                kiai: false,
            });
        }

        assert!(ring.bars().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_idle_refresh_ripples_from_larger_neighbor() {
        let mut ring = ring();
        let mut samples = [0.0; 256];
        samples[5] = 1.0;
        ring.refresh(&playing(&samples, true));
        // offset was 0, so slot 5 holds 1.0
        assert!((ring.bars()[5] - 1.0).abs() < 1e-6);

        ring.refresh(&RefreshInput {
            amplitudes: None,
            playing: false,
            kiai: false,
        });

        // Slot 0 mirrors slot 5; slot 5 keeps its value (refresh never lowers)
        assert!((ring.bars()[0] - 1.0).abs() < 1e-6);
        assert!((ring.bars()[5] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_copies_bar_values() {
        let mut ring = ring();
        ring.refresh(&playing(&[0.7; 256], true));

        let snapshot = ring.snapshot(520.0, [1.0, 1.0, 1.0, 0.2]);
        ring.decay(1000.0);

        // The snapshot is unaffected by later mutation of the live array
        assert_eq!(snapshot.bars.len(), 200);
        assert!((snapshot.bars[0] - 0.7).abs() < 1e-6);
        assert!(ring.bars()[0] < 0.7);
    }

    #[test]
    fn test_refresh_clock_fires_per_period_and_keeps_remainder() {
        let mut clock = RefreshClock::new(50.0);

        assert_eq!(clock.tick(16.0), 0);
        assert_eq!(clock.tick(16.0), 0);
        assert_eq!(clock.tick(16.0), 0);
        // 64 ms accumulated -> one refresh, 14 ms remainder
        assert_eq!(clock.tick(16.0), 1);

        // A long stall fires every missed period
        assert_eq!(clock.tick(250.0), 5);
    }
}
