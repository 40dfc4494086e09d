//! Radial bar geometry: a reusable quad batch rebuilt every frame.
//!
//! Bars radiate from a circle inscribed in the component's square drawable
//! area, repeated over several overlapping angular rounds. The batch size is
//! constant: zero-amplitude bars emit degenerate quads instead of being
//! culled, so the vertex buffer never changes size.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::params::VisualizerTuning;
use crate::visualizer::FrameSnapshot;

/// Vertex data for one bar corner (position + UV + edge-smoothing hint)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BarVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub inflation: [f32; 2],
}

/// Two triangles per quad
pub const VERTICES_PER_QUAD: usize = 6;

/// Reusable vertex batch for the full bar ring.
///
/// Allocated once, rewritten in place each frame; the renderer uploads the
/// same-sized slice every time.
pub struct BarBatch {
    vertices: Vec<BarVertex>,
    bar_count: usize,
    rounds: usize,
    bar_max_length: f32,
}

impl BarBatch {
    pub fn new(tuning: &VisualizerTuning) -> Self {
        Self {
            vertices: vec![BarVertex::zeroed(); tuning.quad_count() * VERTICES_PER_QUAD],
            bar_count: tuning.bar_count,
            rounds: tuning.rounds,
            bar_max_length: tuning.bar_max_length,
        }
    }

    /// Rebuild every quad from the frame's amplitude snapshot.
    ///
    /// `inv_scale` is the drawable-units-per-pixel scale of the current
    /// transform; it feeds the per-vertex inflation hint that keeps edge
    /// smoothing uniform across each bar's anisotropic aspect ratio.
    pub fn rebuild(&mut self, snapshot: &FrameSnapshot, inv_scale: Vec2) {
        debug_assert_eq!(snapshot.bars.len(), self.bar_count);

        let size = snapshot.size;
        let bars = self.bar_count as f32;

        // Chord subtending one bar's angular slice at radius size/2, so bars
        // tile the circumference without gaps.
        let bar_width = size * (2.0 * (1.0 - (TAU / bars).cos())).sqrt() / 2.0;

        let mut cursor = 0;
        for round in 0..self.rounds {
            let round_angle = round as f32 * TAU / self.rounds as f32;

            for (i, &amplitude) in snapshot.bars.iter().enumerate() {
                let angle = i as f32 / bars * TAU + round_angle;
                let (sin, cos) = angle.sin_cos();

                // cos and sin taken to the 0..1 range, mapping the bar's base
                // onto the inscribed circle
                let base = Vec2::new(cos / 2.0 + 0.5, sin / 2.0 + 0.5) * size;
                let bar_length = self.bar_max_length * amplitude;

                // Half-width vector perpendicular to the radius
                let bottom_offset = Vec2::new(-sin, cos) * (bar_width / 2.0);
                // Extrusion vector along the radius
                let length_offset = Vec2::new(cos, sin) * bar_length;

                // Inflation compensates anisotropic scaling, axes swapped so
                // smoothing follows the bar's long side
                let inflation = [
                    inv_scale.x / bar_length.max(f32::EPSILON),
                    inv_scale.y / bar_width.max(f32::EPSILON),
                ];

                let c0 = base - bottom_offset;
                let c1 = c0 + length_offset;
                let c2 = base + bottom_offset;
                let c3 = c2 + length_offset;

                let corners = [
                    (c0, [0.0, 0.0]),
                    (c1, [0.0, 1.0]),
                    (c2, [1.0, 0.0]),
                    (c2, [1.0, 0.0]),
                    (c1, [0.0, 1.0]),
                    (c3, [1.0, 1.0]),
                ];
                for (position, uv) in corners {
                    self.vertices[cursor] = BarVertex {
                        position: position.to_array(),
                        uv,
                        inflation,
                    };
                    cursor += 1;
                }
            }
        }
    }

    pub fn vertices(&self) -> &[BarVertex] {
        &self.vertices
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::VisualizerTuning;

    fn snapshot(bars: Vec<f32>, size: f32) -> FrameSnapshot {
        FrameSnapshot {
            bars,
            size,
            accent: [1.0, 1.0, 1.0, 0.2],
        }
    }

    fn quad(batch: &BarBatch, index: usize) -> &[BarVertex] {
        &batch.vertices()[index * VERTICES_PER_QUAD..(index + 1) * VERTICES_PER_QUAD]
    }

    #[test]
    fn test_batch_emits_constant_quad_count() {
        let tuning = VisualizerTuning::default();
        let mut batch = BarBatch::new(&tuning);

        assert_eq!(batch.quad_count(), 1000);
        assert_eq!(batch.vertices().len(), 6000);

        batch.rebuild(&snapshot(vec![0.0; 200], 100.0), Vec2::ONE);
        assert_eq!(batch.vertices().len(), 6000);

        batch.rebuild(&snapshot(vec![1.0; 200], 100.0), Vec2::ONE);
        assert_eq!(batch.vertices().len(), 6000);
    }

    #[test]
    fn test_all_zero_bars_emit_degenerate_quads_with_full_width() {
        let tuning = VisualizerTuning::default();
        let mut batch = BarBatch::new(&tuning);

        batch.rebuild(&snapshot(vec![0.0; 200], 100.0), Vec2::ONE);

        // 100 * sqrt(2 * (1 - cos(1.8 deg))) / 2
        let expected_width = 100.0 * (2.0 * (1.0 - (TAU / 200.0).cos())).sqrt() / 2.0;
        assert!((expected_width - 1.5707).abs() < 1e-3);

        for q in 0..batch.quad_count() {
            let v = quad(&batch, q);
            // Zero length: base corners coincide with extruded corners
            assert_eq!(v[0].position, v[1].position);
            assert_eq!(v[2].position, v[5].position);

            let dx = v[2].position[0] - v[0].position[0];
            let dy = v[2].position[1] - v[0].position[1];
            let width = (dx * dx + dy * dy).sqrt();
            assert!((width - expected_width).abs() < 1e-4);
        }
    }

    #[test]
    fn test_full_amplitude_bar_extrudes_to_max_length_along_radius() {
        let tuning = VisualizerTuning::default();
        let mut batch = BarBatch::new(&tuning);

        let mut bars = vec![0.0; 200];
        bars[0] = 1.0;
        batch.rebuild(&snapshot(bars, 200.0), Vec2::ONE);

        let v = quad(&batch, 0);

        // Bar 0 sits at angle 0: base midpoint (200, 100), extrusion +x
        let mid_x = (v[0].position[0] + v[2].position[0]) / 2.0;
        let mid_y = (v[0].position[1] + v[2].position[1]) / 2.0;
        assert!((mid_x - 200.0).abs() < 1e-3);
        assert!((mid_y - 100.0).abs() < 1e-3);

        let ext_x = v[1].position[0] - v[0].position[0];
        let ext_y = v[1].position[1] - v[0].position[1];
        assert!((ext_x - 600.0).abs() < 1e-3);
        assert!(ext_y.abs() < 1e-3);
    }

    #[test]
    fn test_rounds_repeat_the_ring_a_fifth_turn_apart() {
        let tuning = VisualizerTuning::default();
        let mut batch = BarBatch::new(&tuning);

        batch.rebuild(&snapshot(vec![0.5; 200], 200.0), Vec2::ONE);

        // Bar 0 of round 1 sits at 72 degrees
        let v = quad(&batch, 200);
        let angle = (72.0_f32).to_radians();
        let expected = Vec2::new(angle.cos() / 2.0 + 0.5, angle.sin() / 2.0 + 0.5) * 200.0;

        let mid_x = (v[0].position[0] + v[2].position[0]) / 2.0;
        let mid_y = (v[0].position[1] + v[2].position[1]) / 2.0;
        assert!((mid_x - expected.x).abs() < 1e-3);
        assert!((mid_y - expected.y).abs() < 1e-3);
    }

    #[test]
    fn test_inflation_follows_inverse_scale_over_bar_size() {
        let tuning = VisualizerTuning::default();
        let mut batch = BarBatch::new(&tuning);

        let mut bars = vec![0.0; 200];
        bars[0] = 0.5;
        batch.rebuild(&snapshot(bars, 100.0), Vec2::new(2.0, 2.0));

        let bar_width = 100.0 * (2.0 * (1.0 - (TAU / 200.0).cos())).sqrt() / 2.0;
        let v = quad(&batch, 0);
        assert!((v[0].inflation[0] - 2.0 / 300.0).abs() < 1e-6);
        assert!((v[0].inflation[1] - 2.0 / bar_width).abs() < 1e-4);
    }
}
