//! Track-side effect metadata: kiai sections over playback time.
//!
//! Kiai marks the high-intensity sections of a track; the visualizer only
//! uses it to scale attack sensitivity.

/// One effect change, in effect from `time_ms` until the next point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectPoint {
    pub time_ms: f64,
    pub kiai: bool,
}

/// Ordered effect changes over a track's timeline.
#[derive(Debug, Clone, Default)]
pub struct EffectTimeline {
    points: Vec<EffectPoint>,
}

impl EffectTimeline {
    pub fn new(mut points: Vec<EffectPoint>) -> Self {
        points.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        Self { points }
    }

    /// The latest effect point at or before `time_ms`, if any.
    pub fn effect_at(&self, time_ms: f64) -> Option<&EffectPoint> {
        match self.points.partition_point(|p| p.time_ms <= time_ms) {
            0 => None,
            n => Some(&self.points[n - 1]),
        }
    }

    /// Whether kiai is active at `time_ms` (inactive before the first point).
    pub fn kiai_at(&self, time_ms: f64) -> bool {
        self.effect_at(time_ms).is_some_and(|p| p.kiai)
    }

    /// Alternating off/on kiai schedule: `count` spans of `period_ms` each,
    /// starting quiet. Matches the bar-phrase structure of the procedural
    /// composition.
    pub fn alternating(period_ms: f64, count: usize) -> Self {
        let points = (0..count)
            .map(|i| EffectPoint {
                time_ms: i as f64 * period_ms,
                kiai: i % 2 == 1,
            })
            .collect();
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> EffectTimeline {
        EffectTimeline::new(vec![
            EffectPoint {
                time_ms: 1000.0,
                kiai: false,
            },
            EffectPoint {
                time_ms: 5000.0,
                kiai: true,
            },
            EffectPoint {
                time_ms: 9000.0,
                kiai: false,
            },
        ])
    }

    #[test]
    fn test_lookup_before_first_point_is_none() {
        assert!(timeline().effect_at(999.9).is_none());
        assert!(!timeline().kiai_at(0.0));
    }

    #[test]
    fn test_lookup_at_exact_time_returns_that_point() {
        let timeline = timeline();
        let point = timeline.effect_at(5000.0).unwrap();
        assert!(point.kiai);
    }

    #[test]
    fn test_lookup_between_points_returns_earlier_point() {
        let timeline = timeline();
        assert!(!timeline.kiai_at(4999.0));
        assert!(timeline.kiai_at(8999.0));
        assert!(!timeline.kiai_at(100_000.0));
    }

    #[test]
    fn test_points_are_sorted_on_construction() {
        let timeline = EffectTimeline::new(vec![
            EffectPoint {
                time_ms: 2000.0,
                kiai: true,
            },
            EffectPoint {
                time_ms: 0.0,
                kiai: false,
            },
        ]);

        assert!(!timeline.kiai_at(1000.0));
        assert!(timeline.kiai_at(3000.0));
    }

    #[test]
    fn test_alternating_schedule_starts_quiet() {
        let timeline = EffectTimeline::alternating(8000.0, 4);

        assert!(!timeline.kiai_at(0.0));
        assert!(timeline.kiai_at(8000.0));
        assert!(!timeline.kiai_at(16_500.0));
        assert!(timeline.kiai_at(24_000.0));
    }
}
