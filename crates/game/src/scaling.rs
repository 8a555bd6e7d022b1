//! Level-indexed scaling curves.
//!
//! Only the shape matters: a piecewise-linear lookup clamped at both ends.
//! Baseline values are always scaled from their wave-0 value, never from the
//! previous wave's already scaled value.

use serde::{Deserialize, Serialize};

/// Piecewise-linear curve over sorted `(x, y)` keys, clamped outside the keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub keys: Vec<(f32, f32)>,
}

impl Curve {
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn constant(value: f32) -> Self {
        Self { keys: vec![(0.0, value)] }
    }

    /// `f(x) = at_zero + per_unit * x` over levels `0..=100`.
    pub fn linear(at_zero: f32, per_unit: f32) -> Self {
        Self {
            keys: vec![(0.0, at_zero), (100.0, at_zero + per_unit * 100.0)],
        }
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let Some(first) = self.keys.first() else {
            return 0.0;
        };
        if x <= first.0 {
            return first.1;
        }

        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x <= b.0 {
                let span = b.0 - a.0;
                if span <= f32::EPSILON {
                    return b.1;
                }
                return a.1 + (b.1 - a.1) * ((x - a.0) / span);
            }
        }

        self.keys.last().map(|k| k.1).unwrap_or(first.1)
    }

    /// True when the curve never changes direction.
    pub fn is_monotonic(&self) -> bool {
        let deltas: Vec<f32> = self.keys.windows(2).map(|p| p[1].1 - p[0].1).collect();
        deltas.iter().all(|d| *d >= 0.0) || deltas.iter().all(|d| *d <= 0.0)
    }
}

/// Per-level adjustments applied to abilities and spawn pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityScaling {
    /// Flat damage bonus added to every ability, floored
    pub damage: Curve,
    /// Multiplier on the baseline spawn count
    pub spawn_count: Curve,
    /// Multiplier on the baseline spawn interval
    pub spawn_rate: Curve,
}

impl Default for AbilityScaling {
    fn default() -> Self {
        Self {
            damage: Curve::linear(0.0, 1.0),
            spawn_count: Curve::linear(1.0, 0.1),
            spawn_rate: Curve::new(vec![(0.0, 1.0), (20.0, 0.4)]),
        }
    }
}

impl AbilityScaling {
    pub fn damage_bonus(&self, level: u32) -> i32 {
        self.damage.evaluate(level as f32).floor() as i32
    }

    pub fn spawn_count(&self, baseline: u32, level: u32) -> u32 {
        (baseline as f32 * self.spawn_count.evaluate(level as f32))
            .floor()
            .max(0.0) as u32
    }

    pub fn spawn_interval(&self, baseline: f32, level: u32) -> f32 {
        (baseline * self.spawn_rate.evaluate(level as f32)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_interpolates_and_clamps() {
        let curve = Curve::new(vec![(0.0, 0.0), (0.5, 2.0), (1.0, 0.0)]);
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(0.25), 1.0);
        assert_eq!(curve.evaluate(0.5), 2.0);
        assert_eq!(curve.evaluate(0.75), 1.0);
        assert_eq!(curve.evaluate(3.0), 0.0);
    }

    #[test]
    fn unsorted_keys_are_sorted() {
        let curve = Curve::new(vec![(10.0, 5.0), (0.0, 1.0)]);
        assert_eq!(curve.keys[0], (0.0, 1.0));
        assert!(curve.is_monotonic());
    }

    #[test]
    fn arc_is_not_monotonic() {
        let curve = Curve::new(vec![(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)]);
        assert!(!curve.is_monotonic());
    }

    #[test]
    fn spawn_count_uses_baseline() {
        let scaling = AbilityScaling {
            spawn_count: Curve::linear(1.0, 0.1),
            ..Default::default()
        };
        assert_eq!(scaling.spawn_count(5, 3), (5.0 * scaling.spawn_count.evaluate(3.0)).floor() as u32);
        assert_eq!(scaling.spawn_count(5, 3), 6);
        assert_eq!(scaling.spawn_count(5, 0), 5);
    }

    #[test]
    fn damage_bonus_is_floored() {
        let scaling = AbilityScaling {
            damage: Curve::linear(0.0, 0.75),
            ..Default::default()
        };
        assert_eq!(scaling.damage_bonus(0), 0);
        assert_eq!(scaling.damage_bonus(1), 0);
        assert_eq!(scaling.damage_bonus(2), 1);
        assert_eq!(scaling.damage_bonus(5), 3);
    }
}
