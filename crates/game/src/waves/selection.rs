//! Archetype selection policies.
//!
//! Pure functions of the wave state and a uniform draw, so every policy can be
//! exercised without a world.

use rand::Rng;

use crate::error::SpawnError;

use super::config::SpawnMethod;

pub fn select_round_robin(spawned: u32, count: usize) -> Result<usize, SpawnError> {
    if count == 0 {
        return Err(SpawnError::NoArchetypes);
    }
    Ok(spawned as usize % count)
}

/// `draw` in `[0, 1)`.
pub fn select_uniform(count: usize, draw: f32) -> Result<usize, SpawnError> {
    if count == 0 {
        return Err(SpawnError::NoArchetypes);
    }
    Ok(((draw * count as f32) as usize).min(count - 1))
}

/// Walks the normalized `weights`, subtracting each from `draw` until it falls
/// inside one. A draw that outlives the vector is a configuration error.
pub fn select_weighted(weights: &[f32], draw: f32) -> Result<usize, SpawnError> {
    if weights.is_empty() {
        return Err(SpawnError::NoArchetypes);
    }
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return Err(SpawnError::ZeroWeights);
    }

    let mut remaining = draw;
    for (index, weight) in weights.iter().enumerate() {
        if remaining < *weight {
            return Ok(index);
        }
        remaining -= weight;
    }
    Err(SpawnError::WeightsExhausted { draw, total })
}

/// Rolls one weight per `(min, max)` range and normalizes them to sum to 1.
pub fn roll_weights(ranges: &[(f32, f32)], rng: &mut impl Rng) -> Result<Vec<f32>, SpawnError> {
    if ranges.is_empty() {
        return Err(SpawnError::NoArchetypes);
    }
    let raw: Vec<f32> = ranges
        .iter()
        .map(|(min, max)| if max > min { rng.gen_range(*min..*max) } else { *min })
        .collect();
    let total: f32 = raw.iter().sum();
    if total <= 0.0 {
        return Err(SpawnError::ZeroWeights);
    }
    Ok(raw.into_iter().map(|w| w / total).collect())
}

impl SpawnMethod {
    pub fn pick(&self, spawned: u32, weights: &[f32], rng: &mut impl Rng) -> Result<usize, SpawnError> {
        match self {
            SpawnMethod::RoundRobin => select_round_robin(spawned, weights.len()),
            SpawnMethod::Random => select_uniform(weights.len(), rng.gen::<f32>()),
            SpawnMethod::WeightedRandom => select_weighted(weights, rng.gen::<f32>()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utils::rng::SimRng;

    #[test]
    fn weighted_walk_picks_expected_buckets() {
        let weights = [0.5, 0.3, 0.2];
        assert_eq!(select_weighted(&weights, 0.1), Ok(0));
        assert_eq!(select_weighted(&weights, 0.6), Ok(1));
        assert_eq!(select_weighted(&weights, 0.9), Ok(2));
    }

    #[test]
    fn exhausted_weights_are_reported() {
        let weights = [0.25, 0.25];
        assert!(matches!(
            select_weighted(&weights, 0.75),
            Err(SpawnError::WeightsExhausted { .. })
        ));
        assert_eq!(select_weighted(&[0.0, 0.0], 0.1), Err(SpawnError::ZeroWeights));
        assert_eq!(select_weighted(&[], 0.1), Err(SpawnError::NoArchetypes));
    }

    #[test]
    fn round_robin_cycles() {
        let picks: Vec<usize> = (0..6).map(|spawned| select_round_robin(spawned, 3).unwrap()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn uniform_stays_in_bounds() {
        assert_eq!(select_uniform(3, 0.0), Ok(0));
        assert_eq!(select_uniform(3, 0.999_999), Ok(2));
        assert_eq!(select_uniform(0, 0.5), Err(SpawnError::NoArchetypes));
    }

    #[test]
    fn rolled_weights_are_normalized_and_in_proportion() {
        let mut rng = SimRng::new(42);
        let weights = roll_weights(&[(0.2, 0.5), (0.3, 0.6), (1.0, 1.0)], &mut rng).unwrap();
        let total: f32 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(weights[2] > weights[0]);
        assert!(weights[2] > weights[1]);
    }

    #[test]
    fn zero_weight_ranges_fail() {
        let mut rng = SimRng::new(1);
        assert_eq!(roll_weights(&[(0.0, 0.0)], &mut rng), Err(SpawnError::ZeroWeights));
    }
}
