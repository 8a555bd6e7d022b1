use bevy::prelude::*;
use rand::RngCore;

/// Deterministic linear congruential generator used for every random decision
/// of the simulation (spawn positions, archetype draws, weight rolls).
///
/// Implements [`RngCore`] so callers use the regular `rand::Rng` helpers on it,
/// and tests can swap in any other `RngCore` where a function is generic.
#[derive(Debug, Resource, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimRng {
    pub seed: u32,
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(0x5eed_1e55)
    }
}

impl SimRng {
    const A: u32 = 1664525;
    const C: u32 = 1013904223;

    pub fn new(initial_seed: u32) -> Self {
        SimRng { seed: initial_seed }
    }

    /// Random value in `[0, 1)`.
    pub fn next_unit(&mut self) -> f32 {
        // Top 24 bits only, the low bits of an LCG are weak.
        (self.step() >> 8) as f32 / 16_777_216.0
    }

    fn step(&mut self) -> u32 {
        self.seed = self.seed.wrapping_mul(Self::A).wrapping_add(Self::C);
        self.seed
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        // Mix the high half of two steps so consumers that read low bits still
        // see a decent distribution.
        let hi = self.step() >> 16;
        let lo = self.step() >> 16;
        (hi << 16) | lo
    }

    fn next_u64(&mut self) -> u64 {
        ((self.next_u32() as u64) << 32) | self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
