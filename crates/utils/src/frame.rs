use bevy::prelude::*;

/// Default simulation step, 60 ticks per second.
pub const DEFAULT_STEP: f32 = 1.0 / 60.0;

/// Simulation clock advanced once per tick.
///
/// Every timed sequence in the encounter compares accumulated `delta` against
/// fixed durations; there is no wall clock.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    pub frame: u32,
    /// Seconds of simulation time since the clock started
    pub elapsed: f32,
    /// Seconds covered by the current tick
    pub delta: f32,
    /// Seconds added by every call to [`SimClock::advance`]
    pub step: f32,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::with_step(DEFAULT_STEP)
    }
}

impl SimClock {
    pub fn with_step(step: f32) -> Self {
        Self {
            frame: 0,
            elapsed: 0.0,
            delta: 0.0,
            step,
        }
    }

    pub fn advance(&mut self) {
        self.frame += 1;
        self.delta = self.step;
        self.elapsed += self.step;
    }

    pub fn now(&self) -> f32 {
        self.elapsed
    }
}

impl std::fmt::Display for SimClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}|{:.3}s", self.frame, self.elapsed)
    }
}

pub fn advance_sim_clock_system(mut clock: ResMut<SimClock>) {
    clock.advance();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_step() {
        let mut clock = SimClock::with_step(0.25);
        clock.advance();
        clock.advance();
        assert_eq!(clock.frame, 2);
        assert_eq!(clock.delta, 0.25);
        assert_eq!(clock.now(), 0.5);
    }
}
