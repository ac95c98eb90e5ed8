//! Simulation clock

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

/// Monotonic tick counter, advanced once per simulation step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    current: Tick,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at an arbitrary tick, e.g. when resuming a scenario
    pub fn starting_at(tick: Tick) -> Self {
        Self { current: tick }
    }

    pub fn now(&self) -> Tick {
        self.current
    }

    /// Advance by one tick and return the new time
    pub fn advance(&mut self) -> Tick {
        self.current += 1;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_by_one() {
        let mut clock = Clock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(Clock::starting_at(90).now(), 90);
    }
}
