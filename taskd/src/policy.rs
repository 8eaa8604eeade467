//! Simulated participants.
//!
//! A policy answers two questions per decision: which side to take and how
//! long to "think" about it. Reaction times are drawn uniformly so the
//! exported records carry plausible spread.

use threestep::prng::Prng;
use threestep::state::Side;

pub trait Policy {
    /// Choose a side for a binary (left/right) decision.
    fn decide(&mut self) -> Side;

    /// Simulated reaction time, in milliseconds.
    fn reaction_ms(&mut self) -> u64;

    /// Whether the participant misses this decision window entirely.
    fn lapses(&mut self) -> bool;
}

/// Uniformly random responder, the same behaviour the original simulation
/// scripts used to sanity-check reward proportions.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: Prng,
    min_rt_ms: u64,
    max_rt_ms: u64,
    lapse_probability: f64,
}

impl RandomPolicy {
    pub fn new(seed: u64, min_rt_ms: u64, max_rt_ms: u64, lapse_probability: f64) -> Self {
        Self {
            rng: Prng::new(seed),
            min_rt_ms,
            max_rt_ms: max_rt_ms.max(min_rt_ms + 1),
            lapse_probability: lapse_probability.clamp(0.0, 1.0),
        }
    }
}

impl Policy for RandomPolicy {
    fn decide(&mut self) -> Side {
        if self.rng.chance(0.5) {
            Side::Left
        } else {
            Side::Right
        }
    }

    fn reaction_ms(&mut self) -> u64 {
        self.min_rt_ms
            + u64::from(
                self.rng
                    .gen_range_u32(0, (self.max_rt_ms - self.min_rt_ms) as u32),
            )
    }

    fn lapses(&mut self) -> bool {
        self.rng.chance(self.lapse_probability)
    }
}
