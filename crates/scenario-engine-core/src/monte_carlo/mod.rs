//! Monte Carlo exit, revenue and DCF simulation.

pub mod dcf;
pub mod random;
pub mod simulation;
pub mod statistics;

pub use random::{seeded_rng, RandomSource, SequenceSource};
