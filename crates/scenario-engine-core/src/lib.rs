pub mod error;
pub mod types;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "stress")]
pub mod stress;

#[cfg(feature = "waterfall")]
pub mod waterfall;

pub use error::EngineError;
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, EngineError>;
