//! Tail-risk stress testing of a base valuation model.

pub mod catalog;
pub mod engine;

pub use catalog::generate_stress_scenarios;
pub use engine::{
    run_stress_test, AssumptionKey, AssumptionValue, BaseModel, ModelType, StressOutcomes,
    StressScenario, StressTestInput, StressTestOutput,
};
