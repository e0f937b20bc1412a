//! Probability-weighted scenario templates and the PWERM outcome taxonomy.

pub mod catalog;
pub mod pwerm;

pub use catalog::{Scenario, ScenarioAssumptions, ScenarioCatalog, ScenarioCategory};
pub use pwerm::{pwerm_catalog, OutcomeType, PwermScenario};
