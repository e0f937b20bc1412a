pub mod monte_carlo;
pub mod pwerm;
pub mod scenarios;
pub mod stress;
pub mod waterfall;
