pub mod distribution;

pub use distribution::{
    distribute_waterfall, TierAllocation, WaterfallInput, WaterfallOutput, WaterfallTier,
};
