pub mod amount;
pub mod reservoir;
pub mod running;

pub use amount::{
    amount_analytics, AmountAnalytics, AmountFilter, AmountSummary, Percentiles, SamplingOptions,
};
pub use reservoir::{nearest_rank, Reservoir};
pub use running::RunningStats;
