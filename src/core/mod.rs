mod compare;
mod engine;
mod error;
mod percentile;
mod sampler;
mod types;
mod worker;

pub use compare::{NamedScenario, ScenarioComparison, compare_scenarios};
pub use engine::{
    after_tax_return, simulate, simulate_parallel, simulate_trajectories, simulate_trial,
    success_probability, summarize,
};
pub use error::{CompareError, SimulationError};
pub use percentile::{Band, aggregate, nearest_rank_band};
pub use sampler::{NormalSampler, SeededSampler};
pub use types::{
    AnnualExpenses, Metric, MonthlyExpenses, Outlook, PercentileSeries, Retention,
    ResultSummary, SimulationParameters, SimulationResult, Trajectory, YearPoint,
};
pub use worker::{compare_in_background, simulate_in_background};
