use tokio::task;
use tracing::error;

use super::compare::{NamedScenario, ScenarioComparison, compare_scenarios};
use super::engine::simulate_parallel;
use super::error::{CompareError, SimulationError};
use super::types::{Retention, SimulationParameters, SimulationResult};

/// Runs the engine on the blocking pool so async callers keep serving while
/// trials execute. The result is only delivered once every trial is done.
pub async fn simulate_in_background(
    params: SimulationParameters,
    seed: u64,
    retention: Retention,
) -> Result<SimulationResult, SimulationError> {
    run_blocking(move || simulate_parallel(&params, seed, retention)).await
}

pub async fn compare_in_background(
    scenarios: Vec<NamedScenario>,
    seed: u64,
) -> Result<Vec<ScenarioComparison>, CompareError> {
    run_blocking(move || compare_scenarios(&scenarios, seed)).await?
}

async fn run_blocking<T, F>(job: F) -> Result<T, SimulationError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(job).await.map_err(|e| {
        error!(error = %e, "simulation worker failed");
        if e.is_cancelled() {
            SimulationError::WorkerCancelled
        } else {
            SimulationError::WorkerPanicked(e.to_string())
        }
    })
}
