use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("simulation worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("simulation worker was cancelled before completing")]
    WorkerCancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompareError {
    #[error("at least two scenarios are required to compare, got {0}")]
    TooFewScenarios(usize),
    #[error(transparent)]
    Worker(#[from] SimulationError),
}
