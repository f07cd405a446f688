use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use super::percentile::{aggregate, aggregate_columns};
use super::sampler::{NormalSampler, SeededSampler};
use super::types::{
    Metric, Retention, SimulationParameters, SimulationResult, Trajectory, YearPoint,
};

pub fn simulate<S: NormalSampler>(
    params: &SimulationParameters,
    sampler: &mut S,
    retention: Retention,
) -> SimulationResult {
    let started = Instant::now();
    info!(runs = params.simulation_runs, "starting sequential simulation");
    let trajectories = simulate_trajectories(params, sampler);
    let result = summarize(params, trajectories, retention);
    log_completion(&result, started);
    result
}

// Trial `i` draws from its own stream derived from `seed`, so the result does
// not depend on scheduling.
pub fn simulate_parallel(
    params: &SimulationParameters,
    seed: u64,
    retention: Retention,
) -> SimulationResult {
    let started = Instant::now();
    info!(
        runs = params.simulation_runs,
        seed, "starting parallel simulation"
    );
    let trials = (0..params.simulation_runs).into_par_iter();
    let result = match retention {
        Retention::Full => {
            let trajectories = trials
                .map(|trial| simulate_trial(params, &mut SeededSampler::for_trial(seed, trial)))
                .collect::<Vec<_>>();
            summarize(params, trajectories, retention)
        }
        Retention::SummaryOnly => {
            let years = year_count(params);
            trials
                .fold(
                    || YearlyAccumulator::new(years, 0),
                    |mut acc, trial| {
                        let mut sampler = SeededSampler::for_trial(seed, trial);
                        acc.push(simulate_trial(params, &mut sampler));
                        acc
                    },
                )
                .reduce(
                    || YearlyAccumulator::new(years, 0),
                    YearlyAccumulator::merge,
                )
                .finish(params)
        }
    };
    log_completion(&result, started);
    result
}

pub fn simulate_trajectories<S: NormalSampler>(
    params: &SimulationParameters,
    sampler: &mut S,
) -> Vec<Trajectory> {
    (0..params.simulation_runs)
        .map(|_| simulate_trial(params, sampler))
        .collect()
}

pub fn summarize(
    params: &SimulationParameters,
    trajectories: Vec<Trajectory>,
    retention: Retention,
) -> SimulationResult {
    match retention {
        Retention::Full => SimulationResult {
            ages: params.ages(),
            success_probability: success_probability(&trajectories),
            assets: aggregate(&trajectories, Metric::Assets),
            spending: aggregate(&trajectories, Metric::Spending),
            trajectories: Some(trajectories),
        },
        Retention::SummaryOnly => {
            let year_count = trajectories
                .iter()
                .map(|t| t.points.len())
                .min()
                .unwrap_or(0);
            let mut acc = YearlyAccumulator::new(year_count, trajectories.len());
            for trajectory in trajectories {
                acc.push(trajectory);
            }
            acc.finish(params)
        }
    }
}

/// Fraction of trials that never went insolvent. Zero trials report 0.
pub fn success_probability(trajectories: &[Trajectory]) -> f64 {
    let solvent = trajectories.iter().filter(|t| !t.insolvent).count();
    solvent_fraction(solvent, trajectories.len())
}

fn solvent_fraction(solvent: usize, trials: usize) -> f64 {
    if trials == 0 {
        return 0.0;
    }
    solvent as f64 / trials as f64
}

fn year_count(params: &SimulationParameters) -> usize {
    if params.simulation_end_age < params.current_age {
        return 0;
    }
    (params.simulation_end_age - params.current_age + 1) as usize
}

/// One lifetime path: accumulate until the intended retirement age, then draw
/// down through the end age. Assets are never clamped and insolvency is sticky.
pub fn simulate_trial<S: NormalSampler>(
    params: &SimulationParameters,
    sampler: &mut S,
) -> Trajectory {
    let mut points = Vec::with_capacity(year_count(params));
    let mut asset = params.current_assets;

    let retirement_age = params
        .intended_retirement_age
        .min(params.simulation_end_age.saturating_add(1))
        .max(params.current_age);

    for age in params.current_age..retirement_age {
        let r = effective_return(params, sampler);
        asset = asset * (1.0 + r) + params.annual_savings;
        points.push(YearPoint {
            age,
            assets: asset,
            monthly_spending: 0.0,
        });
    }

    let mut annual_expense = params.initial_annual_expense();
    let mut insolvent = false;

    for age in retirement_age..=params.simulation_end_age {
        let income = if age >= params.legal_retirement_age {
            params.fixed_monthly_pension * 12.0
        } else {
            0.0
        };
        let r = effective_return(params, sampler);
        asset = asset * (1.0 + r) + income - annual_expense;
        points.push(YearPoint {
            age,
            assets: asset,
            monthly_spending: annual_expense / 12.0,
        });

        let inflation = sampler.sample_normal(params.average_inflation, params.inflation_volatility);
        annual_expense *= 1.0 + inflation;

        if asset < 0.0 && !insolvent {
            debug!(age, asset, "trial went insolvent");
            insolvent = true;
        }
    }

    Trajectory { points, insolvent }
}

fn effective_return<S: NormalSampler>(params: &SimulationParameters, sampler: &mut S) -> f64 {
    let r = sampler.sample_normal(params.average_roi, params.roi_volatility);
    after_tax_return(r, params.capital_gains_tax_rate)
}

pub fn after_tax_return(r: f64, capital_gains_tax_rate: f64) -> f64 {
    if r > 0.0 {
        r * (1.0 - capital_gains_tax_rate)
    } else {
        r
    }
}

// Per-age columns of every trial folded in so far. Trajectories are consumed
// as they arrive so only the columns stay resident.
struct YearlyAccumulator {
    assets: Vec<Vec<f64>>,
    spending: Vec<Vec<f64>>,
    trials: usize,
    solvent: usize,
}

impl YearlyAccumulator {
    fn new(year_count: usize, expected_trials: usize) -> Self {
        let make = || {
            (0..year_count)
                .map(|_| Vec::with_capacity(expected_trials))
                .collect::<Vec<_>>()
        };
        Self {
            assets: make(),
            spending: make(),
            trials: 0,
            solvent: 0,
        }
    }

    fn push(&mut self, trajectory: Trajectory) {
        self.trials += 1;
        if !trajectory.insolvent {
            self.solvent += 1;
        }
        let year_count = self.assets.len();
        for (idx, point) in trajectory.points.into_iter().take(year_count).enumerate() {
            self.assets[idx].push(point.assets);
            self.spending[idx].push(point.monthly_spending);
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (mine, theirs) in self.assets.iter_mut().zip(other.assets) {
            mine.extend(theirs);
        }
        for (mine, theirs) in self.spending.iter_mut().zip(other.spending) {
            mine.extend(theirs);
        }
        self.trials += other.trials;
        self.solvent += other.solvent;
        self
    }

    fn finish(mut self, params: &SimulationParameters) -> SimulationResult {
        if self.trials == 0 {
            self.assets.clear();
            self.spending.clear();
        }
        SimulationResult {
            ages: params.ages(),
            trajectories: None,
            success_probability: solvent_fraction(self.solvent, self.trials),
            assets: aggregate_columns(&mut self.assets),
            spending: aggregate_columns(&mut self.spending),
        }
    }
}

fn log_completion(result: &SimulationResult, started: Instant) {
    info!(
        success_probability = result.success_probability,
        years = result.ages.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "simulation complete"
    );
}
