use serde::Serialize;
use tracing::info;

use super::engine::simulate_parallel;
use super::error::CompareError;
use super::types::{Retention, SimulationParameters};

#[derive(Debug, Clone)]
pub struct NamedScenario {
    pub name: String,
    pub params: SimulationParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioComparison {
    pub name: String,
    pub success_probability: f64,
    pub median_final_assets: f64,
    pub worst_case_final_assets: f64,
    pub intended_retirement_age: u32,
    pub average_roi: f64,
    pub average_inflation: f64,
}

/// Evaluates each scenario independently with the same seed and reports the
/// headline figures side by side, in input order.
pub fn compare_scenarios(
    scenarios: &[NamedScenario],
    seed: u64,
) -> Result<Vec<ScenarioComparison>, CompareError> {
    if scenarios.len() < 2 {
        return Err(CompareError::TooFewScenarios(scenarios.len()));
    }

    Ok(scenarios
        .iter()
        .map(|scenario| {
            info!(scenario = %scenario.name, "simulating scenario");
            let summary =
                simulate_parallel(&scenario.params, seed, Retention::SummaryOnly).summary();
            ScenarioComparison {
                name: scenario.name.clone(),
                success_probability: summary.success_probability,
                median_final_assets: summary.median_final_assets,
                worst_case_final_assets: summary.worst_case_final_assets,
                intended_retirement_age: scenario.params.intended_retirement_age,
                average_roi: scenario.params.average_roi,
                average_inflation: scenario.params.average_inflation,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AnnualExpenses, MonthlyExpenses};

    fn scenario(name: &str, retire_at: u32) -> NamedScenario {
        NamedScenario {
            name: name.to_string(),
            params: SimulationParameters {
                current_age: 50,
                legal_retirement_age: 67,
                intended_retirement_age: retire_at,
                fixed_monthly_pension: 1_500.0,
                current_assets: 400_000.0,
                annual_savings: 15_000.0,
                capital_gains_tax_rate: 0.2625,
                average_roi: 0.06,
                roi_volatility: 0.1,
                average_inflation: 0.02,
                inflation_volatility: 0.01,
                monthly_expenses: MonthlyExpenses {
                    health: 400.0,
                    food: 700.0,
                    entertainment: 300.0,
                    shopping: 300.0,
                    utilities: 300.0,
                },
                annual_expenses: AnnualExpenses {
                    vacations: 5_000.0,
                    repairs: 2_000.0,
                    car_maintenance: 1_000.0,
                },
                simulation_runs: 300,
                simulation_end_age: 90,
            },
        }
    }

    #[test]
    fn rejects_single_scenario() {
        let err = compare_scenarios(&[scenario("only", 60)], 1).expect_err("needs two");
        assert_eq!(err, CompareError::TooFewScenarios(1));
    }

    #[test]
    fn reports_each_scenario_in_order() {
        let rows = compare_scenarios(&[scenario("early", 55), scenario("late", 65)], 4)
            .expect("two scenarios");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "early");
        assert_eq!(rows[1].intended_retirement_age, 65);
        assert!(rows[0].success_probability <= rows[1].success_probability);
        assert!(rows[0].median_final_assets < rows[1].median_final_assets);
    }
}
