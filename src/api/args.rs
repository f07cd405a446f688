use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::warn;

use crate::core::{AnnualExpenses, MonthlyExpenses, SimulationParameters};

#[derive(Parser, Debug)]
#[command(
    name = "earlyretire",
    about = "Monte Carlo estimate of whether early retirement lasts until the pension starts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate one parameter set and print the outcome
    Run(RunArgs),
    /// Simulate several parameter files and compare them side by side
    Compare(CompareArgs),
    /// Serve the JSON API
    Serve {
        #[arg(default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub params: ParamArgs,
    #[arg(
        long,
        help = "Load the parameter set from a JSON parameter file instead of flags"
    )]
    pub params_file: Option<PathBuf>,
    #[arg(long, help = "Write the parameter set actually used to a JSON file")]
    pub save_params: Option<PathBuf>,
    #[arg(long, help = "Export per-age percentiles as CSV")]
    pub csv: Option<PathBuf>,
    #[arg(long, help = "Print the full result as JSON")]
    pub json: bool,
    #[arg(long, help = "Keep every simulated trajectory in the JSON output")]
    pub keep_trajectories: bool,
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(required = true, num_args = 2.., help = "Parameter files, one per scenario")]
    pub files: Vec<PathBuf>,
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    #[arg(long, help = "Print the comparison as JSON")]
    pub json: bool,
}

/// Parameter flags. Return, inflation and tax rates are given in percent;
/// volatilities are standard deviations given as fractions.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ParamArgs {
    #[arg(long, default_value_t = 54)]
    pub current_age: u32,
    #[arg(long, default_value_t = 67, help = "Age when the fixed pension begins")]
    pub legal_retirement_age: u32,
    #[arg(long, default_value_t = 60)]
    pub intended_retirement_age: u32,
    #[arg(
        long,
        default_value_t = 5000.0,
        help = "Fixed monthly pension from the legal retirement age"
    )]
    pub fixed_monthly_pension: f64,
    #[arg(long, default_value_t = 600000.0)]
    pub current_assets: f64,
    #[arg(long, default_value_t = 18000.0, help = "Savings added each working year")]
    pub annual_savings: f64,
    #[arg(
        long,
        default_value_t = 26.25,
        help = "Tax on positive yearly returns in percent"
    )]
    pub capital_gains_tax_rate: f64,
    #[arg(long, default_value_t = 12.0, help = "Expected annual return in percent")]
    pub average_roi: f64,
    #[arg(
        long,
        default_value_t = 0.15,
        help = "Standard deviation of the annual return, e.g. 0.15"
    )]
    pub roi_volatility: f64,
    #[arg(long, default_value_t = 2.5, help = "Expected annual inflation in percent")]
    pub average_inflation: f64,
    #[arg(
        long,
        default_value_t = 0.01,
        help = "Standard deviation of annual inflation, e.g. 0.01"
    )]
    pub inflation_volatility: f64,
    #[arg(long, default_value_t = 1500.0)]
    pub expense_health: f64,
    #[arg(long, default_value_t = 1500.0)]
    pub expense_food: f64,
    #[arg(long, default_value_t = 500.0)]
    pub expense_entertainment: f64,
    #[arg(long, default_value_t = 500.0)]
    pub expense_shopping: f64,
    #[arg(long, default_value_t = 500.0)]
    pub expense_utilities: f64,
    #[arg(long, default_value_t = 12000.0)]
    pub expense_vacations: f64,
    #[arg(long, default_value_t = 3000.0)]
    pub expense_repairs: f64,
    #[arg(long, default_value_t = 3000.0)]
    pub expense_car_maintenance: f64,
    #[arg(long, default_value_t = 10000)]
    pub simulation_runs: u32,
    #[arg(long, default_value_t = 90, help = "Last simulated age (inclusive)")]
    pub simulation_end_age: u32,
}

impl Default for ParamArgs {
    fn default() -> Self {
        Self {
            current_age: 54,
            legal_retirement_age: 67,
            intended_retirement_age: 60,
            fixed_monthly_pension: 5000.0,
            current_assets: 600000.0,
            annual_savings: 18000.0,
            capital_gains_tax_rate: 26.25,
            average_roi: 12.0,
            roi_volatility: 0.15,
            average_inflation: 2.5,
            inflation_volatility: 0.01,
            expense_health: 1500.0,
            expense_food: 1500.0,
            expense_entertainment: 500.0,
            expense_shopping: 500.0,
            expense_utilities: 500.0,
            expense_vacations: 12000.0,
            expense_repairs: 3000.0,
            expense_car_maintenance: 3000.0,
            simulation_runs: 10000,
            simulation_end_age: 90,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("--intended-retirement-age must be > --current-age")]
    RetirementNotAfterCurrentAge,
    #[error("--simulation-end-age must be >= --intended-retirement-age")]
    EndAgeBeforeRetirement,
    #[error("--simulation-runs must be > 0")]
    NoRuns,
    #[error("{name} must be between {min} and {max}")]
    OutOfRange {
        name: &'static str,
        min: f64,
        max: f64,
    },
    #[error("--capital-gains-tax-rate must be >= 0 and < 100")]
    TaxRateOutOfRange,
    #[error("{0} must be a finite amount >= 0")]
    NegativeAmount(&'static str),
}

/// Converts percent flags to fractions and rejects implausible parameter sets.
pub fn build_parameters(args: &ParamArgs) -> Result<SimulationParameters, ParameterError> {
    let params = SimulationParameters {
        current_age: args.current_age,
        legal_retirement_age: args.legal_retirement_age,
        intended_retirement_age: args.intended_retirement_age,
        fixed_monthly_pension: args.fixed_monthly_pension,
        current_assets: args.current_assets,
        annual_savings: args.annual_savings,
        capital_gains_tax_rate: args.capital_gains_tax_rate / 100.0,
        average_roi: args.average_roi / 100.0,
        roi_volatility: args.roi_volatility,
        average_inflation: args.average_inflation / 100.0,
        inflation_volatility: args.inflation_volatility,
        monthly_expenses: MonthlyExpenses {
            health: args.expense_health,
            food: args.expense_food,
            entertainment: args.expense_entertainment,
            shopping: args.expense_shopping,
            utilities: args.expense_utilities,
        },
        annual_expenses: AnnualExpenses {
            vacations: args.expense_vacations,
            repairs: args.expense_repairs,
            car_maintenance: args.expense_car_maintenance,
        },
        simulation_runs: args.simulation_runs,
        simulation_end_age: args.simulation_end_age,
    };
    validate_parameters(&params)?;
    Ok(params)
}

pub fn validate_parameters(params: &SimulationParameters) -> Result<(), ParameterError> {
    check_parameters(params).inspect_err(|e| warn!(error = %e, "rejected parameters"))
}

fn check_parameters(params: &SimulationParameters) -> Result<(), ParameterError> {
    if params.intended_retirement_age <= params.current_age {
        return Err(ParameterError::RetirementNotAfterCurrentAge);
    }

    if params.simulation_end_age < params.intended_retirement_age {
        return Err(ParameterError::EndAgeBeforeRetirement);
    }

    if params.simulation_runs == 0 {
        return Err(ParameterError::NoRuns);
    }

    for (name, value, min, max) in [
        ("--average-roi", params.average_roi, -0.05, 0.30),
        ("--average-inflation", params.average_inflation, 0.0, 0.20),
        ("--roi-volatility", params.roi_volatility, 0.0, 1.0),
        ("--inflation-volatility", params.inflation_volatility, 0.0, 1.0),
    ] {
        if !(min..=max).contains(&value) {
            return Err(ParameterError::OutOfRange { name, min, max });
        }
    }

    if !(0.0..1.0).contains(&params.capital_gains_tax_rate) {
        return Err(ParameterError::TaxRateOutOfRange);
    }

    let monthly = &params.monthly_expenses;
    let annual = &params.annual_expenses;
    for (name, amount) in [
        ("--fixed-monthly-pension", params.fixed_monthly_pension),
        ("--current-assets", params.current_assets),
        ("--annual-savings", params.annual_savings),
        ("--expense-health", monthly.health),
        ("--expense-food", monthly.food),
        ("--expense-entertainment", monthly.entertainment),
        ("--expense-shopping", monthly.shopping),
        ("--expense-utilities", monthly.utilities),
        ("--expense-vacations", annual.vacations),
        ("--expense-repairs", annual.repairs),
        ("--expense-car-maintenance", annual.car_maintenance),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ParameterError::NegativeAmount(name));
        }
    }

    Ok(())
}
