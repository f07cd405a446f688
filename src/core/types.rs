use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyExpenses {
    pub health: f64,
    pub food: f64,
    pub entertainment: f64,
    pub shopping: f64,
    pub utilities: f64,
}

impl MonthlyExpenses {
    pub fn total(&self) -> f64 {
        self.health + self.food + self.entertainment + self.shopping + self.utilities
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualExpenses {
    pub vacations: f64,
    pub repairs: f64,
    pub car_maintenance: f64,
}

impl AnnualExpenses {
    pub fn total(&self) -> f64 {
        self.vacations + self.repairs + self.car_maintenance
    }
}

/// One fully populated parameter set. Rates are fractions (0.08 is 8%).
///
/// The engine trusts these values; range checks belong to whoever builds them.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub current_age: u32,
    pub legal_retirement_age: u32,
    pub intended_retirement_age: u32,
    pub fixed_monthly_pension: f64,
    pub current_assets: f64,
    pub annual_savings: f64,
    pub capital_gains_tax_rate: f64,
    pub average_roi: f64,
    pub roi_volatility: f64,
    pub average_inflation: f64,
    pub inflation_volatility: f64,
    pub monthly_expenses: MonthlyExpenses,
    pub annual_expenses: AnnualExpenses,
    pub simulation_runs: u32,
    pub simulation_end_age: u32,
}

impl SimulationParameters {
    /// Expense charged in the first distribution year, before any inflation.
    pub fn initial_annual_expense(&self) -> f64 {
        self.monthly_expenses.total() * 12.0 + self.annual_expenses.total()
    }

    pub fn ages(&self) -> Vec<u32> {
        (self.current_age..=self.simulation_end_age).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPoint {
    pub age: u32,
    pub assets: f64,
    pub monthly_spending: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    pub points: Vec<YearPoint>,
    pub insolvent: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Assets,
    Spending,
}

impl Metric {
    pub fn value(self, point: &YearPoint) -> f64 {
        match self {
            Metric::Assets => point.assets,
            Metric::Spending => point.monthly_spending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileSeries {
    pub p10: Vec<f64>,
    pub median: Vec<f64>,
    pub p90: Vec<f64>,
}

impl PercentileSeries {
    pub fn with_capacity(len: usize) -> Self {
        Self {
            p10: Vec::with_capacity(len),
            median: Vec::with_capacity(len),
            p90: Vec::with_capacity(len),
        }
    }

    pub fn len(&self) -> usize {
        self.median.len()
    }

    pub fn is_empty(&self) -> bool {
        self.median.is_empty()
    }
}

/// Whether per-trial trajectories survive aggregation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Retention {
    Full,
    #[default]
    SummaryOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub ages: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trajectories: Option<Vec<Trajectory>>,
    pub success_probability: f64,
    pub assets: PercentileSeries,
    pub spending: PercentileSeries,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Good,
    Borderline,
    Poor,
}

impl Outlook {
    pub fn from_success_probability(p: f64) -> Self {
        if p >= 0.8 {
            Outlook::Good
        } else if p >= 0.5 {
            Outlook::Borderline
        } else {
            Outlook::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub success_probability: f64,
    pub median_final_assets: f64,
    pub worst_case_final_assets: f64,
    pub outlook: Outlook,
}

impl SimulationResult {
    /// Terminal-age headline figures. Final values are NaN for an empty age range.
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            success_probability: self.success_probability,
            median_final_assets: self.assets.median.last().copied().unwrap_or(f64::NAN),
            worst_case_final_assets: self.assets.p10.last().copied().unwrap_or(f64::NAN),
            outlook: Outlook::from_success_probability(self.success_probability),
        }
    }
}
