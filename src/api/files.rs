use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{
    AnnualExpenses, MonthlyExpenses, ScenarioComparison, SimulationParameters, SimulationResult,
};

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid parameter file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to export CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// On-disk parameter set. Rates are fractions; key names follow the files
/// written by earlier versions of the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamsFile {
    pub current_age: u32,
    pub legal_retirement_age: u32,
    pub fixed_monthly_pension: f64,
    pub current_assets: f64,
    pub capital_gains_tax_rate: f64,
    pub annual_savings: f64,
    pub intended_retirement_age: u32,
    #[serde(rename = "averageROI")]
    pub average_roi: f64,
    pub average_inflation: f64,
    #[serde(rename = "ROI_volatility")]
    pub roi_volatility: f64,
    #[serde(rename = "inflation_volatility")]
    pub inflation_volatility: f64,
    pub monthly_expenses: MonthlyExpenses,
    pub annual_expenses: AnnualExpenses,
    pub simulation_runs: u32,
    pub simulation_end_age: u32,
}

impl From<ParamsFile> for SimulationParameters {
    fn from(file: ParamsFile) -> Self {
        Self {
            current_age: file.current_age,
            legal_retirement_age: file.legal_retirement_age,
            intended_retirement_age: file.intended_retirement_age,
            fixed_monthly_pension: file.fixed_monthly_pension,
            current_assets: file.current_assets,
            annual_savings: file.annual_savings,
            capital_gains_tax_rate: file.capital_gains_tax_rate,
            average_roi: file.average_roi,
            roi_volatility: file.roi_volatility,
            average_inflation: file.average_inflation,
            inflation_volatility: file.inflation_volatility,
            monthly_expenses: file.monthly_expenses,
            annual_expenses: file.annual_expenses,
            simulation_runs: file.simulation_runs,
            simulation_end_age: file.simulation_end_age,
        }
    }
}

impl From<&SimulationParameters> for ParamsFile {
    fn from(params: &SimulationParameters) -> Self {
        Self {
            current_age: params.current_age,
            legal_retirement_age: params.legal_retirement_age,
            fixed_monthly_pension: params.fixed_monthly_pension,
            current_assets: params.current_assets,
            capital_gains_tax_rate: params.capital_gains_tax_rate,
            annual_savings: params.annual_savings,
            intended_retirement_age: params.intended_retirement_age,
            average_roi: params.average_roi,
            average_inflation: params.average_inflation,
            roi_volatility: params.roi_volatility,
            inflation_volatility: params.inflation_volatility,
            monthly_expenses: params.monthly_expenses,
            annual_expenses: params.annual_expenses,
            simulation_runs: params.simulation_runs,
            simulation_end_age: params.simulation_end_age,
        }
    }
}

pub fn parse_params(json: &str, path: &Path) -> Result<SimulationParameters, FileError> {
    serde_json::from_str::<ParamsFile>(json)
        .map(SimulationParameters::from)
        .map_err(|source| FileError::Json {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_params_file(path: &Path) -> Result<SimulationParameters, FileError> {
    let json = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_params(&json, path)
}

pub fn save_params_file(path: &Path, params: &SimulationParameters) -> Result<(), FileError> {
    let json = serde_json::to_string_pretty(&ParamsFile::from(params)).map_err(|source| {
        FileError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, json).map_err(|source| FileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Serialize)]
struct CsvRow {
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "AssetP10")]
    asset_p10: f64,
    #[serde(rename = "AssetMedian")]
    asset_median: f64,
    #[serde(rename = "AssetP90")]
    asset_p90: f64,
    #[serde(rename = "SpendingMedian")]
    spending_median: f64,
}

/// One row per simulated age with the asset band and median monthly spending.
pub fn write_results_csv<W: Write>(result: &SimulationResult, out: W) -> Result<(), FileError> {
    let mut writer = csv::Writer::from_writer(out);
    for (idx, &age) in result.ages.iter().enumerate().take(result.assets.len()) {
        writer.serialize(CsvRow {
            age,
            asset_p10: result.assets.p10[idx],
            asset_median: result.assets.median[idx],
            asset_p90: result.assets.p90[idx],
            spending_median: result.spending.median[idx],
        })?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn export_results_csv(path: &Path, result: &SimulationResult) -> Result<(), FileError> {
    let file = fs::File::create(path).map_err(|source| FileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_results_csv(result, file)
}

pub fn format_report(result: &SimulationResult) -> String {
    let summary = result.summary();
    let first = result.ages.first().copied().unwrap_or_default();
    let last = result.ages.last().copied().unwrap_or_default();
    format!(
        "Ages simulated:        {first}-{last}\n\
         Success probability:   {:.1}% ({:?})\n\
         Median final assets:   {:.0}\n\
         10% worst case assets: {:.0}\n",
        summary.success_probability * 100.0,
        summary.outlook,
        summary.median_final_assets,
        summary.worst_case_final_assets,
    )
}

pub fn format_comparison(rows: &[ScenarioComparison]) -> String {
    let mut out = format!(
        "{:<24} {:>8} {:>14} {:>14} {:>7} {:>7} {:>7}\n",
        "Scenario", "Success", "Median final", "P10 final", "Retire", "ROI", "Infl."
    );
    for row in rows {
        out.push_str(&format!(
            "{:<24} {:>7.1}% {:>14.0} {:>14.0} {:>7} {:>6.1}% {:>6.1}%\n",
            row.name,
            row.success_probability * 100.0,
            row.median_final_assets,
            row.worst_case_final_assets,
            row.intended_retirement_age,
            row.average_roi * 100.0,
            row.average_inflation * 100.0,
        ));
    }
    out
}
