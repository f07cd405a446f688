mod args;
mod files;

use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    CompareError, NamedScenario, ResultSummary, Retention, ScenarioComparison, SimulationError,
    SimulationParameters, SimulationResult, compare_in_background, simulate_in_background,
};

pub use args::{
    Cli, Command, CompareArgs, ParamArgs, ParameterError, RunArgs, build_parameters,
    validate_parameters,
};
pub use files::{
    FileError, ParamsFile, export_results_csv, format_comparison, format_report,
    load_params_file, parse_params, save_params_file, write_results_csv,
};

const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Compare(#[from] CompareError),
    #[error("failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolves the parameter set, runs it off the async runtime and prints the outcome.
pub async fn run_command(args: RunArgs) -> Result<(), CommandError> {
    let params = match &args.params_file {
        Some(path) => {
            let params = load_params_file(path)?;
            validate_parameters(&params)?;
            params
        }
        None => build_parameters(&args.params)?,
    };

    if let Some(path) = &args.save_params {
        save_params_file(path, &params)?;
        info!(path = %path.display(), "saved parameters");
    }

    let retention = if args.keep_trajectories {
        Retention::Full
    } else {
        Retention::SummaryOnly
    };
    let result = simulate_in_background(params, args.seed, retention).await?;

    if let Some(path) = &args.csv {
        export_results_csv(path, &result)?;
        info!(path = %path.display(), "exported results");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&SimulateResponse::new(result))?);
    } else {
        print!("{}", format_report(&result));
    }
    Ok(())
}

pub async fn compare_command(args: CompareArgs) -> Result<(), CommandError> {
    let mut scenarios = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let params = load_params_file(path)?;
        validate_parameters(&params)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        scenarios.push(NamedScenario { name, params });
    }

    let rows = compare_in_background(scenarios, args.seed).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", format_comparison(&rows));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    current_age: Option<u32>,
    legal_retirement_age: Option<u32>,
    intended_retirement_age: Option<u32>,
    fixed_monthly_pension: Option<f64>,
    current_assets: Option<f64>,
    annual_savings: Option<f64>,
    capital_gains_tax_rate: Option<f64>,
    average_roi: Option<f64>,
    roi_volatility: Option<f64>,
    average_inflation: Option<f64>,
    inflation_volatility: Option<f64>,

    expense_health: Option<f64>,
    expense_food: Option<f64>,
    expense_entertainment: Option<f64>,
    expense_shopping: Option<f64>,
    expense_utilities: Option<f64>,
    expense_vacations: Option<f64>,
    expense_repairs: Option<f64>,
    expense_car_maintenance: Option<f64>,

    simulation_runs: Option<u32>,
    simulation_end_age: Option<u32>,
    seed: Option<u64>,
    keep_trajectories: Option<bool>,
}

#[derive(Debug)]
struct ApiRequest {
    params: SimulationParameters,
    seed: u64,
    retention: Retention,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComparePayloadEntry {
    name: String,
    #[serde(default)]
    params: SimulatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComparePayload {
    #[serde(default)]
    seed: Option<u64>,
    scenarios: Vec<ComparePayloadEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    summary: ResultSummary,
    #[serde(flatten)]
    result: SimulationResult,
}

impl SimulateResponse {
    fn new(result: SimulationResult) -> Self {
        Self {
            summary: result.summary(),
            result,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    scenarios: Vec<ScenarioComparison>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "retirement simulation API listening");
    println!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/compare", post(compare_handler))
        .fallback(not_found_handler)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match simulate_in_background(request.params, request.seed, request.retention).await {
        Ok(result) => json_response(StatusCode::OK, SimulateResponse::new(result)),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn compare_handler(Json(payload): Json<ComparePayload>) -> Response {
    let seed = payload.seed.unwrap_or(DEFAULT_SEED);
    let mut scenarios = Vec::with_capacity(payload.scenarios.len());
    for entry in payload.scenarios {
        match api_request_from_payload(entry.params) {
            Ok(request) => scenarios.push(NamedScenario {
                name: entry.name,
                params: request.params,
            }),
            Err(e) => {
                let msg = format!("scenario '{}': {e}", entry.name);
                return error_response(StatusCode::BAD_REQUEST, &msg);
            }
        }
    }

    match compare_in_background(scenarios, seed).await {
        Ok(rows) => json_response(StatusCode::OK, CompareResponse { scenarios: rows }),
        Err(e @ CompareError::TooFewScenarios(_)) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, ParameterError> {
    let mut args = ParamArgs::default();

    if let Some(v) = payload.current_age {
        args.current_age = v;
    }
    if let Some(v) = payload.legal_retirement_age {
        args.legal_retirement_age = v;
    }
    if let Some(v) = payload.intended_retirement_age {
        args.intended_retirement_age = v;
    }
    if let Some(v) = payload.fixed_monthly_pension {
        args.fixed_monthly_pension = v;
    }
    if let Some(v) = payload.current_assets {
        args.current_assets = v;
    }
    if let Some(v) = payload.annual_savings {
        args.annual_savings = v;
    }
    if let Some(v) = payload.capital_gains_tax_rate {
        args.capital_gains_tax_rate = v;
    }
    if let Some(v) = payload.average_roi {
        args.average_roi = v;
    }
    if let Some(v) = payload.roi_volatility {
        args.roi_volatility = v;
    }
    if let Some(v) = payload.average_inflation {
        args.average_inflation = v;
    }
    if let Some(v) = payload.inflation_volatility {
        args.inflation_volatility = v;
    }

    if let Some(v) = payload.expense_health {
        args.expense_health = v;
    }
    if let Some(v) = payload.expense_food {
        args.expense_food = v;
    }
    if let Some(v) = payload.expense_entertainment {
        args.expense_entertainment = v;
    }
    if let Some(v) = payload.expense_shopping {
        args.expense_shopping = v;
    }
    if let Some(v) = payload.expense_utilities {
        args.expense_utilities = v;
    }
    if let Some(v) = payload.expense_vacations {
        args.expense_vacations = v;
    }
    if let Some(v) = payload.expense_repairs {
        args.expense_repairs = v;
    }
    if let Some(v) = payload.expense_car_maintenance {
        args.expense_car_maintenance = v;
    }

    if let Some(v) = payload.simulation_runs {
        args.simulation_runs = v;
    }
    if let Some(v) = payload.simulation_end_age {
        args.simulation_end_age = v;
    }

    let params = build_parameters(&args)?;
    let retention = if payload.keep_trajectories.unwrap_or(false) {
        Retention::Full
    } else {
        Retention::SummaryOnly
    };

    Ok(ApiRequest {
        params,
        seed: payload.seed.unwrap_or(DEFAULT_SEED),
        retention,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Outlook, simulate_parallel};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "currentAge": 45,
          "legalRetirementAge": 66,
          "intendedRetirementAge": 58,
          "fixedMonthlyPension": 2200,
          "currentAssets": 350000,
          "annualSavings": 24000,
          "capitalGainsTaxRate": 25,
          "averageRoi": 7,
          "roiVolatility": 0.12,
          "averageInflation": 2,
          "inflationVolatility": 0.005,
          "expenseCarMaintenance": 1800,
          "simulationRuns": 321,
          "simulationEndAge": 95,
          "seed": 9,
          "keepTrajectories": true
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let params = request.params;

        assert_eq!(params.current_age, 45);
        assert_eq!(params.legal_retirement_age, 66);
        assert_eq!(params.intended_retirement_age, 58);
        assert_approx(params.fixed_monthly_pension, 2_200.0);
        assert_approx(params.current_assets, 350_000.0);
        assert_approx(params.capital_gains_tax_rate, 0.25);
        assert_approx(params.average_roi, 0.07);
        assert_approx(params.roi_volatility, 0.12);
        assert_approx(params.average_inflation, 0.02);
        assert_approx(params.annual_expenses.car_maintenance, 1_800.0);
        assert_approx(params.monthly_expenses.health, 1_500.0);
        assert_eq!(params.simulation_runs, 321);
        assert_eq!(params.simulation_end_age, 95);
        assert_eq!(request.seed, 9);
        assert_eq!(request.retention, Retention::Full);
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let request = api_request_from_json("{}").expect("defaults are valid");
        assert_eq!(request.params.current_age, 54);
        assert_eq!(request.params.simulation_runs, 10_000);
        assert_eq!(request.seed, DEFAULT_SEED);
        assert_eq!(request.retention, Retention::SummaryOnly);
    }

    #[test]
    fn api_request_rejects_invalid_ages() {
        let err = api_request_from_json(r#"{"currentAge": 61}"#).expect_err("must reject");
        assert!(err.contains("--intended-retirement-age"));
    }

    #[test]
    fn api_request_rejects_malformed_json() {
        let err = api_request_from_json(r#"{"currentAge": "old"}"#).expect_err("must reject");
        assert!(err.starts_with("Invalid API JSON payload"));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let request = api_request_from_json(
            r#"{"simulationRuns": 20, "currentAge": 58, "simulationEndAge": 62}"#,
        )
        .expect("valid");
        let result = simulate_parallel(&request.params, request.seed, request.retention);
        let json = serde_json::to_string(&SimulateResponse::new(result)).expect("serializes");

        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"successProbability\""));
        assert!(json.contains("\"medianFinalAssets\""));
        assert!(json.contains("\"assets\""));
        assert!(json.contains("\"spending\""));
        assert!(json.contains("\"p10\""));
        assert!(json.contains("\"ages\":[58,59,60,61,62]"));
        assert!(!json.contains("\"trajectories\""));
    }

    #[test]
    fn compare_payload_parses_named_scenarios() {
        let json = r#"{
          "seed": 3,
          "scenarios": [
            {"name": "now", "params": {"intendedRetirementAge": 56}},
            {"name": "later"}
          ]
        }"#;
        let payload = serde_json::from_str::<ComparePayload>(json).expect("parses");
        assert_eq!(payload.seed, Some(3));
        assert_eq!(payload.scenarios.len(), 2);
        assert_eq!(payload.scenarios[0].params.intended_retirement_age, Some(56));
        assert!(payload.scenarios[1].params.intended_retirement_age.is_none());
    }

    #[tokio::test]
    async fn compare_handler_rejects_single_scenario() {
        let payload = serde_json::from_str::<ComparePayload>(
            r#"{"scenarios": [{"name": "solo", "params": {"simulationRuns": 10}}]}"#,
        )
        .expect("parses");
        let response = compare_handler(Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn simulate_handler_returns_bad_request_for_invalid_payload() {
        let payload = SimulatePayload {
            average_roi: Some(45.0),
            ..SimulatePayload::default()
        };
        let response = simulate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
    }

    #[tokio::test]
    async fn simulate_handler_runs_small_request() {
        let payload = SimulatePayload {
            simulation_runs: Some(8),
            roi_volatility: Some(0.0),
            inflation_volatility: Some(0.0),
            ..SimulatePayload::default()
        };
        let response = simulate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn default_run_is_rated() {
        let mut args = ParamArgs::default();
        args.simulation_runs = 200;
        let params = build_parameters(&args).expect("valid");
        let summary = simulate_parallel(&params, DEFAULT_SEED, Retention::SummaryOnly).summary();
        assert!((0.0..=1.0).contains(&summary.success_probability));
        assert_eq!(
            summary.outlook,
            Outlook::from_success_probability(summary.success_probability)
        );
    }
}
