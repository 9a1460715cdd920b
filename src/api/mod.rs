use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use crate::core::{
    Checklist, CurrentPosition, EvaluationMode, EvaluationSummary, FinancialInputs, RuleId,
    encouragement, evaluate_plan, format_snapshot_date, format_summary, report_file_name,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliEvaluationMode {
    Automatic,
    SelfReported,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRuleKey {
    EmergencyFund,
    HealthInsurance,
    LifeInsurance,
    CarBudget,
    HomePurchase,
    UnsecuredDebt,
    EmiLoad,
    MonthlySip,
    RetirementCorpus,
}

impl From<CliRuleKey> for RuleId {
    fn from(value: CliRuleKey) -> Self {
        match value {
            CliRuleKey::EmergencyFund => RuleId::EmergencyFund,
            CliRuleKey::HealthInsurance => RuleId::HealthInsurance,
            CliRuleKey::LifeInsurance => RuleId::LifeInsurance,
            CliRuleKey::CarBudget => RuleId::CarBudget,
            CliRuleKey::HomePurchase => RuleId::HomePurchase,
            CliRuleKey::UnsecuredDebt => RuleId::UnsecuredDebt,
            CliRuleKey::EmiLoad => RuleId::EmiLoad,
            CliRuleKey::MonthlySip => RuleId::MonthlySip,
            CliRuleKey::RetirementCorpus => RuleId::RetirementCorpus,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliOutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiEvaluationMode {
    #[serde(alias = "auto")]
    Automatic,
    #[serde(
        alias = "selfReported",
        alias = "self_reported",
        alias = "manual",
        alias = "checklist"
    )]
    SelfReported,
}

impl From<ApiEvaluationMode> for CliEvaluationMode {
    fn from(value: ApiEvaluationMode) -> Self {
        match value {
            ApiEvaluationMode::Automatic => CliEvaluationMode::Automatic,
            ApiEvaluationMode::SelfReported => CliEvaluationMode::SelfReported,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiRuleKey {
    #[serde(alias = "emergencyFund")]
    EmergencyFund,
    #[serde(alias = "healthInsurance")]
    HealthInsurance,
    #[serde(alias = "lifeInsurance", alias = "term-life-insurance")]
    LifeInsurance,
    #[serde(alias = "carBudget")]
    CarBudget,
    #[serde(alias = "homePurchase")]
    HomePurchase,
    #[serde(alias = "unsecuredDebt", alias = "personal-loans")]
    UnsecuredDebt,
    #[serde(alias = "emiLoad", alias = "emis")]
    EmiLoad,
    #[serde(alias = "monthlySip", alias = "sip")]
    MonthlySip,
    #[serde(alias = "retirementCorpus", alias = "retirement")]
    RetirementCorpus,
}

impl From<ApiRuleKey> for CliRuleKey {
    fn from(value: ApiRuleKey) -> Self {
        match value {
            ApiRuleKey::EmergencyFund => CliRuleKey::EmergencyFund,
            ApiRuleKey::HealthInsurance => CliRuleKey::HealthInsurance,
            ApiRuleKey::LifeInsurance => CliRuleKey::LifeInsurance,
            ApiRuleKey::CarBudget => CliRuleKey::CarBudget,
            ApiRuleKey::HomePurchase => CliRuleKey::HomePurchase,
            ApiRuleKey::UnsecuredDebt => CliRuleKey::UnsecuredDebt,
            ApiRuleKey::EmiLoad => CliRuleKey::EmiLoad,
            ApiRuleKey::MonthlySip => CliRuleKey::MonthlySip,
            ApiRuleKey::RetirementCorpus => CliRuleKey::RetirementCorpus,
        }
    }
}

/// JSON bodies send a list; query strings send `checked=a,b,c`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CheckedPayload {
    List(Vec<ApiRuleKey>),
    Csv(String),
}

impl CheckedPayload {
    fn into_cli_keys(self) -> Result<Vec<CliRuleKey>, String> {
        match self {
            CheckedPayload::List(keys) => Ok(keys.into_iter().map(Into::into).collect()),
            CheckedPayload::Csv(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(|key| {
                    <CliRuleKey as ValueEnum>::from_str(key, true)
                        .map_err(|_| format!("unknown rule in checked: {key}"))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    ctc: Option<f64>,
    savings_rate: Option<f64>,
    mode: Option<ApiEvaluationMode>,
    checked: Option<CheckedPayload>,

    emergency_fund: Option<f64>,
    health_cover: Option<f64>,
    life_cover: Option<f64>,
    car_value: Option<f64>,
    home_price: Option<f64>,
    unsecured_debt: Option<f64>,
    monthly_emis: Option<f64>,
    monthly_sip: Option<f64>,
    retirement_corpus: Option<f64>,

    date: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "finplan",
    about = "5 minute financial plan: check CTC and savings rate against personal-finance thumb rules"
)]
struct Cli {
    #[arg(long, help = "Annual CTC in lakhs")]
    ctc: f64,
    #[arg(long, help = "Share of monthly take-home saved, in percent")]
    savings_rate: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliEvaluationMode::Automatic,
        help = "Automatic three-tier evaluation or a self-reported checklist"
    )]
    mode: CliEvaluationMode,
    #[arg(
        long,
        value_enum,
        help = "Rule already met; repeat for each ticked rule (self-reported mode)"
    )]
    checked: Vec<CliRuleKey>,
    #[arg(long, help = "Current emergency fund balance in rupees")]
    emergency_fund: Option<f64>,
    #[arg(long, help = "Current health insurance cover in rupees")]
    health_cover: Option<f64>,
    #[arg(long, help = "Current term-life cover in rupees")]
    life_cover: Option<f64>,
    #[arg(long, help = "Price of the car owned or planned, in rupees")]
    car_value: Option<f64>,
    #[arg(long, help = "Price of the home owned or planned, in rupees")]
    home_price: Option<f64>,
    #[arg(long, help = "Outstanding personal loans and credit card dues in rupees")]
    unsecured_debt: Option<f64>,
    #[arg(long, help = "Total monthly EMIs in rupees")]
    monthly_emis: Option<f64>,
    #[arg(long, help = "Current monthly SIP in rupees; defaults to monthly savings")]
    monthly_sip: Option<f64>,
    #[arg(long, help = "Current retirement corpus in rupees")]
    retirement_corpus: Option<f64>,
    #[arg(long, help = "Snapshot date as YYYY-MM-DD; defaults to today")]
    date: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = CliOutputFormat::Text)]
    format: CliOutputFormat,
    #[arg(long, help = "Write the plan to this file instead of stdout")]
    output: Option<PathBuf>,
    #[arg(
        long,
        conflicts_with = "output",
        help = "Write the plan to financial_plan_<DD-Mon-YYYY>.txt"
    )]
    save: bool,
}

#[derive(Debug)]
struct PlanRequest {
    inputs: FinancialInputs,
    position: CurrentPosition,
    mode: EvaluationMode,
    snapshot_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    #[serde(flatten)]
    summary: EvaluationSummary,
    encouragement: String,
    snapshot_date: String,
    file_name: String,
    report_text: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: &Cli) -> Result<PlanRequest, String> {
    let inputs = FinancialInputs::new(cli.ctc, cli.savings_rate).map_err(|e| e.to_string())?;

    let mode = match cli.mode {
        CliEvaluationMode::Automatic => {
            if !cli.checked.is_empty() {
                return Err("--checked requires --mode self-reported".to_string());
            }
            EvaluationMode::Automatic
        }
        CliEvaluationMode::SelfReported => EvaluationMode::SelfReported(Checklist::from_checked(
            cli.checked.iter().copied().map(RuleId::from),
        )),
    };

    let position = CurrentPosition {
        emergency_fund: cli.emergency_fund,
        health_cover: cli.health_cover,
        life_cover: cli.life_cover,
        car_value: cli.car_value,
        home_price: cli.home_price,
        unsecured_debt: cli.unsecured_debt,
        monthly_emis: cli.monthly_emis,
        monthly_sip: cli.monthly_sip,
        retirement_corpus: cli.retirement_corpus,
    };
    position.validate().map_err(|e| e.to_string())?;

    Ok(PlanRequest {
        inputs,
        position,
        mode,
        snapshot_date: cli.date.unwrap_or_else(today),
    })
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn build_plan_response(request: &PlanRequest) -> Result<PlanResponse, String> {
    let summary = evaluate_plan(&request.inputs, &request.position, &request.mode)
        .map_err(|e| e.to_string())?;
    let report_text = format_summary(&summary, request.snapshot_date);
    Ok(PlanResponse {
        encouragement: encouragement(summary.met_count),
        snapshot_date: format_snapshot_date(request.snapshot_date),
        file_name: report_file_name(request.snapshot_date),
        report_text,
        summary,
    })
}

/// Runs the report command line: evaluates the plan and prints or saves it.
pub fn run_cli<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let request = build_request(&cli)?;
    let response = build_plan_response(&request)?;

    let rendered = match cli.format {
        CliOutputFormat::Text => response.report_text.clone(),
        CliOutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&response)
                .map_err(|e| format!("failed to serialize plan: {e}"))?;
            json.push('\n');
            json
        }
    };

    let destination = match (&cli.output, cli.save) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(&response.file_name)),
        (None, false) => None,
    };

    match destination {
        Some(path) => {
            std::fs::write(&path, rendered)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            tracing::info!(path = %path.display(), met_count = response.summary.met_count, "saved financial plan");
            println!("Saved financial plan to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn app_router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .route(
            "/api/plan/report",
            get(report_get_handler).post(report_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Financial plan HTTP API listening on http://{addr}");
    tracing::info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app_router()).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_get_handler(payload: Result<Query<PlanPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => plan_handler_impl(payload),
        Err(rejection) => payload_rejected(&rejection.body_text()),
    }
}

async fn plan_post_handler(payload: Result<Json<PlanPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => plan_handler_impl(payload),
        Err(rejection) => payload_rejected(&rejection.body_text()),
    }
}

async fn report_get_handler(payload: Result<Query<PlanPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => report_handler_impl(payload),
        Err(rejection) => payload_rejected(&rejection.body_text()),
    }
}

async fn report_post_handler(payload: Result<Json<PlanPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => report_handler_impl(payload),
        Err(rejection) => payload_rejected(&rejection.body_text()),
    }
}

fn payload_rejected(msg: &str) -> Response {
    tracing::warn!(error = %msg, "undecodable plan payload");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn plan_handler_impl(payload: PlanPayload) -> Response {
    match plan_request_from_payload(payload).and_then(|request| build_plan_response(&request)) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected plan request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn report_handler_impl(payload: PlanPayload) -> Response {
    let response =
        match plan_request_from_payload(payload).and_then(|request| build_plan_response(&request))
        {
            Ok(response) => response,
            Err(msg) => {
                tracing::warn!(error = %msg, "rejected report request");
                return error_response(StatusCode::BAD_REQUEST, &msg);
            }
        };

    with_cache_control((
        [
            (
                header::CONTENT_TYPE,
                "text/plain; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", response.file_name),
            ),
        ],
        response.report_text,
    ))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
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
fn plan_request_from_json(json: &str) -> Result<PlanRequest, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    plan_request_from_payload(payload)
}

fn plan_request_from_payload(payload: PlanPayload) -> Result<PlanRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.ctc {
        cli.ctc = v;
    }
    if let Some(v) = payload.savings_rate {
        cli.savings_rate = v;
    }
    if let Some(v) = payload.mode {
        cli.mode = v.into();
    }
    if let Some(v) = payload.checked {
        cli.checked = v.into_cli_keys()?;
    }

    if let Some(v) = payload.emergency_fund {
        cli.emergency_fund = Some(v);
    }
    if let Some(v) = payload.health_cover {
        cli.health_cover = Some(v);
    }
    if let Some(v) = payload.life_cover {
        cli.life_cover = Some(v);
    }
    if let Some(v) = payload.car_value {
        cli.car_value = Some(v);
    }
    if let Some(v) = payload.home_price {
        cli.home_price = Some(v);
    }
    if let Some(v) = payload.unsecured_debt {
        cli.unsecured_debt = Some(v);
    }
    if let Some(v) = payload.monthly_emis {
        cli.monthly_emis = Some(v);
    }
    if let Some(v) = payload.monthly_sip {
        cli.monthly_sip = Some(v);
    }
    if let Some(v) = payload.retirement_corpus {
        cli.retirement_corpus = Some(v);
    }

    if let Some(v) = payload.date {
        let date = NaiveDate::parse_from_str(&v, "%Y-%m-%d")
            .map_err(|e| format!("date must be YYYY-MM-DD: {e}"))?;
        cli.date = Some(date);
    }

    build_request(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        ctc: 25.0,
        savings_rate: 50.0,
        mode: CliEvaluationMode::Automatic,
        checked: Vec::new(),
        emergency_fund: None,
        health_cover: None,
        life_cover: None,
        car_value: None,
        home_price: None,
        unsecured_debt: None,
        monthly_emis: None,
        monthly_sip: None,
        retirement_corpus: None,
        date: None,
        format: CliOutputFormat::Text,
        output: None,
        save: false,
    }
}
