#![cfg(not(tarpaulin_include))]

use axum::{
    Router,
    body::Body,
    extract::{Multipart, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Local;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::analysis;
use crate::auth::{Repository, Role, UserStore};
use crate::datagen::{Observation, generate_energy_data};
use crate::downloader;
use crate::graph::{self, ChartOptions};
use crate::loader;
use crate::login::{self, Session};
use crate::model::{EnergyModel, ForecastPoint, prepare_data};
use crate::saving;

const DATABASE_DIR: &str = "database";
const DATA_FILE: &str = "database/energy_data.csv";
const MODEL_FILE: &str = "database/energy_model.bin.gz";

/// Shared application state
///
/// The current dataset, trained model and last forecast live in process
/// memory for the session; the credential store and the persisted
/// data/model files back them on disk. Single-operator access, so plain
/// mutexes suffice.
pub struct AppState {
    /// Flat-file credential store
    pub store: UserStore,

    /// Current observation series, if generated, uploaded or loaded
    pub data: Mutex<Option<Vec<Observation>>>,

    /// Trained forecasting model, if any
    pub model: Mutex<Option<EnergyModel>>,

    /// Last generated forecast; recomputed per request
    pub forecast: Mutex<Option<Vec<ForecastPoint>>>,
}

/// The screen currently shown on the user dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DashboardPage {
    Upload,
    Analyze,
    Forecast,
    Results,
}

impl DashboardPage {
    fn parse(s: Option<&str>) -> DashboardPage {
        match s {
            Some("analyze") => DashboardPage::Analyze,
            Some("forecast") => DashboardPage::Forecast,
            Some("results") => DashboardPage::Results,
            _ => DashboardPage::Upload,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            DashboardPage::Upload => "upload",
            DashboardPage::Analyze => "analyze",
            DashboardPage::Forecast => "forecast",
            DashboardPage::Results => "results",
        }
    }
}

/// The screen currently shown on the admin dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminPage {
    Overview,
    Users,
    Data,
    Analytics,
}

impl AdminPage {
    fn parse(s: Option<&str>) -> AdminPage {
        match s {
            Some("users") => AdminPage::Users,
            Some("data") => AdminPage::Data,
            Some("analytics") => AdminPage::Analytics,
            _ => AdminPage::Overview,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            AdminPage::Overview => "overview",
            AdminPage::Users => "users",
            AdminPage::Data => "data",
            AdminPage::Analytics => "analytics",
        }
    }
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<String>,
    error: Option<String>,
    success: Option<String>,
}

#[derive(Deserialize)]
struct GenerateForm {
    periods: usize,
}

#[derive(Deserialize)]
struct ForecastForm {
    days_ahead: usize,
    forecast_type: String,
}

#[derive(Deserialize)]
struct DeleteUserForm {
    username: String,
    role: String,
}

/// Start the dashboard server
///
/// Initializes the credential store (seeding sample accounts on first
/// run), loads any persisted dataset and model, and serves the
/// application on the given address.
pub async fn run(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = UserStore::new(DATABASE_DIR);
    store.init()?;

    // Pick up a previously persisted dataset and model, if present
    let data = if Path::new(DATA_FILE).exists() {
        match saving::read_observations(DATA_FILE) {
            Ok(observations) => {
                log::info!("loaded {} observations from {}", observations.len(), DATA_FILE);
                Some(observations)
            }
            Err(e) => {
                log::warn!("could not load {}: {}", DATA_FILE, e);
                None
            }
        }
    } else {
        None
    };

    let model = if Path::new(MODEL_FILE).exists() {
        match saving::load_model(MODEL_FILE) {
            Ok(model) => {
                log::info!("loaded model from {}", MODEL_FILE);
                Some(model)
            }
            Err(e) => {
                log::warn!("could not load {}: {}", MODEL_FILE, e);
                None
            }
        }
    } else {
        None
    };

    let app_state = Arc::new(AppState {
        store,
        data: Mutex::new(data),
        model: Mutex::new(model),
        forecast: Mutex::new(None),
    });

    // Build router
    let app = Router::new()
        .route("/", get(serve_root))
        .route("/login", get(login::serve_login_page).post(login::handle_login))
        .route("/register", post(login::handle_register))
        .route("/logout", get(login::handle_logout))
        .route("/dashboard", get(user_dashboard))
        .route("/dashboard/generate", post(handle_generate))
        .route("/dashboard/upload", post(handle_upload))
        .route("/dashboard/train", post(handle_train))
        .route("/dashboard/forecast", post(handle_forecast))
        .route("/download/forecast.csv", get(download_forecast))
        .route("/download/combined.csv", get(download_combined))
        .route("/download/summary.csv", get(download_summary))
        .route("/charts/history.png", get(chart_history))
        .route("/charts/monthly.png", get(chart_monthly))
        .route("/charts/distribution.png", get(chart_distribution))
        .route("/charts/overlay.png", get(chart_overlay))
        .route("/admin", get(admin_dashboard))
        .route("/admin/delete", post(handle_admin_delete))
        .route("/admin/generate", post(handle_admin_generate))
        .route("/admin/train", post(handle_admin_train))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(app_state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_root(jar: CookieJar) -> Redirect {
    match login::current_session(&jar) {
        Some(session) if session.role == Role::Admin => Redirect::to("/admin"),
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/login"),
    }
}

// Resolve the request's session, requiring a specific role
fn require_role(jar: &CookieJar, role: Role) -> Result<Session, Response> {
    match login::current_session(jar) {
        Some(session) if session.role == role => Ok(session),
        _ => Err(Redirect::to("/login").into_response()),
    }
}

// Any valid session; chart endpoints are shared by both dashboards
fn require_session(jar: &CookieJar) -> Result<Session, Response> {
    login::current_session(jar).ok_or_else(|| Redirect::to("/login").into_response())
}

fn redirect_msg(base: &str, key: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{}&{}={}", base, key, urlencoding::encode(message)))
}

/// Render the user dashboard
///
/// A single render function: the current screen is selected by the `page`
/// query parameter and the page state is injected into the template as a
/// JSON blob.
async fn user_dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    let session = match require_role(&jar, Role::User) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let page = DashboardPage::parse(query.page.as_deref());

    let data = state.data.lock().unwrap();
    let model = state.model.lock().unwrap();
    let forecast = state.forecast.lock().unwrap();

    let summary = data.as_deref().and_then(analysis::summarize);
    let monthly = data.as_deref().map(analysis::monthly_averages);

    let forecast_json = forecast.as_ref().map(|points| {
        let avg = points.iter().map(|p| p.predicted_kwh).sum::<f64>() / points.len() as f64;
        let peak = points.iter().map(|p| p.predicted_kwh).fold(0.0, f64::max);
        let min = points
            .iter()
            .map(|p| p.predicted_kwh)
            .fold(f64::INFINITY, f64::min);
        serde_json::json!({
            "points": points
                .iter()
                .map(|p| serde_json::json!({
                    "date": p.date.format("%Y-%m-%d").to_string(),
                    "predicted_kwh": p.predicted_kwh,
                }))
                .collect::<Vec<_>>(),
            "count": points.len(),
            "avg": avg,
            "peak": peak,
            "min": min,
            "total": points.iter().map(|p| p.predicted_kwh).sum::<f64>(),
        })
    });

    let payload = serde_json::json!({
        "page": page.as_str(),
        "user": {
            "username": session.username,
            "full_name": session.full_name,
            "email": session.email,
            "role": session.role.as_str(),
        },
        "error": query.error,
        "success": query.success,
        "has_data": data.is_some(),
        "has_model": model.is_some(),
        "summary": summary,
        "monthly": monthly,
        "forecast": forecast_json,
    });

    render_template(include_str!("./static/dashboard.html"), "DASHBOARD_DATA", &payload)
}

/// Render the admin dashboard
async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    let session = match require_role(&jar, Role::Admin) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let page = AdminPage::parse(query.page.as_deref());

    let users = state.store.list(Role::User).unwrap_or_default();
    let admins = state.store.list(Role::Admin).unwrap_or_default();

    let data = state.data.lock().unwrap();
    let model = state.model.lock().unwrap();

    let summary = data.as_deref().and_then(analysis::summarize);

    // Holdout MSE for the analytics screen, when both data and model exist
    let mse = match (data.as_deref(), model.as_ref()) {
        (Some(observations), Some(model)) => prepare_data(observations)
            .ok()
            .and_then(|(x, y)| model.evaluate(&x, &y)),
        _ => None,
    };

    let user_rows = |records: &[crate::auth::UserRecord]| {
        records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "username": r.username,
                    "email": r.email,
                    "full_name": r.full_name,
                    "created_at": r.created_at,
                })
            })
            .collect::<Vec<_>>()
    };

    let payload = serde_json::json!({
        "page": page.as_str(),
        "user": {
            "username": session.username,
            "full_name": session.full_name,
            "email": session.email,
            "role": session.role.as_str(),
        },
        "error": query.error,
        "success": query.success,
        "users": user_rows(&users),
        "admins": user_rows(&admins),
        "user_count": users.len(),
        "admin_count": admins.len(),
        "has_data": data.is_some(),
        "has_model": model.is_some(),
        "summary": summary,
        "mse": mse,
    });

    render_template(include_str!("./static/admin.html"), "ADMIN_DATA", &payload)
}

// Inject the page state into the template as a script constant
fn render_template(template: &str, var: &str, payload: &serde_json::Value) -> Response {
    let json = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    let html = template.replace(
        "</head>",
        &format!("    <script>const {} = {};</script>\n</head>", var, json),
    );
    Html(html).into_response()
}

/// Generate a synthetic dataset and persist it
async fn handle_generate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    axum::Form(form): axum::Form<GenerateForm>,
) -> Response {
    if let Err(redirect) = require_role(&jar, Role::User) {
        return redirect;
    }

    generate_and_store(&state, form.periods, "/dashboard?page=upload")
}

/// Accept an uploaded CSV and keep it in memory for the session
async fn handle_upload(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    if let Err(redirect) = require_role(&jar, Role::User) {
        return redirect;
    }

    let mut content = String::new();
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() == Some("file") {
            content = field.text().await.unwrap_or_default();
        }
    }

    if content.is_empty() {
        return redirect_msg("/dashboard?page=upload", "error", "No file data received")
            .into_response();
    }

    match loader::parse_csv(&content) {
        Ok(observations) => {
            let count = observations.len();
            *state.data.lock().unwrap() = Some(observations);
            *state.forecast.lock().unwrap() = None;
            log::info!("uploaded dataset with {} rows", count);
            redirect_msg("/dashboard?page=upload", "success", "Data uploaded successfully")
                .into_response()
        }
        Err(e) => {
            log::warn!("upload rejected: {}", e);
            redirect_msg("/dashboard?page=upload", "error", &e).into_response()
        }
    }
}

/// Train the forecasting model on the current dataset
async fn handle_train(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_role(&jar, Role::User) {
        return redirect;
    }

    train_current(&state, "/dashboard?page=analyze")
}

/// Produce a forecast from the trained model
async fn handle_forecast(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    axum::Form(form): axum::Form<ForecastForm>,
) -> Response {
    if let Err(redirect) = require_role(&jar, Role::User) {
        return redirect;
    }

    if form.days_ahead == 0 || form.days_ahead > 90 {
        return redirect_msg(
            "/dashboard?page=forecast",
            "error",
            "Forecast horizon must be between 1 and 90 days",
        )
        .into_response();
    }

    // Conservative/optimistic variants scale the standard forecast
    let factor = match form.forecast_type.as_str() {
        "conservative" => 0.9,
        "optimistic" => 1.1,
        _ => 1.0,
    };

    let data = state.data.lock().unwrap();
    let model = state.model.lock().unwrap();

    let Some(observations) = data.as_deref() else {
        return redirect_msg("/dashboard?page=forecast", "error", "No data available").into_response();
    };
    let Some(model) = model.as_ref() else {
        return redirect_msg("/dashboard?page=forecast", "error", "Model not trained yet")
            .into_response();
    };

    match model.predict_future(observations, form.days_ahead) {
        Ok(mut forecast) => {
            for point in &mut forecast {
                point.predicted_kwh *= factor;
            }
            let horizon = forecast.len();
            *state.forecast.lock().unwrap() = Some(forecast);
            log::info!("forecast generated for {} days", horizon);
            redirect_msg("/dashboard?page=results", "success", "Forecast generated")
                .into_response()
        }
        Err(e) => redirect_msg("/dashboard?page=forecast", "error", &e).into_response(),
    }
}

// Shared by the user and admin generate actions
fn generate_and_store(state: &AppState, periods: usize, back: &str) -> Response {
    if !(365..=1825).contains(&periods) {
        return redirect_msg(back, "error", "Number of days must be between 365 and 1825")
            .into_response();
    }

    match generate_energy_data(periods, None) {
        Ok(observations) => {
            if let Err(e) = saving::write_observations(&observations, DATA_FILE) {
                log::warn!("could not persist dataset: {}", e);
                return redirect_msg(back, "error", "Failed to save generated data").into_response();
            }
            *state.data.lock().unwrap() = Some(observations);
            *state.forecast.lock().unwrap() = None;
            log::info!("generated {} days of synthetic data", periods);
            redirect_msg(back, "success", "Data generated successfully").into_response()
        }
        Err(e) => redirect_msg(back, "error", &e).into_response(),
    }
}

// Shared by the user and admin train actions
fn train_current(state: &AppState, back: &str) -> Response {
    let data = state.data.lock().unwrap();

    let Some(observations) = data.as_deref() else {
        return redirect_msg(back, "error", "No data available").into_response();
    };

    let trained = prepare_data(observations).and_then(|(x, y)| EnergyModel::train(&x, &y));

    match trained {
        Ok(model) => {
            if let Err(e) = saving::save_model(&model, MODEL_FILE) {
                log::warn!("could not persist model: {}", e);
                return redirect_msg(back, "error", "Failed to save trained model").into_response();
            }
            *state.model.lock().unwrap() = Some(model);
            log::info!("model trained on {} observations", observations.len());
            redirect_msg(back, "success", "Model trained successfully").into_response()
        }
        Err(e) => {
            log::warn!("training failed: {}", e);
            redirect_msg(back, "error", &e).into_response()
        }
    }
}

// CSV download response with an attachment filename
fn csv_attachment(csv: String, stem: &str) -> Response {
    let filename = format!("{}_{}.csv", stem, Local::now().format("%Y%m%d_%H%M"));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(csv))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn download_forecast(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_role(&jar, Role::User) {
        return redirect;
    }

    let forecast = state.forecast.lock().unwrap();
    match forecast.as_deref() {
        Some(points) => csv_attachment(downloader::forecast_to_csv(points), "energy_forecast"),
        None => (StatusCode::NOT_FOUND, "No forecast available").into_response(),
    }
}

async fn download_combined(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_role(&jar, Role::User) {
        return redirect;
    }

    let data = state.data.lock().unwrap();
    let forecast = state.forecast.lock().unwrap();
    match (data.as_deref(), forecast.as_deref()) {
        (Some(history), Some(points)) => csv_attachment(
            downloader::combined_to_csv(history, points),
            "energy_data_complete",
        ),
        _ => (StatusCode::NOT_FOUND, "No forecast available").into_response(),
    }
}

async fn download_summary(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_role(&jar, Role::User) {
        return redirect;
    }

    let data = state.data.lock().unwrap();
    let forecast = state.forecast.lock().unwrap();
    let summary = data.as_deref().and_then(analysis::summarize);
    match (summary, forecast.as_deref()) {
        (Some(summary), Some(points)) => csv_attachment(
            downloader::summary_to_csv(&summary, points),
            "forecast_summary",
        ),
        _ => (StatusCode::NOT_FOUND, "No forecast available").into_response(),
    }
}

// PNG response or a plain not-found message
fn png_response(result: Result<Vec<u8>, Box<dyn std::error::Error>>) -> Response {
    match result {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/png")
            .body(Body::from(bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    }
}

async fn chart_history(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_session(&jar) {
        return redirect;
    }

    let data = state.data.lock().unwrap();
    let Some(observations) = data.as_deref() else {
        return (StatusCode::NOT_FOUND, "No data available").into_response();
    };

    let options = ChartOptions {
        title: "Historical Energy Consumption".to_string(),
        ..ChartOptions::default()
    };
    png_response(graph::history_chart(observations, &options))
}

async fn chart_monthly(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_session(&jar) {
        return redirect;
    }

    let data = state.data.lock().unwrap();
    let Some(observations) = data.as_deref() else {
        return (StatusCode::NOT_FOUND, "No data available").into_response();
    };

    let monthly = analysis::monthly_averages(observations);
    let options = ChartOptions {
        title: "Monthly Average Consumption".to_string(),
        ..ChartOptions::default()
    };
    png_response(graph::monthly_chart(&monthly, &options))
}

async fn chart_distribution(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_session(&jar) {
        return redirect;
    }

    let data = state.data.lock().unwrap();
    let Some(observations) = data.as_deref() else {
        return (StatusCode::NOT_FOUND, "No data available").into_response();
    };

    let bins = analysis::histogram(observations, 30);
    let options = ChartOptions {
        title: "Consumption Distribution".to_string(),
        x_label: "Consumption (kWh)".to_string(),
        y_label: "Frequency".to_string(),
        ..ChartOptions::default()
    };
    png_response(graph::distribution_chart(&bins, &options))
}

async fn chart_overlay(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_session(&jar) {
        return redirect;
    }

    let data = state.data.lock().unwrap();
    let forecast = state.forecast.lock().unwrap();
    let (Some(observations), Some(points)) = (data.as_deref(), forecast.as_deref()) else {
        return (StatusCode::NOT_FOUND, "No forecast available").into_response();
    };

    let options = ChartOptions {
        title: "Historical Data and Forecast".to_string(),
        ..ChartOptions::default()
    };
    png_response(graph::overlay_chart(observations, points, &options))
}

/// Delete a user from one of the role collections
///
/// The logged-in admin cannot delete their own account.
async fn handle_admin_delete(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    axum::Form(form): axum::Form<DeleteUserForm>,
) -> Response {
    let session = match require_role(&jar, Role::Admin) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let Some(role) = Role::parse(&form.role) else {
        return redirect_msg("/admin?page=users", "error", "Unknown role").into_response();
    };

    if role == Role::Admin && form.username == session.username {
        return redirect_msg("/admin?page=users", "error", "Cannot delete your own account")
            .into_response();
    }

    match state.store.delete(&form.username, role) {
        Ok(()) => {
            log::info!("deleted {} ({})", form.username, role.as_str());
            redirect_msg("/admin?page=users", "success", "User deleted successfully")
                .into_response()
        }
        Err(e) => redirect_msg("/admin?page=users", "error", &e).into_response(),
    }
}

/// Regenerate the system dataset from the admin panel
async fn handle_admin_generate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    axum::Form(form): axum::Form<GenerateForm>,
) -> Response {
    if let Err(redirect) = require_role(&jar, Role::Admin) {
        return redirect;
    }

    generate_and_store(&state, form.periods, "/admin?page=data")
}

/// Retrain the system model from the admin panel
async fn handle_admin_train(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_role(&jar, Role::Admin) {
        return redirect;
    }

    train_current(&state, "/admin?page=data")
}
