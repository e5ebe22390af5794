//! Dashboard web server
//!
//! Each request mounts the page it renders, drives it through its load and
//! action handlers, renders it, and drops it. Only the log level preference
//! and open editor sessions outlive a request.

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::api::BackendClient;
use crate::models::LogLevel;
use crate::pages::calibration::{CalibrationPage, CalibrationView};
use crate::pages::editor::ProfileEditor;
use crate::pages::logs::{LogsPage, RecordLogDialog, UnitSelection};
use crate::pages::{describe, Notice};
use crate::scope::PageScope;
use crate::sessions::{new_sessions_handle, SessionsHandle};
use crate::settings::SettingsHandle;
use crate::task::PollConfig;
use crate::views;
use crate::{Config, DashboardError};

/// Session key used for a profile that has not been saved yet
pub const NEW_PROFILE: &str = "new";

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub client: BackendClient,
    pub settings: SettingsHandle,
    pub editors: SessionsHandle,
    pub poll: PollConfig,
    pub page_size: usize,
    pub shutdown: CancellationToken,
}

impl DashboardState {
    pub fn new(
        client: BackendClient,
        settings: SettingsHandle,
        config: &Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            settings,
            editors: new_sessions_handle(config.dashboard.max_editor_sessions),
            poll: PollConfig::for_requests(&config.task_polling),
            page_size: config.logs.page_size,
            shutdown,
        }
    }

    fn scope(&self) -> PageScope {
        PageScope::child_of(&self.shutdown)
    }
}

/// Build the dashboard axum router
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/config", get(config_handler))
        .route("/experiments/{experiment}/logs", get(logs_handler))
        .route("/experiments/{experiment}/logs/{unit}", get(unit_logs_handler))
        .route("/experiments/{experiment}/logs/unit", post(select_unit_handler))
        .route("/experiments/{experiment}/logs/level", post(select_level_handler))
        .route("/experiments/{experiment}/logs/record", post(record_log_handler))
        .route(
            "/calibrations/{unit}/{device}/{name}",
            get(calibration_handler),
        )
        .route(
            "/calibrations/{unit}/{device}/{name}/active",
            post(activate_calibration_handler),
        )
        .route("/profiles", get(profiles_handler))
        .route("/profiles/{filename}", get(profile_handler))
        .route("/profiles/{filename}/preview", post(preview_handler))
        .route("/profiles/{filename}/save", post(save_profile_handler))
        .with_state(state)
}

fn error_page(status: StatusCode, title: &str, err: &DashboardError) -> Response {
    let body = format!(
        "<h1>{}</h1>{}",
        html_escape::encode_text(title),
        views::notices(&[Notice::Error(describe(err))])
    );
    (status, Html(views::layout(title, &body))).into_response()
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn config_handler(State(state): State<DashboardState>) -> Response {
    match state.client.get_config().await {
        Ok(doc) => Json(doc).into_response(),
        Err(e) => {
            tracing::warn!("Fetching config.ini failed: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default)]
    page: usize,
}

async fn render_logs(
    state: &DashboardState,
    experiment: String,
    unit: Option<&str>,
    page: usize,
    dialog: Option<RecordLogDialog>,
) -> Response {
    let mut logs = {
        let settings = state.settings.read().await;
        LogsPage::mount(experiment, unit, &settings, state.page_size, state.scope())
    };
    if let Some(dialog) = dialog {
        logs.record_log(&state.client, &dialog).await;
    }
    logs.set_page(page);
    logs.load(&state.client).await;
    Html(views::logs_page(&logs)).into_response()
}

async fn logs_handler(
    State(state): State<DashboardState>,
    Path(experiment): Path<String>,
    Query(params): Query<PageParams>,
) -> Response {
    render_logs(&state, experiment, None, params.page, None).await
}

async fn unit_logs_handler(
    State(state): State<DashboardState>,
    Path((experiment, unit)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> Response {
    render_logs(&state, experiment, Some(&unit), params.page, None).await
}

#[derive(Debug, Deserialize)]
struct UnitForm {
    unit: String,
}

async fn select_unit_handler(
    Path(experiment): Path<String>,
    Form(form): Form<UnitForm>,
) -> Redirect {
    let selection = UnitSelection::from_route(Some(&form.unit));
    Redirect::to(&selection.route(&experiment))
}

#[derive(Debug, Deserialize)]
struct LevelForm {
    level: String,
    #[serde(default)]
    unit: Option<String>,
}

async fn select_level_handler(
    State(state): State<DashboardState>,
    Path(experiment): Path<String>,
    Form(form): Form<LevelForm>,
) -> Response {
    let level: LogLevel = match form.level.parse() {
        Ok(level) => level,
        Err(e) => return error_page(StatusCode::BAD_REQUEST, "Invalid log level", &e),
    };

    let mut settings = state.settings.write().await;
    let mut page = LogsPage::mount(
        experiment.as_str(),
        form.unit.as_deref(),
        &settings,
        state.page_size,
        state.scope(),
    );
    if let Err(e) = page.select_level(level, &mut settings).await {
        tracing::warn!("Persisting log level failed: {}", e);
        return error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not save log level",
            &e,
        );
    }
    tracing::debug!("Log level set to {}", level);
    Redirect::to(&page.selection().route(&experiment)).into_response()
}

#[derive(Debug, Deserialize)]
struct RecordForm {
    unit: String,
    message: String,
    level: String,
}

async fn record_log_handler(
    State(state): State<DashboardState>,
    Path(experiment): Path<String>,
    Form(form): Form<RecordForm>,
) -> Response {
    let level: LogLevel = match form.level.parse() {
        Ok(level) => level,
        Err(e) => return error_page(StatusCode::BAD_REQUEST, "Invalid log level", &e),
    };
    let selection = UnitSelection::from_route(Some(&form.unit));
    let dialog = RecordLogDialog {
        unit: selection.clone(),
        message: form.message,
        level,
    };
    render_logs(&state, experiment, selection.unit(), 0, Some(dialog)).await
}

fn calibration_response(page: &CalibrationPage) -> Response {
    let status = match page.view() {
        CalibrationView::Loading => StatusCode::ACCEPTED,
        CalibrationView::NotFound => StatusCode::NOT_FOUND,
        CalibrationView::Failed(_) => StatusCode::BAD_GATEWAY,
        CalibrationView::Loaded(_) => StatusCode::OK,
    };
    (status, Html(views::calibration_page(page))).into_response()
}

async fn calibration_handler(
    State(state): State<DashboardState>,
    Path((unit, device, name)): Path<(String, String, String)>,
) -> Response {
    let mut page = CalibrationPage::mount(unit, device, name, state.poll, state.scope());
    page.load(&state.client).await;
    calibration_response(&page)
}

async fn activate_calibration_handler(
    State(state): State<DashboardState>,
    Path((unit, device, name)): Path<(String, String, String)>,
) -> Response {
    let mut page = CalibrationPage::mount(unit, device, name, state.poll, state.scope());
    page.load(&state.client).await;
    page.activate(&state.client).await;
    calibration_response(&page)
}

async fn profiles_handler(State(state): State<DashboardState>) -> Response {
    let scope = state.scope();
    match scope.run(state.client.list_profiles()).await {
        Ok(profiles) => Html(views::profile_list(&profiles, &[])).into_response(),
        Err(e) => {
            tracing::warn!("Listing profiles failed: {}", e);
            let notice = Notice::Warning(format!("Profiles are unavailable: {}", describe(&e)));
            Html(views::profile_list(&[], &[notice])).into_response()
        }
    }
}

async fn profile_handler(
    State(state): State<DashboardState>,
    Path(filename): Path<String>,
) -> Response {
    let editor = if filename == NEW_PROFILE {
        ProfileEditor::new_profile()
    } else {
        match ProfileEditor::load(&state.client, &state.scope(), &filename).await {
            Ok(editor) => editor,
            Err(e @ DashboardError::NotFound(_)) => {
                return error_page(StatusCode::NOT_FOUND, "Profile not found", &e)
            }
            Err(e) => {
                tracing::warn!("Loading profile '{}' failed: {}", filename, e);
                return error_page(StatusCode::BAD_GATEWAY, "Could not load profile", &e);
            }
        }
    };

    let html = views::editor_page(&editor, &[]);
    state.editors.write().await.insert(filename, editor);
    Html(html).into_response()
}

fn fresh_editor(filename: &str) -> ProfileEditor {
    if filename == NEW_PROFILE {
        ProfileEditor::new_profile()
    } else {
        ProfileEditor::new(filename, "")
    }
}

async fn preview_handler(
    State(state): State<DashboardState>,
    Path(filename): Path<String>,
    source: String,
) -> Response {
    let mut editors = state.editors.write().await;
    let Some(editor) = editors.get_mut(&filename) else {
        tracing::debug!("Preview for unknown editor session '{}'", filename);
        let notice = Notice::Error(format!(
            "No open editor for {}. Reopen the profile to continue.",
            filename
        ));
        return (StatusCode::NOT_FOUND, Html(views::notices(&[notice]))).into_response();
    };
    editor.edit(source);
    Html(views::preview(editor.preview())).into_response()
}

#[derive(Debug, Deserialize)]
struct SaveForm {
    filename: String,
    source: String,
}

async fn save_profile_handler(
    State(state): State<DashboardState>,
    Path(session): Path<String>,
    Form(form): Form<SaveForm>,
) -> Response {
    let existing = state.editors.write().await.remove(&session);
    let mut editor = existing.unwrap_or_else(|| fresh_editor(&session));
    if editor.source() != form.source {
        editor.edit(form.source);
    }
    editor.set_filename(form.filename);

    let status = match editor.save(&state.client, &state.scope()).await {
        Ok(()) => StatusCode::OK,
        Err(DashboardError::Validation(_)) => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::BAD_GATEWAY,
    };

    let html = views::editor_page(&editor, &[]);
    let key = if editor.filename().trim().is_empty() {
        session
    } else {
        editor.filename().to_string()
    };
    state.editors.write().await.insert(key, editor);
    (status, Html(html)).into_response()
}
