//! Typed client for the REST backend
//!
//! One method per endpoint. Read methods deserialize the JSON body; write
//! methods turn non-2xx responses into [`DashboardError::Status`] carrying the
//! backend's error message.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::ini::{parse_ini_string, IniDocument};
use crate::io::{HttpClient, HttpResponse};
use crate::models::{
    JobRequest, LogEntry, LogLevel, NewLogEntry, ProfileSummary, RelabelMap, TaskHandle,
    TaskResult, WorkerAssignment,
};
use crate::DashboardError;

/// Parameters for one page of the log table
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub experiment: String,
    pub unit: Option<String>,
    pub min_level: LogLevel,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "msg", alias = "message")]
    error: String,
}

/// Extract a human-readable message from an error response body
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "no details provided".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn ensure_success(response: HttpResponse, what: &str) -> crate::Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let message = error_message(&response.body);
    tracing::warn!("{} failed with status {}: {}", what, response.status, message);
    if response.status == 404 {
        return Err(DashboardError::NotFound(format!("{}: {}", what, message)));
    }
    Err(DashboardError::Status {
        status: response.status,
        message,
    })
}

/// Client for the dashboard's backend service
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Created BackendClient for {}", base_url);
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> crate::Result<T> {
        let response = self.http.get(&self.url(path)).await?;
        let response = ensure_success(response, what)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// GET /api/configs/config.ini, parsed
    pub async fn get_config(&self) -> crate::Result<IniDocument> {
        let response = self.http.get(&self.url("/api/configs/config.ini")).await?;
        let response = ensure_success(response, "Fetching config.ini")?;
        Ok(parse_ini_string(&response.body))
    }

    pub async fn get_relabel_map(&self, experiment: &str) -> crate::Result<RelabelMap> {
        let path = format!("/api/experiments/{}/unit_labels", segment(experiment));
        self.get_json(&path, "Fetching unit labels").await
    }

    /// Distinct units ever assigned to `experiment`, in first-seen order
    pub async fn get_assigned_units(&self, experiment: &str) -> crate::Result<Vec<String>> {
        let path = format!(
            "/api/experiments/{}/historical_worker_assignments",
            segment(experiment)
        );
        let assignments: Vec<WorkerAssignment> =
            self.get_json(&path, "Fetching worker assignments").await?;

        let mut units: Vec<String> = Vec::new();
        for assignment in assignments {
            if !units.contains(&assignment.pioreactor_unit) {
                units.push(assignment.pioreactor_unit);
            }
        }
        Ok(units)
    }

    pub async fn get_logs(&self, query: &LogQuery) -> crate::Result<Vec<LogEntry>> {
        let base = match &query.unit {
            Some(unit) => format!(
                "/api/workers/{}/experiments/{}/logs",
                segment(unit),
                segment(&query.experiment)
            ),
            None => format!("/api/experiments/{}/logs", segment(&query.experiment)),
        };
        let path = format!(
            "{}?min_level={}&skip={}&limit={}",
            base, query.min_level, query.skip, query.limit
        );
        self.get_json(&path, "Fetching logs").await
    }

    pub async fn record_log(
        &self,
        unit: &str,
        experiment: &str,
        entry: &NewLogEntry,
    ) -> crate::Result<()> {
        let url = self.url(&format!(
            "/api/workers/{}/experiments/{}/logs",
            segment(unit),
            segment(experiment)
        ));
        let body = serde_json::to_value(entry)?;
        let response = self.http.post_json(&url, &body).await?;
        ensure_success(response, "Recording log entry")?;
        Ok(())
    }

    /// PATCH a job run. The raw response is returned; callers parse it.
    pub async fn run_job(
        &self,
        unit: &str,
        job: &str,
        request: &JobRequest,
    ) -> crate::Result<HttpResponse> {
        let url = self.url(&format!(
            "/api/workers/{}/jobs/{}/run",
            segment(unit),
            segment(job)
        ));
        let body = serde_json::to_value(request)?;
        tracing::info!("Running job '{}' on '{}'", job, unit);
        self.http.patch_json(&url, &body).await
    }

    /// Start fetching a calibration. The backend answers with a task handle.
    pub async fn get_calibration_task(
        &self,
        unit: &str,
        device: &str,
        name: &str,
    ) -> crate::Result<TaskHandle> {
        let path = format!(
            "/api/workers/{}/calibrations/{}/{}",
            segment(unit),
            segment(device),
            segment(name)
        );
        self.get_json(&path, "Requesting calibration").await
    }

    pub async fn get_task_result(&self, handle: &TaskHandle) -> crate::Result<TaskResult> {
        self.get_json(&handle.result_url_path, "Fetching task result")
            .await
    }

    pub async fn set_active_calibration(
        &self,
        unit: &str,
        device: &str,
        name: &str,
    ) -> crate::Result<()> {
        let url = self.url(&format!(
            "/api/workers/{}/calibrations/{}/{}/active",
            segment(unit),
            segment(device),
            segment(name)
        ));
        let response = self.http.patch_json(&url, &serde_json::json!({})).await?;
        ensure_success(response, "Activating calibration")?;
        tracing::info!("Calibration '{}' for {} on {} set active", name, device, unit);
        Ok(())
    }

    pub async fn list_profiles(&self) -> crate::Result<Vec<ProfileSummary>> {
        self.get_json("/api/contrib/experiment_profiles", "Listing profiles")
            .await
    }

    /// Raw YAML text of one profile
    pub async fn get_profile(&self, filename: &str) -> crate::Result<String> {
        let url = self.url(&format!(
            "/api/contrib/experiment_profiles/{}",
            segment(filename)
        ));
        let response = self.http.get(&url).await?;
        let response = ensure_success(response, "Fetching profile")?;
        Ok(response.body)
    }

    pub async fn save_profile(&self, filename: &str, body: &str) -> crate::Result<()> {
        let url = self.url("/api/contrib/experiment_profiles");
        let payload = serde_json::json!({ "filename": filename, "body": body });
        let response = self.http.patch_json(&url, &payload).await?;
        ensure_success(response, "Saving profile")?;
        tracing::info!("Saved experiment profile '{}'", filename);
        Ok(())
    }
}
