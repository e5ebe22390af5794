//! BDD test world for pio-dashboard

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cucumber::World;
use pio_dashboard::api::BackendClient;
use pio_dashboard::ini::IniDocument;
use pio_dashboard::io::{HttpClient, HttpResponse};
use pio_dashboard::pages::calibration::CalibrationPage;
use pio_dashboard::pages::editor::ProfileEditor;
use pio_dashboard::pages::logs::LogsPage;
use tempfile::TempDir;

/// Backend double answering from canned responses keyed by URL fragment
#[derive(Debug, Default)]
pub struct FakeBackend {
    gets: Mutex<Vec<(String, HttpResponse)>>,
    writes: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl FakeBackend {
    /// Answer GETs whose URL contains `fragment`
    pub fn on_get(&self, fragment: &str, status: u16, body: &str) {
        self.gets.lock().unwrap().push((
            fragment.to_string(),
            HttpResponse {
                status,
                body: body.to_string(),
            },
        ));
    }

    /// Answer every POST and PATCH
    pub fn on_write(&self, status: u16, body: &str) {
        *self.writes.lock().unwrap() = Some(HttpResponse {
            status,
            body: body.to_string(),
        });
    }

    /// Requests seen so far, as "METHOD url"
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn write(&self, method: &str, url: &str) -> HttpResponse {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {}", method, url));
        self.writes.lock().unwrap().clone().unwrap_or(HttpResponse {
            status: 200,
            body: "{}".to_string(),
        })
    }
}

#[async_trait]
impl HttpClient for FakeBackend {
    async fn get(&self, url: &str) -> pio_dashboard::Result<HttpResponse> {
        self.requests.lock().unwrap().push(format!("GET {}", url));
        let gets = self.gets.lock().unwrap();
        Ok(gets
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or(HttpResponse {
                status: 404,
                body: r#"{"error": "not found"}"#.to_string(),
            }))
    }

    async fn post_json(
        &self,
        url: &str,
        _body: &serde_json::Value,
    ) -> pio_dashboard::Result<HttpResponse> {
        Ok(self.write("POST", url))
    }

    async fn patch_json(
        &self,
        url: &str,
        _body: &serde_json::Value,
    ) -> pio_dashboard::Result<HttpResponse> {
        Ok(self.write("PATCH", url))
    }
}

#[derive(Debug, Default, World)]
pub struct DashboardWorld {
    pub backend: Arc<FakeBackend>,

    // Config parsing
    pub ini_text: String,
    pub ini: Option<IniDocument>,

    // Profile editor
    pub editor: Option<ProfileEditor>,
    pub save_result: Option<pio_dashboard::Result<()>>,

    // Logs page
    pub settings_dir: Option<TempDir>,
    pub logs_page: Option<LogsPage>,

    // Calibration page
    pub calibration_page: Option<CalibrationPage>,
    pub rendered: Option<String>,
}

impl DashboardWorld {
    pub fn client(&self) -> BackendClient {
        BackendClient::new("http://leader", Arc::clone(&self.backend) as Arc<dyn HttpClient>)
    }
}
