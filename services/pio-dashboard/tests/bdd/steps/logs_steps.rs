//! BDD step definitions for the logs page

use std::path::PathBuf;

use cucumber::{given, then, when};

use pio_dashboard::models::LogLevel;
use pio_dashboard::pages::logs::{LogsPage, RecordLogDialog, UnitSelection};
use pio_dashboard::pages::Notice;
use pio_dashboard::scope::PageScope;
use pio_dashboard::settings::SettingsStore;

use crate::world::DashboardWorld;

const PAGE_SIZE: usize = 50;

fn settings_path(world: &DashboardWorld) -> PathBuf {
    world
        .settings_dir
        .as_ref()
        .expect("settings dir not set")
        .path()
        .join("settings.json")
}

fn page(world: &mut DashboardWorld) -> &mut LogsPage {
    world.logs_page.as_mut().expect("logs page not mounted")
}

fn mount(world: &mut DashboardWorld, experiment: &str, unit: Option<&str>) {
    let settings = SettingsStore::open(&settings_path(world));
    world.logs_page = Some(LogsPage::mount(
        experiment,
        unit,
        &settings,
        PAGE_SIZE,
        PageScope::new(),
    ));
}

#[given("a fresh settings file")]
fn fresh_settings(world: &mut DashboardWorld) {
    world.settings_dir = Some(tempfile::tempdir().expect("tempdir"));
}

#[given(expr = "the backend has log entries at levels {string} for {string}")]
fn backend_has_logs(world: &mut DashboardWorld, levels: String, experiment: String) {
    let entries: Vec<serde_json::Value> = levels
        .split(',')
        .map(|level| {
            serde_json::json!({
                "pioreactor_unit": "pio01",
                "experiment": experiment,
                "level": level.trim(),
                "message": format!("{} entry", level.trim()),
                "timestamp": "2024-05-01T12:00:00Z"
            })
        })
        .collect();
    world.backend.on_get(
        "/logs?",
        200,
        &serde_json::Value::Array(entries).to_string(),
    );
    world.backend.on_get("/unit_labels", 200, r#"{"pio01": "Alpha"}"#);
    world.backend.on_get(
        "/historical_worker_assignments",
        200,
        r#"[{"pioreactor_unit": "pio01"}]"#,
    );
}

#[given(expr = "the backend rejects writes with {string}")]
fn backend_rejects_writes(world: &mut DashboardWorld, message: String) {
    let body = serde_json::json!({ "error": message }).to_string();
    world.backend.on_write(500, &body);
}

#[given(expr = "the logs page for {string} is open")]
fn open_logs_page(world: &mut DashboardWorld, experiment: String) {
    mount(world, &experiment, None);
}

#[when(expr = "the logs page for {string} is reloaded")]
fn reload_logs_page(world: &mut DashboardWorld, experiment: String) {
    mount(world, &experiment, None);
}

#[when(expr = "the logs page for {string} loads")]
async fn logs_page_loads(world: &mut DashboardWorld, experiment: String) {
    mount(world, &experiment, None);
    let client = world.client();
    page(world).load(&client).await;
}

#[when(expr = "the user selects level {string}")]
async fn select_level(world: &mut DashboardWorld, level: String) {
    let level: LogLevel = level.parse().expect("valid level");
    let mut settings = SettingsStore::open(&settings_path(world));
    page(world)
        .select_level(level, &mut settings)
        .await
        .expect("level persisted");
}

#[when(expr = "the user records {string} at level {string} for all units")]
async fn record_for_all(world: &mut DashboardWorld, message: String, level: String) {
    let dialog = RecordLogDialog {
        unit: UnitSelection::Broadcast,
        message,
        level: level.parse().expect("valid level"),
    };
    let client = world.client();
    page(world).record_log(&client, &dialog).await;
}

#[then(expr = "the selected level is {string}")]
fn selected_level(world: &mut DashboardWorld, level: String) {
    assert_eq!(page(world).level().as_str(), level);
}

#[then(expr = "the visible levels are {string}")]
fn visible_levels(world: &mut DashboardWorld, levels: String) {
    let shown: Vec<String> = page(world)
        .visible_entries()
        .map(|e| e.level.clone())
        .collect();
    let expected: Vec<String> = levels
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    assert_eq!(shown, expected);
}

#[then(expr = "unit {string} is shown as {string}")]
fn unit_label(world: &mut DashboardWorld, unit: String, shown: String) {
    assert_eq!(page(world).labels().display(&unit), shown);
}

#[then(expr = "choosing all units navigates to {string}")]
fn choose_all_units(world: &mut DashboardWorld, route: String) {
    assert_eq!(page(world).select_unit(&UnitSelection::Broadcast), route);
}

#[then(expr = "choosing unit {string} navigates to {string}")]
fn choose_unit(world: &mut DashboardWorld, unit: String, route: String) {
    assert_eq!(page(world).select_unit(&UnitSelection::Unit(unit)), route);
}

#[then(expr = "the page shows the error {string}")]
fn page_shows_error(world: &mut DashboardWorld, message: String) {
    assert!(page(world).notices().contains(&Notice::Error(message)));
}

#[then(expr = "the page shows {int} warnings")]
fn page_shows_warnings(world: &mut DashboardWorld, count: usize) {
    let warnings = page(world)
        .notices()
        .iter()
        .filter(|n| matches!(n, Notice::Warning(_)))
        .count();
    assert_eq!(warnings, count);
}

#[then(expr = "the backend received {string}")]
fn backend_received(world: &mut DashboardWorld, request: String) {
    assert!(
        world.backend.requests().contains(&request),
        "requests were {:?}",
        world.backend.requests()
    );
}
