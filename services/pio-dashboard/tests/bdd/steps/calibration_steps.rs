//! BDD step definitions for the calibration page

use std::time::Duration;

use cucumber::{given, then, when};

use pio_dashboard::pages::calibration::{CalibrationPage, CalibrationView};
use pio_dashboard::pages::Notice;
use pio_dashboard::scope::PageScope;
use pio_dashboard::task::PollConfig;
use pio_dashboard::views;

use crate::world::DashboardWorld;

fn page(world: &mut DashboardWorld) -> &mut CalibrationPage {
    world
        .calibration_page
        .as_mut()
        .expect("calibration page not mounted")
}

fn queue_task(world: &DashboardWorld, result: serde_json::Value) {
    world.backend.on_get(
        "/task_results/",
        200,
        &serde_json::json!({ "status": "complete", "result": result }).to_string(),
    );
    world.backend.on_get(
        "/calibrations/",
        200,
        r#"{"task_id": "t1", "result_url_path": "/unit_api/task_results/t1"}"#,
    );
}

#[given(expr = "unit {string} has no calibration named {string}")]
fn no_calibration(world: &mut DashboardWorld, unit: String, _name: String) {
    queue_task(world, serde_json::json!({ unit: null }));
}

#[given(expr = "unit {string} has an inactive calibration named {string}")]
fn inactive_calibration(world: &mut DashboardWorld, unit: String, name: String) {
    queue_task(
        world,
        serde_json::json!({ unit: {
            "calibration_name": name,
            "curve_type": "poly",
            "curve_data_": [1.5, 0.1],
            "recorded_data": {"x": [0.0, 1.0], "y": [0.1, 1.6]},
            "is_active": false
        }}),
    );
}

#[given(expr = "unit {string} has an active calibration named {string}")]
fn active_calibration(world: &mut DashboardWorld, unit: String, name: String) {
    queue_task(
        world,
        serde_json::json!({ unit: { "calibration_name": name, "is_active": true } }),
    );
}

#[given(expr = "the backend rejects activation with {string}")]
fn activation_rejected(world: &mut DashboardWorld, message: String) {
    let body = serde_json::json!({ "error": message }).to_string();
    world.backend.on_write(500, &body);
}

#[when(expr = "the calibration page for {string} {string} {string} loads")]
async fn calibration_page_loads(
    world: &mut DashboardWorld,
    unit: String,
    device: String,
    name: String,
) {
    let poll = PollConfig {
        interval: Duration::from_millis(1),
        max_attempts: 5,
    };
    let mut page = CalibrationPage::mount(unit, device, name, poll, PageScope::new());
    page.load(&world.client()).await;
    world.rendered = Some(views::calibration_page(&page));
    world.calibration_page = Some(page);
}

#[when("the user sets the calibration active")]
async fn set_active(world: &mut DashboardWorld) {
    let client = world.client();
    page(world).activate(&client).await;
    let rendered = views::calibration_page(page(world));
    world.rendered = Some(rendered);
}

#[then("the page reports the calibration was not found")]
fn not_found(world: &mut DashboardWorld) {
    assert_eq!(page(world).view(), &CalibrationView::NotFound);
    let html = world.rendered.as_ref().expect("not rendered");
    assert!(html.contains("not-found"));
}

#[then("the set active button is enabled")]
fn button_enabled(world: &mut DashboardWorld) {
    assert!(page(world).can_activate());
    let html = world.rendered.as_ref().expect("not rendered");
    assert!(html.contains(r#"id="set-active">"#));
}

#[then("the set active button is disabled")]
fn button_disabled(world: &mut DashboardWorld) {
    assert!(!page(world).can_activate());
    let html = world.rendered.as_ref().expect("not rendered");
    assert!(html.contains(r#"id="set-active" disabled>"#));
}

#[then("the calibration is active")]
fn calibration_active(world: &mut DashboardWorld) {
    let calibration = page(world).calibration().expect("no calibration");
    assert!(calibration.is_active);
}

#[then("the calibration is not active")]
fn calibration_inactive(world: &mut DashboardWorld) {
    let calibration = page(world).calibration().expect("no calibration");
    assert!(!calibration.is_active);
}

#[then(expr = "the calibration page shows the error {string}")]
fn calibration_error(world: &mut DashboardWorld, message: String) {
    assert!(page(world).notices().contains(&Notice::Error(message)));
}

#[then("the chart shows the recorded points")]
fn chart_points(world: &mut DashboardWorld) {
    let html = world.rendered.as_ref().expect("not rendered");
    assert_eq!(html.matches("<circle").count(), 2);
    assert!(html.contains("<polyline"));
}
