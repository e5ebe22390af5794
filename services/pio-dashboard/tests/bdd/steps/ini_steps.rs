//! BDD step definitions for config.ini parsing

use cucumber::{given, then, when};

use pio_dashboard::ini::parse_ini_string;

use crate::world::DashboardWorld;

/// Feature files write line breaks as `\n`
fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
}

#[given(expr = "the config text {string}")]
fn config_text(world: &mut DashboardWorld, text: String) {
    world.ini_text = unescape(&text);
}

#[when("the config text is parsed")]
fn parse_config(world: &mut DashboardWorld) {
    world.ini = Some(parse_ini_string(&world.ini_text));
}

fn parsed(world: &DashboardWorld) -> &pio_dashboard::ini::IniDocument {
    world.ini.as_ref().expect("config not parsed")
}

#[then(expr = "section {string} has {string} set to {string}")]
fn section_has(world: &mut DashboardWorld, section: String, key: String, value: String) {
    assert_eq!(parsed(world).get(&section, &key), Some(value.as_str()));
}

#[then(expr = "section {string} has no key {string}")]
fn section_lacks(world: &mut DashboardWorld, section: String, key: String) {
    assert_eq!(parsed(world).get(&section, &key), None);
}

#[then(expr = "the top level has {string} set to {string}")]
fn top_level_has(world: &mut DashboardWorld, key: String, value: String) {
    assert_eq!(parsed(world).top_level(&key), Some(value.as_str()));
}

#[then(expr = "the top level has no key {string}")]
fn top_level_lacks(world: &mut DashboardWorld, key: String) {
    assert_eq!(parsed(world).top_level(&key), None);
}

#[then("the parsed config is empty")]
fn config_empty(world: &mut DashboardWorld) {
    assert!(parsed(world).is_empty());
}

#[when("the dashboard serves the parsed config")]
async fn serve_config(world: &mut DashboardWorld) {
    world.backend.on_get("/api/configs/config.ini", 200, &world.ini_text);
    let doc = world
        .client()
        .get_config()
        .await
        .expect("config should load");
    world.ini = Some(doc);
}
