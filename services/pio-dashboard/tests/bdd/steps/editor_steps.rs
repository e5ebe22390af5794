//! BDD step definitions for the experiment profile editor

use cucumber::{given, then, when};

use pio_dashboard::pages::editor::{EditorState, ProfileEditor};
use pio_dashboard::scope::PageScope;
use pio_dashboard::template::convert_template_guard;
use pio_dashboard::DashboardError;

use crate::world::DashboardWorld;

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn editor(world: &mut DashboardWorld) -> &mut ProfileEditor {
    world.editor.as_mut().expect("editor not open")
}

#[given(expr = "an editor open on {string} with source {string}")]
fn editor_with_source(world: &mut DashboardWorld, filename: String, source: String) {
    world.editor = Some(ProfileEditor::new(filename, unescape(&source)));
}

#[given("an editor for a new profile")]
fn new_profile_editor(world: &mut DashboardWorld) {
    world.editor = Some(ProfileEditor::new_profile());
}

#[given(expr = "the backend rejects saves with {string}")]
fn backend_rejects_saves(world: &mut DashboardWorld, message: String) {
    let body = serde_json::json!({ "error": message }).to_string();
    world.backend.on_write(400, &body);
}

#[when(expr = "the user types {string}")]
fn user_types(world: &mut DashboardWorld, source: String) {
    editor(world).edit(unescape(&source));
}

#[when(expr = "the user sets the filename to {string}")]
fn user_sets_filename(world: &mut DashboardWorld, filename: String) {
    editor(world).set_filename(filename);
}

#[when("the user saves the profile")]
async fn user_saves(world: &mut DashboardWorld) {
    let client = world.client();
    let scope = PageScope::new();
    let result = editor(world).save(&client, &scope).await;
    world.save_result = Some(result);
}

#[then(expr = "the preview shows the profile name {string}")]
fn preview_shows_name(world: &mut DashboardWorld, name: String) {
    let preview = editor(world).preview().expect("no preview");
    assert_eq!(preview.name.as_deref(), Some(name.as_str()));
}

#[then("the editor reports a parse error")]
fn editor_parse_error(world: &mut DashboardWorld) {
    assert!(editor(world).parse_error().is_some());
}

#[then("the editor reports no parse error")]
fn editor_no_parse_error(world: &mut DashboardWorld) {
    assert!(editor(world).parse_error().is_none());
}

#[then(expr = "the first common action has option {string} set to {string}")]
fn first_action_option(world: &mut DashboardWorld, key: String, value: String) {
    let preview = editor(world).preview().expect("no preview");
    let action = &preview.common_jobs[0].actions[0];
    assert!(action.options.contains(&(key, value)));
}

#[then(expr = "the save is rejected with {string}")]
fn save_rejected(world: &mut DashboardWorld, message: String) {
    match world.save_result.as_ref().expect("no save attempted") {
        Err(DashboardError::Validation(m)) => assert_eq!(m, &message),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(editor(world).validation_error(), Some(message.as_str()));
}

#[then("no request reaches the backend")]
fn no_request(world: &mut DashboardWorld) {
    assert!(world.backend.requests().is_empty());
}

#[then(expr = "the profile is saved as {string}")]
fn profile_saved(world: &mut DashboardWorld, filename: String) {
    assert!(matches!(world.save_result, Some(Ok(()))));
    let editor = editor(world);
    assert_eq!(editor.state(), &EditorState::Saved);
    assert_eq!(editor.filename(), filename);
    assert_eq!(editor.confirmation(), Some(format!("Saved {}", filename)));
}

#[then(expr = "the editor shows the save error {string}")]
fn save_error_shown(world: &mut DashboardWorld, message: String) {
    assert_eq!(editor(world).state(), &EditorState::SaveError(message));
}

#[then(expr = "guarding {string} quotes the placeholder")]
fn guarding_quotes(_world: &mut DashboardWorld, source: String) {
    let guarded = convert_template_guard(&source);
    assert!(guarded.contains("\"{{"), "{} was not quoted: {}", source, guarded);
}

#[then(expr = "guarding {string} leaves it untouched")]
fn guarding_untouched(_world: &mut DashboardWorld, source: String) {
    assert_eq!(convert_template_guard(&source), source);
}
