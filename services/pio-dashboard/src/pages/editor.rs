//! Experiment profile editor
//!
//! Every edit re-parses the source. A document that fails to parse leaves
//! the previous preview in place, so the pane never blanks while the user is
//! halfway through typing something.

use crate::api::BackendClient;
use crate::pages::describe;
use crate::profile::ProfilePreview;
use crate::scope::PageScope;
use crate::template::convert_template_guard;
use crate::DashboardError;

/// Starting point for a profile created from scratch
pub const NEW_PROFILE_TEMPLATE: &str = "experiment_profile_name: new profile

metadata:
  author: \"\"
  description: \"\"

common:
  jobs:
    stirring:
      actions:
        - type: start
          hours_elapsed: 0.0
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Loaded,
    Editing,
    Saving,
    Saved,
    SaveError(String),
}

/// What gets sent to the backend on save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub filename: String,
    pub body: String,
}

#[derive(Debug)]
pub struct ProfileEditor {
    filename: String,
    source: String,
    state: EditorState,
    document: Option<serde_yaml::Value>,
    preview: Option<ProfilePreview>,
    parse_error: Option<String>,
    validation_error: Option<String>,
}

/// Append `.yaml` unless the name already carries a YAML extension
pub fn normalize_filename(filename: &str) -> String {
    let trimmed = filename.trim();
    if trimmed.ends_with(".yaml") || trimmed.ends_with(".yml") {
        trimmed.to_string()
    } else {
        format!("{}.yaml", trimmed)
    }
}

impl ProfileEditor {
    /// Editor over a fetched profile
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        let mut editor = Self {
            filename: filename.into(),
            source: source.into(),
            state: EditorState::Loaded,
            document: None,
            preview: None,
            parse_error: None,
            validation_error: None,
        };
        editor.reparse();
        editor
    }

    /// Editor for a profile that does not exist yet
    pub fn new_profile() -> Self {
        Self::new("", NEW_PROFILE_TEMPLATE)
    }

    /// Fetch `filename` and open it
    pub async fn load(
        client: &BackendClient,
        scope: &PageScope,
        filename: &str,
    ) -> crate::Result<Self> {
        let source = scope.run(client.get_profile(filename)).await?;
        tracing::debug!("Loaded profile '{}' ({} bytes)", filename, source.len());
        Ok(Self::new(filename, source))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Last document that parsed successfully
    pub fn document(&self) -> Option<&serde_yaml::Value> {
        self.document.as_ref()
    }

    pub fn preview(&self) -> Option<&ProfilePreview> {
        self.preview.as_ref()
    }

    /// Why the current source does not parse, if it does not
    pub fn parse_error(&self) -> Option<&str> {
        self.parse_error.as_deref()
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    /// Confirmation shown right after a successful save
    pub fn confirmation(&self) -> Option<String> {
        match self.state {
            EditorState::Saved => Some(format!("Saved {}", self.filename)),
            _ => None,
        }
    }

    /// Apply a keystroke's worth of new source text
    pub fn edit(&mut self, text: impl Into<String>) {
        self.source = text.into();
        self.state = EditorState::Editing;
        self.reparse();
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
        self.validation_error = None;
    }

    fn reparse(&mut self) {
        let guarded = convert_template_guard(&self.source);
        match serde_yaml::from_str::<serde_yaml::Value>(&guarded) {
            Ok(doc) => {
                self.preview = Some(ProfilePreview::from_document(&doc));
                self.document = Some(doc);
                self.parse_error = None;
            }
            Err(e) => {
                tracing::debug!("Profile source does not parse yet: {}", e);
                self.parse_error = Some(e.to_string());
            }
        }
    }

    /// Validate and move to `Saving`. A blank filename keeps the current state.
    pub fn begin_save(&mut self) -> crate::Result<SaveRequest> {
        if self.filename.trim().is_empty() {
            let message = "Filename can't be blank".to_string();
            self.validation_error = Some(message.clone());
            return Err(DashboardError::Validation(message));
        }
        self.validation_error = None;
        self.filename = normalize_filename(&self.filename);
        self.state = EditorState::Saving;
        Ok(SaveRequest {
            filename: self.filename.clone(),
            body: self.source.clone(),
        })
    }

    pub fn finish_save(&mut self, result: &crate::Result<()>) {
        self.state = match result {
            Ok(()) => EditorState::Saved,
            Err(e) => {
                tracing::warn!("Saving profile '{}' failed: {}", self.filename, e);
                EditorState::SaveError(describe(e))
            }
        };
    }

    /// Validate, send, and record the outcome
    pub async fn save(&mut self, client: &BackendClient, scope: &PageScope) -> crate::Result<()> {
        let request = self.begin_save()?;
        let result = scope
            .run(client.save_profile(&request.filename, &request.body))
            .await;
        if matches!(result, Err(DashboardError::Cancelled)) {
            return result;
        }
        self.finish_save(&result);
        result
    }
}
