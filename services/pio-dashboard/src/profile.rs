//! Render model for an experiment profile
//!
//! A profile is free-form YAML. The preview pulls out the parts worth showing
//! and quietly skips anything that is missing or shaped differently.

use serde_yaml::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct PluginRequirement {
    pub name: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAction {
    pub kind: String,
    pub hours_elapsed: Option<f64>,
    pub options: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobSchedule {
    pub job: String,
    pub actions: Vec<ScheduledAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitSchedule {
    pub unit: String,
    pub label: Option<String>,
    pub jobs: Vec<JobSchedule>,
}

/// What the editor's preview pane shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePreview {
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub plugins: Vec<PluginRequirement>,
    pub common_jobs: Vec<JobSchedule>,
    pub units: Vec<UnitSchedule>,
}

impl ProfilePreview {
    pub fn from_document(doc: &Value) -> Self {
        let metadata = doc.get("metadata");
        Self {
            name: doc.get("experiment_profile_name").and_then(scalar),
            author: metadata.and_then(|m| m.get("author")).and_then(scalar),
            description: metadata.and_then(|m| m.get("description")).and_then(scalar),
            plugins: plugins(doc.get("plugins")),
            common_jobs: jobs(doc.get("common").and_then(|c| c.get("jobs"))),
            units: units(doc.get("pioreactors")),
        }
    }

    /// Total number of scheduled actions across all jobs
    pub fn action_count(&self) -> usize {
        let count = |jobs: &[JobSchedule]| jobs.iter().map(|j| j.actions.len()).sum::<usize>();
        count(&self.common_jobs) + self.units.iter().map(|u| count(&u.jobs)).sum::<usize>()
    }
}

/// Stringify a scalar; mappings and sequences yield `None`
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Stringify anything, using compact JSON for nested values
fn display(value: &Value) -> String {
    scalar(value).unwrap_or_else(|| match value {
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    })
}

fn plugins(value: Option<&Value>) -> Vec<PluginRequirement> {
    let Some(list) = value.and_then(Value::as_sequence) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|p| {
            Some(PluginRequirement {
                name: p.get("name").and_then(scalar)?,
                version: p.get("version").and_then(scalar),
            })
        })
        .collect()
}

fn jobs(value: Option<&Value>) -> Vec<JobSchedule> {
    let Some(map) = value.and_then(Value::as_mapping) else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(name, body)| {
            let job = scalar(name)?;
            let mut actions: Vec<ScheduledAction> = body
                .get("actions")
                .and_then(Value::as_sequence)
                .map(|seq| seq.iter().filter_map(action).collect())
                .unwrap_or_default();
            actions.sort_by(|a, b| {
                let key = |h: Option<f64>| h.unwrap_or(f64::INFINITY);
                key(a.hours_elapsed).total_cmp(&key(b.hours_elapsed))
            });
            Some(JobSchedule { job, actions })
        })
        .collect()
}

fn action(value: &Value) -> Option<ScheduledAction> {
    let kind = value.get("type").and_then(scalar)?;
    let hours_elapsed = value.get("hours_elapsed").and_then(Value::as_f64);
    let options = value
        .get("options")
        .and_then(Value::as_mapping)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| Some((scalar(k)?, display(v))))
                .collect()
        })
        .unwrap_or_default();
    Some(ScheduledAction {
        kind,
        hours_elapsed,
        options,
    })
}

fn units(value: Option<&Value>) -> Vec<UnitSchedule> {
    let Some(map) = value.and_then(Value::as_mapping) else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(unit, body)| {
            Some(UnitSchedule {
                unit: scalar(unit)?,
                label: body.get("label").and_then(scalar),
                jobs: jobs(body.get("jobs")),
            })
        })
        .collect()
}
