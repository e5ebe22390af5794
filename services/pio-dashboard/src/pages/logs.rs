//! Logs page: level filter, unit selector, paged log table, record-log dialog

use crate::api::{BackendClient, LogQuery};
use crate::models::{LogEntry, LogLevel, NewLogEntry, RelabelMap};
use crate::pages::{describe, Notice};
use crate::scope::PageScope;
use crate::settings::SettingsStore;
use crate::DashboardError;

/// Unit name meaning "every unit"
pub const BROADCAST: &str = "$broadcast";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitSelection {
    Broadcast,
    Unit(String),
}

impl UnitSelection {
    /// Selection implied by the route's optional unit segment
    pub fn from_route(unit: Option<&str>) -> Self {
        match unit.map(str::trim) {
            None | Some("") | Some(BROADCAST) => UnitSelection::Broadcast,
            Some(unit) => UnitSelection::Unit(unit.to_string()),
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            UnitSelection::Broadcast => None,
            UnitSelection::Unit(u) => Some(u),
        }
    }

    /// Unit segment used in worker URLs
    pub fn path_segment(&self) -> &str {
        self.unit().unwrap_or(BROADCAST)
    }

    /// Dashboard route that shows this selection
    pub fn route(&self, experiment: &str) -> String {
        let experiment = urlencoding::encode(experiment);
        match self {
            UnitSelection::Broadcast => format!("/experiments/{}/logs", experiment),
            UnitSelection::Unit(unit) => format!(
                "/experiments/{}/logs/{}",
                experiment,
                urlencoding::encode(unit)
            ),
        }
    }
}

/// Contents of the "record log" dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLogDialog {
    pub unit: UnitSelection,
    pub message: String,
    pub level: LogLevel,
}

impl RecordLogDialog {
    pub fn validate(&self) -> crate::Result<NewLogEntry> {
        if self.message.trim().is_empty() {
            return Err(DashboardError::Validation(
                "Log message can't be blank".to_string(),
            ));
        }
        Ok(NewLogEntry::from_ui(self.message.trim(), self.level))
    }
}

#[derive(Debug)]
pub struct LogsPage {
    experiment: String,
    selection: UnitSelection,
    level: LogLevel,
    units: Vec<String>,
    labels: RelabelMap,
    entries: Vec<LogEntry>,
    page: usize,
    page_size: usize,
    notices: Vec<Notice>,
    scope: PageScope,
}

impl LogsPage {
    /// Mount for `experiment`, scoped to the route's unit if any
    pub fn mount(
        experiment: impl Into<String>,
        route_unit: Option<&str>,
        settings: &SettingsStore,
        page_size: usize,
        scope: PageScope,
    ) -> Self {
        Self {
            experiment: experiment.into(),
            selection: UnitSelection::from_route(route_unit),
            level: settings.log_level(),
            units: Vec::new(),
            labels: RelabelMap::default(),
            entries: Vec::new(),
            page: 0,
            page_size: page_size.max(1),
            notices: Vec::new(),
            scope,
        }
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn selection(&self) -> &UnitSelection {
        &self.selection
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn labels(&self) -> &RelabelMap {
        &self.labels
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// A full page came back, so there may be another one
    pub fn has_next_page(&self) -> bool {
        self.entries.len() >= self.page_size
    }

    pub fn query(&self) -> LogQuery {
        LogQuery {
            experiment: self.experiment.clone(),
            unit: self.selection.unit().map(str::to_string),
            min_level: self.level,
            skip: self.page * self.page_size,
            limit: self.page_size,
        }
    }

    /// Entries visible at the selected level. Levels the dashboard does not
    /// know (warnings, errors) are always shown.
    pub fn visible_entries(&self) -> impl Iterator<Item = &LogEntry> {
        let level = self.level;
        self.entries
            .iter()
            .filter(move |e| e.log_level().map_or(true, |l| level.shows(l)))
    }

    /// Persist a new level. The log table follows on the next load.
    pub async fn select_level(
        &mut self,
        level: LogLevel,
        settings: &mut SettingsStore,
    ) -> crate::Result<()> {
        self.level = level;
        self.page = 0;
        settings.set_log_level(level).await
    }

    /// Route to navigate to for a new unit selection
    pub fn select_unit(&self, selection: &UnitSelection) -> String {
        selection.route(&self.experiment)
    }

    /// Fetch labels, assigned units and the current page of logs
    pub async fn load(&mut self, client: &BackendClient) {
        let query = self.query();
        let (labels, units, entries) = tokio::join!(
            self.scope.run(client.get_relabel_map(&self.experiment)),
            self.scope.run(client.get_assigned_units(&self.experiment)),
            self.scope.run(client.get_logs(&query)),
        );

        if self.scope.is_cancelled() {
            tracing::debug!("Logs page for '{}' unmounted mid-load", self.experiment);
            return;
        }

        match labels {
            Ok(labels) => self.labels = labels,
            Err(e) => self.read_failed("Unit labels are unavailable", &e),
        }
        match units {
            Ok(units) => self.units = units,
            Err(e) => self.read_failed("Assigned units are unavailable", &e),
        }
        match entries {
            Ok(entries) => self.entries = entries,
            Err(e) => self.read_failed("Logs could not be loaded", &e),
        }
    }

    fn read_failed(&mut self, what: &str, err: &DashboardError) {
        tracing::warn!("{} for '{}': {}", what, self.experiment, err);
        self.notices
            .push(Notice::Warning(format!("{}: {}", what, describe(err))));
    }

    /// Submit the record-log dialog. Returns whether the entry was recorded.
    pub async fn record_log(&mut self, client: &BackendClient, dialog: &RecordLogDialog) -> bool {
        let entry = match dialog.validate() {
            Ok(entry) => entry,
            Err(e) => {
                self.notices.push(Notice::Error(describe(&e)));
                return false;
            }
        };

        let unit = dialog.unit.path_segment();
        let result = self
            .scope
            .run(client.record_log(unit, &self.experiment, &entry))
            .await;

        match result {
            Ok(()) => {
                tracing::info!("Recorded log entry for '{}' in '{}'", unit, self.experiment);
                self.notices
                    .push(Notice::Success("Log entry recorded".to_string()));
                true
            }
            Err(DashboardError::Cancelled) => false,
            Err(e) => {
                tracing::warn!("Recording log entry for '{}' failed: {}", unit, e);
                self.notices.push(Notice::Error(format!(
                    "Log entry was not recorded: {}",
                    describe(&e)
                )));
                false
            }
        }
    }
}
