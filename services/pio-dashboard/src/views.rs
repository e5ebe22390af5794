//! HTML rendering for dashboard pages
//!
//! Every function here is a pure function of page state. All user and
//! backend supplied text goes through [`esc`] / [`attr`].

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::models::{Calibration, LogLevel, ProfileSummary};
use crate::pages::calibration::{ActivationState, CalibrationPage, CalibrationView};
use crate::pages::editor::{EditorState, ProfileEditor};
use crate::pages::logs::{LogsPage, BROADCAST};
use crate::pages::Notice;
use crate::profile::{JobSchedule, ProfilePreview};

const TABLE_STYLE: &str = "width: 100%; border-collapse: collapse;";
const HEAD_ROW_STYLE: &str = "border-bottom: 2px solid #dee2e6;";
const ROW_STYLE: &str = "border-bottom: 1px solid #dee2e6;";
const CELL_STYLE: &str = "padding: 0.5rem; text-align: left;";

fn esc(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

fn attr(text: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(text)
}

fn path(segment: &str) -> Cow<'_, str> {
    urlencoding::encode(segment)
}

/// Seconds before a still-loading page asks the browser to retry
pub const LOADING_REFRESH_SECS: u32 = 2;

/// Wrap a page body in the shared document shell
pub fn layout(title: &str, body: &str) -> String {
    document(title, "", body)
}

fn document(title: &str, head: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">{head}
    <title>{title}</title>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
{body}
</body>
</html>"#,
        title = esc(title),
        head = head,
        body = body,
    )
}

pub fn notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|n| {
            let (kind, color, bg) = match n {
                Notice::Success(_) => ("success", "#155724", "#d4edda"),
                Notice::Warning(_) => ("warning", "#856404", "#fff3cd"),
                Notice::Error(_) => ("error", "#721c24", "#f8d7da"),
            };
            format!(
                r#"<div class="notice notice-{}" style="padding: 0.75rem; margin: 0.5rem 0; border-radius: 0.25rem; color: {}; background-color: {};">{}</div>"#,
                kind,
                color,
                bg,
                esc(n.message())
            )
        })
        .collect()
}

fn level_options(selected: LogLevel) -> String {
    LogLevel::ALL
        .iter()
        .map(|level| {
            let marker = if *level == selected { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, level, marker)
        })
        .collect()
}

/// The logs page: selectors, table, pagination and the record-log form
pub fn logs_page(page: &LogsPage) -> String {
    let experiment = page.experiment();
    let base = format!("/experiments/{}/logs", path(experiment));
    let selected_unit = page.selection().unit();

    let mut unit_options = format!(
        r#"<option value="{}"{}>All units</option>"#,
        BROADCAST,
        if selected_unit.is_none() { " selected" } else { "" }
    );
    for unit in page.units() {
        let marker = if selected_unit == Some(unit.as_str()) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            unit_options,
            r#"<option value="{}"{}>{}</option>"#,
            attr(unit),
            marker,
            esc(&page.labels().display(unit))
        );
    }

    let rows: String = page
        .visible_entries()
        .map(|e| {
            format!(
                r#"<tr style="{row}"><td style="{cell}">{}</td><td style="{cell}">{}</td><td style="{cell}">{}</td><td style="{cell}">{}</td></tr>"#,
                esc(&e.timestamp),
                esc(&page.labels().display(&e.unit)),
                esc(&e.level),
                esc(&e.message),
                row = ROW_STYLE,
                cell = CELL_STYLE,
            )
        })
        .collect();
    let table = if rows.is_empty() {
        "<p>No logs to show.</p>".to_string()
    } else {
        format!(
            r#"<table style="{}"><thead><tr style="{}"><th style="{c}">Time</th><th style="{c}">Unit</th><th style="{c}">Level</th><th style="{c}">Message</th></tr></thead><tbody>{}</tbody></table>"#,
            TABLE_STYLE,
            HEAD_ROW_STYLE,
            rows,
            c = CELL_STYLE,
        )
    };

    let current = page.selection().route(experiment);
    let mut pager = String::new();
    if page.page() > 0 {
        let _ = write!(
            pager,
            r#"<a href="{}?page={}">Newer</a> "#,
            current,
            page.page() - 1
        );
    }
    if page.has_next_page() {
        let _ = write!(
            pager,
            r#"<a href="{}?page={}">Older</a>"#,
            current,
            page.page() + 1
        );
    }

    let unit_field = attr(page.selection().path_segment());
    let body = format!(
        r#"<h1>Logs: {experiment_text}</h1>
{notices}
<section>
    <form method="post" action="{base}/level" style="display: inline-block; margin-right: 1rem;">
        <input type="hidden" name="unit" value="{unit_field}">
        <label>Level <select name="level">{levels}</select></label>
        <button type="submit">Apply</button>
    </form>
    <form method="post" action="{base}/unit" style="display: inline-block;">
        <label>Unit <select name="unit">{units}</select></label>
        <button type="submit">Go</button>
    </form>
</section>
<section>
    {table}
    <nav>{pager}</nav>
</section>
<section>
    <h2>Record a log entry</h2>
    <form method="post" action="{base}/record">
        <input type="hidden" name="unit" value="{unit_field}">
        <label>Message <input type="text" name="message" required></label>
        <label>Level <select name="level">{record_levels}</select></label>
        <button type="submit">Record</button>
    </form>
</section>"#,
        experiment_text = esc(experiment),
        notices = notices(page.notices()),
        base = base,
        unit_field = unit_field,
        levels = level_options(page.level()),
        units = unit_options,
        table = table,
        pager = pager,
        record_levels = level_options(LogLevel::Info),
    );

    layout(&format!("Logs - {}", experiment), &body)
}

fn scale(value: f64, min: f64, max: f64, out_min: f64, out_max: f64) -> f64 {
    out_min + (value - min) / (max - min) * (out_max - out_min)
}

fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    if (max - min).abs() < f64::EPSILON {
        Some((min - 1.0, max + 1.0))
    } else {
        Some((min, max))
    }
}

/// Recorded points plus the fitted curve as an inline SVG
pub fn calibration_chart(calibration: &Calibration) -> String {
    const WIDTH: f64 = 480.0;
    const HEIGHT: f64 = 300.0;
    const MARGIN: f64 = 40.0;
    const SAMPLES: usize = 50;

    let points: Vec<(f64, f64)> = calibration.recorded_data.points().collect();
    let Some((x_min, x_max)) = padded_range(points.iter().map(|p| p.0)) else {
        return "<p>No recorded data points.</p>".to_string();
    };

    let curve: Vec<(f64, f64)> = (0..=SAMPLES)
        .filter_map(|i| {
            let x = x_min + (x_max - x_min) * i as f64 / SAMPLES as f64;
            calibration.predict(x).map(|y| (x, y))
        })
        .collect();

    let Some((y_min, y_max)) =
        padded_range(points.iter().map(|p| p.1).chain(curve.iter().map(|p| p.1)))
    else {
        return "<p>No recorded data points.</p>".to_string();
    };

    let px = |x: f64| scale(x, x_min, x_max, MARGIN, WIDTH - MARGIN);
    let py = |y: f64| scale(y, y_min, y_max, HEIGHT - MARGIN, MARGIN);

    let circles: String = points
        .iter()
        .map(|(x, y)| {
            format!(
                r##"<circle cx="{:.1}" cy="{:.1}" r="3" fill="#0d6efd"/>"##,
                px(*x),
                py(*y)
            )
        })
        .collect();

    let polyline = if curve.is_empty() {
        String::new()
    } else {
        let coords: Vec<String> = curve
            .iter()
            .filter(|(_, y)| y.is_finite())
            .map(|(x, y)| format!("{:.1},{:.1}", px(*x), py(*y)))
            .collect();
        format!(
            r##"<polyline points="{}" fill="none" stroke="#dc3545" stroke-width="2"/>"##,
            coords.join(" ")
        )
    };

    format!(
        r##"<svg class="calibration-chart" width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg">
<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="#6c757d"/>
<line x1="{m}" y1="{m}" x2="{m}" y2="{b}" stroke="#6c757d"/>
<text x="{cx}" y="{h}" text-anchor="middle" font-size="12">{x_label}</text>
<text x="12" y="{cy}" font-size="12" transform="rotate(-90 12 {cy})" text-anchor="middle">{y_label}</text>
{polyline}{circles}
</svg>"##,
        w = WIDTH,
        h = HEIGHT,
        m = MARGIN,
        b = HEIGHT - MARGIN,
        r = WIDTH - MARGIN,
        cx = WIDTH / 2.0,
        cy = HEIGHT / 2.0,
        x_label = esc(calibration.x.as_deref().unwrap_or("x")),
        y_label = esc(calibration.y.as_deref().unwrap_or("y")),
        polyline = polyline,
        circles = circles,
    )
}

fn calibration_table(calibration: &Calibration) -> String {
    let mut rows: Vec<(String, String)> = vec![
        ("Name".to_string(), calibration.calibration_name.clone()),
        (
            "Device".to_string(),
            calibration.device.clone().unwrap_or_default(),
        ),
        (
            "Type".to_string(),
            calibration.calibration_type.clone().unwrap_or_default(),
        ),
        (
            "Created".to_string(),
            calibration.created_at.clone().unwrap_or_default(),
        ),
        (
            "Calibrated on".to_string(),
            calibration
                .calibrated_on_pioreactor_unit
                .clone()
                .unwrap_or_default(),
        ),
        (
            "Curve".to_string(),
            format!(
                "{} {:?}",
                calibration.curve_type.as_deref().unwrap_or(""),
                calibration.curve_data_
            ),
        ),
        (
            "Active".to_string(),
            if calibration.is_active { "Yes" } else { "No" }.to_string(),
        ),
    ];
    for (key, value) in &calibration.extra {
        let shown = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        rows.push((key.clone(), shown));
    }

    let body: String = rows
        .iter()
        .map(|(k, v)| {
            format!(
                r#"<tr style="{}"><th style="{c}">{}</th><td style="{c}">{}</td></tr>"#,
                ROW_STYLE,
                esc(k),
                esc(v),
                c = CELL_STYLE
            )
        })
        .collect();
    format!(r#"<table style="{}">{}</table>"#, TABLE_STYLE, body)
}

/// The calibration detail page in whichever state it is in
pub fn calibration_page(page: &CalibrationPage) -> String {
    let content = match page.view() {
        CalibrationView::Loading => "<p>Loading calibration...</p>".to_string(),
        CalibrationView::NotFound => format!(
            r#"<p class="not-found">No calibration named {} found for {} on {}.</p>"#,
            esc(page.name()),
            esc(page.device()),
            esc(page.unit())
        ),
        CalibrationView::Failed(message) => format!(
            r#"<p class="load-error">Could not load calibration: {}</p>"#,
            esc(message)
        ),
        CalibrationView::Loaded(calibration) => {
            let disabled = if page.can_activate() { "" } else { " disabled" };
            let label = match (calibration.is_active, page.activation()) {
                (true, _) => "Active",
                (false, ActivationState::InFlight) => "Setting active...",
                (false, _) => "Set active",
            };
            format!(
                r#"{chart}
{table}
<form method="post" action="/calibrations/{unit}/{device}/{name}/active">
    <button type="submit" id="set-active"{disabled}>{label}</button>
</form>"#,
                chart = calibration_chart(calibration),
                table = calibration_table(calibration),
                unit = path(page.unit()),
                device = path(page.device()),
                name = path(page.name()),
                disabled = disabled,
                label = label,
            )
        }
    };

    let body = format!(
        "<h1>Calibration {} ({})</h1>\n{}\n{}",
        esc(page.name()),
        esc(page.unit()),
        notices(page.notices()),
        content
    );
    let title = format!("Calibration - {}", page.name());
    match page.view() {
        CalibrationView::Loading => document(
            &title,
            &format!(
                "\n    <meta http-equiv=\"refresh\" content=\"{}\">",
                LOADING_REFRESH_SECS
            ),
            &body,
        ),
        _ => layout(&title, &body),
    }
}

fn job_list(jobs: &[JobSchedule]) -> String {
    let mut out = String::from("<ul>");
    for job in jobs {
        let _ = write!(out, "<li><strong>{}</strong><ul>", esc(&job.job));
        for action in &job.actions {
            let when = action
                .hours_elapsed
                .map(|h| format!("{}h", h))
                .unwrap_or_else(|| "?".to_string());
            let options: Vec<String> = action
                .options
                .iter()
                .map(|(k, v)| format!("{}={}", esc(k), esc(v)))
                .collect();
            let _ = write!(out, "<li>{}: {}", esc(&when), esc(&action.kind));
            if !options.is_empty() {
                let _ = write!(out, " ({})", options.join(", "));
            }
            out.push_str("</li>");
        }
        out.push_str("</ul></li>");
    }
    out.push_str("</ul>");
    out
}

/// Preview pane contents
pub fn preview(preview: Option<&ProfilePreview>) -> String {
    let Some(p) = preview else {
        return r#"<p class="preview-empty">Nothing to preview yet.</p>"#.to_string();
    };

    let mut out = format!(
        "<h3>{}</h3>",
        esc(p.name.as_deref().unwrap_or("Untitled profile"))
    );
    if let Some(author) = &p.author {
        let _ = write!(out, "<p>Author: {}</p>", esc(author));
    }
    if let Some(description) = &p.description {
        let _ = write!(out, "<p>{}</p>", esc(description));
    }
    if !p.plugins.is_empty() {
        out.push_str("<p>Plugins: ");
        let names: Vec<String> = p
            .plugins
            .iter()
            .map(|plugin| match &plugin.version {
                Some(v) => format!("{} {}", esc(&plugin.name), esc(v)),
                None => esc(&plugin.name).into_owned(),
            })
            .collect();
        out.push_str(&names.join(", "));
        out.push_str("</p>");
    }
    if !p.common_jobs.is_empty() {
        out.push_str("<h4>All units</h4>");
        out.push_str(&job_list(&p.common_jobs));
    }
    for unit in &p.units {
        let heading = match &unit.label {
            Some(label) => format!("{} ({})", label, unit.unit),
            None => unit.unit.clone(),
        };
        let _ = write!(out, "<h4>{}</h4>", esc(&heading));
        out.push_str(&job_list(&unit.jobs));
    }
    out
}

/// The profile editor: source, filename, save button and live preview
pub fn editor_page(editor: &ProfileEditor, extra_notices: &[Notice]) -> String {
    let mut status: Vec<Notice> = extra_notices.to_vec();
    if let Some(message) = editor.validation_error() {
        status.push(Notice::Error(message.to_string()));
    }
    match editor.state() {
        EditorState::SaveError(message) => status.push(Notice::Error(message.clone())),
        EditorState::Saved => {
            if let Some(message) = editor.confirmation() {
                status.push(Notice::Success(message));
            }
        }
        _ => {}
    }

    let session = if editor.filename().is_empty() {
        "new".to_string()
    } else {
        editor.filename().to_string()
    };
    let preview_url = format!("/profiles/{}/preview", path(&session));
    let save_url = format!("/profiles/{}/save", path(&session));

    let body = format!(
        r#"<h1>Experiment profile</h1>
{notices}
<form method="post" action="{save_url}">
    <label>Filename <input type="text" name="filename" value="{filename}"></label>
    <div style="display: flex; gap: 1rem;">
        <textarea id="source" name="source" rows="30" style="flex: 1; font-family: monospace;">{source}</textarea>
        <div id="preview" style="flex: 1;">{preview}</div>
    </div>
    <button type="submit">Save</button>
</form>
<script>
    document.getElementById('source').addEventListener('input', function (e) {{
        fetch('{preview_url}', {{ method: 'POST', body: e.target.value }})
            .then(r => r.text())
            .then(html => {{ document.getElementById('preview').innerHTML = html; }});
    }});
</script>"#,
        notices = notices(&status),
        save_url = save_url,
        filename = attr(editor.filename()),
        source = esc(editor.source()),
        preview = preview(editor.preview()),
        preview_url = preview_url,
    );

    layout("Experiment profile", &body)
}

pub fn profile_list(profiles: &[ProfileSummary], page_notices: &[Notice]) -> String {
    let items: String = profiles
        .iter()
        .map(|p| {
            let name = p.experiment_profile_name.as_deref().unwrap_or(&p.file);
            format!(
                r#"<li><a href="/profiles/{}">{}</a> <small>{}</small></li>"#,
                path(&p.file),
                esc(name),
                esc(&p.file)
            )
        })
        .collect();
    let body = format!(
        r#"<h1>Experiment profiles</h1>
{}
<p><a href="/profiles/new">New profile</a></p>
<ul>{}</ul>"#,
        notices(page_notices),
        items
    );
    layout("Experiment profiles", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordedData;

    fn calibration() -> Calibration {
        serde_json::from_value(serde_json::json!({
            "calibration_name": "od-<cal>",
            "curve_data_": [2.0, 0.0],
            "recorded_data": {"x": [0.0, 1.0, 2.0], "y": [0.0, 2.1, 3.9]},
            "x": "OD600",
            "y": "Voltage"
        }))
        .unwrap()
    }

    #[test]
    fn text_is_escaped() {
        let html = calibration_table(&calibration());
        assert!(html.contains("od-&lt;cal&gt;"));
        assert!(!html.contains("od-<cal>"));
    }

    #[test]
    fn chart_has_points_and_curve() {
        let svg = calibration_chart(&calibration());
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("OD600"));
    }

    #[test]
    fn chart_without_points() {
        let mut cal = calibration();
        cal.recorded_data = RecordedData::default();
        assert!(calibration_chart(&cal).contains("No recorded data points."));
    }

    #[test]
    fn single_point_chart_does_not_divide_by_zero() {
        let mut cal = calibration();
        cal.curve_data_.clear();
        cal.recorded_data = RecordedData {
            x: vec![1.0],
            y: vec![1.0],
        };
        let svg = calibration_chart(&cal);
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn notices_carry_kind_class() {
        let html = notices(&[
            Notice::Warning("labels unavailable".to_string()),
            Notice::Error("<boom>".to_string()),
        ]);
        assert!(html.contains("notice-warning"));
        assert!(html.contains("notice-error"));
        assert!(html.contains("&lt;boom&gt;"));
    }

    #[test]
    fn only_loading_calibration_refreshes() {
        let poll = crate::task::PollConfig {
            interval: std::time::Duration::from_millis(1),
            max_attempts: 1,
        };
        let page = CalibrationPage::mount(
            "pio01",
            "od",
            "cal-1",
            poll,
            crate::scope::PageScope::new(),
        );
        let html = calibration_page(&page);
        assert!(html.contains(r#"<meta http-equiv="refresh" content="2">"#));
        assert!(html.contains("Loading calibration..."));

        assert!(!layout("Plain", "<p>x</p>").contains("http-equiv"));
    }

    #[test]
    fn empty_preview_placeholder() {
        assert!(preview(None).contains("Nothing to preview yet."));
    }

    #[test]
    fn editor_shows_save_error() {
        let mut editor = ProfileEditor::new("demo.yaml", "a: 1\n");
        editor.begin_save().unwrap();
        editor.finish_save(&Err(crate::DashboardError::Status {
            status: 400,
            message: "bad profile".to_string(),
        }));
        let html = editor_page(&editor, &[]);
        assert!(html.contains("bad profile"));
        assert!(html.contains(r#"action="/profiles/demo.yaml/save""#));
    }
}
