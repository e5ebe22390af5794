//! Pio Dashboard CLI
//!
//! Serves the dashboard, or runs one-off backend queries from the terminal.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pio_dashboard::models::JobRequest;
use pio_dashboard::pages::calibration::{CalibrationPage, CalibrationView};
use pio_dashboard::pages::editor::ProfileEditor;
use pio_dashboard::pages::Notice;
use pio_dashboard::profile::{JobSchedule, ProfilePreview};
use pio_dashboard::scope::PageScope;
use pio_dashboard::task::PollConfig;
use pio_dashboard::{backend_client, load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "pio-dashboard")]
#[command(about = "Web dashboard for a bioreactor cluster")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Leader backend URL (overrides config file)
    #[arg(long)]
    backend_url: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the dashboard (default)
    Serve,
    /// Print the cluster's config.ini as JSON
    Config,
    /// Print the unit labels of an experiment
    Labels { experiment: String },
    /// Print the units assigned to an experiment
    Units { experiment: String },
    /// Run a job on a unit
    RunJob {
        unit: String,
        job: String,
        /// Positional arguments passed to the job
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
        /// Job option as key=value, repeatable
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
    },
    /// Show a calibration, optionally making it the active one
    Calibration {
        unit: String,
        device: String,
        name: String,
        #[arg(long)]
        activate: bool,
    },
    /// Preview a local experiment profile file
    Preview { file: PathBuf },
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid option '{}': expected key=value", s))?;
    Ok((key.trim().to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, backend_url={:?}, log_level={:?}, command={:?}",
        args.config,
        args.port,
        args.backend_url,
        args.log_level,
        args.command
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(port) = args.port {
        config.dashboard.port = port;
    }
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            tracing::info!("Starting pio-dashboard");
            pio_dashboard::run(config).await?;
        }
        Command::Config => {
            let doc = backend_client(&config)?.get_config().await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Command::Labels { experiment } => {
            let labels = backend_client(&config)?.get_relabel_map(&experiment).await?;
            for (unit, label) in &labels.0 {
                println!("{}\t{}", unit, label);
            }
        }
        Command::Units { experiment } => {
            for unit in backend_client(&config)?
                .get_assigned_units(&experiment)
                .await?
            {
                println!("{}", unit);
            }
        }
        Command::RunJob {
            unit,
            job,
            args,
            options,
        } => {
            let request = JobRequest {
                args,
                options: options
                    .into_iter()
                    .map(|(k, v)| {
                        let value = serde_json::from_str(&v)
                            .unwrap_or(serde_json::Value::String(v));
                        (k, value)
                    })
                    .collect(),
                ..Default::default()
            };
            let response = backend_client(&config)?
                .run_job(&unit, &job, &request)
                .await?;
            println!("{}", response.status);
            if !response.body.is_empty() {
                println!("{}", response.body);
            }
            if !response.is_success() {
                return Err(format!("job request failed with status {}", response.status).into());
            }
        }
        Command::Calibration {
            unit,
            device,
            name,
            activate,
        } => {
            let client = backend_client(&config)?;
            let mut page = CalibrationPage::mount(
                unit,
                device,
                name,
                PollConfig::from(&config.task_polling),
                PageScope::new(),
            );
            page.load(&client).await;
            match page.view() {
                CalibrationView::Loaded(calibration) => {
                    println!("{}", serde_json::to_string_pretty(calibration.as_ref())?)
                }
                CalibrationView::NotFound => {
                    return Err(format!("no calibration named {}", page.name()).into())
                }
                CalibrationView::Failed(message) => return Err(message.clone().into()),
                CalibrationView::Loading => {
                    return Err("timed out waiting for the calibration task".into())
                }
            }
            if activate {
                page.activate(&client).await;
                for notice in page.notices() {
                    println!("{}", notice.message());
                }
                if page.notices().iter().any(|n| matches!(n, Notice::Error(_))) {
                    return Err("activation failed".into());
                }
            }
        }
        Command::Preview { file } => {
            let source = std::fs::read_to_string(&file)?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let editor = ProfileEditor::new(name, source);
            if let Some(error) = editor.parse_error() {
                return Err(format!("{} does not parse: {}", file.display(), error).into());
            }
            if let Some(preview) = editor.preview() {
                print_preview(preview);
            }
        }
    }

    Ok(())
}

fn print_jobs(jobs: &[JobSchedule], indent: &str) {
    for job in jobs {
        println!("{}{}", indent, job.job);
        for action in &job.actions {
            let when = action
                .hours_elapsed
                .map(|h| format!("{}h", h))
                .unwrap_or_else(|| "?".to_string());
            let options: Vec<String> = action
                .options
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            println!("{}  {} {} {}", indent, when, action.kind, options.join(" "));
        }
    }
}

fn print_preview(preview: &ProfilePreview) {
    println!(
        "{}",
        preview.name.as_deref().unwrap_or("Untitled profile")
    );
    if let Some(author) = &preview.author {
        println!("author: {}", author);
    }
    if let Some(description) = &preview.description {
        println!("{}", description);
    }
    for plugin in &preview.plugins {
        println!(
            "plugin: {} {}",
            plugin.name,
            plugin.version.as_deref().unwrap_or("")
        );
    }
    if !preview.common_jobs.is_empty() {
        println!("all units:");
        print_jobs(&preview.common_jobs, "  ");
    }
    for unit in &preview.units {
        match &unit.label {
            Some(label) => println!("{} ({}):", label, unit.unit),
            None => println!("{}:", unit.unit),
        }
        print_jobs(&unit.jobs, "  ");
    }
    println!("{} scheduled actions", preview.action_count());
}
