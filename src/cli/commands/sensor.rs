use std::path::PathBuf;

use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::config::api_client;
use crate::cli::utils::{confirm, output_error, output_success, output_value};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum SensorCommands {
    #[command(about = "Show the latest probe readings")]
    Latest,

    #[command(about = "Show the coliform history series")]
    History {
        #[arg(long, default_value_t = 20, help = "Number of points to fetch")]
        limit: u32,
    },

    #[command(about = "Show the current AI contamination assessment")]
    Ai,
}

pub async fn handle(cmd: SensorCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let api = api_client()?;

    match cmd {
        SensorCommands::Latest => {
            let snapshot = api.latest_sensor().await?;
            output_value(&serde_json::to_value(&snapshot)?)
        }

        SensorCommands::History { limit } => {
            let points = api.coliform_history(limit).await?;
            match output_format {
                OutputFormat::Json => output_value(&serde_json::to_value(&points)?),
                OutputFormat::Text => {
                    if points.is_empty() {
                        println!("No history yet");
                        return Ok(());
                    }
                    for point in points {
                        println!("{}  {:>10.2} MPN", point.timestamp, point.mpn);
                    }
                    Ok(())
                }
            }
        }

        SensorCommands::Ai => match api.ai_detection().await? {
            Some(assessment) => output_value(&serde_json::to_value(&assessment)?),
            None => output_success(&output_format, "No sensor data available yet", None),
        },
    }
}

pub async fn handle_predict(file: PathBuf, _output_format: OutputFormat) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&file)?;
    let sample: Value = serde_json::from_str(&content)?;

    let api = api_client()?;
    let assessment = api.predict(&sample).await?;
    output_value(&serde_json::to_value(&assessment)?)
}

pub async fn handle_override(yes: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    if !yes && !confirm("This sends an override command to the IoT device. Continue?")? {
        output_success(&output_format, "Cancelled", None)?;
        return Ok(());
    }

    let api = api_client()?;
    match api.manual_override().await {
        Ok(message) => output_success(&output_format, &message, None),
        Err(err) => {
            output_error(&output_format, &err.to_string(), None)?;
            std::process::exit(1);
        }
    }
}

pub async fn handle_notifications(output_format: OutputFormat) -> anyhow::Result<()> {
    let api = api_client()?;
    let notifications = api.notifications().await?;

    match output_format {
        OutputFormat::Json => output_value(&json!({ "notifications": notifications })),
        OutputFormat::Text => {
            if notifications.is_empty() {
                println!("No notifications");
                return Ok(());
            }
            for notification in notifications {
                let marker = if notification.read { " " } else { "*" };
                println!("{} {}  {}", marker, notification.created_at, notification.message);
            }
            Ok(())
        }
    }
}
