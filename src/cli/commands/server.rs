use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{
    load_environment_config, load_server_config, ping_server, save_environment_config,
    save_server_config, ServerInfo, ServerStatus,
};
use crate::cli::utils::{output_error, output_success, output_value};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Register a backend server")]
    Add {
        #[arg(help = "Server URL")]
        url: String,
        #[arg(help = "Server name")]
        name: String,
        #[arg(long, default_value = "", help = "Description")]
        description: String,
    },

    #[command(about = "List registered servers")]
    List,

    #[command(about = "Switch to a server, or show the current one")]
    Use {
        #[arg(help = "Server name to switch to")]
        name: Option<String>,
    },

    #[command(about = "Health check a server (defaults to current)")]
    Ping {
        #[arg(help = "Server name to ping")]
        name: Option<String>,
    },

    #[command(about = "Remove a server from the registry")]
    Remove {
        #[arg(help = "Server name to remove")]
        name: String,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Add { url, name, description } => {
            // Reject unparseable URLs up front instead of at first use
            url::Url::parse(&url)?;

            let mut config = load_server_config()?;
            config.servers.insert(name.clone(), ServerInfo::new(url, description));
            save_server_config(&config)?;
            output_success(&output_format, &format!("Server '{}' registered", name), None)
        }

        ServerCommands::List => {
            let config = load_server_config()?;
            let env = load_environment_config()?;
            let current = env.current_server.as_deref();

            match output_format {
                OutputFormat::Json => output_value(&json!({
                    "current_server": current,
                    "servers": config.servers,
                })),
                OutputFormat::Text => {
                    if config.servers.is_empty() {
                        println!("No servers registered");
                        return Ok(());
                    }
                    for (name, info) in &config.servers {
                        let marker = if current == Some(name.as_str()) { "*" } else { " " };
                        println!("{} {}  {}  ({:?})", marker, name, info.url, info.status);
                    }
                    Ok(())
                }
            }
        }

        ServerCommands::Use { name } => match name {
            Some(name) => {
                let config = load_server_config()?;
                if !config.servers.contains_key(&name) {
                    output_error(
                        &output_format,
                        &format!("Server '{}' not found", name),
                        Some("NOT_FOUND"),
                    )?;
                    std::process::exit(1);
                }

                let mut env = load_environment_config()?;
                env.current_server = Some(name.clone());
                save_environment_config(&env)?;
                output_success(&output_format, &format!("Switched to server '{}'", name), None)
            }
            None => {
                let env = load_environment_config()?;
                match env.current_server {
                    Some(current) => {
                        output_success(&output_format, &format!("Current server: {}", current), None)
                    }
                    None => output_success(&output_format, "No current server set", None),
                }
            }
        },

        ServerCommands::Ping { name } => {
            let mut config = load_server_config()?;
            let env = load_environment_config()?;
            let target = match name.or(env.current_server) {
                Some(target) => target,
                None => {
                    output_error(&output_format, "No server specified or selected", None)?;
                    std::process::exit(1);
                }
            };

            let Some(info) = config.servers.get_mut(&target) else {
                output_error(
                    &output_format,
                    &format!("Server '{}' not found", target),
                    Some("NOT_FOUND"),
                )?;
                std::process::exit(1);
            };

            let status = ping_server(info).await;
            info.update_ping(status);
            let healthy = matches!(info.status, ServerStatus::Up);
            save_server_config(&config)?;

            if healthy {
                output_success(&output_format, &format!("Server '{}' is up", target), None)
            } else {
                output_error(&output_format, &format!("Server '{}' is down", target), None)?;
                std::process::exit(1);
            }
        }

        ServerCommands::Remove { name } => {
            let mut config = load_server_config()?;
            if config.servers.remove(&name).is_none() {
                output_error(
                    &output_format,
                    &format!("Server '{}' not found", name),
                    Some("NOT_FOUND"),
                )?;
                std::process::exit(1);
            }
            save_server_config(&config)?;

            let mut env = load_environment_config()?;
            if env.current_server.as_deref() == Some(name.as_str()) {
                env.current_server = None;
                save_environment_config(&env)?;
            }

            output_success(&output_format, &format!("Server '{}' removed", name), None)
        }
    }
}
