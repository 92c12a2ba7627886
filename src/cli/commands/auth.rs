use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{api_client, clear_session, load_saved_session, save_session};
use crate::cli::utils::{output_error, output_success, output_value, prompt_line};
use crate::cli::OutputFormat;
use crate::error::ClientError;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to the backend")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout from the backend")]
    Logout,

    #[command(about = "Show the current session as the server sees it")]
    Whoami,

    #[command(about = "Show local authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_line("Password")?,
            };

            let api = api_client()?;
            match api.login(&email, &password).await {
                Ok(session) => {
                    save_session(&session)?;
                    output_success(
                        &output_format,
                        &format!("Logged in as {} ({})", session.email, session.role),
                        Some(json!({ "user": session })),
                    )
                }
                Err(ClientError::Authentication(message)) => {
                    output_error(&output_format, &message, Some("AUTHENTICATION"))?;
                    std::process::exit(1);
                }
                Err(err) => Err(err.into()),
            }
        }

        AuthCommands::Logout => {
            let api = api_client()?;
            // Local state clears even when the server call fails
            if let Err(err) = api.logout().await {
                tracing::warn!("logout request failed: {}", err);
            }
            clear_session()?;
            output_success(&output_format, "Logged out", None)
        }

        AuthCommands::Whoami => {
            let api = api_client()?;
            match api.me().await? {
                Some(session) => output_value(&json!({ "user": session })),
                None => {
                    output_error(&output_format, "Not logged in", Some("NO_SESSION"))?;
                    std::process::exit(1);
                }
            }
        }

        AuthCommands::Status => match load_saved_session()? {
            Some(saved) => output_success(
                &output_format,
                &format!(
                    "Session for {} ({}) saved at {}",
                    saved.session.email, saved.session.role, saved.saved_at
                ),
                Some(json!({ "user": saved.session, "saved_at": saved.saved_at })),
            ),
            None => output_success(&output_format, "No saved session", None),
        },
    }
}
