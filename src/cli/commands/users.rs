use clap::Subcommand;
use serde_json::json;

use crate::cli::config::api_client;
use crate::cli::utils::{confirm, output_success, output_value, prompt_line};
use crate::cli::OutputFormat;
use crate::types::{NewUser, Role, UserQuery, UserUpdate};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List user accounts")]
    List {
        #[arg(long, help = "Search by name or email")]
        q: Option<String>,
        #[arg(long, help = "Filter by role (admin|superadmin)")]
        role: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    #[command(about = "Create a user account")]
    Add {
        #[arg(help = "Display name")]
        name: String,
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, default_value = "admin", help = "Role (admin|superadmin)")]
        role: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Update a user account")]
    Edit {
        #[arg(help = "User id")]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, help = "Role (admin|superadmin)")]
        role: Option<String>,
    },

    #[command(about = "Reset a user's password")]
    ResetPassword {
        #[arg(help = "User id")]
        id: String,
        #[arg(long, help = "New password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Delete a user account")]
    Delete {
        #[arg(help = "User id")]
        id: String,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

fn parse_role(role: &str) -> anyhow::Result<Role> {
    role.parse().map_err(|e: String| anyhow::anyhow!(e))
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let api = api_client()?;

    match cmd {
        UserCommands::List { q, role, page, limit } => {
            let query = UserQuery {
                q,
                role: role.as_deref().map(parse_role).transpose()?,
                page,
                limit,
            };
            let users = api.list_users(&query).await?;

            match output_format {
                OutputFormat::Json => output_value(&json!({ "users": users })),
                OutputFormat::Text => {
                    if users.is_empty() {
                        println!("No users found");
                        return Ok(());
                    }
                    for user in users {
                        println!("{:<24} {:<12} {}  {}", user.id, user.role, user.name, user.email);
                    }
                    Ok(())
                }
            }
        }

        UserCommands::Add { name, email, role, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_line("Password")?,
            };
            let new_user = NewUser { name, email, password, role: parse_role(&role)? };

            let created = api.create_user(&new_user).await?;
            output_success(
                &output_format,
                &format!("User '{}' created", created.email),
                Some(json!({ "user": created })),
            )
        }

        UserCommands::Edit { id, name, email, role } => {
            let update = UserUpdate {
                name,
                email,
                role: role.as_deref().map(parse_role).transpose()?,
            };
            api.update_user(&id, &update).await?;
            output_success(&output_format, &format!("User '{}' updated", id), None)
        }

        UserCommands::ResetPassword { id, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_line("New password")?,
            };
            api.reset_password(&id, &password).await?;
            output_success(&output_format, &format!("Password reset for '{}'", id), None)
        }

        UserCommands::Delete { id, yes } => {
            if !yes && !confirm(&format!("Delete user '{}'?", id))? {
                output_success(&output_format, "Cancelled", None)?;
                return Ok(());
            }
            api.delete_user(&id).await?;
            output_success(&output_format, &format!("User '{}' deleted", id), None)
        }
    }
}
