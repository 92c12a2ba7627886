use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::types::Session;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub url: String,
    pub description: String,
    pub added_at: DateTime<Utc>,
    pub last_ping: Option<DateTime<Utc>>,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub servers: HashMap<String, ServerInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub current_server: Option<String>,
}

/// Session persisted between CLI invocations. The browser keeps its session
/// in a cookie; a short-lived process keeps the issued token instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSession {
    pub session: Session,
    pub saved_at: DateTime<Utc>,
}

impl ServerInfo {
    pub fn new(url: String, description: String) -> Self {
        Self {
            url,
            description,
            added_at: Utc::now(),
            last_ping: None,
            status: ServerStatus::Unknown,
        }
    }

    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.status = status;
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("AQUA_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("aqua").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    let config_dir = get_config_dir()?;
    let server_file = config_dir.join("server.json");

    if !server_file.exists() {
        return Ok(ServerConfig::default());
    }

    let content = fs::read_to_string(server_file)?;
    let config: ServerConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_server_config(config: &ServerConfig) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let server_file = config_dir.join("server.json");

    let content = serde_json::to_string_pretty(config)?;
    fs::write(server_file, content)?;
    Ok(())
}

pub fn load_environment_config() -> anyhow::Result<EnvironmentConfig> {
    let config_dir = get_config_dir()?;
    let env_file = config_dir.join("env.json");

    if !env_file.exists() {
        return Ok(EnvironmentConfig::default());
    }

    let content = fs::read_to_string(env_file)?;
    let config: EnvironmentConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_environment_config(config: &EnvironmentConfig) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let env_file = config_dir.join("env.json");

    let content = serde_json::to_string_pretty(config)?;
    fs::write(env_file, content)?;
    Ok(())
}

pub fn load_saved_session() -> anyhow::Result<Option<SavedSession>> {
    let config_dir = get_config_dir()?;
    let session_file = config_dir.join("session.json");

    if !session_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(session_file)?;
    let saved: SavedSession = serde_json::from_str(&content)?;
    Ok(Some(saved))
}

pub fn save_session(session: &Session) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let session_file = config_dir.join("session.json");

    let saved = SavedSession { session: session.clone(), saved_at: Utc::now() };
    let content = serde_json::to_string_pretty(&saved)?;
    fs::write(session_file, content)?;
    Ok(())
}

pub fn clear_session() -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let session_file = config_dir.join("session.json");
    if session_file.exists() {
        fs::remove_file(session_file)?;
    }
    Ok(())
}

pub async fn ping_server(server_info: &ServerInfo) -> ServerStatus {
    let client = reqwest::Client::new();
    let url = format!("{}/health", server_info.url.trim_end_matches('/'));

    match client
        .get(&url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => ServerStatus::Up,
        _ => ServerStatus::Down,
    }
}

/// Effective base URL: the selected registry server wins, then the profile
/// config (which already folds in `AQUA_API_BASE_URL`).
pub fn resolve_base_url() -> anyhow::Result<String> {
    let env = load_environment_config()?;
    if let Some(name) = env.current_server {
        let servers = load_server_config()?;
        let info = servers
            .servers
            .get(&name)
            .ok_or_else(|| anyhow::anyhow!("current server '{}' not found in registry", name))?;
        return Ok(info.url.clone());
    }

    Ok(crate::config::config().api.base_url.clone())
}

/// Build an `ApiClient` for the resolved server, attaching the saved session
/// token when one exists.
pub fn api_client() -> anyhow::Result<ApiClient> {
    let base_url = resolve_base_url()?;
    let api_config = &crate::config::config().api;
    let client = ApiClient::new(
        &base_url,
        api_config.request_timeout_secs,
        api_config.predict_timeout_secs,
    )?;

    if let Some(saved) = load_saved_session()? {
        client.set_bearer(saved.session.token);
    }

    Ok(client)
}
