use crate::cli::config::{api_client, clear_session, resolve_base_url};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::realtime::{ws_url, PushClient};
use crate::session::SessionSync;
use crate::types::SyncEvent;

/// Run the full session-sync stack against the selected server and print
/// derived events until Ctrl-C. This is the dashboard's live session wired
/// to a terminal.
pub async fn handle(_output_format: OutputFormat) -> anyhow::Result<()> {
    let api = api_client()?;
    let base_url = url::Url::parse(&resolve_base_url()?)?;
    let app_config = config();

    let push = if app_config.realtime.enabled {
        Some(PushClient::connect(ws_url(&base_url), app_config.realtime.clone()))
    } else {
        None
    };

    let sync = SessionSync::new(api, app_config.session.clone());

    match sync.fetch_session().await {
        Some(session) => println!("session: {} ({})", session.email, session.role),
        None => println!("session: none (login first for an authenticated watch)"),
    }

    sync.start(push.as_ref());
    let mut events = sync.events();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("shutting down");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(SyncEvent::SessionReplaced(session)) => match session {
                        Some(session) => println!("session: {} ({})", session.email, session.role),
                        None => println!("session: none"),
                    },
                    Ok(SyncEvent::RoleUpdated(role)) => println!("role: {}", role),
                    Ok(SyncEvent::ForcedLogout { reason }) => {
                        println!("logged out: {} - please sign in again", reason);
                        clear_session()?;
                        break;
                    }
                    Ok(SyncEvent::UserListChanged(detail)) => {
                        println!("user list changed: {}", detail);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    sync.shutdown();
    Ok(())
}
