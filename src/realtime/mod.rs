//! Push-channel client.
//!
//! Maintains one WebSocket connection to the backend per process, parses
//! server-initiated events, and re-dispatches them on a broadcast channel.
//! Nothing else in the crate touches the raw socket; the session controller
//! and any UI subscribe to the broadcast, so handler registration survives
//! consumer churn without duplication.

mod events;

pub use events::parse_frame;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RealtimeConfig;
use crate::types::PushEvent;

/// What subscribers see from the push channel.
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    /// Channel (re)connected. The session layer refetches on this, since
    /// pushes may have been missed while offline.
    Connected,
    Disconnected,
    Push(PushEvent),
}

/// Derive the push endpoint from the API base URL.
pub fn ws_url(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    // set_scheme only rejects invalid transitions, which ws/wss are not
    let _ = url.set_scheme(scheme);
    url.set_path("/ws");
    url
}

pub struct PushClient {
    connected: Arc<AtomicBool>,
    events: broadcast::Sender<RealtimeEvent>,
    task: Option<JoinHandle<()>>,
}

impl PushClient {
    /// Connect to the push endpoint and keep the connection alive with a
    /// bounded reconnect budget. The budget refills after every successful
    /// connect, so only consecutive failures exhaust it.
    pub fn connect(url: Url, config: RealtimeConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_channel(url, config, connected.clone(), events.clone()));

        Self { connected, events, task: Some(task) }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.events.subscribe()
    }

    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for PushClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_channel(
    url: Url,
    config: RealtimeConfig,
    connected: Arc<AtomicBool>,
    events: broadcast::Sender<RealtimeEvent>,
) {
    let mut attempts_left = config.reconnect_attempts;

    loop {
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                info!("push channel connected to {}", url);
                attempts_left = config.reconnect_attempts;
                connected.store(true, Ordering::SeqCst);
                let _ = events.send(RealtimeEvent::Connected);

                let (mut write, mut read) = ws.split();
                while let Some(next) = read.next().await {
                    let msg = match next {
                        Ok(m) => m,
                        Err(err) => {
                            warn!("push channel read error: {}", err);
                            break;
                        }
                    };

                    match msg {
                        Message::Text(text) => {
                            if let Some(event) = parse_frame(&text) {
                                let _ = events.send(RealtimeEvent::Push(event));
                            } else {
                                debug!("ignoring unrecognized push frame");
                            }
                        }
                        Message::Ping(payload) => {
                            if let Err(err) = write.send(Message::Pong(payload)).await {
                                warn!("push channel pong failed: {}", err);
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => continue,
                    }
                }

                connected.store(false, Ordering::SeqCst);
                let _ = events.send(RealtimeEvent::Disconnected);
            }
            Err(err) => {
                warn!("push channel connect failed: {}", err);
            }
        }

        if attempts_left == 0 {
            warn!("push channel reconnect budget exhausted, giving up");
            return;
        }
        attempts_left -= 1;
        tokio::time::sleep(Duration::from_millis(config.reconnect_delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_ws_scheme_from_http() {
        let base = Url::parse("http://localhost:4000").unwrap();
        assert_eq!(ws_url(&base).as_str(), "ws://localhost:4000/ws");
    }

    #[test]
    fn derives_wss_scheme_from_https() {
        let base = Url::parse("https://api.example.com").unwrap();
        assert_eq!(ws_url(&base).as_str(), "wss://api.example.com/ws");
    }
}
