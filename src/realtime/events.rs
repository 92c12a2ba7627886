//! Push-channel wire format.
//!
//! The server sends text frames shaped as `{ "event": "...", "data": {...} }`.
//! Unknown events are ignored so the server can grow its vocabulary without
//! breaking older clients.

use serde_json::Value;

use crate::types::PushEvent;

/// Parse one text frame into a push event, or `None` if it is not one we
/// recognize.
pub fn parse_frame(text: &str) -> Option<PushEvent> {
    let frame: Value = serde_json::from_str(text).ok()?;
    let event = frame.get("event")?.as_str()?;
    let data = frame.get("data").cloned().unwrap_or(Value::Null);

    match event {
        "roleChanged" => {
            let user_id = subject_id(&data)?;
            let new_role = data.get("newRole")?.as_str()?.parse().ok()?;
            Some(PushEvent::RoleChanged { user_id, new_role })
        }
        "userCreated" => Some(PushEvent::UserCreated { user: data }),
        "userDeleted" => {
            let user_id = subject_id(&data)?;
            Some(PushEvent::UserDeleted { user_id })
        }
        _ => None,
    }
}

/// Ids arrive as strings or numbers depending on the backend build.
fn subject_id(data: &Value) -> Option<String> {
    match data.get("userId") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
