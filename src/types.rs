/// Shared types used across the codebase
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Account role as issued by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user's identity as held client-side.
///
/// A `Session` is either fully populated or not held at all; the parser below
/// refuses payloads missing email or role rather than producing a partial
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Opaque bearer credential some deployments return alongside the cookie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Session {
    /// Parse a session from a `/auth/me` or login response body.
    ///
    /// The backend has shipped both `{ "user": { ... } }` and the flat user
    /// object, and ids arrive as either strings or numbers. Returns `None`
    /// unless email and role are both present and well-formed.
    pub fn from_payload(body: &Value) -> Option<Session> {
        let user = body.get("user").unwrap_or(body);

        let id = match user.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        };
        let email = user.get("email")?.as_str()?.to_string();
        let role: Role = user.get("role")?.as_str()?.parse().ok()?;
        let name = user
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let token = body
            .get("token")
            .or_else(|| user.get("token"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Session { id, name, email, role, token })
    }
}

/// A user row as returned by the admin listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Query parameters for the admin user listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
    pub role: Option<Role>,
    pub page: u32,
    pub limit: u32,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self { q: None, role: None, page: 1, limit: 10 }
    }
}

/// Latest probe readings. The upstream payload is schemaless, so measured
/// values are kept as a name -> reading map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub readings: HashMap<String, f64>,
}

/// One point of the coliform history series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColiformPoint {
    pub timestamp: DateTime<Utc>,
    pub mpn: f64,
}

/// Water-safety verdict produced by the inference upstream.
/// The labels are the product's own and pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyStatus {
    Aman,
    Waspada,
    Bahaya,
}

/// AI contamination assessment with recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAssessment {
    pub mpn_value: f64,
    pub status: SafetyStatus,
    pub severity: String,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub alternative_use: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Server-initiated events delivered over the push channel
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    RoleChanged { user_id: String, new_role: Role },
    UserCreated { user: Value },
    UserDeleted { user_id: String },
}

/// Derived notifications re-dispatched by the session controller.
///
/// Consumers subscribe to these instead of the raw push channel, so handler
/// registration stays in one place no matter how many views come and go.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The held session value was replaced (login, fetch, poll).
    SessionReplaced(Option<Session>),
    /// The current user's role changed via push; already applied locally.
    RoleUpdated(Role),
    /// The session was destroyed without a local logout call.
    ForcedLogout { reason: String },
    /// The user roster changed; admin views should reload their listing.
    UserListChanged(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_parses_nested_user_shape() {
        let body = json!({
            "user": { "id": 1, "name": "A", "email": "a@x.com", "role": "admin" },
            "token": "opaque-123"
        });
        let session = Session::from_payload(&body).unwrap();
        assert_eq!(session.id, "1");
        assert_eq!(session.email, "a@x.com");
        assert_eq!(session.role, Role::Admin);
        assert_eq!(session.token.as_deref(), Some("opaque-123"));
    }

    #[test]
    fn session_parses_flat_shape() {
        let body = json!({ "id": "u-9", "name": "B", "email": "b@x.com", "role": "superadmin" });
        let session = Session::from_payload(&body).unwrap();
        assert_eq!(session.id, "u-9");
        assert_eq!(session.role, Role::Superadmin);
        assert!(session.token.is_none());
    }

    #[test]
    fn session_rejects_missing_role() {
        let body = json!({ "user": { "id": 1, "name": "A", "email": "a@x.com" } });
        assert!(Session::from_payload(&body).is_none());
    }

    #[test]
    fn session_rejects_missing_email() {
        let body = json!({ "id": 1, "name": "A", "role": "admin" });
        assert!(Session::from_payload(&body).is_none());
    }

    #[test]
    fn session_rejects_unknown_role() {
        let body = json!({ "id": 1, "email": "a@x.com", "role": "root" });
        assert!(Session::from_payload(&body).is_none());
    }
}
