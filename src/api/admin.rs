//! Superadmin user-management endpoints.

use reqwest::Method;
use serde_json::json;

use super::ApiClient;
use crate::error::{ClientError, Result};
use crate::types::{NewUser, UserAccount, UserQuery, UserUpdate};

/// The backend enforces this too; checking locally saves a round trip and
/// matches the product's password rules.
const MIN_PASSWORD_LEN: usize = 8;

impl ApiClient {
    /// GET /api/users with search, role filter, and paging
    pub async fn list_users(&self, query: &UserQuery) -> Result<Vec<UserAccount>> {
        let mut request = self.request(Method::GET, "api/users").query(&[
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ]);
        if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
            request = request.query(&[("q", q)]);
        }
        if let Some(role) = query.role {
            request = request.query(&[("role", role.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "Failed to load users").await;
            return Err(ClientError::from_status(status, message));
        }

        // The listing endpoint returns a bare array
        Ok(response.json().await?)
    }

    /// POST /api/users
    pub async fn create_user(&self, new_user: &NewUser) -> Result<UserAccount> {
        if new_user.password.len() < MIN_PASSWORD_LEN {
            return Err(ClientError::Api {
                status: 400,
                message: format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            });
        }

        let response = self
            .request(Method::POST, "api/users")
            .json(new_user)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "Failed to create user").await;
            return Err(ClientError::from_status(status, message));
        }

        Ok(response.json().await?)
    }

    /// PATCH /api/users/:id
    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<()> {
        let response = self
            .request(Method::PATCH, &format!("api/users/{}", id))
            .json(update)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "Failed to update user").await;
            return Err(ClientError::from_status(status, message));
        }
        Ok(())
    }

    /// PATCH /api/users/:id/password
    pub async fn reset_password(&self, id: &str, new_password: &str) -> Result<()> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(ClientError::Api {
                status: 400,
                message: format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            });
        }

        let response = self
            .request(Method::PATCH, &format!("api/users/{}/password", id))
            .json(&json!({ "newPassword": new_password }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "Failed to reset password").await;
            return Err(ClientError::from_status(status, message));
        }
        Ok(())
    }

    /// DELETE /api/users/:id
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("api/users/{}", id))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "Failed to delete user").await;
            return Err(ClientError::from_status(status, message));
        }
        Ok(())
    }
}
