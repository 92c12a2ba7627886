//! Sensor, prediction, override, and notification endpoints.

use reqwest::Method;
use serde_json::Value;

use super::ApiClient;
use crate::error::{ClientError, Result};
use crate::types::{AiAssessment, ColiformPoint, Notification, SensorSnapshot};

impl ApiClient {
    /// GET /api/sensor - latest probe readings
    pub async fn latest_sensor(&self) -> Result<SensorSnapshot> {
        let response = self.request(Method::GET, "api/sensor").send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "Sensor API error").await;
            return Err(ClientError::from_status(status, message));
        }
        Ok(response.json().await?)
    }

    /// GET /api/sensor/coliform/history?limit=N
    ///
    /// The backend wraps the series in `{ status: "success", data: [...] }`.
    pub async fn coliform_history(&self, limit: u32) -> Result<Vec<ColiformPoint>> {
        let response = self
            .request(Method::GET, "api/sensor/coliform/history")
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "History API error").await;
            return Err(ClientError::from_status(status, message));
        }

        let body: Value = response.json().await?;
        if body.get("status").and_then(Value::as_str) != Some("success") {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("history response not successful");
            return Err(ClientError::malformed(message));
        }
        let data = body
            .get("data")
            .cloned()
            .ok_or_else(|| ClientError::malformed("history response missing data"))?;
        serde_json::from_value(data).map_err(|e| ClientError::malformed(e.to_string()))
    }

    /// GET /api/sensor/ai-detection
    ///
    /// Returns `None` when the backend has no sensor data yet.
    pub async fn ai_detection(&self) -> Result<Option<AiAssessment>> {
        let response = self
            .request(Method::GET, "api/sensor/ai-detection")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "AI detection API error").await;
            return Err(ClientError::from_status(status, message));
        }

        let body: Value = response.json().await?;
        if body.get("status").and_then(Value::as_str) == Some("no_data") {
            return Ok(None);
        }
        let assessment =
            serde_json::from_value(body).map_err(|e| ClientError::malformed(e.to_string()))?;
        Ok(Some(assessment))
    }

    /// POST /api/predict - run inference on a sensor sample.
    ///
    /// Uses the longer predict timeout; the upstream sleeps between requests
    /// and takes a while to wake.
    pub async fn predict(&self, sample: &Value) -> Result<AiAssessment> {
        let response = self
            .request(Method::POST, "api/predict")
            .timeout(self.predict_timeout)
            .json(sample)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "Prediction API error").await;
            return Err(ClientError::from_status(status, message));
        }

        let body: Value = response.json().await?;
        serde_json::from_value(body).map_err(|e| ClientError::malformed(e.to_string()))
    }

    /// POST /override - trigger the IoT device's manual override.
    ///
    /// Returns the backend's confirmation message.
    pub async fn manual_override(&self) -> Result<String> {
        let response = self.request(Method::POST, "override").send().await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Override request sent")
            .to_string();

        if status == 401 {
            return Err(ClientError::Api { status, message: "Unauthorized: please login first".into() });
        }
        if !(200..300).contains(&status) {
            return Err(ClientError::from_status(status, message));
        }
        Ok(message)
    }

    /// GET /notifications
    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        let response = self.request(Method::GET, "notifications").send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "Notifications API error").await;
            return Err(ClientError::from_status(status, message));
        }
        Ok(response.json().await?)
    }
}
