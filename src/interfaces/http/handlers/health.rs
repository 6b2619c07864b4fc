use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SERVICE_NAME: &str = "subscription-service";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_service_name_and_timestamp() {
        let response = health().await.0;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.service, "subscription-service");
        assert!(response.timestamp <= Utc::now());
    }
}
