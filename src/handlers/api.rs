use axum::Json;
use serde_json::{Value, json};

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Twilio Media Stream Server is running!"
    }))
}
