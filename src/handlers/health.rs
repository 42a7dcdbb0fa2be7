use axum::{Json, response::IntoResponse};

// Answered locally; never touches cache or upstream
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().timestamp_millis()
    }))
}
