use axum::Json;
use serde_json::{json, Value};

/// `GET /`: liveness acknowledgment.
pub async fn read_root() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}
