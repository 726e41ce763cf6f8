use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    ok: bool,
    version: u8,
}

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true, version: relay_protocol::PROTOCOL_VERSION })
}
