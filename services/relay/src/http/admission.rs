//! Signed HTTP admission endpoints: `register-pc`, `pending-sid`, `sid-status`.
//!
//! All three are verified the same way: the caller signs
//! `op\npath\nsha256(body)\niat\nnonce` with the shared HMAC secret and
//! carries the result in `X-Relay-Iat` / `X-Relay-Nonce` / `X-Relay-Sig`.
//! Nonce replay is tracked per event, alongside `pc-auth` frames, since both
//! ride the same signing envelope.

use axum::extract::{Path, Query, State};
use bytes::Bytes;
use axum::http::HeaderMap;
use axum::Json;

use relay_protocol::{PendingSidRequest, RegisterPcRequest, SidStatusResponse};

use crate::auth::{self, CanonicalRequest};
use crate::error::{RelayError, RelayResult};
use crate::event::EventHandle;
use crate::state::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

async fn verify_signed_request(
    handle: &EventHandle,
    headers: &HeaderMap,
    op: &str,
    path: &str,
    body: &[u8],
) -> RelayResult<()> {
    let iat: i64 = header_str(headers, "x-relay-iat")
        .and_then(|v| v.parse().ok())
        .ok_or(RelayError::MissingHeaders)?;
    let nonce = header_str(headers, "x-relay-nonce").ok_or(RelayError::MissingHeaders)?;
    let sig = header_str(headers, "x-relay-sig").ok_or(RelayError::MissingHeaders)?;

    let payload_hash = auth::sha256_hex(body);
    let canonical = CanonicalRequest {
        op,
        path,
        payload_hash_hex: &payload_hash,
        iat,
        nonce,
    };

    auth::verify(handle.hmac_secret(), &canonical, sig, crate::event::now())?;

    if !handle.claim_nonce(nonce.to_owned()).await {
        return Err(RelayError::NonceReplay);
    }
    Ok(())
}

pub async fn register_pc(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> RelayResult<Json<relay_protocol::OkResponse>> {
    if !relay_protocol::is_valid_event_id(&event_id) {
        return Err(RelayError::BadEventId);
    }
    let path = format!("/e/{event_id}/register-pc");
    let handle = state.get_or_create(&event_id).await;
    verify_signed_request(&handle, &headers, "register-pc", &path, &body).await?;

    let req: RegisterPcRequest =
        serde_json::from_slice(&body).map_err(|_| RelayError::BadField("pcid"))?;
    if !relay_protocol::is_valid_event_id(&req.pcid) {
        return Err(RelayError::BadField("pcid"));
    }

    handle.register_pc(req.pcid).await?;
    Ok(Json(relay_protocol::OkResponse::default()))
}

pub async fn pending_sid(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> RelayResult<Json<relay_protocol::OkResponse>> {
    if !relay_protocol::is_valid_event_id(&event_id) {
        return Err(RelayError::BadEventId);
    }
    let path = format!("/e/{event_id}/pending-sid");
    let handle = state.get_or_create(&event_id).await;
    verify_signed_request(&handle, &headers, "pending-sid", &path, &body).await?;

    let req: PendingSidRequest =
        serde_json::from_slice(&body).map_err(|_| RelayError::BadField("sid"))?;
    if !relay_protocol::is_valid_sid(&req.sid) {
        return Err(RelayError::BadField("sid"));
    }

    handle.pending_sid(req.pcid, req.sid, req.ttl).await?;
    Ok(Json(relay_protocol::OkResponse::default()))
}

#[derive(serde::Deserialize)]
pub struct SidStatusQuery {
    sid: String,
}

/// Unlike `register-pc`/`pending-sid`, this endpoint is unauthenticated —
/// it only answers whether *some* mobile has claimed a SID, which isn't
/// sensitive enough to warrant the signing envelope. A SID that's absent,
/// unknown, or malformed is all the same fact: nothing is connected under
/// it, so this never errors — it always reports `{ok:true, connected}`.
pub async fn sid_status(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<SidStatusQuery>,
) -> Json<SidStatusResponse> {
    if !relay_protocol::is_valid_event_id(&event_id) || !relay_protocol::is_valid_sid(&query.sid) {
        return Json(SidStatusResponse { ok: true, connected: false });
    }
    let handle = state.get_or_create(&event_id).await;
    let connected = handle.sid_status(query.sid).await;
    Json(SidStatusResponse { ok: true, connected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"admission-test-secret";

    fn signed_headers(op: &str, path: &str, body: &[u8], nonce: &str, iat: i64) -> HeaderMap {
        let payload_hash = auth::sha256_hex(body);
        let canonical = CanonicalRequest {
            op,
            path,
            payload_hash_hex: &payload_hash,
            iat,
            nonce,
        };
        let sig = auth::encode_signature(&auth::sign(SECRET, &canonical.canonical_string()));

        let mut headers = HeaderMap::new();
        headers.insert("x-relay-iat", HeaderValue::from_str(&iat.to_string()).unwrap());
        headers.insert("x-relay-nonce", HeaderValue::from_str(nonce).unwrap());
        headers.insert("x-relay-sig", HeaderValue::from_str(&sig).unwrap());
        headers
    }

    #[tokio::test]
    async fn verify_signed_request_claims_the_nonce_exactly_once() {
        let handle = EventHandle::spawn(
            "pool-party".to_owned(),
            "/e/pool-party/ws".to_owned(),
            SECRET.to_vec(),
        );
        let body = br#"{"pcid":"desk-1"}"#;
        let headers = signed_headers(
            "register-pc",
            "/e/pool-party/register-pc",
            body,
            "nonce-1",
            crate::event::now(),
        );

        verify_signed_request(&handle, &headers, "register-pc", "/e/pool-party/register-pc", body)
            .await
            .unwrap();

        let err = verify_signed_request(
            &handle,
            &headers,
            "register-pc",
            "/e/pool-party/register-pc",
            body,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RelayError::NonceReplay));
    }

    #[tokio::test]
    async fn verify_signed_request_rejects_missing_headers() {
        let handle = EventHandle::spawn(
            "pool-party".to_owned(),
            "/e/pool-party/ws".to_owned(),
            SECRET.to_vec(),
        );
        let err = verify_signed_request(&handle, &HeaderMap::new(), "register-pc", "/x", b"")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MissingHeaders));
    }
}
