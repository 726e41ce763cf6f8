//! relay-protocol: wire types and grammar shared between the HTTP admission
//! endpoints, the WebSocket session, and the event actor.
//!
//! WebSocket frames use a top-level `type` field for discriminated
//! deserialization and always carry `v: 1`.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u8 = 1;

/// SHA-256 of the empty byte string, lowercase hex. Used as the `ws-auth`
/// payload hash since `pc-auth` frames carry no request body.
pub const EMPTY_BODY_SHA256_HEX: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

/// `^[a-z0-9-]{3,32}$`
pub fn is_valid_event_id(s: &str) -> bool {
    (3..=32).contains(&s.len())
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// `^[A-Za-z0-9]{10}$`
pub fn is_valid_sid(s: &str) -> bool {
    s.len() == 10 && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Clamp a requested SID TTL (seconds) into `[30, 120]`.
pub fn clamp_sid_ttl(requested: u64) -> u64 {
    requested.clamp(30, 120)
}

// ---------------------------------------------------------------------------
// Frozen v1 error codes
// ---------------------------------------------------------------------------

pub mod error_codes {
    pub const MISSING_HEADERS: &str = "E_MISSING_HEADERS";
    pub const BAD_FIELD: &str = "E_BAD_FIELD";
    pub const BAD_SID: &str = "E_BAD_SID";
    pub const BAD_JSON: &str = "E_BAD_JSON";
    pub const BAD_VERSION: &str = "E_BAD_VERSION";
    pub const CLOCK_SKEW: &str = "E_CLOCK_SKEW";
    pub const NONCE_REPLAY: &str = "E_NONCE_REPLAY";
    pub const BAD_SIGNATURE: &str = "E_BAD_SIGNATURE";
    pub const BAD_PAYLOAD_HASH: &str = "E_BAD_PAYLOAD_HASH";
    pub const SID_EXISTS: &str = "E_SID_EXISTS";
    pub const PC_NOT_REGISTERED: &str = "E_PC_NOT_REGISTERED";
    pub const RATE_LIMITED: &str = "E_RATE_LIMITED";
    pub const OVERLOADED: &str = "E_OVERLOADED";
    pub const AUTH_FAILED: &str = "E_AUTH_FAILED";
}

/// Frozen HTTP error envelope used by all non-2xx admission responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub ok: bool,
    pub error: HttpErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorBody {
    pub code: String,
}

impl HttpErrorEnvelope {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: HttpErrorBody { code: code.into() },
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP admission bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPcRequest {
    pub pcid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl Default for OkResponse {
    fn default() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingSidRequest {
    pub pcid: String,
    pub sid: String,
    pub ttl: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SidStatusResponse {
    pub ok: bool,
    pub connected: bool,
}

// ---------------------------------------------------------------------------
// WebSocket client -> relay frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PcAuthFrame {
    pub pcid: String,
    #[serde(default)]
    pub path: Option<String>,
    pub iat: i64,
    pub nonce: String,
    pub sig: String,
    #[serde(default, rename = "payloadHash")]
    pub payload_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinFrame {
    pub sid: String,
    #[serde(default, rename = "imageId")]
    pub image_id: Option<String>,
}

/// `cmd` accepts either the new `{payload:{...}}` shape or the legacy
/// `{cmd, args}` shape. Both are preserved as an opaque JSON value so the
/// relay never has to understand command semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct CmdFrame {
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub args: Option<serde_json::Value>,
}

impl CmdFrame {
    /// The payload object the relay forwards to the PC: `payload` if
    /// present, else the legacy `{cmd, args}` shape.
    pub fn forwarded_payload(&self) -> serde_json::Value {
        if let Some(payload) = &self.payload {
            payload.clone()
        } else {
            serde_json::json!({ "cmd": self.cmd, "args": self.args })
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvtFrame {
    pub sid: String,
    pub evt: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HbAckFrame {
    #[serde(default)]
    pub t: Option<i64>,
}

// ---------------------------------------------------------------------------
// Relay -> WebSocket client frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "pc-ack")]
    PcAck { v: u8 },
    #[serde(rename = "pc-err")]
    PcErr {
        v: u8,
        code: String,
        #[serde(rename = "serverTime", skip_serializing_if = "Option::is_none")]
        server_time: Option<i64>,
    },
    #[serde(rename = "ack")]
    Ack { v: u8, ok: bool },
    #[serde(rename = "error")]
    Error { v: u8, code: String },
    #[serde(rename = "cmd")]
    Cmd {
        v: u8,
        sid: String,
        payload: serde_json::Value,
    },
    #[serde(rename = "evt")]
    Evt {
        v: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        sid: Option<String>,
        evt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    #[serde(rename = "hb")]
    Hb { v: u8, t: i64 },
    #[serde(rename = "req")]
    ReqPreview {
        v: u8,
        req: &'static str,
        sid: String,
        #[serde(skip_serializing_if = "Option::is_none", rename = "imageId")]
        image_id: Option<String>,
    },
    /// Fallback echo for any frame whose `type` is outside the known
    /// vocabulary. Debug affordance only; not relied on by clients.
    #[serde(rename = "evt")]
    Echo { v: u8, echo: serde_json::Value },
}

impl ServerFrame {
    pub fn pc_ack() -> Self {
        Self::PcAck { v: PROTOCOL_VERSION }
    }

    pub fn pc_err(code: impl Into<String>) -> Self {
        Self::PcErr {
            v: PROTOCOL_VERSION,
            code: code.into(),
            server_time: None,
        }
    }

    pub fn pc_err_with_time(code: impl Into<String>, server_time: i64) -> Self {
        Self::PcErr {
            v: PROTOCOL_VERSION,
            code: code.into(),
            server_time: Some(server_time),
        }
    }

    pub fn ack_ok() -> Self {
        Self::Ack {
            v: PROTOCOL_VERSION,
            ok: true,
        }
    }

    pub fn error(code: impl Into<String>) -> Self {
        Self::Error {
            v: PROTOCOL_VERSION,
            code: code.into(),
        }
    }

    pub fn cmd(sid: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Cmd {
            v: PROTOCOL_VERSION,
            sid: sid.into(),
            payload,
        }
    }

    pub fn evt(
        sid: Option<String>,
        evt: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self::Evt {
            v: PROTOCOL_VERSION,
            sid,
            evt: evt.into(),
            data,
        }
    }

    pub fn presence(sid: String, evt: &'static str) -> Self {
        Self::evt(Some(sid), evt, None)
    }

    pub fn hb(t: i64) -> Self {
        Self::Hb { v: PROTOCOL_VERSION, t }
    }

    pub fn req_preview(sid: impl Into<String>, image_id: Option<String>) -> Self {
        Self::ReqPreview {
            v: PROTOCOL_VERSION,
            req: "preview",
            sid: sid.into(),
            image_id,
        }
    }

    pub fn echo(value: serde_json::Value) -> Self {
        Self::Echo {
            v: PROTOCOL_VERSION,
            echo: value,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerFrame always serializes")
    }
}
