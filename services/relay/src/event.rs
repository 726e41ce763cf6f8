//! The per-event bridging state machine.
//!
//! Each event is a single Tokio task reading from an mpsc mailbox —
//! the "per-event single serialization domain" the rest of the service
//! relies on. Sockets are represented to the actor only as an
//! `UnboundedSender<ServerFrame>` plus metadata; the actor never holds a raw
//! socket, so a slow or dead peer can't block it or any other connection.

use std::collections::{HashMap, HashSet};

use relay_protocol::{error_codes, CmdFrame, EvtFrame, HbAckFrame, JoinFrame, PcAuthFrame, ServerFrame};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::auth::{self, CanonicalRequest};
use crate::config::{HEARTBEAT_INTERVAL, NONCE_TTL, PC_OFFLINE_GRACE};
use crate::error::{RelayError, RelayResult};

pub type SocketId = u64;

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// What the actor asks a socket's writer task to do. Kept distinct from
/// `ServerFrame` because closing a connection isn't itself a wire frame.
#[derive(Debug, Clone)]
pub enum WriterMessage {
    Frame(ServerFrame),
    Close { code: u16, reason: &'static str },
}

/// A frame already classified by `type`, ready for the actor to interpret.
/// Frames the actor doesn't recognize are carried as `Echo`.
#[derive(Debug, Clone)]
pub enum IncomingFrame {
    PcAuth { frame: PcAuthFrame, path: Option<String> },
    Join(JoinFrame),
    Cmd(CmdFrame),
    Evt(EvtFrame),
    HbAck(HbAckFrame),
    Echo(serde_json::Value),
}

#[derive(Debug, Clone)]
enum Role {
    Pc { pcid: String },
    Mobile { pcid: String, sid: String },
}

struct SocketEntry {
    sender: mpsc::UnboundedSender<WriterMessage>,
    role: Option<Role>,
    #[allow(dead_code)]
    last_seen: i64,
}

struct PendingSidEntry {
    pcid: String,
    claimed: bool,
    expires_at: i64,
}

enum EventCommand {
    Connect {
        sender: mpsc::UnboundedSender<WriterMessage>,
        reply: oneshot::Sender<SocketId>,
    },
    Disconnect {
        socket_id: SocketId,
    },
    Frame {
        socket_id: SocketId,
        frame: IncomingFrame,
    },
    GraceTimeout {
        pcid: String,
        generation: u64,
    },
    RegisterPc {
        pcid: String,
        reply: oneshot::Sender<RelayResult<()>>,
    },
    PendingSid {
        pcid: String,
        sid: String,
        ttl: u64,
        reply: oneshot::Sender<RelayResult<()>>,
    },
    SidStatus {
        sid: String,
        reply: oneshot::Sender<bool>,
    },
    ClaimNonce {
        nonce: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Handle to a running event actor. Cheap to clone; every operation is a
/// message send plus (where a result is needed) a oneshot await.
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<EventCommand>,
    hmac_secret: std::sync::Arc<[u8]>,
}

impl EventHandle {
    pub fn spawn(event_id: String, ws_path: String, hmac_secret: Vec<u8>) -> Self {
        let hmac_secret: std::sync::Arc<[u8]> = std::sync::Arc::from(hmac_secret.into_boxed_slice());
        let (tx, rx) = mpsc::channel(256);
        let actor = EventActor::new(event_id, ws_path, hmac_secret.to_vec(), tx.clone(), rx);
        tokio::spawn(actor.run());
        Self { tx, hmac_secret }
    }

    /// The HMAC secret for this event's signing envelope, shared between
    /// `pc-auth` frames and the signed HTTP admission endpoints.
    pub fn hmac_secret(&self) -> &[u8] {
        &self.hmac_secret
    }

    pub async fn connect(&self, sender: mpsc::UnboundedSender<WriterMessage>) -> SocketId {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(EventCommand::Connect { sender, reply: reply_tx })
            .await;
        reply_rx.await.unwrap_or(0)
    }

    pub async fn disconnect(&self, socket_id: SocketId) {
        let _ = self.tx.send(EventCommand::Disconnect { socket_id }).await;
    }

    pub async fn dispatch(&self, socket_id: SocketId, frame: IncomingFrame) {
        let _ = self.tx.send(EventCommand::Frame { socket_id, frame }).await;
    }

    pub async fn register_pc(&self, pcid: String) -> RelayResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(EventCommand::RegisterPc { pcid, reply: reply_tx })
            .await;
        reply_rx
            .await
            .unwrap_or(Err(RelayError::Overloaded { retry_after_secs: 1 }))
    }

    pub async fn pending_sid(&self, pcid: String, sid: String, ttl: u64) -> RelayResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(EventCommand::PendingSid { pcid, sid, ttl, reply: reply_tx })
            .await;
        reply_rx
            .await
            .unwrap_or(Err(RelayError::Overloaded { retry_after_secs: 1 }))
    }

    pub async fn sid_status(&self, sid: String) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(EventCommand::SidStatus { sid, reply: reply_tx })
            .await;
        reply_rx.await.unwrap_or(false)
    }

    /// Claims `nonce` for this event's replay window. Used by the signed
    /// HTTP admission endpoints, which share the same nonce store as
    /// `pc-auth` frames since both ride the same signing envelope.
    pub async fn claim_nonce(&self, nonce: String) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(EventCommand::ClaimNonce { nonce, reply: reply_tx })
            .await;
        reply_rx.await.unwrap_or(false)
    }
}

struct EventActor {
    event_id: String,
    ws_path: String,
    hmac_secret: Vec<u8>,
    rx: mpsc::Receiver<EventCommand>,
    self_tx: mpsc::Sender<EventCommand>,

    next_socket_id: SocketId,
    sockets: HashMap<SocketId, SocketEntry>,
    pc_by_pcid: HashMap<String, SocketId>,
    mobiles_by_sid: HashMap<String, HashSet<SocketId>>,
    registered_pcs: HashSet<String>,
    pending_sids: HashMap<String, PendingSidEntry>,
    seen_nonces: HashMap<String, i64>,
    grace_generation: HashMap<String, u64>,
}

impl EventActor {
    fn new(
        event_id: String,
        ws_path: String,
        hmac_secret: Vec<u8>,
        self_tx: mpsc::Sender<EventCommand>,
        rx: mpsc::Receiver<EventCommand>,
    ) -> Self {
        Self {
            event_id,
            ws_path,
            hmac_secret,
            rx,
            self_tx,
            next_socket_id: 1,
            sockets: HashMap::new(),
            pc_by_pcid: HashMap::new(),
            mobiles_by_sid: HashMap::new(),
            registered_pcs: HashSet::new(),
            pending_sids: HashMap::new(),
            seen_nonces: HashMap::new(),
            grace_generation: HashMap::new(),
        }
    }

    async fn run(mut self) {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle(cmd),
                        None => break,
                    }
                }
                _ = heartbeat.tick() => self.send_heartbeats(),
            }
        }
    }

    fn handle(&mut self, cmd: EventCommand) {
        match cmd {
            EventCommand::Connect { sender, reply } => {
                let id = self.next_socket_id;
                self.next_socket_id += 1;
                self.sockets.insert(
                    id,
                    SocketEntry { sender, role: None, last_seen: now() },
                );
                let _ = reply.send(id);
            }
            EventCommand::Disconnect { socket_id } => self.on_disconnect(socket_id),
            EventCommand::Frame { socket_id, frame } => self.on_frame(socket_id, frame),
            EventCommand::GraceTimeout { pcid, generation } => {
                self.on_grace_timeout(pcid, generation)
            }
            EventCommand::RegisterPc { pcid, reply } => {
                let _ = reply.send(self.register_pc(pcid));
            }
            EventCommand::PendingSid { pcid, sid, ttl, reply } => {
                let _ = reply.send(self.pending_sid(pcid, sid, ttl));
            }
            EventCommand::SidStatus { sid, reply } => {
                let connected = self
                    .pending_sids
                    .get(&sid)
                    .map(|entry| entry.claimed)
                    .unwrap_or(false);
                let _ = reply.send(connected);
            }
            EventCommand::ClaimNonce { nonce, reply } => {
                let _ = reply.send(self.claim_nonce(&nonce));
            }
        }
    }

    // -------------------------------------------------------------------
    // Admission effects
    // -------------------------------------------------------------------

    fn register_pc(&mut self, pcid: String) -> RelayResult<()> {
        self.registered_pcs.insert(pcid);
        Ok(())
    }

    fn pending_sid(&mut self, pcid: String, sid: String, ttl: u64) -> RelayResult<()> {
        if !self.registered_pcs.contains(&pcid) {
            return Err(RelayError::PcNotRegistered);
        }
        self.sweep_pending_sids();
        if self.pending_sids.contains_key(&sid) {
            return Err(RelayError::SidExists);
        }
        let clamped = relay_protocol::clamp_sid_ttl(ttl);
        self.pending_sids.insert(
            sid,
            PendingSidEntry { pcid, claimed: false, expires_at: now() + clamped as i64 },
        );
        Ok(())
    }

    fn sweep_pending_sids(&mut self) {
        let t = now();
        self.pending_sids.retain(|_, entry| entry.expires_at > t);
    }

    // -------------------------------------------------------------------
    // Frame handling
    // -------------------------------------------------------------------

    fn on_frame(&mut self, socket_id: SocketId, frame: IncomingFrame) {
        if !self.sockets.contains_key(&socket_id) {
            return;
        }
        if let Some(entry) = self.sockets.get_mut(&socket_id) {
            entry.last_seen = now();
        }
        match frame {
            IncomingFrame::PcAuth { frame, path } => self.on_pc_auth(socket_id, frame, path),
            IncomingFrame::Join(frame) => self.on_join(socket_id, frame),
            IncomingFrame::Cmd(frame) => self.on_cmd(socket_id, frame),
            IncomingFrame::Evt(frame) => self.on_evt(socket_id, frame),
            IncomingFrame::HbAck(_) => {}
            IncomingFrame::Echo(value) => self.send_to(socket_id, ServerFrame::echo(value)),
        }
    }

    fn on_pc_auth(&mut self, socket_id: SocketId, frame: PcAuthFrame, path_override: Option<String>) {
        let path = path_override.or(frame.path.clone()).unwrap_or_else(|| self.ws_path.clone());
        let payload_hash = frame.payload_hash.clone().unwrap_or_default();

        if !auth::is_empty_body_hash(&payload_hash) {
            self.send_to(socket_id, ServerFrame::pc_err(error_codes::BAD_PAYLOAD_HASH));
            return;
        }

        let canonical = CanonicalRequest {
            op: "ws-auth",
            path: &path,
            payload_hash_hex: &payload_hash,
            iat: frame.iat,
            nonce: &frame.nonce,
        };

        match auth::verify(&self.hmac_secret, &canonical, &frame.sig, now()) {
            Err(RelayError::ClockSkew { server_time }) => {
                self.send_to(
                    socket_id,
                    ServerFrame::pc_err_with_time(error_codes::CLOCK_SKEW, server_time),
                );
                return;
            }
            Err(err) => {
                self.send_to(socket_id, ServerFrame::pc_err(err.code()));
                return;
            }
            Ok(()) => {}
        }

        if !self.claim_nonce(&frame.nonce) {
            self.send_to(socket_id, ServerFrame::pc_err(error_codes::NONCE_REPLAY));
            return;
        }

        let pcid = frame.pcid;
        if let Some(&previous) = self.pc_by_pcid.get(&pcid) {
            if previous != socket_id {
                if let Some(entry) = self.sockets.get_mut(&previous) {
                    entry.role = None;
                }
            }
        }
        self.pc_by_pcid.insert(pcid.clone(), socket_id);
        if let Some(entry) = self.sockets.get_mut(&socket_id) {
            entry.role = Some(Role::Pc { pcid: pcid.clone() });
        }

        // A reconnect within the grace window invalidates any pending timer.
        let generation = self.grace_generation.entry(pcid.clone()).or_insert(0);
        *generation += 1;

        self.broadcast_to_pc_mobiles(&pcid, ServerFrame::evt(None, "pc-online", None));
        self.send_to(socket_id, ServerFrame::pc_ack());
        info!(event = %self.event_id, pcid = %pcid, "pc authenticated");
    }

    fn on_join(&mut self, socket_id: SocketId, frame: JoinFrame) {
        if !relay_protocol::is_valid_sid(&frame.sid) {
            self.send_to(socket_id, ServerFrame::error(error_codes::BAD_SID));
            return;
        }

        self.sweep_pending_sids();
        let Some(entry) = self.pending_sids.get_mut(&frame.sid) else {
            self.send_to(socket_id, ServerFrame::error(error_codes::BAD_SID));
            return;
        };
        entry.claimed = true;
        let pcid = entry.pcid.clone();

        if let Some(socket) = self.sockets.get_mut(&socket_id) {
            socket.role = Some(Role::Mobile { pcid: pcid.clone(), sid: frame.sid.clone() });
        }
        self.mobiles_by_sid.entry(frame.sid.clone()).or_default().insert(socket_id);

        self.send_to(socket_id, ServerFrame::ack_ok());

        if let Some(&pc_socket) = self.pc_by_pcid.get(&pcid) {
            self.send_to(pc_socket, ServerFrame::req_preview(frame.sid.clone(), frame.image_id));
        }
    }

    fn on_cmd(&mut self, socket_id: SocketId, frame: CmdFrame) {
        let Some(Role::Mobile { pcid, sid }) = self.role_of(socket_id) else {
            return;
        };
        let Some(&pc_socket) = self.pc_by_pcid.get(&pcid) else {
            return; // PC absent; mobile already learned this via pc-offline
        };
        self.send_to(pc_socket, ServerFrame::cmd(sid, frame.forwarded_payload()));
    }

    fn on_evt(&mut self, socket_id: SocketId, frame: EvtFrame) {
        let Some(Role::Pc { .. }) = self.role_of(socket_id) else {
            return;
        };
        let Some(recipients) = self.mobiles_by_sid.get(&frame.sid) else {
            return;
        };
        let msg = ServerFrame::evt(Some(frame.sid.clone()), frame.evt.clone(), frame.data.clone());
        for &mobile in recipients.clone().iter() {
            self.send_to(mobile, msg.clone());
        }
    }

    fn role_of(&self, socket_id: SocketId) -> Option<Role> {
        self.sockets.get(&socket_id).and_then(|s| s.role.clone())
    }

    // -------------------------------------------------------------------
    // Disconnect, offline grace, heartbeat
    // -------------------------------------------------------------------

    fn on_disconnect(&mut self, socket_id: SocketId) {
        let Some(entry) = self.sockets.remove(&socket_id) else {
            return;
        };
        match entry.role {
            Some(Role::Mobile { sid, .. }) => {
                if let Some(set) = self.mobiles_by_sid.get_mut(&sid) {
                    set.remove(&socket_id);
                    if set.is_empty() {
                        self.mobiles_by_sid.remove(&sid);
                    }
                }
            }
            Some(Role::Pc { pcid }) => {
                if self.pc_by_pcid.get(&pcid) == Some(&socket_id) {
                    self.pc_by_pcid.remove(&pcid);
                    self.broadcast_to_pc_mobiles(&pcid, ServerFrame::evt(None, "pc-offline", None));
                    self.start_grace_timer(pcid);
                }
            }
            None => {}
        }
    }

    fn start_grace_timer(&mut self, pcid: String) {
        let generation = self.grace_generation.entry(pcid.clone()).or_insert(0);
        *generation += 1;
        let generation = *generation;
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(PC_OFFLINE_GRACE).await;
            let _ = tx.send(EventCommand::GraceTimeout { pcid, generation }).await;
        });
    }

    fn on_grace_timeout(&mut self, pcid: String, generation: u64) {
        if self.grace_generation.get(&pcid) != Some(&generation) {
            return; // a reconnect or a newer disconnect superseded this timer
        }

        let mobiles: Vec<SocketId> = self
            .sockets
            .iter()
            .filter_map(|(&id, entry)| match &entry.role {
                Some(Role::Mobile { pcid: p, .. }) if *p == pcid => Some(id),
                _ => None,
            })
            .collect();

        for mobile in mobiles {
            self.send_to(mobile, ServerFrame::evt(None, "pc-timeout", None));
            if let Some(entry) = self.sockets.get(&mobile) {
                let _ = entry.sender.send(WriterMessage::Close {
                    code: 1012,
                    reason: "pc-offline-timeout",
                });
            }
        }
        warn!(event = %self.event_id, pcid = %pcid, "pc offline-grace expired");
    }

    fn send_heartbeats(&mut self) {
        if self.sockets.is_empty() {
            return;
        }
        let t = now();
        let dead: Vec<SocketId> = self
            .sockets
            .iter()
            .filter_map(|(&id, entry)| {
                if entry.sender.send(WriterMessage::Frame(ServerFrame::hb(t))).is_err() {
                    Some(id)
                } else {
                    None
                }
            })
            .collect();
        for id in dead {
            self.on_disconnect(id);
        }
    }

    // -------------------------------------------------------------------
    // Shared helpers
    // -------------------------------------------------------------------

    fn claim_nonce(&mut self, nonce: &str) -> bool {
        let t = now();
        self.seen_nonces.retain(|_, &mut expires_at| expires_at > t);
        if self.seen_nonces.contains_key(nonce) {
            return false;
        }
        self.seen_nonces.insert(nonce.to_owned(), t + NONCE_TTL.as_secs() as i64);
        true
    }

    fn broadcast_to_pc_mobiles(&mut self, pcid: &str, frame: ServerFrame) {
        let targets: Vec<SocketId> = self
            .sockets
            .iter()
            .filter_map(|(&id, entry)| match &entry.role {
                Some(Role::Mobile { pcid: p, .. }) if p == pcid => Some(id),
                _ => None,
            })
            .collect();
        for target in targets {
            self.send_to(target, frame.clone());
        }
    }

    fn send_to(&self, socket_id: SocketId, frame: ServerFrame) {
        if let Some(entry) = self.sockets.get(&socket_id) {
            let _ = entry.sender.send(WriterMessage::Frame(frame));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use tokio::sync::mpsc::unbounded_channel;

    const SECRET: &[u8] = b"event-actor-test-secret";

    fn handle() -> EventHandle {
        EventHandle::spawn(
            "pool-party".to_owned(),
            "/e/pool-party/ws".to_owned(),
            SECRET.to_vec(),
        )
    }

    fn signed_pc_auth(pcid: &str, nonce: &str, iat: i64) -> PcAuthFrame {
        let canonical = CanonicalRequest {
            op: "ws-auth",
            path: "/e/pool-party/ws",
            payload_hash_hex: relay_protocol::EMPTY_BODY_SHA256_HEX,
            iat,
            nonce,
        };
        let sig = auth::encode_signature(&auth::sign(SECRET, &canonical.canonical_string()));
        PcAuthFrame {
            pcid: pcid.to_owned(),
            path: None,
            iat,
            nonce: nonce.to_owned(),
            sig,
            payload_hash: Some(relay_protocol::EMPTY_BODY_SHA256_HEX.to_owned()),
        }
    }

    #[tokio::test]
    async fn pending_sid_requires_prior_register_pc() {
        let h = handle();
        let err = h
            .pending_sid("desk-1".to_owned(), "ABCDEFGHIJ".to_owned(), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::PcNotRegistered));

        h.register_pc("desk-1".to_owned()).await.unwrap();
        assert!(h
            .pending_sid("desk-1".to_owned(), "ABCDEFGHIJ".to_owned(), 60)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn pending_sid_rejects_duplicates() {
        let h = handle();
        h.register_pc("desk-1".to_owned()).await.unwrap();
        h.pending_sid("desk-1".to_owned(), "ABCDEFGHIJ".to_owned(), 60)
            .await
            .unwrap();
        let err = h
            .pending_sid("desk-1".to_owned(), "ABCDEFGHIJ".to_owned(), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::SidExists));
    }

    #[tokio::test]
    async fn sid_status_reflects_claim_after_join() {
        let h = handle();
        h.register_pc("desk-1".to_owned()).await.unwrap();
        h.pending_sid("desk-1".to_owned(), "ABCDEFGHIJ".to_owned(), 60)
            .await
            .unwrap();
        assert!(!h.sid_status("ABCDEFGHIJ".to_owned()).await);

        let (mobile_tx, mut mobile_rx) = unbounded_channel();
        let mobile_id = h.connect(mobile_tx).await;
        h.dispatch(
            mobile_id,
            IncomingFrame::Join(JoinFrame { sid: "ABCDEFGHIJ".to_owned(), image_id: None }),
        )
        .await;

        let ack = mobile_rx.recv().await.expect("ack");
        assert!(matches!(ack, WriterMessage::Frame(ServerFrame::Ack { ok: true, .. })));
        assert!(h.sid_status("ABCDEFGHIJ".to_owned()).await);
    }

    #[tokio::test]
    async fn pc_auth_then_mobile_cmd_is_forwarded_to_pc() {
        let h = handle();
        h.register_pc("desk-1".to_owned()).await.unwrap();
        h.pending_sid("desk-1".to_owned(), "ABCDEFGHIJ".to_owned(), 60)
            .await
            .unwrap();

        let (pc_tx, mut pc_rx) = unbounded_channel();
        let pc_id = h.connect(pc_tx).await;
        let auth_frame = signed_pc_auth("desk-1", "nonce-a", now());
        h.dispatch(pc_id, IncomingFrame::PcAuth { frame: auth_frame, path: None })
            .await;
        let ack = pc_rx.recv().await.expect("pc-ack");
        assert!(matches!(ack, WriterMessage::Frame(ServerFrame::PcAck { .. })));

        let (mobile_tx, mut mobile_rx) = unbounded_channel();
        let mobile_id = h.connect(mobile_tx).await;
        h.dispatch(
            mobile_id,
            IncomingFrame::Join(JoinFrame { sid: "ABCDEFGHIJ".to_owned(), image_id: None }),
        )
        .await;
        let _join_ack = mobile_rx.recv().await.expect("join ack");
        let preview = pc_rx.recv().await.expect("preview request");
        assert!(matches!(
            preview,
            WriterMessage::Frame(ServerFrame::ReqPreview { .. })
        ));

        h.dispatch(
            mobile_id,
            IncomingFrame::Cmd(CmdFrame {
                payload: Some(serde_json::json!({"cmd": "jump"})),
                cmd: None,
                args: None,
            }),
        )
        .await;

        let forwarded = pc_rx.recv().await.expect("forwarded cmd");
        match forwarded {
            WriterMessage::Frame(ServerFrame::Cmd { sid, payload, .. }) => {
                assert_eq!(sid, "ABCDEFGHIJ");
                assert_eq!(payload, serde_json::json!({"cmd": "jump"}));
            }
            other => panic!("expected cmd frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn replayed_nonce_is_rejected_on_second_pc_auth() {
        let h = handle();
        h.register_pc("desk-1".to_owned()).await.unwrap();

        let (pc_tx, mut pc_rx) = unbounded_channel();
        let pc_id = h.connect(pc_tx).await;
        let frame = signed_pc_auth("desk-1", "reused-nonce", now());
        h.dispatch(pc_id, IncomingFrame::PcAuth { frame: frame.clone(), path: None })
            .await;
        assert!(matches!(
            pc_rx.recv().await.unwrap(),
            WriterMessage::Frame(ServerFrame::PcAck { .. })
        ));

        let (pc2_tx, mut pc2_rx) = unbounded_channel();
        let pc2_id = h.connect(pc2_tx).await;
        h.dispatch(pc2_id, IncomingFrame::PcAuth { frame, path: None }).await;
        match pc2_rx.recv().await.unwrap() {
            WriterMessage::Frame(ServerFrame::PcErr { code, .. }) => {
                assert_eq!(code, error_codes::NONCE_REPLAY);
            }
            other => panic!("expected pc-err, got {other:?}"),
        }
    }
}
