//! WebSocket upgrade and per-connection session loop.

mod session;

pub use session::ws_upgrade;
