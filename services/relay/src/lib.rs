pub mod auth;
pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod state;
pub mod ws;

pub use state::AppState;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Assembles the full HTTP/WS surface. `allowed_origins` drives the CORS
/// layer: an empty list allows any origin, matching a single-tenant
/// deployment with no browser-side trust boundary to enforce.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/healthz", get(http::health::healthz))
        .route("/app", get(app_placeholder))
        .route("/e/:event_id/register-pc", post(http::admission::register_pc))
        .route("/e/:event_id/pending-sid", post(http::admission::pending_sid))
        .route("/e/:event_id/sid-status", get(http::admission::sid_status))
        .route("/e/:event_id/ws", get(ws::ws_upgrade))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    if allowed_origins.is_empty() {
        layer.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn app_placeholder() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>relay</title></head>
<body>
  <p>The controller UI is served separately; this relay only speaks the
  admission HTTP endpoints and the WebSocket protocol.</p>
</body>
</html>"#,
    )
}

async fn fallback_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>404 – Not Found</title>
  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
      background: #0f1117;
      color: #e1e4e8;
      display: flex;
      align-items: center;
      justify-content: center;
      min-height: 100vh;
    }
    .container { text-align: center; }
    .code {
      font-size: 8rem;
      font-weight: 700;
      letter-spacing: -0.04em;
      line-height: 1;
      background: linear-gradient(135deg, #667eea, #764ba2);
      -webkit-background-clip: text;
      -webkit-text-fill-color: transparent;
    }
    .message {
      margin-top: 0.5rem;
      font-size: 1.25rem;
      color: #8b949e;
    }
    .home-link {
      display: inline-block;
      margin-top: 2rem;
      padding: 0.6rem 1.5rem;
      border: 1px solid #30363d;
      border-radius: 6px;
      color: #c9d1d9;
      text-decoration: none;
      transition: border-color 0.15s, color 0.15s;
    }
    .home-link:hover { border-color: #667eea; color: #fff; }
  </style>
</head>
<body>
  <div class="container">
    <div class="code">404</div>
    <p class="message">This page doesn't exist.</p>
    <a class="home-link" href="/">← Back to home</a>
  </div>
</body>
</html>"#,
        ),
    )
}
