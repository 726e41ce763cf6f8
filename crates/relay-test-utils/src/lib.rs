// relay-test-utils: Shared test utilities for the relay's integration suite.
//
// Provides a thin WebSocket test client. Tests spin up the real relay
// service in-process (via `relay::build_router`) and drive it like any
// other client, so there is no need for a mock server here.

pub mod mock_ws_client;

pub use mock_ws_client::MockWsClient;
