//! Shared helpers for the apimount conformance test suite.
//!
//! Provides [`spawn_server`]: it binds a `TcpListener` on an ephemeral port,
//! mounts the demo APIs with the given configuration, and returns the local
//! base URL.

use apimount_server::{build_router, demo_host, ServerConfig};

/// Bearer token accepted by servers started with [`spawn_with_token`].
pub const TEST_TOKEN: &str = "conformance-token";

/// Start an ephemeral in-process server and return its base URL.
///
/// The server runs in a background `tokio` task and is bound to an
/// OS-assigned port on `127.0.0.1`, e.g. `http://127.0.0.1:51234`. The
/// `bind_addr` of `config` is ignored.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the demo APIs fail to mount.
pub async fn spawn_server(config: ServerConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let config = ServerConfig {
        bind_addr: addr,
        ..config
    };
    let host = demo_host(&config).expect("register demo apis");
    let router = build_router(host.registry(), &config).expect("mount demo routes");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    base_url
}

/// [`spawn_server`] with [`TEST_TOKEN`] as the only accepted bearer token.
pub async fn spawn_with_token(require_auth: bool) -> String {
    spawn_server(ServerConfig {
        require_auth,
        tokens: vec![TEST_TOKEN.to_string()],
        ..ServerConfig::default()
    })
    .await
}
