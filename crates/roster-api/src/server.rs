//! Binding and serving the intent API.
//!
//! [`spawn_api`] binds before it spawns, so a bad address or a taken port
//! fails engine startup instead of surfacing later as a log line.

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use roster_core::config::InfrastructureConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::router::build_router;
use crate::state::AppState;

/// Errors raised while bringing the API up.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `api_host:api_port` is not a socket address.
    #[error("invalid API address {addr:?}: {source}")]
    Address {
        /// The rejected `host:port` string.
        addr: String,
        /// Why it did not parse.
        #[source]
        source: AddrParseError,
    },

    /// The listener could not bind.
    #[error("cannot bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// The OS error.
        #[source]
        source: std::io::Error,
    },
}

/// The address configured for the API.
///
/// # Errors
///
/// [`ServerError::Address`] if `api_host:api_port` does not parse.
pub fn listen_addr(infra: &InfrastructureConfig) -> Result<SocketAddr, ServerError> {
    let addr = format!("{}:{}", infra.api_host, infra.api_port);
    addr.parse().map_err(|source| ServerError::Address { addr, source })
}

/// Bind the API listener and serve on a background task.
///
/// The caller owns the handle and aborts it on shutdown. Errors after
/// binding are logged by the task.
///
/// # Errors
///
/// [`ServerError`] if the address is invalid or cannot be bound.
pub async fn spawn_api(
    infra: &InfrastructureConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, ServerError> {
    let addr = listen_addr(infra)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local = listener.local_addr().unwrap_or(addr);
    tracing::info!(addr = %local, "Roster API listening");

    let router = build_router(state);
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Roster API stopped serving");
        }
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use roster_core::config::RosterConfig;
    use roster_store::{EventStore, MemoryRepository};

    use super::*;

    fn infra(host: &str, port: u16) -> InfrastructureConfig {
        InfrastructureConfig {
            api_host: host.to_owned(),
            api_port: port,
            ..InfrastructureConfig::default()
        }
    }

    #[test]
    fn bad_host_is_an_address_error() {
        assert_eq!(
            listen_addr(&infra("127.0.0.1", 3000)).unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 3000))
        );
        assert!(matches!(
            listen_addr(&infra("not a host", 3000)),
            Err(ServerError::Address { .. })
        ));
    }

    #[tokio::test]
    async fn spawn_binds_before_returning() {
        let store = EventStore::open(MemoryRepository::new().into(), &RosterConfig::default())
            .await
            .unwrap();
        let state = Arc::new(AppState::new(store));

        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();
        let err = spawn_api(&infra("127.0.0.1", port), Arc::clone(&state))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));

        let handle = spawn_api(&infra("127.0.0.1", 0), state).await.unwrap();
        handle.abort();
    }
}
