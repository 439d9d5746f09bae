//! Listener setup and the serve loop

pub mod tls;

use crate::config::ServerConfig;
use crate::rpc::{create_router, Dispatcher, NotebookBackend};
use crate::types::{BridgeError, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use tls::TlsListener;

enum Transport {
    Plain(TcpListener),
    Tls(TlsListener),
}

/// A bound notebook server, ready to [`run`](NotebookServer::run).
pub struct NotebookServer {
    transport: Transport,
    router: Router,
    shutdown: CancellationToken,
}

impl NotebookServer {
    /// Load TLS material (if configured) and bind the listening socket.
    ///
    /// `shutdown` stops the server once cancelled; the `quit` method cancels it.
    pub async fn bind(
        config: &ServerConfig,
        backend: Arc<dyn NotebookBackend>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let acceptor = config.tls.as_ref().map(tls::load_acceptor).transpose()?;

        let (host, port) = config.bind_target();
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| BridgeError::Bind {
                addr: format!("{}:{}", host, port),
                source,
            })?;

        let transport = match acceptor {
            Some(acceptor) => Transport::Tls(TlsListener::new(
                listener,
                acceptor,
                config.tls_handshake_timeout,
            )),
            None => Transport::Plain(listener),
        };

        let dispatcher = Arc::new(Dispatcher::new(backend, shutdown.clone()));
        let router = create_router(dispatcher, config.max_request_bytes);

        Ok(Self {
            transport,
            router,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        let addr = match &self.transport {
            Transport::Plain(listener) => listener.local_addr()?,
            Transport::Tls(listener) => axum::serve::Listener::local_addr(listener)?,
        };
        Ok(addr)
    }

    /// Serve until the shutdown token is cancelled or the process gets Ctrl-C.
    /// In-flight requests are allowed to finish.
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        let shutdown = self.shutdown.clone();
        let signal = async move {
            tokio::select! {
                _ = shutdown.cancelled() => info!("Shutdown requested"),
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => info!("Received Ctrl-C"),
                    Err(e) => {
                        warn!("Cannot listen for Ctrl-C: {}", e);
                        shutdown.cancelled().await;
                    }
                },
            }
        };

        match self.transport {
            Transport::Plain(listener) => {
                info!("Listening on http://{}", addr);
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(signal)
                    .await?;
            }
            Transport::Tls(listener) => {
                info!("Listening on https://{}", addr);
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(signal)
                    .await?;
            }
        }

        info!("Server stopped");
        Ok(())
    }
}
