//! HTTP server lifecycle: bind, serve, and an explicit bounded shutdown.

use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// Triggers shutdown of the [`Server`] it was created with. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Stops accepting connections and starts the drain. Idempotent.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[must_use = "call .run().await to start serving"]
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    router: Router,
    grace: Duration,
    handle: ShutdownHandle,
}

impl Server {
    /// Binds `address` and returns the server with its shutdown handle.
    ///
    /// # Errors
    ///
    /// Returns the bind error if the address is unavailable.
    pub async fn bind(
        address: &str,
        router: Router,
        grace: Duration,
    ) -> std::io::Result<(Self, ShutdownHandle)> {
        let listener = TcpListener::bind(address).await?;
        let (tx, _) = watch::channel(false);
        let handle = ShutdownHandle { tx: Arc::new(tx) };
        let server = Self {
            listener,
            router,
            grace,
            handle: handle.clone(),
        };
        Ok((server, handle))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until [`ShutdownHandle::shutdown`] is called and in-flight
    /// requests finish, or the grace period runs out, whichever is first.
    pub async fn run(self) -> std::io::Result<()> {
        let address = self.listener.local_addr()?;
        info!(address = %address, "Starting HTTP server");

        let stop = wait_for_shutdown(self.handle.subscribe());
        let serve = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(stop)
            .into_future();
        tokio::pin!(serve);

        let grace = self.grace;
        let deadline = async {
            wait_for_shutdown(self.handle.subscribe()).await;
            info!(grace_secs = grace.as_secs_f64(), "Shutdown requested, draining connections");
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = &mut serve => {
                result?;
                info!("Server shutdown complete");
            }
            () = deadline => {
                warn!("Grace period elapsed with requests in flight, closing connections");
            }
        }
        Ok(())
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // The server keeps a sender alive, so this only returns once shutdown is set.
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() -> anyhow::Result<()> {
    use anyhow::Context;
    use tokio::signal;

    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}
