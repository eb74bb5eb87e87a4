use anyhow::Context as _;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// An in-process upstream server for integration tests.
///
/// Bound to an ephemeral localhost port; shut down gracefully when dropped
/// or via [`TestUpstream::shutdown`].
pub struct TestUpstream {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestUpstream {
    /// Serve `router` on `127.0.0.1:0`.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the ephemeral port fails.
    pub async fn serve(router: Router) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind ephemeral port")?;
        let addr = listener.local_addr().context("local_addr")?;

        let (stop, stopped) = oneshot::channel::<()>();
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = stopped.await;
        });
        let handle = tokio::spawn(async move { server.await });

        Ok(Self {
            addr,
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task panicked or failed.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.context("server task join")?.context("server")?;
        }
        Ok(())
    }
}

impl Drop for TestUpstream {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
