use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::handler::IssueHandler;
use crate::routes::route;

/// Pause after a failed accept. Errors such as EMFILE clear up once open
/// connections finish, so the loop waits and tries again.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Source of inbound connections.
#[async_trait]
pub trait Acceptor: Send + Sync + 'static {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Acceptor for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// A bound listener plus the handler that serves it.
pub struct Server<A = TcpListener> {
    listener: A,
    handler: IssueHandler,
}

impl Server<TcpListener> {
    pub async fn bind(addr: SocketAddr, handler: IssueHandler) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, handler))
    }
}

impl<A: Acceptor> Server<A> {
    pub fn from_listener(listener: A, handler: IssueHandler) -> Self {
        Self { listener, handler }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves. Connections already
    /// accepted run to completion on their own tasks. A failed accept never
    /// stops the loop.
    pub async fn serve<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        info!(%addr, "Listening");

        let builder = auto::Builder::new(TokioExecutor::new());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                res = self.listener.accept() => match res {
                    Ok((stream, peer)) => {
                        debug!(%peer, "Accepted connection");
                        let io = TokioIo::new(stream);
                        let handler = self.handler.clone();
                        let service = service_fn(move |req: Request<Incoming>| {
                            let handler = handler.clone();
                            async move { Ok::<_, Infallible>(route(&handler, req).await) }
                        });
                        let builder = builder.clone();
                        tokio::spawn(async move {
                            if let Err(e) = builder.serve_connection(io, service).await {
                                debug!(%peer, error = %e, "Connection closed with error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            backoff_ms = ACCEPT_ERROR_BACKOFF.as_millis() as u64,
                            "Accept failed"
                        );
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::tests::FakeSource;
    use crate::fetcher::IssueFetcher;
    use jira_lookup_bulk::BulkExecutor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    const EMFILE: i32 = 24;

    /// Fails the first `failures` accepts with "too many open files", then
    /// hands out real connections.
    struct ExhaustedListener {
        inner: TcpListener,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl Acceptor for ExhaustedListener {
        async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(io::Error::from_raw_os_error(EMFILE));
            }
            self.inner.accept().await
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            self.inner.local_addr()
        }
    }

    fn handler() -> IssueHandler {
        IssueHandler::new(IssueFetcher::new(
            Arc::new(FakeSource::default()),
            BulkExecutor::new(1),
        ))
    }

    #[tokio::test]
    async fn test_serve_survives_descriptor_exhaustion() {
        let listener = ExhaustedListener {
            inner: TcpListener::bind("127.0.0.1:0").await.unwrap(),
            failures: AtomicUsize::new(3),
        };
        let server = Server::from_listener(listener, handler());
        let addr = server.local_addr().unwrap();
        let (stop, rx) = oneshot::channel::<()>();
        let join = tokio::spawn(server.serve(async move {
            let _ = rx.await;
        }));

        let response = reqwest::get(format!("http://{addr}/jira/search?issueKeys=A-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(
            body,
            serde_json::json!({"issues": [
                {"issueKey": "A-1", "error": "Issue not found or API error"}
            ]})
        );

        assert!(!join.is_finished());
        let _ = stop.send(());
        assert!(join.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::from_listener(listener, handler());

        let result = server.serve(async {}).await;

        assert!(result.is_ok());
    }
}
