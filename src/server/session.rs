//! One accepted connection and its sequential request/response loop.

use std::net::SocketAddr;
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::parser::{parse_request, Error as ParserError, HttpRequest};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::HandlerFn;
use crate::server::response::{HttpResponse, StatusCode};
use crate::server::writer::write_response;

/// Identifier of a session within its listener.
pub type SessionId = u64;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Running the exchange loop.
    Active,
    /// The loop has stopped; the stream is being closed.
    Closing,
    /// The loop has exited and the stream is released.
    Closed,
}

/// The single "this session is done" notification sent to the registry.
///
/// Consumed on send, so a session can notify at most once.
pub struct DoneNotifier {
    id: SessionId,
    tx: mpsc::UnboundedSender<SessionId>,
}

impl DoneNotifier {
    pub fn new(id: SessionId, tx: mpsc::UnboundedSender<SessionId>) -> Self {
        Self { id, tx }
    }

    fn notify(self) {
        // The registry may already be gone during shutdown
        let _ = self.tx.send(self.id);
    }
}

/// How the exchange loop ended.
#[derive(Debug)]
enum Exit {
    /// The peer closed the stream between requests.
    PeerClosed,
    /// A response carried `Connection: close`.
    ConnectionClose,
    /// The peer went away in the middle of a request.
    Severed,
    /// Reading from the stream failed.
    ReadFailed(std::io::Error),
    /// Writing a response failed.
    WriteFailed(std::io::Error),
}

/// Owner of the session task, held by the registry.
pub struct SessionHandle {
    id: SessionId,
    peer: SocketAddr,
    state: watch::Receiver<SessionState>,
    teardown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Force the session into `Closed` and wait for its task to exit.
    ///
    /// An in-flight read or write is abandoned. Consumes the handle, so a
    /// session cannot be disposed twice.
    pub async fn dispose(self) {
        // Err means the session already finished on its own
        let _ = self.teardown.send(());
        if let Err(e) = self.task.await {
            error!("Session {id} with {peer} failed: {e}", id = self.id, peer = self.peer);
        }
    }
}

/// A connection session: parses requests, dispatches them to the handler and
/// writes responses until the connection should close.
pub struct Session<S> {
    id: SessionId,
    peer: SocketAddr,
    stream: BufReader<S>,
    handler: HandlerFn,
    copy_buf: Vec<u8>,
    signature: String,
    state: watch::Sender<SessionState>,
    /// The handler task of the request being served, if any.
    inflight: Option<JoinHandle<Result<HttpResponse, Error>>>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(id: SessionId, stream: S, peer: SocketAddr, handler: HandlerFn, config: &ServerConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Active);
        Self {
            id,
            peer,
            stream: BufReader::new(stream),
            handler,
            copy_buf: vec![0; config.copy_buffer_size.max(1)],
            signature: config.signature.clone(),
            state,
            inflight: None,
        }
    }

    /// Start the exchange loop on its own task.
    pub fn spawn(self, done: DoneNotifier) -> SessionHandle {
        let (teardown, teardown_rx) = oneshot::channel();
        let handle_state = self.state.subscribe();
        let (id, peer) = (self.id, self.peer);
        let task = tokio::spawn(self.run(teardown_rx, done));

        SessionHandle {
            id,
            peer,
            state: handle_state,
            teardown,
            task,
        }
    }

    async fn run(mut self, mut teardown: oneshot::Receiver<()>, done: DoneNotifier) {
        // A dropped handle counts as a teardown request too
        let exit = tokio::select! {
            exit = self.exchange_loop() => Some(exit),
            _ = &mut teardown => None,
        };
        self.state.send_replace(SessionState::Closing);

        // A teardown mid-request must not leave the handler running
        if let Some(task) = self.inflight.take() {
            task.abort();
            let _ = task.await;
        }

        let peer = self.peer;
        match &exit {
            Some(Exit::PeerClosed) => info!("Connection to {peer} closed by client"),
            Some(Exit::ConnectionClose) => info!("Connection to {peer} closed"),
            Some(Exit::Severed) => info!("Connection to {peer} dropped by client"),
            Some(Exit::ReadFailed(e)) => info!("Connection to {peer} closed by server: {e}"),
            Some(Exit::WriteFailed(e)) => warn!("Writing response to {peer} failed: {e}"),
            None => info!("Connection to {peer} closed by server"),
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!("Shutting down stream to {peer}: {e}");
        }
        self.state.send_replace(SessionState::Closed);

        // A disposed session is removed by whoever disposed it
        if exit.is_some() {
            done.notify();
        }
    }

    async fn exchange_loop(&mut self) -> Exit {
        loop {
            let response = match parse_request(&mut self.stream, &mut self.copy_buf).await {
                Ok(None) => return Exit::PeerClosed,
                Ok(Some(mut request)) => {
                    info!("<< {method} {path}", method = request.method, path = request.path);
                    request.peer_addr = Some(self.peer);
                    Self::dispatch(&self.handler, &mut self.inflight, &self.signature, self.peer, request).await
                }
                Err(ParserError::ConnectionSevered) => return Exit::Severed,
                Err(ParserError::Io(e)) => return Exit::ReadFailed(e),
                Err(e) => {
                    info!("<< ?? ({e})");
                    let status = if e.is_bad_request() {
                        StatusCode::BadRequest
                    } else {
                        StatusCode::InternalServerError
                    };
                    HttpResponse::error_page(status, &self.signature).with_connection("close")
                }
            };

            info!(">> {status}", status = response.status);
            if let Err(e) = write_response(&mut self.stream, &response).await {
                return Exit::WriteFailed(e);
            }

            if response.closes_connection() {
                return Exit::ConnectionClose;
            }
        }
    }

    /// Run the handler and mirror the request's version and `Connection` tokens.
    ///
    /// The handler runs on its own task so a panic stays contained. Its handle
    /// is parked in `inflight` until it finishes. Routing errors become their
    /// error page; any other failure becomes a 500 that closes the connection.
    async fn dispatch(
        handler: &HandlerFn,
        inflight: &mut Option<JoinHandle<Result<HttpResponse, Error>>>,
        signature: &str,
        peer: SocketAddr,
        request: HttpRequest,
    ) -> HttpResponse {
        let version = request.version;
        let connection: Vec<String> = request.connection_tokens().map(str::to_string).collect();

        let task = inflight.insert(tokio::spawn(handler(request)));
        let outcome = task.await;
        *inflight = None;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.status() != StatusCode::InternalServerError => {
                info!("Handler rejected request from {peer}: {e}");
                HttpResponse::from_error(&e, signature)
            }
            Ok(Err(e)) => {
                error!("Handler failed for {peer}: {e}");
                return HttpResponse::error_page(StatusCode::InternalServerError, signature)
                    .with_version(version)
                    .with_connection("close");
            }
            Err(e) => {
                error!("Handler panicked for {peer}: {e}");
                return HttpResponse::error_page(StatusCode::InternalServerError, signature)
                    .with_version(version)
                    .with_connection("close");
            }
        };

        connection
            .into_iter()
            .fold(response.with_version(version), |response, token| response.with_connection(token))
    }
}
