//! HTTP server implementation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use log::{error, info, warn};

use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::HandlerFn;
use crate::server::session::{DoneNotifier, Session, SessionHandle, SessionId, SessionState};

/// Lifecycle of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not accepting connections.
    Stopped,
    /// The accept loop is running.
    Listening,
    /// A stop was requested; the accept loop is winding down.
    Stopping,
}

/// An HTTP server: owns the listening socket and the registry of live sessions.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    handler: HandlerFn,
    listener: Mutex<Option<Arc<TcpListener>>>,
    state: Mutex<ListenerState>,
    /// Live sessions. One lock for insertion, removal and shutdown.
    sessions: AsyncMutex<HashMap<SessionId, SessionHandle>>,
    next_session_id: AtomicU64,
    done_tx: mpsc::UnboundedSender<SessionId>,
    done_rx: AsyncMutex<mpsc::UnboundedReceiver<SessionId>>,
    stop_tx: watch::Sender<bool>,
    accepting: AtomicBool,
    disposed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and request handler.
    pub fn new(config: ServerConfig, handler: HandlerFn) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (stop_tx, _) = watch::channel(false);
        Self {
            config,
            handler,
            listener: Mutex::new(None),
            state: Mutex::new(ListenerState::Stopped),
            sessions: AsyncMutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(0),
            done_tx,
            done_rx: AsyncMutex::new(done_rx),
            stop_tx,
            accepting: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ListenerState {
        *lock(&self.state)
    }

    fn set_state(&self, state: ListenerState) {
        *lock(&self.state) = state;
    }

    /// The bound address, once [`bind`](Self::bind) or [`start`](Self::start) has run.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        lock(&self.listener)
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Number of sessions currently in the registry.
    pub async fn session_count(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        self.reap(&mut sessions);
        sessions.len()
    }

    /// Drop the entries of sessions that have reported themselves done.
    fn reap(&self, sessions: &mut HashMap<SessionId, SessionHandle>) {
        // Busy while the accept loop waits on it; the loop reaps then
        let Ok(mut done_rx) = self.done_rx.try_lock() else {
            return;
        };
        while let Ok(id) = done_rx.try_recv() {
            sessions.remove(&id);
        }
    }

    /// Bind the listening socket without accepting yet.
    ///
    /// # Returns
    ///
    /// The bound address, which resolves port 0, or [`Error::Stopped`] once a
    /// stop has been requested.
    pub async fn bind(&self) -> Result<SocketAddr, Error> {
        if *self.stop_tx.borrow() {
            return Err(Error::Stopped);
        }
        if let Some(addr) = self.local_addr() {
            return Ok(addr);
        }
        let listener = TcpListener::bind(&self.config.addr).await?;
        let addr = listener.local_addr()?;
        *lock(&self.listener) = Some(Arc::new(listener));
        Ok(addr)
    }

    /// Bind if needed, then accept connections until a stop is requested or
    /// accepting fails.
    ///
    /// Every accepted connection is registered as a session before the next
    /// accept. Sessions outlive the accept loop; [`shutdown`](Self::shutdown)
    /// tears them down. The listening socket is closed when the loop returns.
    ///
    /// # Returns
    ///
    /// `Ok(())` after a stop, the accept error otherwise, or
    /// [`Error::AlreadyListening`] when another accept loop is running.
    pub async fn start(&self) -> Result<(), Error> {
        if self.accepting.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyListening);
        }
        let result = self.accept_loop().await;
        self.set_state(ListenerState::Stopped);
        self.accepting.store(false, Ordering::SeqCst);
        result
    }

    async fn accept_loop(&self) -> Result<(), Error> {
        let mut stop_rx = self.stop_tx.subscribe();
        if *stop_rx.borrow_and_update() {
            info!("Server stopped before accepting");
            return Ok(());
        }

        match self.bind().await {
            Ok(_) => {}
            Err(Error::Stopped) => return Ok(()),
            Err(e) => return Err(e),
        }
        let Some(listener) = lock(&self.listener).clone() else {
            // Released by a concurrent stop
            return Ok(());
        };

        self.set_state(ListenerState::Listening);
        info!("Server listening on http://{addr}", addr = listener.local_addr()?);

        let result = loop {
            tokio::select! {
                biased;

                _ = stop_rx.changed() => {
                    info!("Server stopped normally");
                    break Ok(());
                }

                Some(id) = self.next_done() => {
                    self.sessions.lock().await.remove(&id);
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => self.register_session(socket, addr).await,
                        Err(e) => {
                            error!("Unexpected error accepting connection: {e}");
                            break Err(Error::IoError(e));
                        }
                    }
                }
            }
        };

        // Both handles must go for the socket to close
        drop(listener);
        lock(&self.listener).take();
        result
    }

    async fn next_done(&self) -> Option<SessionId> {
        self.done_rx.lock().await.recv().await
    }

    /// Create a session for an accepted connection and add it to the registry.
    ///
    /// Once [`shutdown`](Self::shutdown) has begun the connection is dropped
    /// instead, so nothing is registered after the registry was drained.
    pub(crate) async fn register_session(&self, socket: TcpStream, peer: SocketAddr) {
        match socket.local_addr() {
            Ok(local) => info!("Connection: {peer} > {local}"),
            Err(_) => info!("Connection: {peer}"),
        }

        let mut sessions = self.sessions.lock().await;
        if self.disposed.load(Ordering::SeqCst) {
            info!("Server shutting down, dropping connection from {peer}");
            return;
        }
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = Session::new(id, socket, peer, self.handler.clone(), &self.config);
        sessions.insert(id, session.spawn(DoneNotifier::new(id, self.done_tx.clone())));
    }

    /// Stop accepting and close the listening socket. Existing sessions keep running.
    pub fn request_stop(&self) {
        {
            let mut state = lock(&self.state);
            if *state == ListenerState::Listening {
                *state = ListenerState::Stopping;
            }
        }
        self.stop_tx.send_replace(true);
        // The accept loop drops its own handle when it sees the stop
        lock(&self.listener).take();
    }

    /// Tear the server down: stop accepting, then dispose every registered
    /// session, waiting for each session task to exit.
    ///
    /// # Panics
    ///
    /// Panics when called a second time.
    pub async fn shutdown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            panic!("HttpServer::shutdown called twice");
        }
        self.request_stop();

        {
            let mut sessions = self.sessions.lock().await;
            self.reap(&mut sessions);
            if !sessions.is_empty() {
                info!("Disconnecting {len} connected clients...", len = sessions.len());
            }
            for (_, session) in sessions.drain() {
                if session.state() != SessionState::Closed {
                    warn!("Forcing session {id} with {peer} closed", id = session.id(), peer = session.peer_addr());
                }
                session.dispose().await;
            }
        }
        info!("Clients disconnected");
        info!("Server shutdown complete");
    }
}
