//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Size of the per-session buffer used to copy request bodies.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 64 * 1024;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The body copy buffer size, allocated once per session.
    pub copy_buffer_size: usize,
    /// Footer shown on generated error pages.
    pub signature: String,
}

impl ServerConfig {
    /// Listen on every interface at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            signature: "tcphttp server".to_string(),
        }
    }
}
