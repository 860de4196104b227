//! Client socket configuration.
//!
//! [`SocketConfig`] collects the TCP options applied to the game connection
//! (TCP_NODELAY and keepalive probes) and [`configure_stream`] applies them
//! the same way on Linux, Windows and macOS.

use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};

/// TCP options applied to the game connection.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm. Frames are flushed once per tick, so there
    /// is nothing to coalesce. Default: true.
    pub tcp_nodelay: bool,
    /// Enable TCP keepalive. Default: true.
    pub keepalive_enabled: bool,
    /// Idle time before the first keepalive probe. Default: 60s.
    pub keepalive_idle: Duration,
    /// Interval between probes. Default: 10s.
    pub keepalive_interval: Duration,
    /// Probes before the connection is declared dead. Default: 3.
    pub keepalive_retries: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            keepalive_enabled: true,
            keepalive_idle: Duration::from_secs(60),
            keepalive_interval: Duration::from_secs(10),
            keepalive_retries: 3,
        }
    }
}

/// Apply socket configuration to a connected [`TcpStream`].
pub fn configure_stream(stream: &TcpStream, config: &SocketConfig) -> std::io::Result<()> {
    stream.set_nodelay(config.tcp_nodelay)?;

    if config.keepalive_enabled {
        let sock_ref = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(config.keepalive_idle)
            .with_interval(config.keepalive_interval);

        // Retries are supported on Linux and Windows but not macOS.
        #[cfg(any(target_os = "linux", target_os = "windows"))]
        let keepalive = keepalive.with_retries(config.keepalive_retries);

        sock_ref.set_tcp_keepalive(&keepalive)?;
    }

    Ok(())
}

/// Opens a configured connection, giving up after `timeout`.
pub fn connect(
    addr: SocketAddr,
    config: &SocketConfig,
    timeout: Duration,
) -> std::io::Result<TcpStream> {
    let stream = TcpStream::connect_timeout(&addr, timeout)?;
    configure_stream(&stream, config)?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn listener() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[test]
    fn test_tcp_nodelay_is_set() {
        let (_listener, addr) = listener();
        let client = connect(addr, &SocketConfig::default(), Duration::from_secs(1)).unwrap();
        assert!(client.nodelay().unwrap(), "TCP_NODELAY should be enabled");
    }

    #[test]
    fn test_nodelay_disabled_when_configured() {
        let (_listener, addr) = listener();
        let config = SocketConfig {
            tcp_nodelay: false,
            ..Default::default()
        };
        let client = connect(addr, &config, Duration::from_secs(1)).unwrap();
        assert!(
            !client.nodelay().unwrap(),
            "TCP_NODELAY should be disabled when configured off"
        );
    }

    #[test]
    fn test_keepalive_is_configured() {
        let (_listener, addr) = listener();
        let config = SocketConfig {
            keepalive_idle: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(5),
            ..Default::default()
        };
        let client = connect(addr, &config, Duration::from_secs(1)).unwrap();
        let keepalive = SockRef::from(&client).keepalive().unwrap();
        assert!(keepalive, "Keepalive should be enabled");
    }
}
