//! Turns loaded configuration into engine settings and drives one session.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use runewire_config::Config;
use runewire_net::{ConnectionEngine, Credentials, EngineConfig, HandshakeConfig, RsaKey, Transport};
use runewire_sync::{DescriptorTable, SyncContext, WorldEvent, dispatcher};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::tick_clock::TickClock;

/// Descriptor table looked up next to `config.ron`.
pub const DESCRIPTOR_FILE: &str = "descriptors.ron";

/// Builds the engine configuration. A custom RSA key needs both halves.
pub fn engine_config(config: &Config) -> Result<EngineConfig, ClientError> {
    let protocol = &config.protocol;
    let rsa = match (&protocol.rsa_exponent, &protocol.rsa_modulus) {
        (Some(exponent), Some(modulus)) => RsaKey::from_hex(exponent, modulus)?,
        (None, None) => RsaKey::default(),
        _ => return Err(ClientError::PartialRsaKey),
    };
    Ok(EngineConfig {
        keepalive_idle_ticks: config.network.keepalive_idle_ticks,
        handshake_timeout: Duration::from_millis(config.network.handshake_timeout_ms),
        handshake: HandshakeConfig {
            revision: protocol.revision,
            client_uid: protocol.client_uid,
            rsa,
        },
        ..EngineConfig::default()
    })
}

/// Resolves the configured server to its first address.
pub fn server_addr(config: &Config) -> Result<SocketAddr, ClientError> {
    let host = config.network.server_address.as_str();
    let port = config.network.server_port;
    (host, port)
        .to_socket_addrs()
        .map_err(|source| ClientError::Resolve {
            host: host.to_string(),
            source,
        })?
        .next()
        .ok_or_else(|| ClientError::NoAddress(host.to_string()))
}

/// Loads `descriptors.ron` from `config_dir`, or an empty table when absent.
pub fn load_descriptors(config_dir: &Path) -> Result<DescriptorTable, ClientError> {
    let path = config_dir.join(DESCRIPTOR_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "no descriptor table");
        return Ok(DescriptorTable::new());
    }
    Ok(DescriptorTable::load(&path)?)
}

/// Connects, logs in and runs ticks until the server disconnects.
pub fn run(
    config: &Config,
    password: &str,
    descriptors: DescriptorTable,
) -> Result<(), ClientError> {
    let addr = server_addr(config)?;
    let mut engine = ConnectionEngine::new(engine_config(config)?);
    let credentials = Credentials::new(config.login.username.clone(), password);
    let success = engine.connect(addr, &credentials)?;

    let mut ctx = SyncContext::new(descriptors);
    ctx.world.rights = success.rights;
    let dispatcher = dispatcher();
    let mut clock = TickClock::new(Duration::from_millis(config.network.tick_interval_ms));

    while engine.is_connected() {
        clock.poll(|tick| {
            let report = engine.tick(&dispatcher, &mut ctx);
            ctx.world.end_tick();
            for event in ctx.world.drain_events() {
                log_event(&event);
            }
            flush_outbound(&mut engine, tick);
            debug!(
                tick,
                frames = report.frames,
                dropped = report.dropped,
                failed = report.failed,
                "tick"
            );
        });
        std::thread::sleep(clock.until_next());
    }

    info!(ticks = clock.tick_count(), "session ended");
    Ok(())
}

/// Writes queued frames. Returns `None` without touching the engine once the
/// connection is gone.
fn flush_outbound<T: Transport>(engine: &mut ConnectionEngine<T>, tick: u64) -> Option<usize> {
    if !engine.is_connected() {
        return None;
    }
    match engine.flush() {
        Ok(written) => Some(written),
        Err(err) => {
            warn!(tick, error = %err, "flush failed");
            Some(0)
        }
    }
}

fn log_event(event: &WorldEvent) {
    match event {
        WorldEvent::RegionChanged { x, y } => info!(x, y, "region changed"),
        other => debug!(?other, "world event"),
    }
}
