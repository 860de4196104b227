//! Unit tests for the connection engine.

use std::cell::RefCell;
use std::rc::Rc;

use runewire_codec::{DECODER_SEED_OFFSET, Isaac};

use super::*;
use crate::handshake::session_seed;
use crate::transport::MemoryTransport;

const SERVER_SEED: u64 = 0x0000_0001_0000_0002;
const CLIENT_SEED: [u32; 2] = [0xDEAD_BEEF, 0x0BAD_CAFE];

#[derive(Debug, Default)]
struct Recorder {
    frames: Vec<(u8, Vec<u8>)>,
}

fn record(frame: &mut Frame, recorder: &mut Recorder) -> Result<(), String> {
    recorder
        .frames
        .push((frame.opcode, frame.payload.as_bytes().to_vec()));
    Ok(())
}

fn reject(_: &mut Frame, _: &mut Recorder) -> Result<(), String> {
    Err("bad payload".into())
}

fn dispatcher() -> Dispatcher<Recorder, String> {
    Dispatcher::new()
        .with(server::RUN_ENERGY, record)
        .with(server::SYSTEM_MESSAGE, record)
        .with(server::ACTIVE_TAB, reject)
}

fn login_reply(rights: u8) -> Vec<u8> {
    let mut reply = SERVER_SEED.to_be_bytes().to_vec();
    reply.extend_from_slice(&[0, 2, rights, 0]);
    reply
}

/// Ciphers as the server holds them: it encodes with the +50 seed and
/// decodes client traffic with the plain seed.
fn server_ciphers() -> (Isaac, Isaac) {
    let seed = session_seed(CLIENT_SEED, SERVER_SEED);
    let encoder = Isaac::new(seed.map(|w| w.wrapping_add(DECODER_SEED_OFFSET)));
    let decoder = Isaac::new(seed);
    (encoder, decoder)
}

fn connected_engine() -> ConnectionEngine<MemoryTransport> {
    let mut engine = ConnectionEngine::new(EngineConfig::default());
    let transport = MemoryTransport::with_inbound(&login_reply(0));
    let credentials = Credentials::new("tester", "secret");
    engine.login(transport, &credentials, CLIENT_SEED).unwrap();
    engine.transport_mut().unwrap().take_written();
    engine
}

fn server_frame(encoder: &mut Isaac, opcode: u8, body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![encoder.encode_opcode(opcode)];
    match crate::protocol::frame_size(opcode) {
        crate::protocol::FrameSize::VariableByte => bytes.push(body.len() as u8),
        crate::protocol::FrameSize::VariableShort => {
            bytes.extend_from_slice(&(body.len() as u16).to_be_bytes())
        }
        crate::protocol::FrameSize::Fixed(_) => {}
    }
    bytes.extend_from_slice(body);
    bytes
}

fn disconnect_log(
    engine: &mut ConnectionEngine<MemoryTransport>,
) -> Rc<RefCell<Vec<DisconnectReason>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    engine.on_disconnect(move |reason| sink.borrow_mut().push(reason));
    log
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[test]
fn test_engine_starts_disconnected() {
    let engine: ConnectionEngine<MemoryTransport> = ConnectionEngine::new(EngineConfig::default());
    assert_eq!(engine.state(), ConnectionState::Disconnected);
    assert!(engine.transport().is_none());
}

#[test]
fn test_login_success_connects_and_enables_polling() {
    let mut engine = ConnectionEngine::new(EngineConfig::default());
    let transport = MemoryTransport::with_inbound(&login_reply(2));
    let credentials = Credentials::new("tester", "secret");
    let success = engine.login(transport, &credentials, CLIENT_SEED).unwrap();

    assert_eq!(success.rights, 2);
    assert_eq!(engine.rights(), 2);
    assert_eq!(engine.state(), ConnectionState::Connected);
    assert!(engine.transport().unwrap().is_polling());
}

#[test]
fn test_login_failure_leaves_engine_disconnected() {
    let mut engine = ConnectionEngine::new(EngineConfig::default());
    let mut reply = SERVER_SEED.to_be_bytes().to_vec();
    reply.extend_from_slice(&[0, 3]);
    let result = engine.login(
        MemoryTransport::with_inbound(&reply),
        &Credentials::new("tester", "wrong"),
        CLIENT_SEED,
    );

    assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    assert_eq!(engine.state(), ConnectionState::Disconnected);
    assert!(engine.transport().is_none());
}

// ---------------------------------------------------------------------------
// Decode and dispatch
// ---------------------------------------------------------------------------

#[test]
fn test_tick_dispatches_enciphered_frames() {
    let mut engine = connected_engine();
    let (mut encoder, _) = server_ciphers();
    let mut wire = server_frame(&mut encoder, server::RUN_ENERGY, &[87]);
    wire.extend(server_frame(
        &mut encoder,
        server::SYSTEM_MESSAGE,
        b"Welcome\n",
    ));
    engine.transport_mut().unwrap().push_inbound(&wire);

    let mut recorder = Recorder::default();
    let report = engine.tick(&dispatcher(), &mut recorder);

    assert_eq!(report.frames, 2);
    assert_eq!(report.dropped, 0);
    assert_eq!(
        recorder.frames,
        vec![
            (server::RUN_ENERGY, vec![87]),
            (server::SYSTEM_MESSAGE, b"Welcome\n".to_vec()),
        ]
    );
}

#[test]
fn test_partial_frame_completes_on_a_later_tick() {
    let mut engine = connected_engine();
    let (mut encoder, _) = server_ciphers();
    let wire = server_frame(&mut encoder, server::SYSTEM_MESSAGE, b"split message\n");
    let dispatcher = dispatcher();
    let mut recorder = Recorder::default();

    for byte in &wire[..wire.len() - 1] {
        engine.transport_mut().unwrap().push_inbound(&[*byte]);
        assert_eq!(engine.tick(&dispatcher, &mut recorder).frames, 0);
    }
    assert_eq!(
        engine.decoder().pending_opcode(),
        Some(server::SYSTEM_MESSAGE)
    );

    engine
        .transport_mut()
        .unwrap()
        .push_inbound(&wire[wire.len() - 1..]);
    assert_eq!(engine.tick(&dispatcher, &mut recorder).frames, 1);
    assert_eq!(recorder.frames[0].1, b"split message\n".to_vec());
}

#[test]
fn test_unregistered_opcode_is_dropped_silently() {
    let mut engine = connected_engine();
    let (mut encoder, _) = server_ciphers();
    let mut wire = server_frame(&mut encoder, server::SKILL, &[1, 0, 0, 0, 50, 10]);
    wire.extend(server_frame(&mut encoder, server::RUN_ENERGY, &[3]));
    engine.transport_mut().unwrap().push_inbound(&wire);

    let mut recorder = Recorder::default();
    let report = engine.tick(&dispatcher(), &mut recorder);
    assert_eq!(report.frames, 2);
    assert_eq!(report.dropped, 1);
    assert_eq!(recorder.frames, vec![(server::RUN_ENERGY, vec![3])]);
    assert!(engine.is_connected());
}

#[test]
fn test_handler_error_keeps_connection() {
    let mut engine = connected_engine();
    let (mut encoder, _) = server_ciphers();
    let mut wire = server_frame(&mut encoder, server::ACTIVE_TAB, &[1]);
    wire.extend(server_frame(&mut encoder, server::RUN_ENERGY, &[4]));
    engine.transport_mut().unwrap().push_inbound(&wire);

    let mut recorder = Recorder::default();
    let report = engine.tick(&dispatcher(), &mut recorder);
    assert_eq!(report.failed, 1);
    assert_eq!(recorder.frames.len(), 1);
    assert!(engine.is_connected());
}

#[test]
fn test_logout_opcode_disconnects() {
    let mut engine = connected_engine();
    let log = disconnect_log(&mut engine);
    let (mut encoder, _) = server_ciphers();
    let wire = server_frame(&mut encoder, server::LOGOUT, &[]);
    engine.transport_mut().unwrap().push_inbound(&wire);

    engine.tick(&dispatcher(), &mut Recorder::default());
    assert_eq!(engine.state(), ConnectionState::Disconnected);
    assert_eq!(*log.borrow(), vec![DisconnectReason::Logout]);
}

#[test]
fn test_transport_error_is_a_hard_disconnect() {
    let mut engine = connected_engine();
    let log = disconnect_log(&mut engine);
    engine.queue(outbound::keepalive());
    engine.transport_mut().unwrap().close();

    let report = engine.tick(&dispatcher(), &mut Recorder::default());
    assert_eq!(report.frames, 0);
    assert_eq!(engine.state(), ConnectionState::Disconnected);
    assert_eq!(engine.queued(), 0);
    assert_eq!(engine.decoder().pending_opcode(), None);
    assert_eq!(
        *log.borrow(),
        vec![DisconnectReason::Io(io::ErrorKind::ConnectionAborted)]
    );
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[test]
fn test_flush_writes_queue_in_order_with_cipher() {
    let mut engine = connected_engine();
    engine.queue(outbound::command("home").unwrap());
    engine.queue(outbound::keepalive());
    assert_eq!(engine.queued(), 2);

    assert_eq!(engine.flush().unwrap(), 2);
    assert_eq!(engine.queued(), 0);

    let transport = engine.transport_mut().unwrap();
    let written = transport.take_written();
    let (_, mut server_decoder) = server_ciphers();
    assert_eq!(
        server_decoder.decode_opcode(written[0]),
        crate::protocol::client::COMMAND
    );
    assert_eq!(&written[1..7], &[5, b'h', b'o', b'm', b'e', 10]);
    assert_eq!(
        server_decoder.decode_opcode(written[7]),
        crate::protocol::client::KEEPALIVE
    );
    assert_eq!(written.len(), 8);
    assert!(transport.flush_count() >= 1);
}

#[test]
fn test_keepalive_after_idle_ticks() {
    let mut engine = connected_engine();
    let dispatcher = dispatcher();
    let mut recorder = Recorder::default();

    for _ in 0..49 {
        engine.tick(&dispatcher, &mut recorder);
    }
    assert_eq!(engine.queued(), 0);
    engine.tick(&dispatcher, &mut recorder);
    assert_eq!(engine.queued(), 1);

    engine.flush().unwrap();
    let written = engine.transport_mut().unwrap().take_written();
    let (_, mut server_decoder) = server_ciphers();
    assert_eq!(written.len(), 1);
    assert_eq!(server_decoder.decode_opcode(written[0]), 0);
}

#[test]
fn test_inbound_frame_resets_idle_counter() {
    let mut engine = connected_engine();
    let dispatcher = dispatcher();
    let mut recorder = Recorder::default();
    let (mut encoder, _) = server_ciphers();

    for _ in 0..30 {
        engine.tick(&dispatcher, &mut recorder);
    }
    let wire = server_frame(&mut encoder, server::RUN_ENERGY, &[1]);
    engine.transport_mut().unwrap().push_inbound(&wire);
    engine.tick(&dispatcher, &mut recorder);
    for _ in 0..30 {
        engine.tick(&dispatcher, &mut recorder);
    }
    assert_eq!(engine.queued(), 0);
}

#[test]
fn test_flush_failure_disconnects() {
    let mut engine = connected_engine();
    let log = disconnect_log(&mut engine);
    engine.queue(outbound::keepalive());
    engine.transport_mut().unwrap().close();

    assert!(matches!(engine.flush(), Err(NetError::Io(_))));
    assert_eq!(engine.state(), ConnectionState::Disconnected);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_disconnect_clears_state_and_fires_once() {
    let mut engine = connected_engine();
    let log = disconnect_log(&mut engine);
    engine.queue(outbound::keepalive());

    engine.disconnect();
    engine.disconnect();

    assert_eq!(engine.state(), ConnectionState::Disconnected);
    assert_eq!(engine.queued(), 0);
    assert!(engine.transport().is_none());
    assert_eq!(*log.borrow(), vec![DisconnectReason::Requested]);
    assert!(matches!(engine.flush(), Err(NetError::NotConnected)));

    engine.queue(outbound::keepalive());
    assert_eq!(engine.queued(), 0);
}

// ---------------------------------------------------------------------------
// Real socket
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_connect_over_loopback_tcp() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 2];
        stream.read_exact(&mut request).await.unwrap();
        assert_eq!(request[0], 14);

        let mut challenge = SERVER_SEED.to_be_bytes().to_vec();
        challenge.push(0);
        stream.write_all(&challenge).await.unwrap();

        let mut header = [0u8; 2];
        stream.read_exact(&mut header).await.unwrap();
        assert_eq!(header[0], 16);
        let mut block = vec![0u8; usize::from(header[1])];
        stream.read_exact(&mut block).await.unwrap();

        // Recover the client's random seed words from the RSA block.
        let rsa_len = usize::from(block[40]);
        let plain = crate::rsa::tests::decrypt(&block[41..41 + rsa_len]);
        let mut seed = [0u32; 4];
        for (i, word) in seed.iter_mut().enumerate() {
            let at = 1 + i * 4;
            *word = u32::from_be_bytes([plain[at], plain[at + 1], plain[at + 2], plain[at + 3]]);
        }

        stream.write_all(&[2, 1, 0]).await.unwrap();
        let mut encoder = Isaac::new(seed.map(|w| w.wrapping_add(DECODER_SEED_OFFSET)));
        let frame = [encoder.encode_opcode(server::RUN_ENERGY), 99];
        stream.write_all(&frame).await.unwrap();

        let mut decoder = Isaac::new(seed);
        let mut reply = [0u8; 1];
        stream.read_exact(&mut reply).await.unwrap();
        decoder.decode_opcode(reply[0])
    });

    let received = tokio::task::spawn_blocking(move || {
        let mut engine = ConnectionEngine::new(EngineConfig::default());
        let success = engine
            .connect(addr, &Credentials::new("tester", "secret"))
            .unwrap();
        assert_eq!(success.rights, 1);

        let dispatcher = dispatcher();
        let mut recorder = Recorder::default();
        for _ in 0..200 {
            engine.tick(&dispatcher, &mut recorder);
            if !recorder.frames.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        engine.queue(outbound::keepalive());
        engine.flush().unwrap();
        recorder.frames
    })
    .await
    .unwrap();

    assert_eq!(received, vec![(server::RUN_ENERGY, vec![99])]);
    assert_eq!(server.await.unwrap(), crate::protocol::client::KEEPALIVE);
}
