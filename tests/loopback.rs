//! End-to-end transfers over real loopback UDP sockets.
//!
//! A minimal TFTP responder runs on a background thread. Like a real server
//! it answers every request from a fresh port, so these tests also cover the
//! client binding to the server's transfer ID.

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tftpc::tftp::client::{Client, ClientConfig, TransferError};
use tftpc::tftp::core::{BLOCK_SIZE, ErrorCode, Packet};

const SERVER_TIMEOUT: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Responder
// ---------------------------------------------------------------------------

/// Start a responder serving `files`; uploads are reported on the returned channel.
fn spawn_server(files: HashMap<String, Vec<u8>>) -> (SocketAddr, mpsc::Receiver<(String, Vec<u8>)>) {
    let listener = UdpSocket::bind("127.0.0.1:0").expect("bind listener");
    let addr = listener.local_addr().unwrap();
    let (uploads, received) = mpsc::channel();

    thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            let Ok((len, client)) = listener.recv_from(&mut buf) else {
                return;
            };
            let transfer = UdpSocket::bind("127.0.0.1:0").expect("bind transfer socket");
            transfer.set_read_timeout(Some(SERVER_TIMEOUT)).unwrap();

            match Packet::deserialize(&buf[..len]) {
                Ok(Packet::Rrq { filename, .. }) => match files.get(&filename) {
                    Some(content) => serve_read(&transfer, client, content),
                    None => send(&transfer, client, Packet::error(ErrorCode::FileNotFound)),
                },
                Ok(Packet::Wrq { filename, .. }) => {
                    if let Some(content) = serve_write(&transfer, client) {
                        let _ = uploads.send((filename, content));
                    }
                }
                _ => send(&transfer, client, Packet::error(ErrorCode::IllegalOperation)),
            }
        }
    });

    (addr, received)
}

fn send(socket: &UdpSocket, to: SocketAddr, packet: Packet) {
    socket.send_to(&packet.serialize().unwrap(), to).unwrap();
}

fn recv(socket: &UdpSocket) -> Option<Packet> {
    let mut buf = [0u8; 1024];
    let (len, _) = socket.recv_from(&mut buf).ok()?;
    Packet::deserialize(&buf[..len]).ok()
}

fn serve_read(socket: &UdpSocket, client: SocketAddr, content: &[u8]) {
    let mut chunks: Vec<&[u8]> = content.chunks(BLOCK_SIZE).collect();
    if content.len() % BLOCK_SIZE == 0 {
        chunks.push(&[]);
    }

    for (index, chunk) in chunks.into_iter().enumerate() {
        let block_num = (index + 1) as u16;
        let data = Packet::Data {
            block_num,
            data: chunk.to_vec(),
        };
        let acked = (0..5).any(|_| {
            send(socket, client, data.clone());
            matches!(recv(socket), Some(Packet::Ack(n)) if n == block_num)
        });
        if !acked {
            return;
        }
    }
}

fn serve_write(socket: &UdpSocket, client: SocketAddr) -> Option<Vec<u8>> {
    let mut received = Vec::new();
    let mut last_ack = 0u16;
    send(socket, client, Packet::Ack(0));

    let mut silent = 0;
    while silent < 5 {
        match recv(socket) {
            Some(Packet::Data { block_num, data }) if block_num == last_ack.wrapping_add(1) => {
                silent = 0;
                received.extend_from_slice(&data);
                last_ack = block_num;
                send(socket, client, Packet::Ack(last_ack));
                if data.len() < BLOCK_SIZE {
                    return Some(received);
                }
            }
            Some(_) => send(socket, client, Packet::Ack(last_ack)),
            None => {
                silent += 1;
                send(socket, client, Packet::Ack(last_ack));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}

fn client_for(server: SocketAddr) -> Client {
    Client::new(
        ClientConfig::new(server.ip(), server.port())
            .with_timeout(Duration::from_millis(500))
            .with_retries(5),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn get_writes_remote_file_locally() {
    for len in [0, 1300, 2 * BLOCK_SIZE] {
        let file = content(len);
        let (server, _) = spawn_server(HashMap::from([("remote.bin".to_string(), file.clone())]));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.bin");

        let stats = client_for(server).get("remote.bin", &local).unwrap();

        assert_eq!(std::fs::read(&local).unwrap(), file, "length {len}");
        assert_eq!(stats.bytes, len as u64);
        assert_eq!(stats.blocks, (len / BLOCK_SIZE + 1) as u64);
    }
}

#[test]
fn put_uploads_local_file() {
    let file = content(1700);
    let (server, uploads) = spawn_server(HashMap::new());
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("upload.bin");
    std::fs::write(&local, &file).unwrap();

    let stats = client_for(server).put(&local, "stored.bin").unwrap();

    let (name, received) = uploads
        .recv_timeout(Duration::from_secs(5))
        .expect("server should report the upload");
    assert_eq!(name, "stored.bin");
    assert_eq!(received, file);
    assert_eq!(stats.blocks, 4);
}

#[test]
fn get_of_missing_file_reports_server_error() {
    let (server, _) = spawn_server(HashMap::new());
    let dir = tempfile::tempdir().unwrap();

    let err = client_for(server)
        .get("absent.txt", &dir.path().join("absent.txt"))
        .unwrap_err();

    match err {
        TransferError::Remote(remote) => {
            assert_eq!(remote.code, 1);
            assert_eq!(remote.to_string(), "1: File not found.");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn silent_server_times_out() {
    // Bound but never read: requests vanish
    let black_hole = UdpSocket::bind("127.0.0.1:0").unwrap();
    let server = black_hole.local_addr().unwrap();
    let client = Client::new(
        ClientConfig::new(server.ip(), server.port())
            .with_timeout(Duration::from_millis(50))
            .with_retries(2),
    );
    let dir = tempfile::tempdir().unwrap();

    let err = client
        .get("anything", &dir.path().join("anything"))
        .unwrap_err();

    assert!(matches!(
        err,
        TransferError::NetworkTimeout { peer, attempts: 2 } if peer == server
    ));
}
