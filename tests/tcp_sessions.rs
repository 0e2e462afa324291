/// TCP Session Pool Integration Tests
///
/// Pool backed by the TCP dialer against loopback listeners

use sessionpool::config::Config;
use sessionpool::{DialConfig, DialMode, SessionPool, SessionPoolError, TcpDialer};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::Duration;

/// Echo server accepting connections until the test ends
fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            thread::spawn(move || {
                let mut buf = [0u8; 64];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 || stream.write_all(&buf[..n]).is_err() {
                        break;
                    }
                }
            });
        }
    });

    addr
}

fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

#[test]
fn pool_reuses_tcp_sessions() {
    let addr = spawn_echo_server();
    let pool = SessionPool::new(
        2,
        TcpDialer::new(DialConfig {
            addresses: vec![addr.to_string()],
            timeout: Duration::from_secs(2),
            ..Default::default()
        }),
    );

    let mut session = pool.get().unwrap();
    let local = session.stream().local_addr().unwrap();

    session.stream_mut().write_all(b"ping").unwrap();
    let mut buf = [0u8; 4];
    session.stream_mut().read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ping");

    pool.put(session);
    assert_eq!(pool.len(), 1);

    // Same socket comes back
    let reused = pool.get().unwrap();
    assert_eq!(reused.stream().local_addr().unwrap(), local);
    assert_eq!(reused.peer_addr(), addr);
    assert_eq!(pool.stats().hits, 1);

    pool.close(reused);
    assert_eq!(pool.len(), 0);
}

#[test]
fn empty_address_list_yields_no_session() {
    let pool = SessionPool::new(
        2,
        TcpDialer::new(DialConfig {
            mode: DialMode::Single,
            addresses: Vec::new(),
            ..Default::default()
        }),
    );

    assert!(matches!(pool.get(), Err(SessionPoolError::Config(_))));
    assert_eq!(pool.len(), 0);
}

#[test]
fn unreachable_endpoint_surfaces_dial_error() {
    let dead = dead_address();
    let pool = SessionPool::new(
        2,
        TcpDialer::new(DialConfig {
            addresses: vec![dead.clone()],
            timeout: Duration::from_millis(500),
            ..Default::default()
        }),
    );

    match pool.get() {
        Err(SessionPoolError::Dial { addr, .. }) => assert_eq!(addr, dead),
        other => panic!("expected dial error, got {:?}", other),
    }
}

#[test]
fn cluster_pool_from_config() {
    let addr = spawn_echo_server();

    let mut config = Config::default();
    config.endpoint.mode = DialMode::Cluster;
    config.endpoint.addresses = vec![dead_address(), addr.to_string()];
    config.endpoint.timeout_ms = 500;
    config.endpoint.username = "admin".to_string();
    config.endpoint.password = "secret".to_string();
    config.pool.capacity = 1;

    let pool = SessionPool::from_config(&config);
    assert_eq!(pool.capacity(), 1);

    let session = pool.get().unwrap();
    assert_eq!(session.peer_addr(), addr);
    assert_eq!(session.mode(), DialMode::Cluster);
    assert_eq!(session.username(), Some("admin"));

    pool.put(session);
    assert_eq!(pool.shutdown(), 1);
}
