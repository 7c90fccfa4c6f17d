//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use peer_transfer::{Cache, MemoryCache, ServerSettings, TransferServer};

/// Loopback settings with short deadlines so failure paths finish quickly.
pub fn test_settings() -> ServerSettings {
    ServerSettings {
        host: "127.0.0.1".into(),
        accept_timeout: Duration::from_millis(50),
        command_timeout: Duration::from_millis(500),
        transfer_timeout: Duration::from_secs(10),
        ..ServerSettings::default()
    }
}

pub async fn start_server(cache: Arc<dyn Cache>, settings: ServerSettings) -> TransferServer {
    TransferServer::start(cache, settings)
        .await
        .expect("server should start")
}

/// A memory cache holding a couple of small items.
pub fn sample_cache() -> Arc<MemoryCache> {
    let cache = MemoryCache::new();
    cache.insert("hello.txt", b"hello, peer\n".to_vec());
    cache.insert("with space", b"spaced".to_vec());
    Arc::new(cache)
}

/// Send raw bytes and collect whatever the server writes before closing.
pub async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(request).await.expect("write request");
    read_until_closed(&mut stream).await
}

/// Read until EOF, failing the test if the server keeps the socket open.
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    match tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf)).await {
        Ok(_) => buf,
        Err(_) => panic!("server did not close the connection"),
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn eventually<F: FnMut() -> bool>(mut cond: F) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
