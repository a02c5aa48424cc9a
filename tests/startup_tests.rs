//! Tests that drive a real listener instead of calling the router directly.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tweetbook::{ServerConfig, db::Database, jwt::JwtConfig, start_server};

async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_server_uses_peer_address_for_rate_limiting() {
    let db = Database::open(":memory:").await.unwrap();
    let config = ServerConfig {
        db,
        jwt: JwtConfig::new(b"startup-test-secret-0123456789abcd", Duration::from_secs(300))
            .unwrap(),
        min_password_length: 6,
        rate_limit: true,
        trust_proxy: false,
    };

    let (handle, addr) = start_server(config, 0).await.unwrap();

    let body = r#"{"email":"nobody@example.com","password":"Secr3t!"}"#;
    let request = format!(
        "POST /api/v1/identity/login HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );

    // The peer address is known, so the request reaches the handler
    let response = raw_request(addr, &request).await;
    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
    assert!(response.contains("User does not exist"), "{response}");

    let response = raw_request(addr, "GET /api/v1/tags HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 401"), "{response}");
    assert!(response.to_ascii_lowercase().contains("www-authenticate: bearer"), "{response}");

    handle.abort();
}
