//! Connection Lifecycle Tests
//!
//! Framing over a raw socket, protocol violations, limits and shutdown.

use std::io::Write;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use vksc_server::protocol::{
    read_packet, MessageType, Packet, Request, Response, StoreContentRequest,
    DEFAULT_MAX_PAYLOAD_SIZE,
};
use vksc_server::{Client, VkscError};

use crate::common::TestServer;

fn store_request(name: &str, data: &[u8]) -> Request {
    Request::StoreContent(StoreContentRequest {
        name: name.to_string(),
        data: data.to_vec(),
    })
}

#[test]
fn test_pipelined_packets_in_one_write() {
    let server = TestServer::start();
    let mut stream = TcpStream::connect(server.addr).unwrap();

    let mut bytes = store_request("@a", b"1").to_packet().unwrap().encode();
    bytes.extend(store_request("@b", b"2").to_packet().unwrap().encode());
    stream.write_all(&bytes).unwrap();

    for _ in 0..2 {
        let packet = read_packet(&mut stream, DEFAULT_MAX_PAYLOAD_SIZE).unwrap();
        let response = Response::from_packet(&packet, MessageType::StoreContentResponse).unwrap();
        assert!(response.status());
    }
}

#[test]
fn test_packet_split_across_writes() {
    let server = TestServer::start();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_nodelay(true).unwrap();

    let bytes = store_request("@split", b"payload").to_packet().unwrap().encode();
    for chunk in bytes.chunks(3) {
        stream.write_all(chunk).unwrap();
        thread::sleep(Duration::from_millis(5));
    }

    let packet = read_packet(&mut stream, DEFAULT_MAX_PAYLOAD_SIZE).unwrap();
    let response = Response::from_packet(&packet, MessageType::StoreContentResponse).unwrap();
    assert!(response.status());
}

#[test]
fn test_unknown_tag_closes_only_that_connection() {
    let server = TestServer::start();
    let mut bad = Client::connect(&server.address()).unwrap();
    let mut good = Client::connect(&server.address()).unwrap();

    bad.send_packet(&Packet::new(77, b"junk".to_vec()).unwrap())
        .unwrap();
    let result = bad.store_content("@x", b"x");
    assert!(
        matches!(result, Err(VkscError::ConnectionLost)),
        "got {:?}",
        result
    );

    assert!(good.store_content("@y", b"y").unwrap());
    assert_eq!(good.get_content("@y", false).unwrap().data, b"y".to_vec());
}

#[test]
fn test_response_tag_sent_as_request_closes_connection() {
    let server = TestServer::start();
    let mut client = Client::connect(&server.address()).unwrap();

    let tag = MessageType::StoreContentResponse.tag();
    client.send_packet(&Packet::new(tag, vec![1]).unwrap()).unwrap();
    assert!(client.store_content("@x", b"x").is_err());
}

#[test]
fn test_idle_connection_is_closed() {
    let server = TestServer::start_with(|builder, _| builder.read_timeout_ms(100));
    let mut client = Client::connect(&server.address()).unwrap();

    assert!(client.store_content("@a", b"1").unwrap());
    thread::sleep(Duration::from_millis(500));

    assert!(matches!(
        client.store_content("@a", b"2"),
        Err(VkscError::ConnectionLost)
    ));
}

#[test]
fn test_connection_limit() {
    let server = TestServer::start_with(|builder, _| builder.max_connections(1));

    let mut first = Client::connect(&server.address()).unwrap();
    assert!(first.store_content("@a", b"1").unwrap());

    let mut refused = Client::connect(&server.address()).unwrap();
    assert!(matches!(
        refused.store_content("@b", b"2"),
        Err(VkscError::ConnectionLost)
    ));

    // The slot frees up once the first client leaves
    drop(first);
    let mut admitted = false;
    for _ in 0..50 {
        thread::sleep(Duration::from_millis(20));
        let mut next = Client::connect(&server.address()).unwrap();
        if let Ok(true) = next.store_content("@c", b"3") {
            admitted = true;
            break;
        }
    }
    assert!(admitted);
}

#[test]
fn test_shutdown_closes_clients() {
    let server = TestServer::start();
    let address = server.address();
    let mut client = Client::connect(&address).unwrap();
    assert!(client.store_content("@a", b"1").unwrap());

    server.stop().unwrap();

    assert!(client.store_content("@a", b"2").is_err());
    assert!(Client::connect(&address).is_err());
}

#[test]
fn test_oversized_entry_is_refused_and_kept() {
    let server = TestServer::start_with(|builder, _| builder.max_content_size(64));
    let mut client = Client::connect(&server.address()).unwrap();

    client.append("@big", &[1; 40], false).unwrap();
    client.append("@big", &[2; 40], false).unwrap();
    let response = client.get_content("@big", true).unwrap();
    assert!(response.status);
    assert_eq!(response.data, vec![1; 40]);

    // A file dropped in by another process can exceed the limit
    let path = server.dir.path().join("content").join("external.bin");
    std::fs::write(&path, [9u8; 100]).unwrap();

    let response = client.get_content("external.bin", true).unwrap();
    assert!(!response.status);
    assert!(response.data.is_empty());
    assert!(path.exists());

    // The connection keeps serving requests
    assert!(client.store_content("@after", b"ok").unwrap());
}

#[test]
fn test_client_timeout_on_silent_server() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let mut client = Client::connect(&address).unwrap();
    let _accepted = listener.accept().unwrap();

    client
        .set_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    assert!(client.store_content("@x", b"x").is_err());
}
