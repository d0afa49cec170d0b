// TCP echo front-end

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use stage_scan::communication::echo_server::echo_reply;
use stage_scan::communication::EchoServer;

#[test]
fn test_reply_is_stripped_and_uppercased() {
    assert_eq!(echo_reply(b"  hello stage\r\n"), b"HELLO STAGE");
    assert_eq!(echo_reply(b"g1 x1.5"), b"G1 X1.5");
    assert!(echo_reply(b" \n").is_empty());
}

async fn exchange(stream: &mut TcpStream, message: &[u8]) -> Vec<u8> {
    stream.write_all(message).await.unwrap();
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).await.unwrap();
    buf[..n].to_vec()
}

#[tokio::test]
async fn test_clients_served_independently() {
    let server = EchoServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());

    let mut first = TcpStream::connect(addr).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();
    assert_eq!(exchange(&mut first, b"ping\n").await, b"PING");
    assert_eq!(exchange(&mut second, b"status?\r\n").await, b"STATUS?");
    assert_eq!(exchange(&mut first, b"again").await, b"AGAIN");

    // A disconnecting client leaves the others alone.
    drop(first);
    assert_eq!(exchange(&mut second, b"still here").await, b"STILL HERE");
}
