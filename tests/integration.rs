use rand::seq::SliceRandom;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use listdis::commands::Mux;
use listdis::server::serve;
use listdis::store::{ListEngine, Store};

async fn start_server() -> (SocketAddr, Store) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = Store::new();
    let mux = Arc::new(Mux::with_list_commands(Arc::new(store.clone())));
    tokio::spawn(serve(listener, mux, 1024));

    (addr, store)
}

/// Sends `request` and asserts the server answers with exactly `expected`.
async fn exchange(stream: &mut TcpStream, request: &[u8], expected: &[u8]) {
    stream.write_all(request).await.unwrap();

    let mut buf = vec![0; expected.len()];
    stream.read_exact(&mut buf).await.unwrap();

    assert_eq!(
        String::from_utf8_lossy(&buf),
        String::from_utf8_lossy(expected),
        "request: {}",
        String::from_utf8_lossy(request)
    );
}

#[tokio::test]
async fn test_push_and_pop() {
    let (addr, _) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    exchange(&mut stream, b"LPUSH k a b\r\n", b":2\r\n").await;
    exchange(&mut stream, b"LPOP k\r\n", b"$1\r\nb\r\n").await;
    exchange(&mut stream, b"LPOP k\r\n", b"$1\r\na\r\n").await;
    exchange(&mut stream, b"LPOP k\r\n", b"$-1\r\n").await;

    exchange(&mut stream, b"RPUSH k a b\r\n", b":2\r\n").await;
    exchange(&mut stream, b"RPOP k\r\n", b"$1\r\nb\r\n").await;
    exchange(&mut stream, b"RPOP k\r\n", b"$1\r\na\r\n").await;
    exchange(&mut stream, b"RPOP k\r\n", b"$-1\r\n").await;
}

#[tokio::test]
async fn test_range() {
    let (addr, _) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    exchange(&mut stream, b"RPUSH k a b c d\r\n", b":4\r\n").await;
    exchange(
        &mut stream,
        b"LRANGE k 0 -1\r\n",
        b"*4\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n$1\r\nd\r\n",
    )
    .await;
    exchange(&mut stream, b"LRANGE k -2 -1\r\n", b"*2\r\n$1\r\nc\r\n$1\r\nd\r\n").await;
    exchange(&mut stream, b"LRANGE k 5 10\r\n", b"*0\r\n").await;
    exchange(&mut stream, b"LRANGE missing 0 -1\r\n", b"*0\r\n").await;
}

#[tokio::test]
async fn test_errors_keep_the_connection_open() {
    let (addr, store) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    exchange(&mut stream, b"FOO bar\r\n", b"-NOT_SUPPORTED FOO not supported\r\n").await;
    exchange(
        &mut stream,
        b"lpush k a\r\n",
        b"-NOT_SUPPORTED lpush not supported\r\n",
    )
    .await;
    exchange(
        &mut stream,
        b"LPUSH k\r\n",
        b"-PROTOCOL_ERROR protocol error; wrong number of arguments for 'LPUSH' command, got 1\r\n",
    )
    .await;
    exchange(
        &mut stream,
        b"LRANGE k x 1\r\n",
        b"-PROTOCOL_ERROR protocol error; value is not an integer for 'LRANGE' command: x\r\n",
    )
    .await;

    assert_eq!(store.lock().size(), 0);

    exchange(&mut stream, b"RPUSH k a\r\n", b":1\r\n").await;
}

#[tokio::test]
async fn test_quoted_and_empty_values() {
    let (addr, _) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    exchange(&mut stream, b"RPUSH k \"hello world\" \"\"\r\n", b":2\r\n").await;
    exchange(&mut stream, b"LPOP k\r\n", b"$11\r\nhello world\r\n").await;
    exchange(&mut stream, b"LPOP k\r\n", b"$0\r\n\r\n").await;
    exchange(&mut stream, b"LPOP k\r\n", b"$-1\r\n").await;
}

#[tokio::test]
async fn test_multibulk_requests() {
    let (addr, _) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    exchange(
        &mut stream,
        b"*3\r\n$5\r\nRPUSH\r\n$1\r\nk\r\n$1\r\nv\r\n",
        b":1\r\n",
    )
    .await;
    exchange(&mut stream, b"*2\r\n$4\r\nRPOP\r\n$1\r\nk\r\n", b"$1\r\nv\r\n").await;
}

#[tokio::test]
async fn test_framing_error_closes_the_connection() {
    let (addr, _) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    exchange(
        &mut stream,
        b"RPUSH k \"open\r\n",
        b"-PROTOCOL_ERROR protocol error; unbalanced quotes in request\r\n",
    )
    .await;

    let mut buf = [0; 16];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_last_request_without_newline() {
    let (addr, store) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"RPUSH k a").await.unwrap();
    stream.shutdown().await.unwrap();

    let mut reply = vec![];
    stream.read_to_end(&mut reply).await.unwrap();

    assert_eq!(reply, b":1\r\n");
    assert_eq!(store.llen("k"), 1);
}

#[tokio::test]
async fn test_oversized_multibulk_request() {
    let (addr, store) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // The server under test accepts requests of up to 1024 bytes.
    exchange(
        &mut stream,
        b"*1000\r\n$5\r\nRPUSH\r\n",
        b"-PROTOCOL_ERROR protocol error; request exceeds the maximum length of 1024 bytes\r\n",
    )
    .await;

    let mut buf = [0; 16];
    assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
    assert_eq!(store.lock().size(), 0);
}

#[tokio::test]
async fn test_concurrent_pushes() {
    let (addr, store) = start_server().await;
    let clients = 8;
    let pushes_per_client = 50;

    let mut tasks = vec![];
    for client in 0..clients {
        tasks.push(tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let mut commands: Vec<_> = (0..pushes_per_client)
                .map(|i| {
                    let command = if rand::thread_rng().gen_bool(0.5) {
                        "LPUSH"
                    } else {
                        "RPUSH"
                    };
                    format!("{} shared v{}-{}\r\n", command, client, i)
                })
                .collect();
            commands.shuffle(&mut rand::thread_rng());

            for command in commands {
                stream.write_all(command.as_bytes()).await.unwrap();
                // Replies are `:<len>\r\n`, read until the line ends.
                let mut reply = vec![];
                loop {
                    let byte = stream.read_u8().await.unwrap();
                    reply.push(byte);
                    if byte == b'\n' {
                        break;
                    }
                }
                assert_eq!(reply[0], b':');
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.llen("shared"), clients * pushes_per_client);
    assert_eq!(store.lrange("shared", 0, -1).len(), clients * pushes_per_client);
}
