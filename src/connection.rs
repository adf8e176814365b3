use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::{self, RequestCodec};
use crate::commands::Request;
use crate::reply::Reply;

/// A client connection. Bytes read from the socket are decoded into requests, replies are
/// encoded and flushed back.
pub struct Connection {
    pub id: Uuid,
    pub client_address: Option<SocketAddr>,
    framed: Framed<TcpStream, RequestCodec>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        Connection::with_codec(stream, RequestCodec::new())
    }

    pub fn with_codec(stream: TcpStream, codec: RequestCodec) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            client_address: stream.peer_addr().ok(),
            framed: Framed::new(stream, codec),
        }
    }

    /// Reads the next request. Returns `None` once the client closed the connection.
    pub async fn read_request(&mut self) -> Result<Option<Request>, codec::Error> {
        self.framed.next().await.transpose()
    }

    pub async fn write_reply(&mut self, reply: Reply) -> Result<(), codec::Error> {
        self.framed.send(reply).await
    }
}
