use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use crate::codec::RequestCodec;
use crate::commands::Mux;
use crate::config::Config;
use crate::connection::Connection;
use crate::reply::Reply;
use crate::store::Store;
use crate::Error;

/// Installs the global tracing subscriber. Calling it more than once is harmless.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("Invalid log filter {:?}, falling back to info: {}", filter, e);
        EnvFilter::new("info")
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));
}

pub async fn run(config: Config) -> Result<(), Error> {
    init_tracing(&config.log_level);

    let listener = TcpListener::bind(config.address()).await?;
    let store = Store::new();
    let mux = Arc::new(Mux::with_list_commands(Arc::new(store)));

    info!("listdis listening on {}", listener.local_addr()?);

    tokio::select! {
        res = serve(listener, mux, config.max_line_length) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

/// Accepts connections forever, handling each one on its own task. Only returns if accepting
/// fails.
pub async fn serve(
    listener: TcpListener,
    mux: Arc<Mux>,
    max_line_length: usize,
) -> Result<(), Error> {
    loop {
        let (socket, client_address) = listener.accept().await?;
        let mux = mux.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, mux, max_line_length).await {
                error!("Connection error: {}", e);
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, mux, max_line_length),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    mux: Arc<Mux>,
    max_line_length: usize,
) -> Result<(), Error> {
    let codec = RequestCodec::with_max_line_length(max_line_length);
    let mut conn = Connection::with_codec(stream, codec);

    let client_address = conn
        .client_address
        .map(|addr| addr.to_string())
        .unwrap_or_default();
    tracing::Span::current()
        .record("connection_id", conn.id.to_string().as_str())
        .record("client_address", client_address.as_str());

    loop {
        let request = match conn.read_request().await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(err) => {
                // The stream can't be re-synchronized after a framing error, tell the client why
                // and hang up.
                warn!("Closing connection after transport error: {}", err);
                if let Some(reply) = err.to_reply() {
                    conn.write_reply(reply).await?;
                }
                return Ok(());
            }
        };

        debug!("Received request from client: {}", request);
        let reply = match mux.dispatch(&request) {
            Ok(reply) => reply,
            Err(err) => {
                debug!("Command failed: {}", err);
                Reply::from(err)
            }
        };
        debug!("Sending reply to client: {:?}", reply);

        conn.write_reply(reply).await?;
    }

    info!("Connection closed");
    Ok(())
}
