//! The per-connection read loop.

use super::{ClientConnection, ResponseWriter};
use crate::context::ServerContext;
use crate::messaging::{Dispatcher, Reply};
use bitrealm_protocol::{decode, TransportError, STOP_SENTINEL};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Longest request line accepted, excluding the newline. A client that sends
/// more without a line break is disconnected.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Serves one accepted TCP connection until the client stops, disconnects
/// or the server shuts down.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: ServerContext,
    dispatcher: Arc<Dispatcher>,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), TransportError> {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
    }
    let (read_half, write_half) = stream.into_split();
    serve_connection(
        BufReader::new(read_half),
        write_half,
        addr,
        &ctx,
        &dispatcher,
        shutdown,
    )
    .await
}

/// Runs the request loop over any line reader and writer.
///
/// Requests are handled one at a time, and each reply is fully written
/// before the next line is read.
///
/// # Errors
///
/// Only I/O failures are returned. Decoding and handler failures are logged
/// (or answered with an error packet) and the loop continues.
pub async fn serve_connection<R, W>(
    mut reader: R,
    writer: W,
    addr: SocketAddr,
    ctx: &ServerContext,
    dispatcher: &Dispatcher,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("🔗 Client connected from {}", addr);
    let mut client = ClientConnection::new(addr);
    let mut responses = ResponseWriter::new(writer, ctx.config().partition_limit);
    let mut line = Vec::new();

    let result = loop {
        line.clear();
        let mut bounded = (&mut reader).take(MAX_LINE_BYTES as u64 + 1);
        let read = tokio::select! {
            read = bounded.read_until(b'\n', &mut line) => read,
            _ = shutdown.recv() => {
                debug!("Closing connection from {} for shutdown", addr);
                break Ok(());
            }
        };

        match read {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => {
                error!("❌ Read from {} failed: {}", addr, e);
                break Err(TransportError::Io(e));
            }
        }
        if line.len() > MAX_LINE_BYTES && line.last() != Some(&b'\n') {
            warn!(
                "⚠️ Closing connection from {}: line exceeds {} bytes",
                addr, MAX_LINE_BYTES
            );
            break Ok(());
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if text == STOP_SENTINEL {
            break Ok(());
        }

        let frame = match decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Dropping line from {}: {}", addr, e);
                continue;
            }
        };
        if frame.payload.trim() == STOP_SENTINEL {
            break Ok(());
        }

        client.note_request();
        let reply = dispatcher.dispatch(frame, ctx).await;
        if let Err(e) = write_reply(reply, &mut client, &mut responses, ctx).await {
            match e {
                TransportError::Io(_) => {
                    error!("❌ Write to {} failed: {}", addr, e);
                    break Err(e);
                }
                TransportError::Protocol(_) => warn!("⚠️ Could not encode reply for {}: {}", addr, e),
            }
        }
    };

    if ctx.config().evict_on_disconnect {
        let evicted: usize = client
            .accounts()
            .map(|account_id| ctx.deliveries().evict_account(account_id))
            .sum();
        if evicted > 0 {
            debug!("🧹 Evicted {} cached response(s) of {}", evicted, addr);
        }
    }

    info!(
        "👋 Client {} disconnected after {} request(s)",
        addr,
        client.request_count()
    );
    result
}

async fn write_reply<W>(
    reply: Reply,
    client: &mut ClientConnection,
    responses: &mut ResponseWriter<W>,
    ctx: &ServerContext,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    match reply {
        Reply::Deliver { account_id, packet } => {
            ctx.deliveries().record(account_id, packet.clone());
            client.note_delivery(account_id);
            responses.send_packet(&packet).await
        }
        Reply::Transient(packet) => responses.send_packet(&packet).await,
        Reply::Raw(text) => responses.send_raw(&text).await,
        Reply::Nothing => Ok(()),
    }
}
