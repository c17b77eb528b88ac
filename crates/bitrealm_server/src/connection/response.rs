//! Writing responses to a client.
//!
//! Chained packets go through the partitioned transport; everything else is
//! written as a single newline-terminated frame.

use bitrealm_protocol::{escape_ascii, send_frame, send_partitioned, Packet, TransportError};
use tokio::io::AsyncWrite;

/// The write side of one client connection.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
    partition_limit: usize,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W, partition_limit: usize) -> Self {
        Self {
            writer,
            partition_limit,
        }
    }

    /// Writes a packet, partitioned when it is chained.
    pub async fn send_packet(&mut self, packet: &Packet) -> Result<(), TransportError> {
        if packet.chained {
            let body = packet.encode_body()?;
            send_partitioned(
                &mut self.writer,
                &packet.opcode,
                &packet.service_tag,
                body.as_bytes(),
                self.partition_limit,
            )
            .await?;
        } else {
            send_frame(&mut self.writer, &packet.encode_frame()?).await?;
        }
        Ok(())
    }

    /// Writes plain text as one frame, escaped like every other outgoing text.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), TransportError> {
        send_frame(&mut self.writer, &escape_ascii(text)).await
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
