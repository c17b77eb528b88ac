//! # Partitioned Transport
//!
//! Responses larger than the configured byte limit are sliced into numbered
//! partitions. Each partition carries an opcode built from the response
//! opcode with its terminator stripped, followed by the partition index and
//! the partition total, then a fresh terminator:
//!
//! ```text
//! payload (25 bytes), limit 10, opcode "X#"
//!
//! X13#<bytes 0..10>
//! X23#?<bytes 10..20>
//! X33#?<bytes 20..25>
//! ```
//!
//! Partitions after the first carry a leading `?` before their chunk. An
//! empty payload still produces exactly one partition so the client always
//! observes a terminating frame.
//!
//! Index and total are concatenated without a separator, so a reader can
//! only split them unambiguously by knowing which index comes next. The
//! [`Reassembler`] does exactly that, relying on the in-order guarantee of
//! the transport.

use crate::codec::{FIELD_SEPARATOR, TERMINATOR};
use crate::error::{ProtocolError, TransportError};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Frame delimiter appended to every outgoing frame.
const FRAME_DELIMITER: u8 = b'\n';

/// Number of partitions needed for `len` bytes at `limit` bytes each.
///
/// Always at least one.
pub fn partition_count(len: usize, limit: usize) -> usize {
    if len == 0 {
        1
    } else {
        len.div_ceil(limit)
    }
}

/// Strips terminators from an opcode, giving the base used for partition
/// opcodes.
pub fn base_opcode(opcode: &str) -> &str {
    opcode.trim_end_matches(TERMINATOR)
}

/// One slice of a partitioned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<'a> {
    /// One-based partition index
    pub index: usize,
    /// Total number of partitions in this response
    pub total: usize,
    /// Opcode of this partition, e.g. `BR23#`
    pub opcode: String,
    /// Raw payload bytes carried by this partition
    pub chunk: &'a [u8],
}

impl Partition<'_> {
    /// Encodes the partition as a newline-terminated frame.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.opcode.len() + self.chunk.len() + 2);
        frame.extend_from_slice(self.opcode.as_bytes());
        if self.index > 1 {
            frame.push(FIELD_SEPARATOR as u8);
        }
        frame.extend_from_slice(self.chunk);
        frame.push(FRAME_DELIMITER);
        frame
    }
}

/// Slices `payload` into partitions of at most `limit` bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidLimit`] if `limit` is zero.
pub fn partitions<'a>(
    opcode: &str,
    payload: &'a [u8],
    limit: usize,
) -> Result<Vec<Partition<'a>>, ProtocolError> {
    if limit == 0 {
        return Err(ProtocolError::InvalidLimit);
    }

    let base = base_opcode(opcode);
    let total = partition_count(payload.len(), limit);

    Ok((1..=total)
        .map(|index| {
            let start = (index - 1) * limit;
            let end = (index * limit).min(payload.len());
            Partition {
                index,
                total,
                opcode: format!("{base}{index}{total}{TERMINATOR}"),
                chunk: &payload[start..end],
            }
        })
        .collect())
}

/// Writes `payload` to `writer` as consecutive partitions.
///
/// The caller must hold exclusive access to the writer for the whole call so
/// partitions of different responses never interleave.
///
/// # Returns
///
/// The number of partitions written.
pub async fn send_partitioned<W>(
    writer: &mut W,
    opcode: &str,
    service_tag: &str,
    payload: &[u8],
    limit: usize,
) -> Result<usize, TransportError>
where
    W: AsyncWrite + Unpin,
{
    let parts = partitions(opcode, payload, limit)?;
    for partition in &parts {
        writer.write_all(&partition.to_frame()).await?;
    }
    writer.flush().await?;

    debug!(
        "📦 ({}) sent {} bytes in {} partition(s) of at most {} bytes",
        service_tag,
        payload.len(),
        parts.len(),
        limit
    );
    Ok(parts.len())
}

/// Writes a single newline-terminated frame.
pub async fn send_frame<W>(writer: &mut W, frame: &str) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame.as_bytes()).await?;
    writer.write_all(&[FRAME_DELIMITER]).await?;
    writer.flush().await?;
    Ok(())
}

/// Progress of a [`Reassembler`] after accepting a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyStatus {
    /// More partitions are expected
    Incomplete { received: usize, total: usize },
    /// The final partition arrived; holds the reconstructed payload
    Complete(Vec<u8>),
}

/// Client-side reconstruction of one partitioned response.
///
/// Feed it the frames carrying the expected base opcode, in the order they
/// arrive. Index/total suffixes are decoded using the next expected index.
#[derive(Debug, Clone)]
pub struct Reassembler {
    base: String,
    next_index: usize,
    buffer: Vec<u8>,
}

impl Reassembler {
    /// Creates a reassembler for responses to `opcode`.
    pub fn new(opcode: &str) -> Self {
        Self {
            base: base_opcode(opcode).to_string(),
            next_index: 1,
            buffer: Vec::new(),
        }
    }

    /// Accepts one frame (with or without its trailing newline).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnexpectedPartition`] if the frame does not
    /// carry the base opcode or the expected next index.
    pub fn push(&mut self, frame: &[u8]) -> Result<ReassemblyStatus, ProtocolError> {
        let frame = frame.strip_suffix(&[FRAME_DELIMITER]).unwrap_or(frame);
        let unexpected = || ProtocolError::UnexpectedPartition {
            expected: self.next_index,
            found: String::from_utf8_lossy(frame).chars().take(32).collect(),
        };

        let rest = frame
            .strip_prefix(self.base.as_bytes())
            .ok_or_else(unexpected)?;
        let terminator = rest
            .iter()
            .position(|&b| b == TERMINATOR as u8)
            .ok_or_else(unexpected)?;
        let (digits, body) = (&rest[..terminator], &rest[terminator + 1..]);

        let index_digits = self.next_index.to_string();
        let total_digits = digits
            .strip_prefix(index_digits.as_bytes())
            .filter(|total| !total.is_empty() && total.iter().all(u8::is_ascii_digit))
            .ok_or_else(unexpected)?;
        let total: usize = std::str::from_utf8(total_digits)
            .ok()
            .and_then(|t| t.parse().ok())
            .filter(|&t| t >= self.next_index)
            .ok_or_else(unexpected)?;

        let chunk = if self.next_index > 1 {
            body.strip_prefix(&[FIELD_SEPARATOR as u8]).unwrap_or(body)
        } else {
            body
        };
        self.buffer.extend_from_slice(chunk);

        if self.next_index == total {
            self.next_index = 1;
            Ok(ReassemblyStatus::Complete(std::mem::take(&mut self.buffer)))
        } else {
            let received = self.next_index;
            self.next_index += 1;
            Ok(ReassemblyStatus::Incomplete { received, total })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(opcode: &str, frames: &[Vec<u8>]) -> Vec<u8> {
        let mut reassembler = Reassembler::new(opcode);
        let mut result = None;
        for frame in frames {
            if let ReassemblyStatus::Complete(payload) = reassembler.push(frame).unwrap() {
                result = Some(payload);
            }
        }
        result.expect("final partition never arrived")
    }

    #[test]
    fn test_twenty_five_bytes_at_limit_ten() {
        let payload = b"abcdefghijklmnopqrstuvwxy";
        let parts = partitions("X#", payload, 10).unwrap();

        let opcodes: Vec<&str> = parts.iter().map(|p| p.opcode.as_str()).collect();
        assert_eq!(opcodes, vec!["X13#", "X23#", "X33#"]);
        assert_eq!(parts[0].to_frame(), b"X13#abcdefghij\n".to_vec());
        assert_eq!(parts[1].to_frame(), b"X23#?klmnopqrst\n".to_vec());
        assert_eq!(parts[2].to_frame(), b"X33#?uvwxy\n".to_vec());
    }

    #[test]
    fn test_empty_payload_emits_one_partition() {
        let parts = partitions("BR#", b"", 1024).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].opcode, "BR11#");
        assert!(parts[0].chunk.is_empty());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        assert!(matches!(
            partitions("BR#", b"data", 0),
            Err(ProtocolError::InvalidLimit)
        ));
    }

    #[test]
    fn test_partition_count() {
        assert_eq!(partition_count(0, 10), 1);
        assert_eq!(partition_count(10, 10), 1);
        assert_eq!(partition_count(11, 10), 2);
        assert_eq!(partition_count(25, 10), 3);
        assert_eq!(partition_count(7, 1), 7);
    }

    #[test]
    fn test_concatenated_partitions_reproduce_payload() {
        let payload: Vec<u8> = (0..1000u32).map(|i| b'a' + (i % 26) as u8).collect();
        for limit in [1, 3, 7, 64, 999, 1000, 4096] {
            let parts = partitions("PR#", &payload, limit).unwrap();
            assert_eq!(parts.len(), partition_count(payload.len(), limit));

            let joined: Vec<u8> = parts.iter().flat_map(|p| p.chunk.to_vec()).collect();
            assert_eq!(joined, payload, "limit {limit}");
        }
    }

    #[test]
    fn test_reassembler_handles_ambiguous_suffixes() {
        // 12 partitions: "BR112#" could read as 11/2 or 1/12 without context.
        let payload: Vec<u8> = (0..120u8).collect();
        let frames: Vec<Vec<u8>> = partitions("BR#", &payload, 10)
            .unwrap()
            .iter()
            .map(Partition::to_frame)
            .collect();
        assert_eq!(reassemble("BR#", &frames), payload);
    }

    #[test]
    fn test_reassembler_handles_digits_in_base_opcode() {
        let payload = b"login secret payload".to_vec();
        let frames: Vec<Vec<u8>> = partitions("L0#", &payload, 6)
            .unwrap()
            .iter()
            .map(Partition::to_frame)
            .collect();
        assert_eq!(reassemble("L0#", &frames), payload);
    }

    #[test]
    fn test_reassembler_rejects_out_of_order_partition() {
        let parts = partitions("X#", b"abcdefghijklmnopqrstuvwxy", 10).unwrap();
        let mut reassembler = Reassembler::new("X#");
        assert!(reassembler.push(&parts[1].to_frame()).is_err());
    }

    #[tokio::test]
    async fn test_send_partitioned_writes_frames_in_order() {
        let mut wire: Vec<u8> = Vec::new();
        let written = send_partitioned(&mut wire, "X#", "TEST", b"abcdefghijklmnopqrstuvwxy", 10)
            .await
            .unwrap();

        assert_eq!(written, 3);
        assert_eq!(wire, b"X13#abcdefghij\nX23#?klmnopqrst\nX33#?uvwxy\n".to_vec());
    }

    #[tokio::test]
    async fn test_short_payload_goes_out_as_one_frame() {
        let payload = br#"@"{"level":3}"@"#;
        let mut wire: Vec<u8> = Vec::new();
        let written = send_partitioned(&mut wire, "PR#", "PROFILE", payload, 1024)
            .await
            .unwrap();

        assert_eq!(written, 1);
        let frames: Vec<Vec<u8>> = wire
            .split_inclusive(|&b| b == b'\n')
            .map(<[u8]>::to_vec)
            .collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with(b"PR11#@"));
        assert_eq!(reassemble("PR#", &frames), payload.to_vec());
    }

    #[tokio::test]
    async fn test_send_frame_appends_delimiter() {
        let mut wire: Vec<u8> = Vec::new();
        send_frame(&mut wire, "LF#?nope").await.unwrap();
        assert_eq!(wire, b"LF#?nope\n".to_vec());
    }
}
