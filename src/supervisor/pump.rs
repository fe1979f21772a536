use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use crate::broadcast::BroadcastHandle;
use crate::metrics::RECORDS_TOTAL;
use crate::pipeline::decode_bytes;
use crate::pipeline::LineFramer;
use crate::pipeline::Record;

/// Per-instance counters returned when a stdout pump reaches EOF.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub states: u64,
    pub errors: u64,
    pub noise: u64,
}

/// Frames and decodes producer stdout, publishing every state and error record.
pub async fn pump_records<R>(
    reader: R,
    mut framer: LineFramer,
    broadcast: BroadcastHandle,
) -> PumpStats
where
    R: AsyncRead + Unpin,
{
    let mut stats = PumpStats::default();
    let mut chunks = ReaderStream::new(reader);

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("producer stdout read failed: {}", e);
                break;
            }
        };

        for line in framer.feed(&chunk) {
            let record = decode_bytes(&line);
            RECORDS_TOTAL.with_label_values(&[record.kind()]).inc();
            match &record {
                Record::Noise => {
                    stats.noise += 1;
                    continue;
                }
                Record::Error(message) => {
                    stats.errors += 1;
                    error!("producer reported error: {}", message);
                }
                Record::State(_) => {
                    stats.states += 1;
                    trace!("producer state record");
                }
            }
            if !broadcast.publish(record) {
                debug!("broadcaster stopped, dropping record");
            }
        }
    }

    let lost = framer.reset();
    if lost > 0 {
        debug!("producer closed stdout with {} unterminated bytes, dropping them", lost);
    }
    stats
}

/// Copies producer stderr to `writer` chunk by chunk, each preceded by `prefix`.
///
/// Returns the number of producer bytes forwarded.
pub async fn forward_diagnostics<R, W>(
    reader: R,
    mut writer: W,
    prefix: &str,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut forwarded = 0u64;
    let mut chunks = ReaderStream::new(reader);

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if !prefix.is_empty() {
            writer.write_all(prefix.as_bytes()).await?;
        }
        writer.write_all(&chunk).await?;
        writer.flush().await?;
        forwarded += chunk.len() as u64;
    }
    Ok(forwarded)
}
