use crate::{ControlMessage, ProtocolError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_LINE_BYTES: usize = if cfg!(test) { 1024 } else { 1024 * 1024 };

/// Read one `\n`-terminated line of at most `max_bytes` (terminator excluded).
///
/// Returns `Ok(None)` on a clean EOF. A trailing `\r` is dropped.
pub async fn read_line_limited<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> Result<Option<Vec<u8>>> {
    let mut out = Vec::new();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let n = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut out)
        .await?;
    if n == 0 {
        return Ok(None);
    }

    if out.last() == Some(&b'\n') {
        out.pop();
    } else if out.len() > max_bytes {
        return Err(ProtocolError::LineTooLong(max_bytes));
    }
    if out.last() == Some(&b'\r') {
        out.pop();
    }
    Ok(Some(out))
}

/// Read the next message, skipping blank lines. `Ok(None)` means the peer closed the stream.
pub async fn read_message<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Option<ControlMessage>> {
    loop {
        let Some(line) = read_line_limited(reader, MAX_LINE_BYTES).await? else {
            return Ok(None);
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        return Ok(Some(serde_json::from_slice(&line)?));
    }
}

pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &ControlMessage,
) -> Result<()> {
    let mut payload = serde_json::to_vec(message)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
