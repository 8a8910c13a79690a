use std::io::SeekFrom;

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Reads the last non-empty line of a file by walking backwards from its end, `buffer.len()` bytes
/// at a time. Useful for append-only logs where only the newest entry matters.
pub async fn read_last_line(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
    buffer: &mut [u8],
) -> Result<Option<String>, io::Error> {
    let mut position = file.seek(SeekFrom::End(0)).await?;
    // Bytes between `position` and the end of the file.
    let mut collected = Vec::<u8>::new();

    loop {
        let content = trim_line_endings(&collected);
        if let Some(index) = content.iter().rposition(|v| *v == b'\n') {
            return Ok(Some(String::from_utf8_lossy(&content[index + 1..]).into_owned()));
        }
        if position == 0 {
            return Ok((!content.is_empty()).then(|| String::from_utf8_lossy(content).into_owned()));
        }

        let next_chunk = u64::min(position, buffer.len() as u64) as usize;
        position -= next_chunk as u64;
        file.seek(SeekFrom::Start(position)).await?;
        file.read_exact(&mut buffer[..next_chunk]).await?;

        let mut chunk = buffer[..next_chunk].to_vec();
        chunk.extend_from_slice(&collected);
        collected = chunk;
    }
}

fn trim_line_endings(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|v| !matches!(v, b'\n' | b'\r'))
        .map_or(0, |index| index + 1);
    &bytes[..end]
}
