//! Server-sent events reader shared by the streaming adapters

use futures::StreamExt;

use crate::error::{Error, Result};

use super::types::ProviderId;

/// Upper bound on buffered, not yet newline-terminated event data
const MAX_SSE_BUFFER_SIZE: usize = 1024 * 1024;

/// Feed every `data: ` payload of an SSE response to `on_data`, in order
///
/// Stops at `[DONE]` or when the body ends. Bytes are buffered until a full
/// line arrives so multi-byte characters split across network chunks survive.
pub(crate) async fn for_each_data<F>(
    provider: ProviderId,
    response: reqwest::Response,
    mut on_data: F,
) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buffer.len() + chunk.len() > MAX_SSE_BUFFER_SIZE {
            return Err(Error::Provider {
                provider,
                message: "SSE buffer exceeded maximum size".to_string(),
            });
        }
        buffer.extend_from_slice(&chunk);

        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim();

            let Some(data) = line.strip_prefix("data:") else {
                continue; // comments, event names, blank separators
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                return Ok(());
            }
            if !data.is_empty() {
                on_data(data)?;
            }
        }
    }

    // Trailing event without a final newline
    let rest = String::from_utf8_lossy(&buffer);
    if let Some(data) = rest.trim().strip_prefix("data:") {
        let data = data.trim_start();
        if !data.is_empty() && data != "[DONE]" {
            on_data(data)?;
        }
    }

    Ok(())
}
