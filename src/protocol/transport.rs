//! Newline-delimited JSON-RPC over stdio.

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::types::{JsonRpcResponse, Message};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `Ok(None)` on end of input.
    async fn read_message(&self) -> Result<Option<Message>>;
    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()>;
}

/// Line transport over any async reader/writer pair.
pub struct LineTransport<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
}

/// Transport bound to the process's stdin/stdout.
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }
}

#[cfg(test)]
impl<R> LineTransport<R, Vec<u8>> {
    /// Everything written so far.
    pub(crate) async fn written(&self) -> String {
        String::from_utf8_lossy(&self.writer.lock().await).into_owned()
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_message(&self) -> Result<Option<Message>> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();

        // Skip blank lines between messages.
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }

        trace!("Received line: {}", line.trim());
        match serde_json::from_str::<Message>(line.trim()) {
            Ok(message) => Ok(Some(message)),
            Err(e) => {
                debug!("Failed to parse message: {}", e);
                Err(McpError::Protocol(ProtocolError::ParseError))
            }
        }
    }

    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()> {
        let json = serde_json::to_string(response)?;
        debug!("Sending response: id={:?}", response.id);

        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}
