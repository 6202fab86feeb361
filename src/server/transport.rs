//! Line-delimited JSON framing over any async byte stream
//!
//! One JSON-RPC message per line. Blank lines are skipped.

use crate::protocol::JsonRpcResponse;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One non-blank input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// Line text with surrounding whitespace removed
    Message(String),
    /// Bytes that are not UTF-8 and can never parse as JSON-RPC
    InvalidUtf8,
}

pub struct MessageReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Next non-blank line, `None` on EOF
    pub async fn next_line(&mut self) -> Result<Option<InboundLine>, TransportError> {
        loop {
            let mut buffer = Vec::new();
            let bytes_read = self
                .reader
                .read_until(b'\n', &mut buffer)
                .await
                .map_err(TransportError::Read)?;

            if bytes_read == 0 {
                return Ok(None);
            }

            let line = match String::from_utf8(buffer) {
                Ok(line) => line,
                Err(e) => {
                    trace!(len = bytes_read, error = %e, "read non UTF-8 line");
                    return Ok(Some(InboundLine::InvalidUtf8));
                }
            };

            let trimmed = line.trim();
            if !trimmed.is_empty() {
                trace!(len = trimmed.len(), "read message");
                return Ok(Some(InboundLine::Message(trimmed.to_string())));
            }
        }
    }
}

pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> Result<(), TransportError> {
        let mut encoded = serde_json::to_vec(response)?;
        encoded.push(b'\n');
        trace!(len = encoded.len(), "writing message");

        self.writer
            .write_all(&encoded)
            .await
            .map_err(TransportError::Write)?;
        self.writer.flush().await.map_err(TransportError::Write)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;
    use serde_json::json;

    fn message(text: &str) -> InboundLine {
        InboundLine::Message(text.to_string())
    }

    #[tokio::test]
    async fn test_reads_lines_and_skips_blanks() {
        let mock = tokio_test::io::Builder::new()
            .read(b"{\"a\":1}\n\n   \n")
            .read(b"{\"b\":2}\r\n")
            .build();
        let mut reader = MessageReader::new(mock);

        assert_eq!(reader.next_line().await.unwrap(), Some(message("{\"a\":1}")));
        assert_eq!(reader.next_line().await.unwrap(), Some(message("{\"b\":2}")));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let mock = tokio_test::io::Builder::new()
            .read(b"{\"jsonrpc\":")
            .read(b"\"2.0\"}\n")
            .build();
        let mut reader = MessageReader::new(mock);

        assert_eq!(
            reader.next_line().await.unwrap(),
            Some(message("{\"jsonrpc\":\"2.0\"}"))
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_stream() {
        let mock = tokio_test::io::Builder::new()
            .read(b"{\"x\":\"\xff\"}\n")
            .read(b"{\"ok\":true}\n")
            .build();
        let mut reader = MessageReader::new(mock);

        assert_eq!(reader.next_line().await.unwrap(), Some(InboundLine::InvalidUtf8));
        assert_eq!(reader.next_line().await.unwrap(), Some(message("{\"ok\":true}")));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writes_one_line_per_response() {
        let response = JsonRpcResponse::success(RequestId::Number(1), json!({}));
        let mut expected = serde_json::to_vec(&response).unwrap();
        expected.push(b'\n');

        let mock = tokio_test::io::Builder::new().write(&expected).build();
        let mut writer = MessageWriter::new(mock);
        writer.write_response(&response).await.unwrap();
    }
}
