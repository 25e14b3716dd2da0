//! Line-oriented connection halves
//!
//! Wraps any `AsyncRead` / `AsyncWrite` pair in newline framing. Reading
//! never folds end-of-stream into an error: callers switch on `ReadOutcome`.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::error::AppError;

/// Result of reading one line
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete line, terminator stripped
    Line(String),
    /// The peer closed its side cleanly
    EndOfStream,
    /// The transport failed (reset, oversized line, ...)
    TransportError(LinesCodecError),
}

/// Reading half of a line connection
pub struct LineReader<R> {
    inner: FramedRead<R, LinesCodec>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R, max_line_length: usize) -> Self {
        Self {
            inner: FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_length)),
        }
    }

    /// Reader without a line length cap, for trusted local input
    pub fn unbounded(reader: R) -> Self {
        Self {
            inner: FramedRead::new(reader, LinesCodec::new()),
        }
    }

    /// Wait for the next line
    pub async fn read_line(&mut self) -> ReadOutcome {
        match self.inner.next().await {
            Some(Ok(line)) => ReadOutcome::Line(line),
            Some(Err(e)) => ReadOutcome::TransportError(e),
            None => ReadOutcome::EndOfStream,
        }
    }
}

/// Writing half of a line connection
pub struct LineWriter<W> {
    inner: FramedWrite<W, LinesCodec>,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    /// Write one line and flush it
    pub async fn write_line(&mut self, line: &str) -> Result<(), AppError> {
        self.inner.send(line).await?;
        Ok(())
    }

    /// Flush and shut down the write direction
    pub async fn close(&mut self) -> Result<(), AppError> {
        SinkExt::<&str>::close(&mut self.inner).await?;
        Ok(())
    }
}

/// Bidirectional line connection to one peer
pub struct Connection<R, W> {
    pub reader: LineReader<R>,
    pub writer: LineWriter<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Connection<R, W> {
    pub fn new(reader: R, writer: W, max_line_length: usize) -> Self {
        Self {
            reader: LineReader::new(reader, max_line_length),
            writer: LineWriter::new(writer),
        }
    }

    pub fn into_split(self) -> (LineReader<R>, LineWriter<W>) {
        (self.reader, self.writer)
    }
}

impl Connection<OwnedReadHalf, OwnedWriteHalf> {
    /// Split a TCP stream into independently owned line halves
    pub fn from_tcp(stream: TcpStream, max_line_length: usize) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer, max_line_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_read_lines_then_end_of_stream() {
        let (mut peer, local) = duplex(256);
        let mut reader = LineReader::new(local, 64);

        peer.write_all(b"first\r\nsecond\n").await.unwrap();
        drop(peer);

        assert!(matches!(reader.read_line().await, ReadOutcome::Line(l) if l == "first"));
        assert!(matches!(reader.read_line().await, ReadOutcome::Line(l) if l == "second"));
        assert!(matches!(reader.read_line().await, ReadOutcome::EndOfStream));
    }

    #[tokio::test]
    async fn test_oversized_line_is_transport_error() {
        let (mut peer, local) = duplex(256);
        let mut reader = LineReader::new(local, 4);

        peer.write_all(b"far too long\n").await.unwrap();

        assert!(matches!(
            reader.read_line().await,
            ReadOutcome::TransportError(LinesCodecError::MaxLineLengthExceeded)
        ));
    }

    #[tokio::test]
    async fn test_unbounded_reader_accepts_long_lines() {
        let (mut peer, local) = duplex(64 * 1024);
        let mut reader = LineReader::unbounded(local);
        let long = "y".repeat(20_000);

        peer.write_all(format!("{}\n", long).as_bytes()).await.unwrap();

        assert!(matches!(reader.read_line().await, ReadOutcome::Line(l) if l == long));
    }

    #[tokio::test]
    async fn test_write_line_appends_newline() {
        let (mut peer, local) = duplex(256);
        let mut writer = LineWriter::new(local);

        writer.write_line("hello").await.unwrap();
        writer.close().await.unwrap();
        drop(writer);

        let mut received = String::new();
        peer.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "hello\n");
    }
}
