//! Line-oriented prompt channel.
//!
//! Abstracts the bidirectional text stream a session talks over: write a
//! line, show the prompt marker, suspend until one reply line arrives.
//! The production implementation frames lines over any async byte stream;
//! tests drive sessions through a scripted in-memory channel instead.

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Prompt marker shown before each command is read
pub const PROMPT: &str = "quiz> ";

/// Maximum accepted input line length; longer input is an error rather
/// than an unbounded buffer
const MAX_LINE_LENGTH: usize = 16 * 1024;

/// Channel transport errors. All of these end the session.
#[derive(Debug)]
pub enum ChannelError {
    /// The peer closed the connection
    Closed,
    /// The peer sent a line longer than [`MAX_LINE_LENGTH`]
    LineTooLong,
    /// Underlying transport failure
    Io(std::io::Error),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::Closed => write!(f, "Connection closed by peer"),
            ChannelError::LineTooLong => {
                write!(f, "Input line exceeds {} bytes", MAX_LINE_LENGTH)
            }
            ChannelError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<std::io::Error> for ChannelError {
    fn from(e: std::io::Error) -> Self {
        ChannelError::Io(e)
    }
}

/// A bidirectional line-oriented text stream, one per client session.
#[async_trait]
pub trait PromptChannel: Send {
    /// Write one line of text to the client
    async fn write_line(&mut self, text: &str) -> Result<(), ChannelError>;

    /// Emit the prompt marker (no line terminator)
    async fn prompt(&mut self) -> Result<(), ChannelError>;

    /// Suspend until one line arrives. Returns the line without its
    /// terminator.
    async fn read_line(&mut self) -> Result<String, ChannelError>;

    /// Close the channel
    async fn close(&mut self) -> Result<(), ChannelError>;

    /// Write a question line, then wait for one reply.
    async fn ask(&mut self, text: &str) -> Result<String, ChannelError> {
        self.write_line(text).await?;
        self.read_line().await
    }

    /// Like [`ask`](Self::ask), offering `initial` as editable prefill.
    /// Channels without local line editing ignore the prefill and issue a
    /// bare prompt.
    async fn ask_with_initial(
        &mut self,
        text: &str,
        _initial: &str,
    ) -> Result<String, ChannelError> {
        self.ask(text).await
    }
}

/// Line framing over any async byte stream. `LineChannel<TcpStream>` is
/// the production channel.
pub struct LineChannel<S> {
    stream: S,
    buf: BytesMut,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> LineChannel<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Pop one complete line off the buffer, if present. Strips the
    /// trailing `\n` and an optional preceding `\r`.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        if line.ends_with(b"\r") {
            line.truncate(pos - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> PromptChannel for LineChannel<S> {
    async fn write_line(&mut self, text: &str) -> Result<(), ChannelError> {
        self.stream.write_all(text.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        Ok(())
    }

    async fn prompt(&mut self) -> Result<(), ChannelError> {
        self.stream.write_all(PROMPT.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, ChannelError> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }
            if self.buf.len() > MAX_LINE_LENGTH {
                return Err(ChannelError::LineTooLong);
            }
            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                // EOF; a partial unterminated line is discarded
                return Err(ChannelError::Closed);
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_line_lf_and_crlf() {
        let stream = tokio_test::io::Builder::new()
            .read(b"list\r\nshow 3\n")
            .build();
        let mut channel = LineChannel::new(stream);

        assert_eq!(channel.read_line().await.unwrap(), "list");
        assert_eq!(channel.read_line().await.unwrap(), "show 3");
    }

    #[tokio::test]
    async fn test_read_line_split_across_reads() {
        let stream = tokio_test::io::Builder::new()
            .read(b"he")
            .read(b"lp")
            .read(b"\r\n")
            .build();
        let mut channel = LineChannel::new(stream);

        assert_eq!(channel.read_line().await.unwrap(), "help");
    }

    #[tokio::test]
    async fn test_read_line_eof() {
        let stream = tokio_test::io::Builder::new().read(b"quit\n").build();
        let mut channel = LineChannel::new(stream);

        assert_eq!(channel.read_line().await.unwrap(), "quit");
        assert!(matches!(
            channel.read_line().await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_read_line_empty_line() {
        let stream = tokio_test::io::Builder::new().read(b"\r\n").build();
        let mut channel = LineChannel::new(stream);

        assert_eq!(channel.read_line().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_read_line_too_long() {
        let oversized = vec![b'a'; MAX_LINE_LENGTH + 1];
        let stream = tokio_test::io::Builder::new().read(&oversized).build();
        let mut channel = LineChannel::new(stream);

        assert!(matches!(
            channel.read_line().await,
            Err(ChannelError::LineTooLong)
        ));
    }

    #[tokio::test]
    async fn test_write_line_terminator() {
        let stream = tokio_test::io::Builder::new()
            .write(b"CORRECT")
            .write(b"\r\n")
            .build();
        let mut channel = LineChannel::new(stream);

        channel.write_line("CORRECT").await.unwrap();
    }

    #[tokio::test]
    async fn test_prompt_marker() {
        let stream = tokio_test::io::Builder::new()
            .write(PROMPT.as_bytes())
            .build();
        let mut channel = LineChannel::new(stream);

        channel.prompt().await.unwrap();
    }

    #[tokio::test]
    async fn test_scripted_channel() {
        let mut channel = scripted::ScriptedChannel::new(&["Madrid"]);

        let reply = channel.ask("Capital of Spain").await.unwrap();
        assert_eq!(reply, "Madrid");
        assert_eq!(channel.output(), vec!["Capital of Spain".to_string()]);

        assert!(matches!(
            channel.read_line().await,
            Err(ChannelError::Closed)
        ));

        channel.close().await.unwrap();
        assert!(channel.closed);
    }
}
