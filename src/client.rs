//! Console chat client
//!
//! Two loops share one TCP connection: the receive loop owns the read half
//! and prints whatever the server pushes, the send loop owns the write half
//! and forwards local input. Losing the server ends the client; the user
//! quitting only ends the send loop.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::connection::{Connection, LineReader, LineWriter, ReadOutcome};
use crate::error::AppError;
use crate::message::is_exit_keyword;

const NAME_PROMPT: &str = "Enter your pseudonym: ";
const READY_NOTICE: &str = "You can now send messages. Type 'exit' to quit.";
const SERVER_GONE_NOTICE: &str = "Server disconnected.";
const TOO_LONG_NOTICE: &str = "Message too long, not sent.";

/// Connects to a chat server and runs the send/receive pair
pub struct ChatClient {
    config: ClientConfig,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Run until the server closes the connection
    ///
    /// The send loop is detached; whoever calls this should end the
    /// process when it returns, since a pending stdin read cannot be
    /// cancelled.
    pub async fn run(&self) -> Result<(), AppError> {
        let stream = TcpStream::connect(&self.config.server_addr).await?;
        info!("Connected to chat server {}", self.config.server_addr);

        let (reader, writer) =
            Connection::from_tcp(stream, self.config.max_line_length).into_split();
        let input = LineReader::unbounded(tokio::io::stdin());
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = send_loop(input, writer, tokio::io::stdout(), &config).await {
                error!("Error sending message: {}", e);
            }
        });

        receive_loop(reader, tokio::io::stdout()).await
    }
}

async fn print_line<O: AsyncWrite + Unpin>(out: &mut O, text: &str) -> Result<(), AppError> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Print every line the server sends until it closes the connection
pub async fn receive_loop<R, O>(mut reader: LineReader<R>, mut display: O) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    loop {
        match reader.read_line().await {
            ReadOutcome::Line(line) => print_line(&mut display, &line).await?,
            ReadOutcome::EndOfStream => {
                print_line(&mut display, SERVER_GONE_NOTICE).await?;
                return Ok(());
            }
            ReadOutcome::TransportError(e) => {
                warn!("Error reading from server: {}", e);
                print_line(&mut display, SERVER_GONE_NOTICE).await?;
                return Err(e.into());
            }
        }
    }
}

/// Send the pseudonym, then forward input lines until the user quits
///
/// Lines longer than the server accepts are skipped with a notice. The
/// write half is shut down on return, so a server still waiting for a
/// name sees end-of-stream.
pub async fn send_loop<I, W, O>(
    mut input: LineReader<I>,
    mut writer: LineWriter<W>,
    mut prompt: O,
    config: &ClientConfig,
) -> Result<(), AppError>
where
    I: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    let result = forward_input(&mut input, &mut writer, &mut prompt, config).await;
    if let Err(e) = writer.close().await {
        debug!("Closing connection write half failed: {}", e);
    }
    result
}

async fn forward_input<I, W, O>(
    input: &mut LineReader<I>,
    writer: &mut LineWriter<W>,
    prompt: &mut O,
    config: &ClientConfig,
) -> Result<(), AppError>
where
    I: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    prompt.write_all(NAME_PROMPT.as_bytes()).await?;
    prompt.flush().await?;

    let Some(name) = next_sendable(input, prompt, config.max_line_length).await? else {
        return Ok(());
    };
    writer.write_line(&name).await?;

    print_line(prompt, READY_NOTICE).await?;

    while let Some(line) = next_sendable(input, prompt, config.max_line_length).await? {
        if is_exit_keyword(&line, &config.exit_keyword) {
            break;
        }
        writer.write_line(&line).await?;
    }

    writer.write_line(&config.exit_keyword).await
}

/// Next local line short enough to send; None once input is exhausted
async fn next_sendable<I, O>(
    input: &mut LineReader<I>,
    prompt: &mut O,
    max_line_length: usize,
) -> Result<Option<String>, AppError>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    loop {
        match input.read_line().await {
            ReadOutcome::Line(line) if line.len() > max_line_length => {
                print_line(prompt, TOO_LONG_NOTICE).await?;
            }
            ReadOutcome::Line(line) => return Ok(Some(line)),
            ReadOutcome::EndOfStream => return Ok(None),
            ReadOutcome::TransportError(e) => {
                warn!("Error reading local input: {}", e);
                return Ok(None);
            }
        }
    }
}
