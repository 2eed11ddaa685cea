//! Console channel: one session driven from stdin, replies on stdout.
//!
//! Besides menu choices and task input it understands three commands:
//! `/clear` empties the transcript, `/menu` returns to the main menu and
//! `/quit` ends the process. Runs until `/quit`, EOF or shutdown.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assistant::{Message, Role};
use crate::error::AppError;
use crate::runtime::{Component, ComponentFuture};

use super::state::{CommsEvent, CommsState};

const BANNER: &str = "─────────────────────────────────────────────\n \
Study assistant console  (/menu, /clear, /quit)\n\
─────────────────────────────────────────────";

pub struct PtyChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            let input = BufReader::new(tokio::io::stdin());
            let output = tokio::io::stdout();
            run_console(&self.channel_id, &self.state, input, output, shutdown).await
        })
    }
}

enum Command {
    Clear,
    Menu,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line {
        "/clear" => Some(Command::Clear),
        "/menu" => Some(Command::Menu),
        "/quit" => Some(Command::Quit),
        _ => None,
    }
}

async fn print_messages<W: AsyncWrite + Unpin>(out: &mut W, messages: &[Message]) -> Result<(), AppError> {
    for m in messages.iter().filter(|m| m.role == Role::Assistant) {
        out.write_all(m.content.as_bytes()).await?;
        out.write_all(b"\n\n").await?;
    }
    Ok(())
}

pub(crate) async fn run_console<R, W>(
    channel_id: &str,
    state: &CommsState,
    input: R,
    mut out: W,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (session_id, session) = state.open_session(channel_id).await;
    info!(channel_id, %session_id, "console session started");

    out.write_all(BANNER.as_bytes()).await?;
    out.write_all(b"\n").await?;
    print_messages(&mut out, session.lock().await.transcript().since(0)).await?;

    let mut lines = input.lines();
    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;

        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!(channel_id, "console shutting down");
                out.write_all(b"\n").await?;
                break;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Err(e) => {
                warn!(channel_id, "console read error: {e}");
                break;
            }
            Ok(None) => {
                info!(channel_id, "console input closed");
                break;
            }
            Ok(Some(line)) => line,
        };
        let line = line.trim();

        let mut s = session.lock().await;
        match parse_command(line) {
            Some(Command::Quit) => break,
            Some(Command::Clear) => {
                s.clear_transcript();
                out.write_all(b"(transcript cleared)\n\n").await?;
            }
            Some(Command::Menu) => {
                let before = s.transcript().len();
                s.return_to_menu();
                print_messages(&mut out, s.transcript().since(before)).await?;
            }
            None => {
                let before = s.transcript().len();
                match state.assistant().submit(&mut s, line).await {
                    Ok(outcome) => debug!(channel_id, ?outcome, "turn done"),
                    Err(e) => warn!(channel_id, error = %e, "turn failed"),
                }
                print_messages(&mut out, s.transcript().since(before)).await?;
            }
        }
    }
    out.flush().await?;

    state.close_session(channel_id, &session_id).await;
    state.report_event(CommsEvent::ChannelShutdown { channel_id: channel_id.to_string() });
    // Leaving the console stops the whole process, other channels included.
    shutdown.cancel();
    Ok(())
}
