// Prompt input that can be interrupted

use std::future::Future;

use tokio::io::{AsyncBufRead, Lines};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    Eof,
    Interrupted,
}

/// Wait for the next line, or for `interrupt` to resolve first
///
/// Reading a line is cancel safe, so an interrupt never loses input.
pub async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> std::io::Result<InputEvent>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    tokio::select! {
        biased;
        _ = interrupt => Ok(InputEvent::Interrupted),
        line = lines.next_line() => Ok(match line? {
            Some(line) => InputEvent::Line(line),
            None => InputEvent::Eof,
        }),
    }
}
