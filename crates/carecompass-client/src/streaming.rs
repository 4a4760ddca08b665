use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::abort::AbortSignal;
use crate::buffer_utils::Utf8StreamDecoder;

/// Outcome of draining a text body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRead {
    /// The body ended. Holds the full text.
    Completed(String),
    /// The signal fired first. Holds the text received until then.
    Aborted(String),
}

impl StreamRead {
    pub fn text(&self) -> &str {
        match self {
            StreamRead::Completed(text) | StreamRead::Aborted(text) => text,
        }
    }
}

/// Turn a byte stream into a stream of decoded text increments
///
/// Empty increments (a chunk holding only part of a character) are skipped.
/// The held-back tail is flushed when the byte stream ends. A byte stream
/// error is forwarded and ends the text stream.
pub fn decode_text_stream<S, B, E>(
    byte_stream: S,
) -> Pin<Box<dyn Stream<Item = Result<String, E>> + Send>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut decoder = Utf8StreamDecoder::new();

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    let text = decoder.decode(bytes.as_ref());
                    if !text.is_empty() {
                        yield Ok(text);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            yield Ok(tail);
        }
    })
}

/// Read a chunked text body to the end, or until `abort` fires
///
/// `on_update` receives the cumulative text after every decoded increment,
/// so each call sees a prefix-extension of the previous one.
pub async fn read_text_stream<S, B, E>(
    byte_stream: S,
    abort: &AbortSignal,
    on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
) -> Result<StreamRead, E>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    let mut increments = decode_text_stream(byte_stream);
    let mut accumulated = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = abort.aborted() => {
                tracing::debug!(chars = accumulated.len(), "text stream aborted");
                return Ok(StreamRead::Aborted(accumulated));
            }
            next = increments.next() => next,
        };

        match next {
            Some(Ok(text)) => {
                accumulated.push_str(&text);
                on_update(&accumulated);
            }
            Some(Err(e)) => return Err(e),
            None => break,
        }
    }

    Ok(StreamRead::Completed(accumulated))
}
