use std::io::Write;

use carecompass_chat::ExchangeOutcome;
use carecompass_client::FALLBACK_REPLY;

/// Prints a streamed answer to stdout
///
/// Updates arrive as the full text so far. Only the new suffix is written.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    shown: String,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The part of `text` not yet written
    pub fn delta<'a>(&self, text: &'a str) -> &'a str {
        match text.strip_prefix(self.shown.as_str()) {
            Some(rest) => rest,
            None => text,
        }
    }

    pub fn update(&mut self, text: &str) {
        let delta = self.delta(text);
        if delta.len() == text.len() && !self.shown.is_empty() {
            // Not an extension of what is on screen, start over on a new line
            println!();
        }
        print!("{}", delta);
        let _ = std::io::stdout().flush();
        self.shown = text.to_string();
    }

    pub fn finish(&self, outcome: &ExchangeOutcome) {
        match outcome {
            ExchangeOutcome::Skipped => {}
            ExchangeOutcome::Answered { .. } => println!(),
            ExchangeOutcome::Fallback { .. } => println!("{}", FALLBACK_REPLY),
            ExchangeOutcome::Aborted { .. } => println!(" [stopped]"),
        }
    }
}
