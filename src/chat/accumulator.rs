//! Turns a streamed chat response into accumulated assistant text.
//!
//! The wire format is the minimal SSE subset the chat endpoint speaks: lines
//! starting with `data: ` carry a JSON object whose optional `response` field
//! is the next piece of text. Every other line is ignored, and so is every data
//! line that fails to parse.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::chat::decoder::{LineDecoder, LineFraming};
use crate::error::AppResult;
use crate::models::message::StreamFragment;

pub const DATA_PREFIX: &str = "data: ";

/// Raw response body as delivered by the transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = AppResult<Bytes>> + Send + 'static>>;

/// Extract the text fragment carried by one line, if any.
///
/// Returns `None` for non-data lines, malformed JSON, a missing or non-string
/// `response`, and an empty `response`.
pub fn parse_data_line(line: &str) -> Option<String> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    match serde_json::from_str::<StreamFragment>(payload) {
        Ok(StreamFragment {
            response: Some(text),
        }) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            log::trace!("Skipping unparseable data line: {}", e);
            None
        }
    }
}

/// Successive prefixes produced by concatenating `fragments` in order.
pub fn fold_fragments<I, S>(fragments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .scan(String::new(), |acc, fragment| {
            acc.push_str(fragment.as_ref());
            Some(acc.clone())
        })
        .collect()
}

pub struct StreamAccumulator {
    decoder: LineDecoder,
    text: String,
    fragments: usize,
}

impl StreamAccumulator {
    pub fn new(framing: LineFraming) -> Self {
        Self {
            decoder: LineDecoder::new(framing),
            text: String::new(),
            fragments: 0,
        }
    }

    /// Accumulated text so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Feed one chunk. `sink` sees the full accumulated text after every
    /// fragment, in line order.
    pub fn feed(&mut self, chunk: &[u8], sink: impl FnMut(&str)) {
        let lines = self.decoder.push(chunk);
        self.apply(lines, sink);
    }

    /// Flush anything still buffered and return the final text.
    pub fn finish(mut self, sink: impl FnMut(&str)) -> String {
        let lines = self.decoder.finish();
        self.apply(lines, sink);
        log::debug!(
            "Stream finished: {} fragments, {} bytes",
            self.fragments,
            self.text.len()
        );
        self.text
    }

    fn apply(&mut self, lines: Vec<String>, mut sink: impl FnMut(&str)) {
        for line in lines {
            if let Some(fragment) = parse_data_line(&line) {
                self.text.push_str(&fragment);
                self.fragments += 1;
                log::trace!("Fragment {}: {} bytes", self.fragments, fragment.len());
                sink(&self.text);
            }
        }
    }
}

/// Drive `stream` to completion, returning the final accumulated text.
///
/// The end of the stream is a normal completion even if it came early. The
/// first error the stream yields aborts processing and is returned as is.
pub async fn accumulate<S>(
    mut stream: S,
    framing: LineFraming,
    mut sink: impl FnMut(&str),
) -> AppResult<String>
where
    S: Stream<Item = AppResult<Bytes>> + Unpin,
{
    let mut acc = StreamAccumulator::new(framing);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        acc.feed(&chunk, &mut sink);
    }
    Ok(acc.finish(&mut sink))
}
