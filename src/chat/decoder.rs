use encoding_rs::{Decoder, UTF_8};

/// How decoded text is cut into lines when a line straddles two chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineFraming {
    /// Carry the trailing partial line over to the next chunk.
    #[default]
    Buffered,
    /// Split every chunk on its own. A line split across chunks is lost.
    PerChunk,
}

/// Incremental bytes -> lines decoder.
///
/// Handles:
/// - multi-byte UTF-8 characters split across chunks
/// - lines split across chunks (in `Buffered` mode)
/// - a final line without a trailing newline
pub struct LineDecoder {
    decoder: Decoder,
    framing: LineFraming,
    buffer: String,
}

impl LineDecoder {
    pub fn new(framing: LineFraming) -> Self {
        Self {
            decoder: UTF_8.new_decoder(),
            framing,
            buffer: String::new(),
        }
    }

    pub fn framing(&self) -> LineFraming {
        self.framing
    }

    /// Push a chunk of bytes and return the lines it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode(chunk, false);
        match self.framing {
            LineFraming::Buffered => {
                self.buffer.push_str(&text);
                let mut lines = Vec::new();
                while let Some(newline_pos) = self.buffer.find('\n') {
                    lines.push(self.buffer[..newline_pos].to_string());
                    self.buffer.drain(..=newline_pos);
                }
                lines
            }
            LineFraming::PerChunk => text.split('\n').map(str::to_string).collect(),
        }
    }

    /// Flush the decoder at end of stream and return whatever is left.
    pub fn finish(&mut self) -> Vec<String> {
        let tail = self.decode(&[], true);
        match self.framing {
            LineFraming::Buffered => {
                self.buffer.push_str(&tail);
                let rest = std::mem::take(&mut self.buffer);
                if rest.is_empty() {
                    Vec::new()
                } else {
                    rest.split('\n').map(str::to_string).collect()
                }
            }
            LineFraming::PerChunk => {
                if tail.is_empty() {
                    Vec::new()
                } else {
                    tail.split('\n').map(str::to_string).collect()
                }
            }
        }
    }

    fn decode(&mut self, bytes: &[u8], last: bool) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 4);
        let mut out = String::with_capacity(capacity);
        let (_, _, had_errors) = self.decoder.decode_to_string(bytes, &mut out, last);
        if had_errors {
            log::trace!("Replaced malformed UTF-8 in response chunk");
        }
        out
    }
}
