//! Incremental Server-Sent-Event reassembly.
//!
//! Providers stream chat completions as SSE lines of the form
//! `data: {json chunk}` terminated by the literal `data: [DONE]` sentinel.
//! Network reads split those lines arbitrarily, so the reassembler owns a
//! line buffer: bytes go in, complete frames come out, partial lines wait
//! for the next read. One reassembler per request — it is not restartable.

use promptgate_core::provider::StreamChunk;
use serde::Deserialize;
use tracing::trace;

/// The fixed marker value signaling the end of a streamed response.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A reassembled frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// A content delta to forward to the caller
    Delta(StreamChunk),
    /// The terminal sentinel: the sequence completed cleanly
    Done,
}

/// Reassembles raw SSE bytes into ordered frames.
///
/// The buffer holds raw bytes and decoding happens per complete line, so a
/// multi-byte UTF-8 character split across two reads waits in the buffer
/// instead of decaying into replacement characters.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    buffer: Vec<u8>,
    done: bool,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed bytes from the wire; returns the frames completed by this read,
    /// in arrival order. Input after the terminal sentinel is ignored.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        if self.done {
            return Vec::new();
        }

        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let decoded = String::from_utf8_lossy(&line_bytes[..line_end]);
            let line = decoded.trim_end_matches('\r');

            // Skip blank separators and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == DONE_SENTINEL {
                self.done = true;
                frames.push(SseFrame::Done);
                return frames;
            }

            match serde_json::from_str::<ChunkFrame>(data) {
                Ok(chunk) => {
                    if let Some(content) = chunk.content() {
                        frames.push(SseFrame::Delta(StreamChunk::delta(content)));
                    }
                    // Frames without a content delta (role preludes, finish
                    // markers) produce no output and no error.
                }
                Err(e) => {
                    // A single malformed frame must never abort the stream.
                    trace!(data = %data, error = %e, "Skipping unparseable SSE frame");
                }
            }
        }

        frames
    }
}

// --- Streaming wire types ---

#[derive(Debug, Deserialize)]
struct ChunkFrame {
    #[serde(default)]
    choices: Vec<ChoiceFrame>,
}

#[derive(Debug, Deserialize)]
struct ChoiceFrame {
    #[serde(default)]
    delta: DeltaFrame,
}

#[derive(Debug, Default, Deserialize)]
struct DeltaFrame {
    #[serde(default)]
    content: Option<String>,
}

impl ChunkFrame {
    fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|c| !c.is_empty())
    }
}
