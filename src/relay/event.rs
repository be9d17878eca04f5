//! Client-facing events and their newline-delimited JSON encoding.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// One record of the relay stream.
///
/// Serializes as `{"type":"chunk","content":"..."}`; `End` has no content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Prompt { content: String },
    Query { content: String },
    Chunk { content: String },
    Error { content: String },
    End,
}

impl Event {
    pub fn chunk(content: impl Into<String>) -> Self {
        Self::Chunk {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }
}

/// Writes events as JSON lines, flushing after every line.
pub struct EventEncoder<W> {
    out: W,
    line: Vec<u8>,
}

impl<W> EventEncoder<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(out: W) -> Self {
        Self {
            out,
            line: Vec::with_capacity(256),
        }
    }

    /// Encode `event` as one line and push it to the transport immediately.
    pub async fn send(&mut self, event: &Event) -> std::io::Result<()> {
        self.line.clear();
        serde_json::to_writer(&mut self.line, event)?;
        self.line.push(b'\n');
        self.out.write_all(&self.line).await?;
        self.out.flush().await
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Parse an NDJSON body back into events, skipping blank lines.
pub fn decode_lines(body: &str) -> Result<Vec<Event>, serde_json::Error> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}
