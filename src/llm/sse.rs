//! `data:` line decoding shared by the streaming adapters.
//!
//! Both streaming providers speak the same line protocol:
//!
//! - blank lines and lines not starting with `data: ` are ignored,
//! - `data: [DONE]` ends the stream,
//! - any other `data: ` payload is JSON handed to the adapter's extractor.
//!
//! A payload the extractor cannot decode is logged and skipped; it never ends
//! the stream. Only a transport error while reading the body does.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{trace, warn};

use super::{Fragment, FragmentStream, LlmError};

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// What one line of an event stream means to the relay.
#[derive(Debug, PartialEq, Eq)]
pub enum DataLine<'a> {
    /// A JSON payload (prefix stripped, whitespace trimmed).
    Payload(&'a str),
    /// The end-of-stream sentinel.
    Done,
    /// Blank line, comment, or any non-`data:` field.
    Ignored,
}

/// Classify a single line (without its newline).
pub fn classify(line: &str) -> DataLine<'_> {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return DataLine::Ignored;
    };
    match data.trim() {
        DONE_SENTINEL => DataLine::Done,
        "" => DataLine::Ignored,
        payload => DataLine::Payload(payload),
    }
}

/// Splits a byte stream into lines without breaking multi-byte characters.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append `chunk` and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Return the unterminated tail left at end of stream, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            let tail = std::mem::take(&mut self.pending);
            Some(decode_line(&tail))
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_owned()
}

/// Extracts the text (if any) from one decoded payload.
pub type Extractor = fn(&str) -> Result<Option<String>, serde_json::Error>;

/// Turn a raw response body into fragments using `extract` on every payload.
///
/// Generic over the body's error type so tests can feed in-memory chunks.
pub fn data_fragments<S, E>(provider: &'static str, body: S, extract: Extractor) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        let mut lines = LineBuffer::default();

        'read: loop {
            let (batch, at_eof) = match body.next().await {
                Some(Ok(chunk)) => (lines.push(&chunk), false),
                Some(Err(e)) => {
                    yield Err(e.into());
                    break 'read;
                }
                None => (lines.finish().into_iter().collect(), true),
            };

            for line in batch {
                match classify(&line) {
                    DataLine::Ignored => {}
                    DataLine::Done => {
                        trace!(provider, "stream finished with [DONE]");
                        break 'read;
                    }
                    DataLine::Payload(payload) => match extract(payload) {
                        Ok(Some(text)) => yield Ok(Fragment::new(text)),
                        Ok(None) => {}
                        Err(e) => warn!(provider, error = %e, "skipping unparseable stream line"),
                    },
                }
            }

            if at_eof {
                break 'read;
            }
        }
    })
}

/// Attach the provider name to a body read failure.
pub(crate) struct BodyError {
    pub provider: &'static str,
    pub source: reqwest::Error,
}

impl From<BodyError> for LlmError {
    fn from(e: BodyError) -> Self {
        LlmError::Transport {
            provider: e.provider,
            source: e.source,
        }
    }
}

/// Adapt a reqwest response into the byte stream [`data_fragments`] expects.
pub(crate) fn response_bytes(
    provider: &'static str,
    response: reqwest::Response,
) -> impl Stream<Item = Result<Bytes, BodyError>> + Send + 'static {
    response
        .bytes_stream()
        .map(move |item| item.map_err(|source| BodyError { provider, source }))
}


#[cfg(test)]
mod tests {
    use super::testing::{chunks, collect_texts};
    use super::*;

    fn raw_text(payload: &str) -> Result<Option<String>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(payload)?;
        Ok(value["t"].as_str().map(str::to_owned))
    }

    #[test]
    fn classify_lines() {
        assert_eq!(classify("data: {\"a\":1}"), DataLine::Payload("{\"a\":1}"));
        assert_eq!(classify("data: [DONE]"), DataLine::Done);
        assert_eq!(classify("data: [DONE]  "), DataLine::Done);
        assert_eq!(classify(""), DataLine::Ignored);
        assert_eq!(classify(": keep-alive"), DataLine::Ignored);
        assert_eq!(classify("event: message"), DataLine::Ignored);
        assert_eq!(classify("data:{\"a\":1}"), DataLine::Ignored);
    }

    #[test]
    fn line_buffer_joins_split_lines() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"data: {\"t\":").is_empty());
        assert_eq!(buf.push(b"\"x\"}\r\ndata: "), vec!["data: {\"t\":\"x\"}"]);
        assert_eq!(buf.finish().as_deref(), Some("data: "));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn line_buffer_keeps_multibyte_chars_whole() {
        let mut buf = LineBuffer::default();
        let text = "é\n".as_bytes();
        assert!(buf.push(&text[..1]).is_empty());
        assert_eq!(buf.push(&text[1..]), vec!["é"]);
    }

    #[tokio::test]
    async fn malformed_line_is_skipped() {
        let body = chunks(&["data: {broken\n", "data: {\"t\":\"ok\"}\n"]);
        let texts = collect_texts(data_fragments("test", body, raw_text)).await;
        assert_eq!(texts, vec!["ok"]);
    }

    #[tokio::test]
    async fn done_stops_reading() {
        let body = chunks(&[
            "data: {\"t\":\"a\"}\n\ndata: [DONE]\n",
            "data: {\"t\":\"after\"}\n",
        ]);
        let texts = collect_texts(data_fragments("test", body, raw_text)).await;
        assert_eq!(texts, vec!["a"]);
    }

    #[tokio::test]
    async fn eof_without_done_ends_normally() {
        let body = chunks(&["data: {\"t\":\"a\"}\n", "data: {\"t\":\"b\"}"]);
        let texts = collect_texts(data_fragments("test", body, raw_text)).await;
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn read_error_ends_the_stream_with_an_error_item() {
        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"t\":\"a\"}\n")),
            Err(LlmError::Upstream {
                provider: "test",
                status: 200,
                body: "connection reset".to_owned(),
            }),
            Ok(Bytes::from_static(b"data: {\"t\":\"b\"}\n")),
        ]);
        let items: Vec<Result<Fragment, LlmError>> =
            data_fragments("test", body, raw_text).collect().await;

        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(fragment) if fragment.text == "a"));
        assert!(matches!(&items[1], Err(LlmError::Upstream { .. })));
    }

    #[tokio::test]
    async fn lines_without_text_yield_nothing() {
        let body = chunks(&["event: ping\n", "data: {\"other\":1}\n", ": comment\n"]);
        let texts = collect_texts(data_fragments("test", body, raw_text)).await;
        assert!(texts.is_empty());
    }
}
