//! The relay driver: turns input items into an ordered event stream.
//!
//! Each item runs through `Start → Streaming → (Done | Failed) → Closed`:
//!
//! ```text
//! prompt|query   once, before the adapter is called
//! chunk          once per fragment
//! error          at most once; no chunk follows it
//! end            always, whatever happened above
//! ```
//!
//! Items of a batch are relayed strictly in order, and a failed item never
//! stops the ones after it. Only a failed write to the client ends the run
//! early; that error is returned to the caller.

use futures::StreamExt;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use crate::llm::Provider;

pub mod event;

pub use event::{Event, EventEncoder, decode_lines};

/// Heading sent before the single-prompt relay starts.
pub const GENERATING_NOTICE: &str = "Generating summaries…";

const PREVIEW_CHARS: usize = 60;

/// Which heading event opens each item of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Prompt,
    Query,
}

impl Heading {
    fn event(self, content: &str) -> Event {
        let content = content.to_owned();
        match self {
            Self::Prompt => Event::Prompt { content },
            Self::Query => Event::Query { content },
        }
    }
}

/// How an item's relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The adapter ran to the end of its stream.
    Done { fragments: usize },
    /// The adapter failed; `fragments` were relayed before the failure.
    Failed { fragments: usize },
}

/// Relay one prompt to `provider`, opening with [`GENERATING_NOTICE`].
pub async fn relay_single<W>(
    encoder: &mut EventEncoder<W>,
    provider: &dyn Provider,
    prompt: &str,
) -> std::io::Result<Outcome>
where
    W: AsyncWrite + Unpin,
{
    let heading = Event::Prompt {
        content: GENERATING_NOTICE.to_owned(),
    };
    relay_item(encoder, provider, heading, prompt).await
}

/// Relay every item of `items` in order, each opened by its own heading.
pub async fn relay_batch<W>(
    encoder: &mut EventEncoder<W>,
    provider: &dyn Provider,
    heading: Heading,
    items: &[String],
) -> std::io::Result<Vec<Outcome>>
where
    W: AsyncWrite + Unpin,
{
    let mut outcomes = Vec::with_capacity(items.len());
    for item in items {
        let outcome = relay_item(encoder, provider, heading.event(item), item).await?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

async fn relay_item<W>(
    encoder: &mut EventEncoder<W>,
    provider: &dyn Provider,
    heading: Event,
    input: &str,
) -> std::io::Result<Outcome>
where
    W: AsyncWrite + Unpin,
{
    let name = provider.name();
    encoder.send(&heading).await?;

    let outcome = match provider.stream(input).await {
        Ok(mut fragments) => {
            let mut count = 0;
            loop {
                match fragments.next().await {
                    Some(Ok(fragment)) => {
                        debug!(
                            provider = name,
                            len = fragment.text.chars().count(),
                            preview = %preview(&fragment.text),
                            "streamed chunk"
                        );
                        encoder.send(&Event::Chunk { content: fragment.text }).await?;
                        count += 1;
                    }
                    Some(Err(e)) => {
                        warn!(provider = name, error = %e, fragments = count, "stream failed");
                        encoder.send(&Event::error(e.to_string())).await?;
                        break Outcome::Failed { fragments: count };
                    }
                    None => break Outcome::Done { fragments: count },
                }
            }
        }
        Err(e) => {
            warn!(provider = name, error = %e, "provider call failed");
            encoder.send(&Event::error(e.to_string())).await?;
            Outcome::Failed { fragments: 0 }
        }
    };

    encoder.send(&Event::End).await?;
    if let Outcome::Done { fragments } = outcome {
        info!(provider = name, fragments, "item relayed");
    }
    Ok(outcome)
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
