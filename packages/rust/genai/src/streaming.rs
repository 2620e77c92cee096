//! Server-sent-event parsing for streamed chat responses.
//!
//! Converts a raw `reqwest` byte stream into [`StreamEvent`]s. Each `data:`
//! line carries a JSON object with `text` and/or `finishReason`. An event
//! carrying `finishReason` ends the stream; nothing is yielded after it.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use categorizer_shared::{ClassificationError, Result};

/// One item of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental piece of generated text.
    Fragment(String),
    /// The service signalled completion.
    EndOfStream,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    text: Option<String>,
    /// `Some` whenever the key is present, even with a `null` value.
    #[serde(default, rename = "finishReason", deserialize_with = "present")]
    finish_reason: Option<serde_json::Value>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

/// Stream adapter from raw event-stream bytes to [`StreamEvent`]s.
///
/// Once it yields [`StreamEvent::EndOfStream`] or an error, it yields nothing more.
pub struct ResponseStream {
    inner: ByteStream,
    buffer: Vec<u8>,
    finished: bool,
}

impl ResponseStream {
    pub fn new(
        byte_stream: impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Parse the next complete event line out of the buffer, if any.
    ///
    /// With `flush`, a trailing line without a newline is parsed too.
    fn next_buffered(&mut self, flush: bool) -> Option<Result<StreamEvent>> {
        loop {
            let line = match self.buffer.iter().position(|&b| b == b'\n') {
                Some(pos) => self.buffer.drain(..=pos).collect::<Vec<u8>>(),
                None if flush && !self.buffer.is_empty() => std::mem::take(&mut self.buffer),
                None => return None,
            };

            if let Some(event) = parse_line(&line) {
                if !matches!(event, Ok(StreamEvent::Fragment(_))) {
                    self.finished = true;
                }
                return Some(event);
            }
        }
    }
}

impl Stream for ResponseStream {
    type Item = Result<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            if let Some(event) = this.next_buffered(false) {
                return Poll::Ready(Some(event));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(ClassificationError::ModelService(format!(
                        "stream interrupted: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    let tail = this.next_buffered(true);
                    if tail.is_none() {
                        debug!("event stream closed without a finish reason");
                    }
                    this.finished = true;
                    return Poll::Ready(tail);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Interpret one raw line. `None` means the line carries nothing to yield.
fn parse_line(line: &[u8]) -> Option<Result<StreamEvent>> {
    let line = String::from_utf8_lossy(line);
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }

    let raw: RawEvent = match serde_json::from_str(data) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "malformed stream event");
            return Some(Err(ClassificationError::ModelService(format!(
                "malformed stream event: {e} (data: {})",
                data.chars().take(200).collect::<String>()
            ))));
        }
    };

    if let Some(reason) = raw.finish_reason {
        info!(finish_reason = %reason, "stream finished");
        return Some(Ok(StreamEvent::EndOfStream));
    }

    raw.text.map(|text| Ok(StreamEvent::Fragment(text)))
}

/// Drain a stream, concatenating fragments until it ends.
pub async fn collect_text(mut stream: ResponseStream) -> Result<String> {
    let mut full = String::new();
    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Fragment(text) => full.push_str(&text),
            StreamEvent::EndOfStream => break,
        }
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(chunks: &[&[u8]]) -> ResponseStream {
        let items: Vec<std::result::Result<Bytes, reqwest::Error>> = chunks
            .iter()
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        ResponseStream::new(futures::stream::iter(items))
    }

    async fn events(stream: ResponseStream) -> Vec<Result<StreamEvent>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn yields_fragments_then_end() {
        let stream = stream_of(&[
            b"data: {\"text\":\"PRIMARY_\"}\n\n",
            b"data: {\"text\":\"CATEGORY: Software\"}\n\n",
            b"data: {\"text\":\"ignored\",\"finishReason\":\"COMPLETE\"}\n\n",
            b"data: {\"text\":\"after end\"}\n\n",
        ]);

        let events: Vec<StreamEvent> = events(stream)
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(
            events,
            vec![
                StreamEvent::Fragment("PRIMARY_".into()),
                StreamEvent::Fragment("CATEGORY: Software".into()),
                StreamEvent::EndOfStream,
            ]
        );
    }

    #[tokio::test]
    async fn null_finish_reason_still_ends_the_stream() {
        let stream = stream_of(&[
            b"data: {\"text\":\"done\"}\n",
            b"data: {\"finishReason\":null}\n",
            b"data: {\"text\":\"after end\"}\n",
        ]);
        let collected: Vec<StreamEvent> = events(stream)
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(
            collected,
            vec![StreamEvent::Fragment("done".into()), StreamEvent::EndOfStream]
        );
    }

    #[tokio::test]
    async fn lines_split_across_chunks() {
        let stream = stream_of(&[b"data: {\"te", b"xt\":\"Hel", b"lo\"}\ndata: {\"finishReason\":\"COMPLETE\"}\n"]);
        let text = collect_text(stream).await.unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn multibyte_characters_split_across_chunks() {
        let line = "data: {\"text\":\"Café\"}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let stream = stream_of(&[&line[..split], &line[split..]]);
        assert_eq!(collect_text(stream).await.unwrap(), "Café");
    }

    #[tokio::test]
    async fn events_without_text_are_skipped() {
        let stream = stream_of(&[
            b"event: message\n",
            b"data: {\"index\":0}\n",
            b"data: {\"text\":\"A\"}\n",
        ]);
        let collected: Vec<StreamEvent> = events(stream)
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(collected, vec![StreamEvent::Fragment("A".into())]);
    }

    #[tokio::test]
    async fn malformed_event_is_an_error_and_terminates() {
        let stream = stream_of(&[b"data: {\"text\":\"ok\"}\n", b"data: not json\n", b"data: {\"text\":\"more\"}\n"]);
        let events = events(stream).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Ok(StreamEvent::Fragment(_))));
        assert!(matches!(events[1], Err(ClassificationError::ModelService(_))));
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_parsed() {
        let stream = stream_of(&[b"data: {\"text\":\"tail\"}"]);
        assert_eq!(collect_text(stream).await.unwrap(), "tail");
    }

    #[tokio::test]
    async fn fragments_concatenate_to_full_text() {
        let full = "PRIMARY_CATEGORY: Retail\nSECONDARY_CATEGORY: N/A\nCONFIDENCE: High";
        let mut body = Vec::new();
        for piece in full.as_bytes().chunks(7) {
            let text = String::from_utf8(piece.to_vec()).unwrap();
            let event = serde_json::json!({ "text": text });
            body.extend_from_slice(format!("data: {event}\n\n").as_bytes());
        }
        body.extend_from_slice(b"data: {\"finishReason\":\"COMPLETE\"}\n\n");

        let stream = stream_of(&[&body]);
        assert_eq!(collect_text(stream).await.unwrap(), full);
    }
}
