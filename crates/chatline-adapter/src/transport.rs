use crate::errors::ChatError;

const DATA_PREFIX: &str = "data: ";

/// Kind of a decoded backend stream event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEventKind {
    /// Incremental text fragment.
    Token,
    /// Terminal event; non-blank content is the authoritative final text.
    End,
    /// Backend failure; terminates the stream.
    Error,
    /// Event type this crate does not know; ignored.
    #[serde(other)]
    Unknown,
}

/// One event decoded from a `data: ` line.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamEvent {
    /// Returns the event content, treating a missing value as empty.
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn new(kind: StreamEventKind, content: &str) -> Self {
        Self {
            kind,
            content: Some(content.to_string()),
        }
    }
}

/// Incremental server-sent-events decoder.
///
/// Raw bytes are buffered until a blank line closes a frame, so multi-byte
/// UTF-8 sequences split across chunks are decoded only once complete.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    /// Prefix of `buf` already searched for a frame delimiter.
    scanned: usize,
}

impl SseDecoder {
    /// Appends a chunk and returns the events of every frame it completed.
    ///
    /// A `data: ` line whose payload is not a valid event is a protocol error.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, ChatError> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf, self.scanned) {
            let frame_bytes: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            self.scanned = 0;
            parse_frame(&frame_bytes, &mut events)?;
        }
        self.scanned = self.buf.len();
        Ok(events)
    }

    /// Returns true when bytes of an unterminated frame are buffered.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }
}

/// Searches for `\n\n` or `\r\n\r\n`, resuming near `scanned` so a
/// delimiter split across chunks is still found.
fn find_frame_delimiter(buf: &[u8], scanned: usize) -> Option<(usize, usize)> {
    let mut i = scanned.saturating_sub(3);
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_frame(bytes: &[u8], events: &mut Vec<StreamEvent>) -> Result<(), ChatError> {
    if bytes.is_empty() {
        return Ok(());
    }
    let text = String::from_utf8_lossy(bytes);
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        let event: StreamEvent = serde_json::from_str(payload)
            .map_err(|e| ChatError::protocol_msg(format!("invalid SSE JSON frame: {e}")))?;
        events.push(event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        let first = decoder
            .push_chunk(b"data: {\"type\":\"token\",\"content\":\"hel")
            .expect("first");
        assert!(first.is_empty());
        assert!(decoder.has_pending());
        let second = decoder.push_chunk(b"lo\"}\n\n").expect("second");
        assert_eq!(second, vec![StreamEvent::new(StreamEventKind::Token, "hello")]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn multibyte_character_split_across_chunks_is_preserved() {
        let frame = "data: {\"type\":\"token\",\"content\":\"caf\u{e9} \u{1f600}\"}\n\n";
        let bytes = frame.as_bytes();
        let emoji_start = frame.find('\u{1f600}').expect("emoji");
        let split = emoji_start + 2;

        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(&bytes[..split]).expect("head").is_empty());
        let events = decoder.push_chunk(&bytes[split..]).expect("tail");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content(), "caf\u{e9} \u{1f600}");
    }

    #[test]
    fn one_chunk_may_carry_several_frames_and_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder
            .push_chunk(
                b": keep-alive\nevent: message\ndata: {\"type\":\"token\",\"content\":\"a\"}\ndata: {\"type\":\"token\",\"content\":\"b\"}\n\ndata: {\"type\":\"end\",\"content\":\"\"}\n\n",
            )
            .expect("decode");
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![StreamEventKind::Token, StreamEventKind::Token, StreamEventKind::End]
        );
    }

    #[test]
    fn crlf_frames_are_accepted() {
        let mut decoder = SseDecoder::default();
        let events = decoder
            .push_chunk(b"data: {\"type\":\"token\",\"content\":\"x\"}\r\n\r\n")
            .expect("decode");
        assert_eq!(events, vec![StreamEvent::new(StreamEventKind::Token, "x")]);
    }

    #[test]
    fn data_prefix_requires_the_space() {
        let mut decoder = SseDecoder::default();
        let events = decoder
            .push_chunk(b"data:{\"type\":\"token\",\"content\":\"x\"}\n\n")
            .expect("decode");
        assert!(events.is_empty());
    }

    #[test]
    fn unknown_types_and_missing_content_decode() {
        let mut decoder = SseDecoder::default();
        let events = decoder
            .push_chunk(b"data: {\"type\":\"ping\"}\n\ndata: {\"type\":\"end\",\"content\":null}\n\n")
            .expect("decode");
        assert_eq!(events[0].kind, StreamEventKind::Unknown);
        assert_eq!(events[1].kind, StreamEventKind::End);
        assert_eq!(events[1].content(), "");
    }

    #[test]
    fn invalid_json_is_a_protocol_error() {
        let mut decoder = SseDecoder::default();
        let err = decoder
            .push_chunk(b"data: {not json}\n\n")
            .expect_err("should fail");
        assert!(matches!(err, ChatError::Protocol(msg) if msg.contains("invalid SSE JSON")));
    }

    #[test]
    fn byte_at_a_time_delivery_finds_split_delimiters() {
        let body = b"data: {\"type\":\"token\",\"content\":\"a\"}\r\n\r\ndata: {\"type\":\"token\",\"content\":\"b\"}\n\n";
        let mut decoder = SseDecoder::default();
        let mut events = Vec::new();
        for byte in body {
            events.extend(decoder.push_chunk(std::slice::from_ref(byte)).expect("decode"));
            assert_eq!(decoder.scanned, decoder.buf.len());
        }
        assert_eq!(
            events,
            vec![
                StreamEvent::new(StreamEventKind::Token, "a"),
                StreamEvent::new(StreamEventKind::Token, "b"),
            ]
        );
        assert!(!decoder.has_pending());
    }
}
