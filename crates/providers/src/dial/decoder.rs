//! Decoding of `text/event-stream` chat completion bodies.
//!
//! The body arrives in arbitrary byte chunks. [`LineBuffer`] turns those into
//! complete lines and [`classify_line`] turns one line into at most one
//! content fragment. Nothing in here fails: a line that cannot be understood
//! simply carries no content.

use bytes::BytesMut;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// Not an event line, unparsable JSON, or a chunk without content.
    Skip,
    /// `data: [DONE]`.
    Done,
    Fragment(String),
}

pub fn classify_line(line: &str) -> LineEvent {
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return LineEvent::Skip;
    };
    let payload = rest.trim();
    if payload == DONE_SENTINEL {
        return LineEvent::Done;
    }
    let v: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(_) => return LineEvent::Skip,
    };
    // Only the first choice is ever read; missing or null content is empty.
    match v["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => LineEvent::Fragment(content.to_string()),
        _ => LineEvent::Skip,
    }
}

/// Content fragment carried by one stream line, if any.
pub fn decode_line(line: &str) -> Option<String> {
    match classify_line(line) {
        LineEvent::Fragment(s) => Some(s),
        LineEvent::Skip | LineEvent::Done => None,
    }
}

/// Accumulates raw body bytes and yields complete `\n`-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator, or `None` if the buffer
    /// holds only a partial line.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = twoway::find_bytes(&self.buf, b"\n")?;
        let line = self.buf.split_to(pos + 1);
        Some(Self::decode(&line[..pos]))
    }

    /// Whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(Self::decode(&rest))
    }

    fn decode(raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        String::from_utf8_lossy(raw).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_data_lines_are_skipped() {
        for line in ["", "event: foo", ": keep-alive", "id: 7", "data:{\"x\":1}", " data: {}"] {
            assert_eq!(classify_line(line), LineEvent::Skip, "line {:?}", line);
            assert_eq!(decode_line(line), None);
        }
    }

    #[test]
    fn test_done_sentinel() {
        assert_eq!(classify_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(classify_line("data: [DONE]  "), LineEvent::Done);
        assert_eq!(decode_line("data: [DONE]"), None);
    }

    #[test]
    fn test_malformed_json_is_tolerated() {
        // Leniency is deliberate: a bad line never aborts the stream.
        assert_eq!(decode_line("data: {not json"), None);
        assert_eq!(decode_line("data: "), None);
        assert_eq!(decode_line("data:    "), None);
        assert_eq!(decode_line("data: 42"), None);
        assert_eq!(decode_line("data: \"text\""), None);
    }

    #[test]
    fn test_missing_or_empty_choices() {
        assert_eq!(decode_line(r#"data: {"choices":[]}"#), None);
        assert_eq!(decode_line(r#"data: {"id":"x"}"#), None);
        assert_eq!(decode_line(r#"data: {"choices":null}"#), None);
        assert_eq!(decode_line(r#"data: {"choices":"nope"}"#), None);
    }

    #[test]
    fn test_missing_delta_or_content() {
        assert_eq!(decode_line(r#"data: {"choices":[{}]}"#), None);
        assert_eq!(decode_line(r#"data: {"choices":[{"delta":{}}]}"#), None);
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"content":null}}]}"#),
            None
        );
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"role":"assistant","content":""}}]}"#),
            None
        );
    }

    #[test]
    fn test_only_first_choice_counts() {
        let line = r#"data: {"choices":[{"delta":{"content":"A"}},{"delta":{"content":"B"}}]}"#;
        assert_eq!(decode_line(line), Some("A".to_string()));
        let line = r#"data: {"choices":[{"delta":{}},{"delta":{"content":"B"}}]}"#;
        assert_eq!(decode_line(line), None);
    }

    #[test]
    fn test_fragments_accumulate() {
        let lines = [
            r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
            "",
            r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
            "",
            "data: [DONE]",
        ];
        let full: String = lines.iter().filter_map(|l| decode_line(l)).collect();
        assert_eq!(full, "Hello");
    }

    #[test]
    fn test_fragment_whitespace_is_kept() {
        let line = r#"data: {"choices":[{"delta":{"content":" world\n"}}]}"#;
        assert_eq!(decode_line(line), Some(" world\n".to_string()));
    }

    #[test]
    fn test_line_buffer_splits_across_chunks() {
        let mut buf = LineBuffer::new();
        buf.extend(b"data: {\"choi");
        assert_eq!(buf.next_line(), None);
        buf.extend(b"ces\":[]}\r\n\ndata: [DO");
        assert_eq!(buf.next_line().as_deref(), Some("data: {\"choices\":[]}"));
        assert_eq!(buf.next_line().as_deref(), Some(""));
        assert_eq!(buf.next_line(), None);
        buf.extend(b"NE]");
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.finish().as_deref(), Some("data: [DONE]"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_line_buffer_multibyte_split() {
        let text = "data: {\"choices\":[{\"delta\":{\"content\":\"日本\"}}]}\n";
        let bytes = text.as_bytes();
        let cut = text.find('本').unwrap() + 1;
        let mut buf = LineBuffer::new();
        buf.extend(&bytes[..cut]);
        assert_eq!(buf.next_line(), None);
        buf.extend(&bytes[cut..]);
        let line = buf.next_line().unwrap();
        assert_eq!(decode_line(&line), Some("日本".to_string()));
    }
}
