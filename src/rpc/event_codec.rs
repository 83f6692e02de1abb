//! Incremental `text/event-stream` decoder.
//!
//! Bytes arrive in arbitrary chunks; the decoder buffers partial lines and
//! yields one [`SseFrame`] per blank-line-terminated block:
//!
//! ```text
//! : keep-alive comment        (ignored)
//! event: payments
//! data: {"payment_id":1,
//! data:  "status":1}
//! id: 42
//!                             (blank line dispatches)
//! ```
//!
//! Multiple `data:` lines are joined with `\n`. A block without `data:` is
//! dropped. `retry:` is ignored; reconnect timing is owned by the client.
//! Lines may end in `\n` or `\r\n`.

use bytes::{Buf, BytesMut};

/// Event name used when a block has no `event:` line.
pub const DEFAULT_EVENT: &str = "message";

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
    /// Last event id seen on the stream, if any.
    pub id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    event: Option<String>,
    data: Option<String>,
    last_id: Option<String>,
    started: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        if !self.started && self.buf.len() >= 3 {
            if self.buf.starts_with(b"\xEF\xBB\xBF") {
                self.buf.advance(3);
            }
            self.started = true;
        }

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw = self.buf.split_to(pos + 1);
            let mut line = &raw[..pos];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            let line = String::from_utf8_lossy(line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            let event = self.event.take();
            let data = self.data.take()?;
            return Some(SseFrame {
                event: event.filter(|e| !e.is_empty()).unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
                data,
                id: self.last_id.clone(),
            });
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_owned()),
            },
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_event() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b"event: info\ndata: {\"prize_pool\":10}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame { event: "info".into(), data: "{\"prize_pool\":10}".into(), id: None }]
        );
    }

    #[test]
    fn split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"event: pay").is_empty());
        assert!(d.feed(b"ments\r\ndata: {\"a\":").is_empty());
        assert!(d.feed(b"1}\r\n").is_empty());
        let frames = d.feed(b"\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "payments");
        assert_eq!(frames[0].data, "{\"a\":1}");
    }

    #[test]
    fn multiline_data_comments_and_defaults() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b": ping\n\ndata: line one\ndata:line two\nid: 7\nretry: 100\n\nevent: x\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, DEFAULT_EVENT);
        assert_eq!(frames[0].data, "line one\nline two");
        assert_eq!(frames[0].id.as_deref(), Some("7"));

        // The `event: x` block had no data and was dropped; the name does
        // not leak into the next block.
        let frames = d.feed(b"data: y\n\n");
        assert_eq!(frames[0].event, DEFAULT_EVENT);
        assert_eq!(frames[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn several_frames_in_one_chunk() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b"\xEF\xBB\xBFevent: a\ndata: 1\n\nevent: b\ndata: 2\n\n");
        let names: Vec<_> = frames.iter().map(|f| f.event.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn empty_data_line_still_dispatches() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b"data\n\n");
        assert_eq!(frames[0].data, "");
    }
}
