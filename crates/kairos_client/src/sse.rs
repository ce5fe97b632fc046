use bytes::{Buf, BytesMut};

/// Event name used when the stream does not set one.
pub const DEFAULT_EVENT: &str = "message";

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub name: String,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` decoder.
///
/// Chunks may split lines (or UTF-8 sequences) anywhere; only complete lines
/// are interpreted. An event is dispatched on a blank line if it carried at
/// least one `data` field.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: BytesMut,
    name: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw = self.buffer.split_to(newline);
            self.buffer.advance(1);
            let line = String::from_utf8_lossy(&raw);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.name = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            // `retry` only matters for reconnecting clients.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let name = self.name.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ServerEvent {
            name: name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ServerEvent, SseParser};

    fn event(name: &str, data: &str) -> ServerEvent {
        ServerEvent {
            name: name.into(),
            data: data.into(),
            id: None,
        }
    }

    #[test]
    fn parses_named_event() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: ping\ndata: ping\n\n");
        assert_eq!(events, vec![event("ping", "ping")]);
    }

    #[test]
    fn joins_multiline_data_and_defaults_name() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: first\ndata:second\n\n");
        assert_eq!(events, vec![event("message", "first\nsecond")]);
    }

    #[test]
    fn handles_chunk_boundaries_and_crlf() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: pi").is_empty());
        assert!(parser.feed(b"ng\r\nda").is_empty());
        let events = parser.feed(b"ta: caf\xc3");
        assert!(events.is_empty());
        let events = parser.feed(b"\xa9\r\n\r\n");
        assert_eq!(events, vec![event("ping", "café")]);
    }

    #[test]
    fn comments_and_empty_events_are_skipped() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\n\nevent: ping\n\ndata: x\n\n");
        // The name from the data-less block must not leak into the next event.
        assert_eq!(events, vec![event("message", "x")]);
    }

    #[test]
    fn last_event_id_is_carried() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"id: 7\ndata: a\n\ndata: b\n\n");
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[1].id.as_deref(), Some("7"));
    }
}
