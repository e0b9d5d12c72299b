use std::collections::VecDeque;
use std::io::{BufRead, Write};

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText};
use quick_xml::events::Event as XmlEvent;
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::format::{Format, Mode};
use crate::node::{NodeMap, Position};

/// An owned token from the underlying markup stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start {
        name: String,
        attributes: NodeMap,
        position: Position,
    },
    /// Character data, already unescaped. CDATA sections arrive as text.
    Text(String),
    End { name: String },
}

/// Source of markup tokens with one token of lookahead.
pub trait EventReader {
    /// Returns the next token without consuming it.
    fn peek(&mut self) -> Result<Option<&Event>>;

    /// Consumes and returns the next token, or None at end of input.
    fn next(&mut self) -> Result<Option<Event>>;
}

/// Sink for markup tokens.
///
/// Implementations escape text and attribute values themselves; callers pass
/// raw strings.
pub trait EventWriter {
    fn start(&mut self, name: &str, attributes: &NodeMap) -> Result<()>;

    fn text(&mut self, value: &str, mode: Mode) -> Result<()>;

    fn end(&mut self, name: &str) -> Result<()>;

    /// Flushes any buffered output.
    fn finish(&mut self) -> Result<()>;
}

impl<T: EventReader + ?Sized> EventReader for &mut T {
    fn peek(&mut self) -> Result<Option<&Event>> {
        (**self).peek()
    }

    fn next(&mut self) -> Result<Option<Event>> {
        (**self).next()
    }
}

impl<T: EventWriter + ?Sized> EventWriter for &mut T {
    fn start(&mut self, name: &str, attributes: &NodeMap) -> Result<()> {
        (**self).start(name, attributes)
    }

    fn text(&mut self, value: &str, mode: Mode) -> Result<()> {
        (**self).text(value, mode)
    }

    fn end(&mut self, name: &str) -> Result<()> {
        (**self).end(name)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn read_attributes(start: &BytesStart<'_>) -> Result<NodeMap> {
    let mut attributes = NodeMap::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let name = utf8(attribute.key.as_ref())?;
        let value = attribute.unescape_value()?.into_owned();
        attributes.put(name, value);
    }
    Ok(attributes)
}

/// Reads tokens from an XML document with `quick-xml`.
///
/// Declarations, comments, processing instructions and doctypes are dropped.
/// Empty elements are reported as a start token followed by an end token.
pub struct XmlEventReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    pending: VecDeque<Event>,
}

impl<R: BufRead> XmlEventReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.trim_text(false);
        XmlEventReader {
            reader,
            buf: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn fill(&mut self) -> Result<bool> {
        loop {
            self.buf.clear();
            let position = Position::new(self.reader.buffer_position() as u64);
            match self.reader.read_event_into(&mut self.buf)? {
                XmlEvent::Start(start) => {
                    self.pending.push_back(Event::Start {
                        name: utf8(start.name().as_ref())?,
                        attributes: read_attributes(&start)?,
                        position,
                    });
                }
                XmlEvent::Empty(start) => {
                    let name = utf8(start.name().as_ref())?;
                    self.pending.push_back(Event::Start {
                        name: name.clone(),
                        attributes: read_attributes(&start)?,
                        position,
                    });
                    self.pending.push_back(Event::End { name });
                }
                XmlEvent::End(end) => {
                    self.pending.push_back(Event::End {
                        name: utf8(end.name().as_ref())?,
                    });
                }
                XmlEvent::Text(text) => {
                    let value = text.unescape()?.into_owned();
                    if value.is_empty() {
                        continue;
                    }
                    self.pending.push_back(Event::Text(value));
                }
                XmlEvent::CData(data) => {
                    self.pending.push_back(Event::Text(utf8(&data)?));
                }
                XmlEvent::Eof => return Ok(false),
                _ => continue,
            }
            return Ok(true);
        }
    }
}

impl<R: BufRead> EventReader for XmlEventReader<R> {
    fn peek(&mut self) -> Result<Option<&Event>> {
        if self.pending.is_empty() && !self.fill()? {
            return Ok(None);
        }
        Ok(self.pending.front())
    }

    fn next(&mut self) -> Result<Option<Event>> {
        if self.pending.is_empty() && !self.fill()? {
            return Ok(None);
        }
        Ok(self.pending.pop_front())
    }
}

/// Writes tokens as an XML document with `quick-xml`.
///
/// A start tag is held back until the next token so that elements without
/// content are written in their short form.
pub struct XmlEventWriter<W: Write> {
    writer: Writer<W>,
    pending: Option<BytesStart<'static>>,
}

impl<W: Write> XmlEventWriter<W> {
    /// Creates a writer, emitting the declaration line when the format
    /// names an encoding.
    pub fn new(output: W, format: &Format) -> Result<Self> {
        let mut writer = if format.indent > 0 {
            Writer::new_with_indent(output, b' ', format.indent)
        } else {
            Writer::new(output)
        };
        if let Some(encoding) = &format.encoding {
            writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some(encoding.as_str()), None)))?;
        }
        Ok(XmlEventWriter {
            writer,
            pending: None,
        })
    }

    fn release(&mut self) -> Result<()> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(XmlEvent::Start(start))?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> EventWriter for XmlEventWriter<W> {
    fn start(&mut self, name: &str, attributes: &NodeMap) -> Result<()> {
        self.release()?;
        let mut start = BytesStart::new(name.to_string());
        for attribute in attributes {
            start.push_attribute((attribute.name(), attribute.value()));
        }
        self.pending = Some(start);
        Ok(())
    }

    fn text(&mut self, value: &str, mode: Mode) -> Result<()> {
        self.release()?;
        match mode {
            Mode::Data => {
                // A section cannot contain its own terminator, so split it.
                let mut rest = value;
                while let Some(at) = rest.find("]]>") {
                    self.writer.write_event(XmlEvent::CData(BytesCData::new(&rest[..at + 2])))?;
                    rest = &rest[at + 2..];
                }
                self.writer.write_event(XmlEvent::CData(BytesCData::new(rest)))?;
            }
            _ => self.writer.write_event(XmlEvent::Text(BytesText::new(value)))?,
        }
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        match self.pending.take() {
            Some(start) => self.writer.write_event(XmlEvent::Empty(start))?,
            None => self.writer.write_event(XmlEvent::End(BytesEnd::new(name)))?,
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.release()?;
        self.writer.get_mut().flush()?;
        Ok(())
    }
}

/// A recorded token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logged {
    Start(String, Vec<(String, String)>),
    Text(String, Mode),
    End(String),
}

/// An in-memory [`EventWriter`] that records every token it receives.
///
/// Also usable as an [`EventReader`] that replays the recording.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Logged>,
    replay: VecDeque<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Logged] {
        &self.events
    }

    /// Returns true if every start token is closed by a matching end token
    /// in properly nested order.
    pub fn is_balanced(&self) -> bool {
        let mut open = Vec::new();
        for event in &self.events {
            match event {
                Logged::Start(name, _) => open.push(name.as_str()),
                Logged::End(name) => {
                    if open.pop() != Some(name.as_str()) {
                        return false;
                    }
                }
                Logged::Text(..) => {}
            }
        }
        open.is_empty()
    }

    /// Prepares the recorded tokens for reading back.
    pub fn rewind(&mut self) {
        self.replay = self
            .events
            .iter()
            .map(|event| match event {
                Logged::Start(name, attributes) => Event::Start {
                    name: name.clone(),
                    attributes: attributes.iter().cloned().collect(),
                    position: Position::default(),
                },
                Logged::Text(value, _) => Event::Text(value.clone()),
                Logged::End(name) => Event::End { name: name.clone() },
            })
            .collect();
    }
}

impl EventWriter for EventLog {
    fn start(&mut self, name: &str, attributes: &NodeMap) -> Result<()> {
        let attributes = attributes
            .iter()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();
        self.events.push(Logged::Start(name.to_string(), attributes));
        Ok(())
    }

    fn text(&mut self, value: &str, mode: Mode) -> Result<()> {
        self.events.push(Logged::Text(value.to_string(), mode));
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.events.push(Logged::End(name.to_string()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl EventReader for EventLog {
    fn peek(&mut self) -> Result<Option<&Event>> {
        Ok(self.replay.front())
    }

    fn next(&mut self) -> Result<Option<Event>> {
        Ok(self.replay.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(xml: &str) -> Vec<Event> {
        let mut reader = XmlEventReader::new(xml.as_bytes());
        let mut events = Vec::new();
        while let Some(event) = reader.next().unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn reader_expands_empty_elements() {
        let events = read_all(r#"<a x="1"/>"#);
        assert_eq!(events.len(), 2);
        match &events[0] {
            Event::Start { name, attributes, .. } => {
                assert_eq!(name, "a");
                assert_eq!(attributes.value("x"), Some("1"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(events[1], Event::End { name: "a".to_string() });
    }

    #[test]
    fn reader_unescapes_text_and_attributes() {
        let events = read_all(r#"<?xml version="1.0"?><a v="&lt;&amp;&gt;">&quot;x&apos;</a>"#);
        match &events[0] {
            Event::Start { attributes, .. } => assert_eq!(attributes.value("v"), Some("<&>")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(events[1], Event::Text("\"x'".to_string()));
    }

    #[test]
    fn reader_merges_cdata_as_text() {
        let events = read_all("<a><![CDATA[<raw>]]></a>");
        assert_eq!(events[1], Event::Text("<raw>".to_string()));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut reader = XmlEventReader::new("<a>text</a>".as_bytes());
        assert!(matches!(reader.peek().unwrap(), Some(Event::Start { .. })));
        assert!(matches!(reader.next().unwrap(), Some(Event::Start { .. })));
        assert!(matches!(reader.peek().unwrap(), Some(Event::Text(_))));
        assert!(matches!(reader.next().unwrap(), Some(Event::Text(_))));
    }

    #[test]
    fn writer_escapes_and_shortens_empty() {
        let mut writer = XmlEventWriter::new(Vec::new(), &Format::new(0)).unwrap();
        let attributes: NodeMap = [("v", "a<b")].into_iter().collect();
        writer.start("root", &NodeMap::new()).unwrap();
        writer.start("item", &attributes).unwrap();
        writer.end("item").unwrap();
        writer.start("text", &NodeMap::new()).unwrap();
        writer.text("1 & 2", Mode::Escape).unwrap();
        writer.end("text").unwrap();
        writer.end("root").unwrap();
        writer.finish().unwrap();

        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(xml, r#"<root><item v="a&lt;b"/><text>1 &amp; 2</text></root>"#);
    }

    #[test]
    fn writer_emits_cdata_and_declaration() {
        let format = Format::new(0).with_encoding("UTF-8");
        let mut writer = XmlEventWriter::new(Vec::new(), &format).unwrap();
        writer.start("a", &NodeMap::new()).unwrap();
        writer.text("<raw>", Mode::Data).unwrap();
        writer.end("a").unwrap();
        writer.finish().unwrap();

        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.ends_with("<a><![CDATA[<raw>]]></a>"));
    }

    #[test]
    fn cdata_terminator_is_split() {
        let mut writer = XmlEventWriter::new(Vec::new(), &Format::new(0)).unwrap();
        writer.start("a", &NodeMap::new()).unwrap();
        writer.text("a]]>b", Mode::Data).unwrap();
        writer.end("a").unwrap();
        writer.finish().unwrap();

        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(xml, "<a><![CDATA[a]]]]><![CDATA[>b]]></a>");
        let text: String = read_all(&xml)
            .into_iter()
            .filter_map(|e| match e {
                Event::Text(text) => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(text, "a]]>b");
    }

    #[test]
    fn empty_cdata_is_kept() {
        let events = read_all("<a><![CDATA[]]></a>");
        assert_eq!(events[1], Event::Text(String::new()));
    }

    #[test]
    fn log_detects_imbalance() {
        let mut log = EventLog::new();
        log.start("a", &NodeMap::new()).unwrap();
        log.start("b", &NodeMap::new()).unwrap();
        log.end("a").unwrap();
        assert!(!log.is_balanced());
    }
}
