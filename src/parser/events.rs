//! Materialized XML event stream and the cursor the parsers walk it with.
//!
//! Declarations, comments, processing instructions and whitespace-only text are
//! dropped. Empty elements (`<dish/>`) become a `Start` followed by an `End`, so element
//! functions never need to care which form the producer used.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;

use super::ParseError;
use crate::fixed_point::Field;

/// An opening tag with its attributes, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    /// Tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value, unescaped.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, or a structural error when it is absent.
    pub fn require(&self, name: &str) -> Result<&str, ParseError> {
        self.attribute(name)
            .ok_or_else(|| ParseError::MissingAttribute {
                element: self.name.clone(),
                attribute: name.to_string(),
            })
    }

    /// Required attribute decoded as a fixed-point field.
    pub fn fixed(&self, name: &str, field: Field) -> Result<i64, ParseError> {
        field
            .decode(self.require(name)?)
            .map_err(|source| self.numeric(name, source))
    }

    /// Required attribute decoded as a 32-bit fixed-point field.
    pub fn fixed_i32(&self, name: &str, field: Field) -> Result<i32, ParseError> {
        field
            .decode_i32(self.require(name)?)
            .map_err(|source| self.numeric(name, source))
    }

    /// Required boolean attribute; `true` in any letter case is true, anything else false.
    pub fn flag(&self, name: &str) -> Result<bool, ParseError> {
        Ok(self.require(name)?.eq_ignore_ascii_case("true"))
    }

    fn numeric(&self, attribute: &str, source: crate::fixed_point::NumericError) -> ParseError {
        ParseError::Numeric {
            element: self.name.clone(),
            attribute: attribute.to_string(),
            source,
        }
    }
}

/// One event of a materialized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Opening tag.
    Start(Element),
    /// Closing tag.
    End(String),
    /// Non-blank text, trimmed and unescaped.
    Text(String),
}

impl fmt::Display for XmlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(element) => write!(f, "<{}>", element.name),
            Self::End(name) => write!(f, "</{}>", name),
            Self::Text(text) => write!(f, "text {:?}", text),
        }
    }
}

/// Read a whole document into owned events.
pub fn materialize(bytes: &[u8]) -> Result<Vec<XmlEvent>, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut events = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(&reader, e))?;
        match event {
            Event::Start(start) => {
                let element = element(&start).map_err(|e| xml_error(&reader, e))?;
                events.push(XmlEvent::Start(element));
            }
            Event::Empty(start) => {
                let element = element(&start).map_err(|e| xml_error(&reader, e))?;
                let name = element.name.clone();
                events.push(XmlEvent::Start(element));
                events.push(XmlEvent::End(name));
            }
            Event::End(end) => {
                let name = utf8(end.name().as_ref()).map_err(|e| xml_error(&reader, e))?;
                events.push(XmlEvent::End(name));
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| xml_error(&reader, e))?;
                if !text.trim().is_empty() {
                    events.push(XmlEvent::Text(text.trim().to_string()));
                }
            }
            Event::CData(data) => {
                let text = utf8(&data).map_err(|e| xml_error(&reader, e))?;
                if !text.trim().is_empty() {
                    events.push(XmlEvent::Text(text.trim().to_string()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(events)
}

fn element(start: &BytesStart<'_>) -> Result<Element, quick_xml::Error> {
    let name = utf8(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = utf8(attribute.key.as_ref())?;
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element { name, attributes })
}

fn utf8(bytes: &[u8]) -> Result<String, quick_xml::Error> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| quick_xml::Error::NonDecodable(Some(e)))
}

fn xml_error(reader: &Reader<&[u8]>, error: quick_xml::Error) -> ParseError {
    ParseError::Xml {
        position: reader.buffer_position(),
        message: error.to_string(),
    }
}

/// Forward-only position in a materialized document.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    events: &'a [XmlEvent],
    position: usize,
}

impl<'a> Cursor<'a> {
    /// Start at the first event.
    pub fn new(events: &'a [XmlEvent]) -> Self {
        Self { events, position: 0 }
    }

    /// The next event, without consuming it.
    pub fn peek(&self) -> Option<&'a XmlEvent> {
        self.events.get(self.position)
    }

    /// The next event if it is an opening tag.
    pub fn peek_start(&self) -> Option<&'a Element> {
        match self.peek() {
            Some(XmlEvent::Start(element)) => Some(element),
            _ => None,
        }
    }

    /// Whether the next event opens an element named `name`.
    pub fn at_start(&self, name: &str) -> bool {
        self.peek_start().is_some_and(|e| e.name == name)
    }

    fn advance(&mut self) -> Option<&'a XmlEvent> {
        let event = self.events.get(self.position)?;
        self.position += 1;
        Some(event)
    }

    /// Consume the opening tag of an element named `name`.
    pub fn open(&mut self, name: &str) -> Result<&'a Element, ParseError> {
        match self.peek() {
            Some(XmlEvent::Start(element)) if element.name == name => {
                self.position += 1;
                Ok(element)
            }
            _ => Err(self.unexpected(&format!("<{}>", name))),
        }
    }

    /// Consume any opening tag; `expected` describes it for errors.
    pub fn open_any(&mut self, expected: &str) -> Result<&'a Element, ParseError> {
        match self.peek() {
            Some(XmlEvent::Start(element)) => {
                self.position += 1;
                Ok(element)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Consume the closing tag of `name`.
    pub fn close(&mut self, name: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(XmlEvent::End(end)) if end == name => {
                self.position += 1;
                Ok(())
            }
            _ => Err(self.unexpected(&format!("</{}>", name))),
        }
    }

    /// Consume a text event; `expected` describes it for errors.
    pub fn text(&mut self, expected: &str) -> Result<&'a str, ParseError> {
        match self.peek() {
            Some(XmlEvent::Text(text)) => {
                self.position += 1;
                Ok(text)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Fail unless every event has been consumed.
    pub fn finish(mut self) -> Result<(), ParseError> {
        match self.advance() {
            None => Ok(()),
            Some(event) => Err(ParseError::UnexpectedEvent {
                expected: "end of document".to_string(),
                found: event.to_string(),
            }),
        }
    }

    /// Error describing the next event as not being `expected`.
    pub fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
            Some(event) => ParseError::UnexpectedEvent {
                expected: expected.to_string(),
                found: event.to_string(),
            },
        }
    }
}
