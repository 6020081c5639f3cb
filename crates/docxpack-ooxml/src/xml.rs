//! XML plumbing shared by every part serializer
//!
//! Elements implement [`XmlRead`] to decode themselves from an event stream
//! positioned just after their opening tag, and [`XmlWrite`] to append their
//! markup to an output buffer. Elements the model does not interpret are
//! captured as [`RawXml`] and written back unchanged.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Result type for XML decoding
pub type XmlResult<T> = std::result::Result<T, quick_xml::Error>;

/// XML declaration written at the top of every generated part
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Decode an element from the event stream
pub trait XmlRead: Sized {
    /// Read the element whose opening tag `start` was just consumed
    ///
    /// When `empty` is true the tag was self-closing and no further events
    /// belong to the element.
    fn read_xml(reader: &mut XmlReader<'_>, start: &BytesStart<'_>, empty: bool)
        -> XmlResult<Self>;
}

/// Encode an element as markup
pub trait XmlWrite {
    /// Append this element's markup to `out`
    fn write_xml(&self, out: &mut String);

    /// Markup of this element as a new string
    fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }
}

/// An element kept verbatim, including its namespace prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawXml(pub String);

impl RawXml {
    /// Local name of the captured element (`bookmarkStart` for `<w:bookmarkStart .../>`)
    pub fn local_name(&self) -> &str {
        let tag = self.0.trim_start().trim_start_matches('<');
        let end = tag
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(tag.len());
        let qualified = &tag[..end];
        qualified.rsplit(':').next().unwrap_or(qualified)
    }
}

impl XmlWrite for RawXml {
    fn write_xml(&self, out: &mut String) {
        out.push_str(self.0.trim());
    }
}

/// Event reader over an in-memory part that can slice out raw element markup
pub struct XmlReader<'a> {
    reader: Reader<&'a [u8]>,
    input: &'a [u8],
}

impl<'a> XmlReader<'a> {
    /// Create a reader that keeps whitespace text (needed inside `w:t`)
    pub fn new(input: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(false);
        Self { reader, input }
    }

    /// Next event together with the byte offset where it starts
    pub fn next_event(&mut self) -> XmlResult<(usize, Event<'a>)> {
        let offset = self.reader.buffer_position() as usize;
        let event = self.reader.read_event()?;
        Ok((offset, event))
    }

    /// Consume the rest of an element and return its full markup
    ///
    /// `offset` is where the opening tag started, as returned by
    /// [`next_event`](Self::next_event).
    pub fn capture(
        &mut self,
        offset: usize,
        start: &BytesStart<'_>,
        empty: bool,
    ) -> XmlResult<RawXml> {
        if !empty {
            self.reader.read_to_end(start.name())?;
        }
        let end = self.reader.buffer_position() as usize;
        let markup = String::from_utf8_lossy(&self.input[offset..end]).into_owned();
        Ok(RawXml(markup))
    }

    /// Skip the rest of an element
    pub fn skip(&mut self, start: &BytesStart<'_>, empty: bool) -> XmlResult<()> {
        if !empty {
            self.reader.read_to_end(start.name())?;
        }
        Ok(())
    }

    /// Collect the text content of an element up to its closing tag
    pub fn read_text(&mut self, start: &BytesStart<'_>, empty: bool) -> XmlResult<String> {
        let mut text = String::new();
        if empty {
            return Ok(text);
        }
        let mut depth = 0usize;
        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
                Event::Start(ref e) if e.name() == start.name() => depth += 1,
                Event::End(ref e) if e.name() == start.name() => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(text)
    }

    /// Iterate over the child elements of the current element
    ///
    /// Calls `on_child(reader, offset, start, empty)` for each direct child
    /// start tag; the callback must consume the child completely. Returns at
    /// the parent's closing tag.
    pub fn read_children<F>(&mut self, mut on_child: F) -> XmlResult<()>
    where
        F: FnMut(&mut XmlReader<'a>, usize, &BytesStart<'a>, bool) -> XmlResult<()>,
    {
        loop {
            let (offset, event) = self.next_event()?;
            match event {
                Event::Start(e) => on_child(self, offset, &e, false)?,
                Event::Empty(e) => on_child(self, offset, &e, true)?,
                Event::End(_) | Event::Eof => return Ok(()),
                _ => {}
            }
        }
    }
}

/// Attribute value by qualified name, falling back to the local name
pub fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    let local = name.rsplit(':').next().unwrap_or(name);
    let mut fallback = None;
    for a in e.attributes().with_checks(false).flatten() {
        if a.key.as_ref() == name.as_bytes() {
            return a.unescape_value().ok().map(Cow::into_owned);
        }
        if fallback.is_none() && a.key.local_name().as_ref() == local.as_bytes() {
            fallback = a.unescape_value().ok().map(Cow::into_owned);
        }
    }
    fallback
}

/// All attributes of a tag as `(qualified name, value)` pairs
pub fn attrs(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
            let value = a
                .unescape_value()
                .map(Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
            (key, value)
        })
        .collect()
}

/// Check that every attribute of a tag is one of `allowed`
pub fn has_only_attrs(e: &BytesStart<'_>, allowed: &[&str]) -> bool {
    e.attributes()
        .with_checks(false)
        .flatten()
        .all(|a| allowed.iter().any(|name| a.key.as_ref() == name.as_bytes()))
}

/// Attribute parsed as a number
pub fn attr_parse<T: std::str::FromStr>(e: &BytesStart<'_>, name: &str) -> Option<T> {
    attr(e, name).and_then(|v| v.trim().parse().ok())
}

/// On/off toggle such as `<w:b/>` or `<w:b w:val="0"/>`
pub fn on_off(e: &BytesStart<'_>) -> bool {
    !matches!(
        attr(e, "w:val").as_deref(),
        Some("0") | Some("false") | Some("off")
    )
}

/// Escape special XML characters in text and attribute values
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Append `<tag w:val="value"/>`
pub(crate) fn push_val(out: &mut String, tag: &str, value: &str) {
    out.push_str(&format!(r#"<{} w:val="{}"/>"#, tag, escape_xml(value)));
}

/// Append ` key="value"` for each attribute
pub(crate) fn push_attrs(out: &mut String, attributes: &[(String, String)]) {
    for (key, value) in attributes {
        out.push_str(&format!(r#" {}="{}""#, key, escape_xml(value)));
    }
}

/// Child elements of a property container, emitted in schema order
///
/// WordprocessingML property elements (`w:pPr`, `w:rPr`, `w:tblPr`, ...) are
/// `xsd:sequence`s. Modeled and preserved children are collected here with
/// their rank in `order` and written sorted, so a preserved element lands in
/// the same slot it had in the source.
pub(crate) struct Sequence {
    order: &'static [&'static str],
    items: Vec<(usize, String)>,
}

impl Sequence {
    pub(crate) fn new(order: &'static [&'static str]) -> Self {
        Self {
            order,
            items: Vec::new(),
        }
    }

    fn rank(&self, local_name: &str) -> usize {
        self.order
            .iter()
            .position(|n| *n == local_name)
            .unwrap_or(self.order.len())
    }

    /// Add a modeled child by local name
    pub(crate) fn push(&mut self, local_name: &str, markup: String) {
        self.items.push((self.rank(local_name), markup));
    }

    /// Add a preserved child
    pub(crate) fn push_raw(&mut self, raw: &RawXml) {
        self.items
            .push((self.rank(raw.local_name()), raw.0.trim().to_string()));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Write `<tag>children</tag>`, or nothing when there are no children
    pub(crate) fn write(mut self, out: &mut String, tag: &str) {
        if self.items.is_empty() {
            return;
        }
        self.items.sort_by_key(|(rank, _)| *rank);
        out.push('<');
        out.push_str(tag);
        out.push('>');
        for (_, markup) in &self.items {
            out.push_str(markup);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"a < b & "c" > 'd'"#),
            "a &lt; b &amp; &quot;c&quot; &gt; &apos;d&apos;"
        );
    }

    #[test]
    fn test_attr_qualified_and_local() {
        let xml = br#"<w:hyperlink r:id="rId4" w:history="1"/>"#;
        let mut reader = XmlReader::new(xml);
        let (_, event) = reader.next_event().unwrap();
        let Event::Empty(e) = event else {
            panic!("expected empty element");
        };

        assert_eq!(attr(&e, "r:id"), Some("rId4".to_string()));
        assert_eq!(attr(&e, "history"), Some("1".to_string()));
        assert_eq!(attr(&e, "w:anchor"), None);
    }

    #[test]
    fn test_capture_preserves_markup() {
        let xml = br#"<w:body><w:bookmarkStart w:id="0" w:name="intro"/><w:sdt><w:sdtContent><w:p/></w:sdtContent></w:sdt></w:body>"#;
        let mut reader = XmlReader::new(xml);
        reader.next_event().unwrap(); // <w:body>

        let mut captured = Vec::new();
        reader
            .read_children(|r, offset, start, empty| {
                captured.push(r.capture(offset, start, empty)?);
                Ok(())
            })
            .unwrap();

        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].0, r#"<w:bookmarkStart w:id="0" w:name="intro"/>"#);
        assert_eq!(captured[0].local_name(), "bookmarkStart");
        assert_eq!(
            captured[1].0,
            "<w:sdt><w:sdtContent><w:p/></w:sdtContent></w:sdt>"
        );
        assert_eq!(captured[1].local_name(), "sdt");
    }

    #[test]
    fn test_read_text_unescapes() {
        let xml = br#"<w:t xml:space="preserve"> a &amp; b </w:t>"#;
        let mut reader = XmlReader::new(xml);
        let (_, event) = reader.next_event().unwrap();
        let Event::Start(e) = event else {
            panic!("expected start element");
        };
        assert_eq!(reader.read_text(&e, false).unwrap(), " a & b ");
    }

    #[test]
    fn test_on_off() {
        let mut reader = XmlReader::new(br#"<w:b/><w:i w:val="0"/><w:strike w:val="true"/>"#);
        let mut values = Vec::new();
        loop {
            match reader.next_event().unwrap().1 {
                Event::Empty(e) => values.push(on_off(&e)),
                Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(values, vec![true, false, true]);
    }

    #[test]
    fn test_sequence_sorts_by_schema_rank() {
        static ORDER: &[&str] = &["pStyle", "keepNext", "spacing", "jc"];
        let mut seq = Sequence::new(ORDER);
        seq.push("jc", r#"<w:jc w:val="center"/>"#.to_string());
        seq.push_raw(&RawXml(r#"<w:keepNext/>"#.to_string()));
        seq.push("pStyle", r#"<w:pStyle w:val="Title"/>"#.to_string());
        seq.push_raw(&RawXml(r#"<w:unknownThing/>"#.to_string()));

        let mut out = String::new();
        seq.write(&mut out, "w:pPr");
        assert_eq!(
            out,
            r#"<w:pPr><w:pStyle w:val="Title"/><w:keepNext/><w:jc w:val="center"/><w:unknownThing/></w:pPr>"#
        );
    }

    #[test]
    fn test_empty_sequence_writes_nothing() {
        let seq = Sequence::new(&["b"]);
        assert!(seq.is_empty());
        let mut out = String::new();
        seq.write(&mut out, "w:rPr");
        assert!(out.is_empty());
    }
}
