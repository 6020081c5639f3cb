//! Main document part (`word/document.xml`)
//!
//! The document owns its body, the root element's namespace declarations and
//! its relationship store. Block content the model does not interpret is kept
//! verbatim so that reading and writing a document preserves it.

use quick_xml::events::{BytesStart, Event};

use crate::drawing::Drawing;
use crate::error::{OoxmlError, Result};
use crate::paragraph::Paragraph;
use crate::paths::rels_path_for;
use crate::relationships::Relationships;
use crate::table::{RowChild, Table, TableChild};
use crate::units::inches_to_twips;
use crate::xml::{
    attrs, push_attrs, RawXml, XmlRead, XmlReader, XmlResult, XmlWrite, XML_DECLARATION,
};

/// Default path of the main document part
pub const DEFAULT_DOCUMENT_PATH: &str = "word/document.xml";

/// Namespaces declared on a new document root
pub const DEFAULT_NAMESPACES: &[(&str, &str)] = &[
    ("xmlns:w", "http://schemas.openxmlformats.org/wordprocessingml/2006/main"),
    ("xmlns:o", "urn:schemas-microsoft-com:office:office"),
    ("xmlns:r", "http://schemas.openxmlformats.org/officeDocument/2006/relationships"),
    ("xmlns:v", "urn:schemas-microsoft-com:vml"),
    ("xmlns:w10", "urn:schemas-microsoft-com:office:word"),
    ("xmlns:wp", "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"),
    ("xmlns:wps", "http://schemas.microsoft.com/office/word/2010/wordprocessingShape"),
    ("xmlns:wpg", "http://schemas.microsoft.com/office/word/2010/wordprocessingGroup"),
    ("xmlns:mc", "http://schemas.openxmlformats.org/markup-compatibility/2006"),
    ("xmlns:wp14", "http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing"),
    ("xmlns:w14", "http://schemas.microsoft.com/office/word/2010/wordml"),
    ("xmlns:w15", "http://schemas.microsoft.com/office/word/2012/wordml"),
    ("xmlns:a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    ("xmlns:pic", "http://schemas.openxmlformats.org/drawingml/2006/picture"),
];

/// Block-level content of a body or table cell
#[derive(Debug, Clone, PartialEq)]
pub enum BlockChild {
    /// A paragraph
    Paragraph(Paragraph),
    /// A table
    Table(Table),
    /// Content controls, custom XML, bookmarks and the like, kept verbatim
    Raw(RawXml),
}

/// Read one block-level element
pub(crate) fn read_block(
    reader: &mut XmlReader<'_>,
    offset: usize,
    e: &BytesStart<'_>,
    empty: bool,
) -> XmlResult<BlockChild> {
    Ok(match e.local_name().as_ref() {
        b"p" => BlockChild::Paragraph(Paragraph::read_xml(reader, e, empty)?),
        b"tbl" => BlockChild::Table(Table::read_xml(reader, e, empty)?),
        _ => BlockChild::Raw(reader.capture(offset, e, empty)?),
    })
}

/// Write block-level elements in order
pub(crate) fn write_blocks(out: &mut String, blocks: &[BlockChild]) {
    for block in blocks {
        match block {
            BlockChild::Paragraph(p) => p.write_xml(out),
            BlockChild::Table(t) => t.write_xml(out),
            BlockChild::Raw(raw) => raw.write_xml(out),
        }
    }
}

/// Section properties for a US Letter page with one-inch margins
pub fn letter_section() -> RawXml {
    let inch = inches_to_twips(1.0);
    RawXml(format!(
        r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"/><w:pgMar w:top="{inch}" w:right="{inch}" w:bottom="{inch}" w:left="{inch}" w:header="{half}" w:footer="{half}" w:gutter="0"/><w:cols w:space="{half}"/><w:docGrid w:linePitch="360"/></w:sectPr>"#,
        inches_to_twips(8.5),
        inches_to_twips(11.0),
        half = inch / 2,
    ))
}

/// Document body (`w:body`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    /// Attributes of `w:body`
    pub attributes: Vec<(String, String)>,
    /// Block content in document order
    pub children: Vec<BlockChild>,
    /// Final section properties (`w:sectPr`)
    pub section: Option<RawXml>,
}

impl Body {
    /// Create an empty body with no section properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block and return a reference to it
    pub fn push(&mut self, block: BlockChild) -> &mut BlockChild {
        self.children.push(block);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Append a paragraph
    pub fn add_paragraph(&mut self, paragraph: Paragraph) -> &mut Paragraph {
        match self.push(BlockChild::Paragraph(paragraph)) {
            BlockChild::Paragraph(p) => p,
            _ => unreachable!("paragraph was just pushed"),
        }
    }

    /// Append a table
    pub fn add_table(&mut self, table: Table) -> &mut Table {
        match self.push(BlockChild::Table(table)) {
            BlockChild::Table(t) => t,
            _ => unreachable!("table was just pushed"),
        }
    }
}

impl XmlRead for Body {
    fn read_xml(reader: &mut XmlReader<'_>, start: &BytesStart<'_>, empty: bool) -> XmlResult<Self> {
        let mut body = Body {
            attributes: attrs(start),
            ..Body::default()
        };
        if empty {
            return Ok(body);
        }
        reader.read_children(|r, offset, e, empty| {
            if e.local_name().as_ref() == b"sectPr" && body.section.is_none() {
                body.section = Some(r.capture(offset, e, empty)?);
            } else {
                body.children.push(read_block(r, offset, e, empty)?);
            }
            Ok(())
        })?;
        Ok(body)
    }
}

impl XmlWrite for Body {
    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:body");
        push_attrs(out, &self.attributes);
        out.push('>');
        write_blocks(out, &self.children);
        if let Some(section) = &self.section {
            section.write_xml(out);
        }
        out.push_str("</w:body>");
    }
}

/// The main document part with its relationships
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    path: String,
    /// Attributes of the root element, namespace declarations included
    pub root_attributes: Vec<(String, String)>,
    /// Root children that precede the body (`w:background`)
    pub leading: Vec<RawXml>,
    pub body: Body,
    relationships: Relationships,
}

impl Document {
    /// Create an empty document at `path` with a Letter page section
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let mut root_attributes: Vec<(String, String)> = DEFAULT_NAMESPACES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        root_attributes.push(("mc:Ignorable".to_string(), "w14 wp14 w15".to_string()));

        Self {
            relationships: Relationships::new(rels_path_for(&path)),
            path,
            root_attributes,
            leading: Vec::new(),
            body: Body {
                attributes: Vec::new(),
                children: Vec::new(),
                section: Some(letter_section()),
            },
        }
    }

    /// Parse the document part stored at `path`
    pub fn parse(path: impl Into<String>, xml: &[u8], relationships: Relationships) -> Result<Self> {
        let path = path.into();
        let (root_attributes, leading, body) =
            read_document(xml).map_err(|source| OoxmlError::MalformedDocument {
                path: path.clone(),
                source,
            })?;

        let mut doc = Self {
            path,
            root_attributes,
            leading,
            body,
            relationships,
        };
        doc.ensure_namespaces();
        Ok(doc)
    }

    /// Declare any default namespace the root element is missing
    fn ensure_namespaces(&mut self) {
        for (key, value) in DEFAULT_NAMESPACES {
            if !self.root_attributes.iter().any(|(k, _)| k == key) {
                self.root_attributes
                    .push((key.to_string(), value.to_string()));
            }
        }
    }

    /// Path of the part inside the package
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Relationships owned by the document
    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Mutable relationships owned by the document
    pub fn relationships_mut(&mut self) -> &mut Relationships {
        &mut self.relationships
    }

    /// All paragraphs, including those inside tables
    pub fn paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        collect_paragraphs(&self.body.children, &mut out);
        out
    }

    /// Tables at body level
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.children.iter().filter_map(|b| match b {
            BlockChild::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Drawings in document order
    pub fn drawings(&self) -> Vec<&Drawing> {
        self.paragraphs()
            .into_iter()
            .flat_map(|p| p.drawings())
            .collect()
    }

    /// Next unused drawing object ID
    pub fn next_drawing_id(&self) -> u32 {
        self.drawings()
            .iter()
            .filter_map(|d| d.object_id())
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Text of every paragraph, one per line
    pub fn plain_text(&self) -> String {
        self.paragraphs()
            .iter()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serialize the document part
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<w:document");
        push_attrs(&mut xml, &self.root_attributes);
        xml.push('>');
        for raw in &self.leading {
            raw.write_xml(&mut xml);
        }
        self.body.write_xml(&mut xml);
        xml.push_str("</w:document>");
        xml
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_PATH)
    }
}

type DocumentParts = (Vec<(String, String)>, Vec<RawXml>, Body);

fn read_document(xml: &[u8]) -> XmlResult<DocumentParts> {
    let mut reader = XmlReader::new(xml);
    let mut root_attributes = Vec::new();
    let mut leading = Vec::new();
    let mut body = None;

    loop {
        match reader.next_event()?.1 {
            Event::Start(ref root) => {
                root_attributes = attrs(root);
                reader.read_children(|r, offset, e, empty| {
                    if e.local_name().as_ref() == b"body" && body.is_none() {
                        body = Some(Body::read_xml(r, e, empty)?);
                    } else {
                        leading.push(r.capture(offset, e, empty)?);
                    }
                    Ok(())
                })?;
                break;
            }
            Event::Empty(ref root) => {
                root_attributes = attrs(root);
                break;
            }
            Event::Eof => {
                return Err(quick_xml::Error::from(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "document part has no root element",
                )))
            }
            _ => {}
        }
    }

    Ok((root_attributes, leading, body.unwrap_or_default()))
}

fn collect_paragraphs<'a>(blocks: &'a [BlockChild], out: &mut Vec<&'a Paragraph>) {
    for block in blocks {
        match block {
            BlockChild::Paragraph(p) => out.push(p),
            BlockChild::Table(table) => {
                for child in &table.children {
                    let TableChild::Row(row) = child else { continue };
                    for cell in &row.children {
                        if let RowChild::Cell(cell) = cell {
                            collect_paragraphs(&cell.children, out);
                        }
                    }
                }
            }
            BlockChild::Raw(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paragraph::ParagraphChild;

    const DOC_RELS: &str = "word/_rels/document.xml.rels";

    fn parse(xml: &str) -> Document {
        Document::parse(
            DEFAULT_DOCUMENT_PATH,
            xml.as_bytes(),
            Relationships::new(DOC_RELS),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_simple_document() {
        let doc = parse(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Hello</w:t></w:r></w:p>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>World</w:t></w:r></w:p>
    <w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>
  </w:body>
</w:document>"#,
        );

        assert_eq!(doc.paragraphs().len(), 2);
        assert_eq!(doc.plain_text(), "Hello\nWorld");
        assert_eq!(doc.paragraphs()[1].style_id(), Some("Heading1"));
        assert!(doc.body.section.as_ref().unwrap().0.contains("11906"));
    }

    #[test]
    fn test_parse_empty_document() {
        let doc = parse(r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body/></w:document>"#);
        assert!(doc.body.children.is_empty());
        assert!(doc.body.section.is_none());
        assert_eq!(doc.plain_text(), "");
    }

    #[test]
    fn test_malformed_document() {
        let err = Document::parse(
            DEFAULT_DOCUMENT_PATH,
            b"<w:document><w:body><w:p></w:body></w:document>",
            Relationships::new(DOC_RELS),
        )
        .unwrap_err();
        match err {
            OoxmlError::MalformedDocument { path, .. } => assert_eq!(path, DEFAULT_DOCUMENT_PATH),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_document_without_root_is_rejected() {
        for xml in [
            b"".as_slice(),
            b"just some text".as_slice(),
            br#"<?xml version="1.0" encoding="UTF-8"?>"#.as_slice(),
        ] {
            let err = Document::parse(DEFAULT_DOCUMENT_PATH, xml, Relationships::new(DOC_RELS))
                .unwrap_err();
            assert!(
                matches!(err, OoxmlError::MalformedDocument { .. }),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn test_body_attributes_survive() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml"><w14:marker/><w:p/></w:body></w:document>"#;
        let doc = parse(xml);

        assert_eq!(doc.body.attributes[0].0, "xmlns:w14");
        assert!(doc
            .to_xml()
            .contains(r#"<w:body xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml"><w14:marker/>"#));
    }

    #[test]
    fn test_unknown_blocks_survive() {
        let doc = parse(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:background w:color="FFFFFF"/><w:body><w:sdt><w:sdtContent><w:p><w:r><w:t>In control</w:t></w:r></w:p></w:sdtContent></w:sdt><w:p><w:r><w:t>After</w:t></w:r></w:p></w:body></w:document>"#,
        );

        assert_eq!(doc.leading.len(), 1);
        assert!(matches!(doc.body.children[0], BlockChild::Raw(_)));

        let xml = doc.to_xml();
        assert!(xml.contains(r#"<w:background w:color="FFFFFF"/><w:body>"#));
        assert!(xml.contains("<w:sdt><w:sdtContent><w:p><w:r><w:t>In control</w:t></w:r></w:p></w:sdtContent></w:sdt>"));

        let reparsed = parse(&xml);
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_missing_namespaces_are_declared() {
        let doc = parse(r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:custom="urn:x"><w:body/></w:document>"#);
        let xml = doc.to_xml();

        assert!(xml.contains(r#"xmlns:custom="urn:x""#));
        assert!(xml.contains(r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing""#));
        assert_eq!(xml.matches("xmlns:w=").count(), 1);
    }

    #[test]
    fn test_new_document() {
        let doc = Document::default();

        assert_eq!(doc.path(), DEFAULT_DOCUMENT_PATH);
        assert_eq!(doc.relationships().path(), DOC_RELS);
        assert!(doc.body.children.is_empty());

        let xml = doc.to_xml();
        assert!(xml.contains(r#"mc:Ignorable="w14 wp14 w15""#));
        assert!(xml.contains(r#"<w:pgSz w:w="12240" w:h="15840"/>"#));
        assert!(xml.contains(r#"w:header="720""#));
    }

    #[test]
    fn test_paragraphs_flatten_tables() {
        let mut doc = Document::default();
        doc.body.add_paragraph(Paragraph::with_text("Before"));
        let table = doc.body.add_table(Table::new());
        let row = table.add_row();
        row.add_cell().add_paragraph("A");
        row.add_cell().add_paragraph("B");
        doc.body.add_paragraph(Paragraph::with_text("After"));

        assert_eq!(doc.plain_text(), "Before\nA\nB\nAfter");
        assert_eq!(doc.tables().count(), 1);
    }

    #[test]
    fn test_next_drawing_id() {
        let mut doc = Document::default();
        assert_eq!(doc.next_drawing_id(), 1);

        let pic = crate::drawing::InlinePicture::new(4, "rId2", 1.0, 1.0);
        doc.body
            .add_paragraph(Paragraph::new())
            .add_run(crate::run::Run::new())
            .add_drawing(Drawing::Inline(pic));
        assert_eq!(doc.next_drawing_id(), 5);
    }

    #[test]
    fn test_hyperlink_paragraph_child() {
        let doc = parse(r#"<w:document xmlns:w="w" xmlns:r="r"><w:body><w:p><w:hyperlink r:id="rId3"><w:r><w:t>link</w:t></w:r></w:hyperlink></w:p></w:body></w:document>"#);
        let p = doc.paragraphs()[0];
        assert!(matches!(&p.children[0], ParagraphChild::Hyperlink(h) if h.id.as_deref() == Some("rId3")));
    }
}
