//! Relationship store for OOXML parts
//!
//! Every part that references other parts owns a `.rels` file mapping
//! relationship IDs to targets. The package root keeps its store at
//! `_rels/.rels`; the main document at `word/_rels/document.xml.rels`.
//!
//! # Example
//!
//! ```
//! use docxpack_ooxml::relationships::{Relationships, TargetMode};
//!
//! let mut rels = Relationships::new("word/_rels/document.xml.rels");
//! let image = rels.add_image("media/image1.png");
//! let link = rels.add_hyperlink("https://example.com");
//!
//! assert_eq!(image, "rId1");
//! assert_eq!(link, "rId2");
//! assert_eq!(rels.get(&link).unwrap().target_mode, TargetMode::External);
//! ```

use quick_xml::events::Event;

use crate::error::{OoxmlError, Result};
use crate::xml::{attr, escape_xml, XmlReader, XML_DECLARATION};

/// OOXML namespace for relationships
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Main document relationship type
pub const TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
/// Styles relationship type
pub const TYPE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
/// Image relationship type
pub const TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
/// Hyperlink relationship type
pub const TYPE_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
/// Numbering relationship type
pub const TYPE_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
/// Settings relationship type
pub const TYPE_SETTINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
/// Font table relationship type
pub const TYPE_FONT_TABLE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/fontTable";
/// Theme relationship type
pub const TYPE_THEME: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

/// Whether a target lives inside the package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// Target is a part path relative to the owning part
    #[default]
    Internal,
    /// Target is an external URI
    External,
}

/// A single relationship entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID, e.g. `rId3`
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path or URL
    pub target: String,
    /// Internal part or external resource
    pub target_mode: TargetMode,
}

/// Ordered relationships of one part plus the path of its `.rels` file
///
/// IDs are only minted through [`next_id`](Self::next_id), so they are never
/// reused while the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationships {
    path: String,
    entries: Vec<Relationship>,
    counter: u64,
}

impl Relationships {
    /// Create an empty store saved at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            counter: 0,
        }
    }

    /// Parse a `.rels` part loaded from `path`
    pub fn parse(path: impl Into<String>, xml: &[u8]) -> Result<Self> {
        let path = path.into();
        let entries = parse_entries(xml).map_err(|source| OoxmlError::MalformedRelationships {
            path: path.clone(),
            source,
        })?;

        let max_numeric = entries
            .iter()
            .filter_map(|rel| extract_id_number(&rel.id))
            .max()
            .unwrap_or(0);
        let counter = max_numeric.max(entries.len() as u64);

        Ok(Self {
            path,
            entries,
            counter,
        })
    }

    /// Mint a fresh relationship ID
    ///
    /// Advances past any ID already present in the store.
    pub fn next_id(&mut self) -> String {
        loop {
            self.counter += 1;
            let id = format!("rId{}", self.counter);
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// The ID the next call to [`next_id`](Self::next_id) would return
    pub fn peek_next_id(&self) -> String {
        let mut counter = self.counter;
        loop {
            counter += 1;
            let id = format!("rId{}", counter);
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Append a relationship with a freshly minted ID and return the ID
    pub fn add(
        &mut self,
        rel_type: impl Into<String>,
        target: impl Into<String>,
        target_mode: TargetMode,
    ) -> String {
        let id = self.next_id();
        self.entries.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.into(),
            target: target.into(),
            target_mode,
        });
        id
    }

    /// Add an internal image relationship
    pub fn add_image(&mut self, target: impl Into<String>) -> String {
        self.add(TYPE_IMAGE, target, TargetMode::Internal)
    }

    /// Add an external hyperlink relationship
    pub fn add_hyperlink(&mut self, url: impl Into<String>) -> String {
        self.add(TYPE_HYPERLINK, url, TargetMode::External)
    }

    /// Look up a relationship by ID
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.entries.iter().find(|rel| rel.id == id)
    }

    /// Target of a relationship by ID
    pub fn target(&self, id: &str) -> Option<&str> {
        self.get(id).map(|rel| rel.target.as_str())
    }

    /// First relationship of the given type
    pub fn find_by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.entries.iter().find(|rel| rel.rel_type == rel_type)
    }

    /// Check if a relationship ID exists
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|rel| rel.id == id)
    }

    /// Path of the `.rels` part
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no relationships
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over relationships in document order
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }

    /// Serialize to a `.rels` part
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS));

        for rel in &self.entries {
            xml.push_str("<Relationship");
            xml.push_str(&format!(r#" Id="{}""#, escape_xml(&rel.id)));
            xml.push_str(&format!(r#" Type="{}""#, escape_xml(&rel.rel_type)));
            xml.push_str(&format!(r#" Target="{}""#, escape_xml(&rel.target)));
            if rel.target_mode == TargetMode::External {
                xml.push_str(r#" TargetMode="External""#);
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }
}

fn parse_entries(xml: &[u8]) -> std::result::Result<Vec<Relationship>, quick_xml::Error> {
    let mut reader = XmlReader::new(xml);
    let mut entries = Vec::new();

    loop {
        match reader.next_event()?.1 {
            Event::Empty(ref e) | Event::Start(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let (Some(id), Some(target)) = (attr(e, "Id"), attr(e, "Target")) else {
                    continue;
                };
                let target_mode = match attr(e, "TargetMode").as_deref() {
                    Some(mode) if mode.eq_ignore_ascii_case("External") => TargetMode::External,
                    _ => TargetMode::Internal,
                };
                entries.push(Relationship {
                    id,
                    rel_type: attr(e, "Type").unwrap_or_default(),
                    target,
                    target_mode,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Largest ID suffix that feeds the counter; minting stays far below `u64::MAX`
const MAX_COUNTED_ID: u64 = u64::MAX >> 1;

/// Numeric portion of a relationship ID (`rId5` -> 5)
///
/// Suffixes above [`MAX_COUNTED_ID`] are treated like named IDs.
fn extract_id_number(id: &str) -> Option<u64> {
    id.strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))
        .and_then(|num_str| num_str.parse::<u64>().ok())
        .filter(|n| *n <= MAX_COUNTED_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_RELS: &str = "word/_rels/document.xml.rels";

    #[test]
    fn test_parse_relationships() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
            <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
        </Relationships>"#;

        let rels = Relationships::parse(DOC_RELS, xml).unwrap();

        assert_eq!(rels.path(), DOC_RELS);
        assert_eq!(rels.len(), 2);
        assert_eq!(rels.target("rId1"), Some("https://example.com"));
        assert_eq!(rels.get("rId1").unwrap().target_mode, TargetMode::External);
        assert_eq!(rels.get("rId2").unwrap().target_mode, TargetMode::Internal);
        assert_eq!(rels.find_by_type(TYPE_STYLES).unwrap().id, "rId2");
        assert!(rels.find_by_type(TYPE_NUMBERING).is_none());
    }

    #[test]
    fn test_malformed_relationships() {
        let err = Relationships::parse(DOC_RELS, b"<Relationships><Relationship></Oops>")
            .unwrap_err();
        match err {
            OoxmlError::MalformedRelationships { path, .. } => assert_eq!(path, DOC_RELS),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ids_start_at_one() {
        let mut rels = Relationships::new(DOC_RELS);
        assert_eq!(rels.peek_next_id(), "rId1");
        assert_eq!(rels.next_id(), "rId1");
        assert_eq!(rels.next_id(), "rId2");
    }

    #[test]
    fn test_add_continues_from_highest_id() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
            <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
        </Relationships>"#;

        let mut rels = Relationships::parse(DOC_RELS, xml).unwrap();
        assert_eq!(rels.add_image("media/image1.png"), "rId6");
    }

    #[test]
    fn test_add_continues_from_count_with_named_ids() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="R1a2b" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
            <Relationship Id="Rtheme" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
        </Relationships>"#;

        let mut rels = Relationships::parse(DOC_RELS, xml).unwrap();
        assert_eq!(rels.next_id(), "rId3");
    }

    #[test]
    fn test_next_id_skips_existing_sparse_ids() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="custom" Type="t" Target="a.xml"/>
            <Relationship Id="rId2" Type="t" Target="b.xml"/>
            <Relationship Id="rId3" Type="t" Target="c.xml"/>
            <Relationship Id="other" Type="t" Target="d.xml"/>
        </Relationships>"#;

        // count is 4, highest numeric suffix is 3
        let mut rels = Relationships::parse(DOC_RELS, xml).unwrap();
        assert_eq!(rels.next_id(), "rId5");
    }

    #[test]
    fn test_next_id_past_u32_range() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId4294967295" Type="t" Target="a.xml"/>
        </Relationships>"#;

        let mut rels = Relationships::parse(DOC_RELS, xml).unwrap();
        assert_eq!(rels.peek_next_id(), "rId4294967296");
        assert_eq!(rels.next_id(), "rId4294967296");
        assert_eq!(rels.next_id(), "rId4294967297");
    }

    #[test]
    fn test_oversized_suffix_is_treated_as_named() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId99999999999999999999999" Type="t" Target="a.xml"/>
            <Relationship Id="rId18446744073709551615" Type="t" Target="b.xml"/>
        </Relationships>"#;

        let mut rels = Relationships::parse(DOC_RELS, xml).unwrap();
        assert_eq!(rels.next_id(), "rId3");
        assert_eq!(rels.next_id(), "rId4");
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut rels = Relationships::new(DOC_RELS);
        let ids: Vec<u64> = (0..10)
            .map(|_| extract_id_number(&rels.next_id()).unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_to_xml() {
        let mut rels = Relationships::new("_rels/.rels");
        rels.add(TYPE_OFFICE_DOCUMENT, "word/document.xml", TargetMode::Internal);
        rels.add_hyperlink("https://example.com/?a=1&b=2");

        let xml = rels.to_xml();

        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(&format!(r#"xmlns="{}""#, RELATIONSHIPS_NS)));
        assert!(xml.contains(&format!(
            r#"<Relationship Id="rId1" Type="{}" Target="word/document.xml"/>"#,
            TYPE_OFFICE_DOCUMENT
        )));
        assert!(xml.contains(&format!(
            r#"<Relationship Id="rId2" Type="{}" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>"#,
            TYPE_HYPERLINK
        )));
    }

    #[test]
    fn test_serialize_and_reparse() {
        let mut rels = Relationships::new(DOC_RELS);
        rels.add(TYPE_STYLES, "styles.xml", TargetMode::Internal);
        rels.add_image("media/image1.png");
        rels.add_hyperlink("https://example.com");

        let reparsed = Relationships::parse(DOC_RELS, rels.to_xml().as_bytes()).unwrap();
        assert_eq!(reparsed, rels);
    }

    #[test]
    fn test_xml_escaping_roundtrip() {
        let mut rels = Relationships::new(DOC_RELS);
        rels.add(TYPE_STYLES, "file with <special> & \"chars\".xml", TargetMode::Internal);

        let xml = rels.to_xml();
        assert!(xml.contains("&lt;special&gt;"));
        assert!(xml.contains("&quot;chars&quot;"));

        let reparsed = Relationships::parse(DOC_RELS, xml.as_bytes()).unwrap();
        assert_eq!(
            reparsed.target("rId1"),
            Some("file with <special> & \"chars\".xml")
        );
    }

    #[test]
    fn test_iteration_order() {
        let mut rels = Relationships::new(DOC_RELS);
        rels.add("type1", "first.xml", TargetMode::Internal);
        rels.add("type2", "second.xml", TargetMode::Internal);
        rels.add("type3", "third.xml", TargetMode::Internal);

        let targets: Vec<&str> = rels.iter().map(|rel| rel.target.as_str()).collect();
        assert_eq!(targets, vec!["first.xml", "second.xml", "third.xml"]);
    }

    #[test]
    fn test_extract_id_number() {
        assert_eq!(extract_id_number("rId1"), Some(1));
        assert_eq!(extract_id_number("rId123"), Some(123));
        assert_eq!(extract_id_number("RId5"), Some(5));
        assert_eq!(extract_id_number("invalid"), None);
        assert_eq!(extract_id_number("rIdabc"), None);
        assert_eq!(extract_id_number("rId4294967296"), Some(4_294_967_296));
        assert_eq!(extract_id_number("rId99999999999999999999999"), None);
    }
}
