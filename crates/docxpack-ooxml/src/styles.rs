//! Style definitions (`word/styles.xml`)
//!
//! The styles part is kept byte-for-byte; a parsed [`StyleSheet`] alongside
//! it answers lookups such as "is `Heading2` a paragraph style?".

use std::collections::{HashMap, HashSet};

use quick_xml::events::Event;

use crate::error::{OoxmlError, Result};
use crate::xml::{attr, attr_parse, XmlReader, XmlResult};

/// Default path of the styles part
pub const DEFAULT_STYLES_PATH: &str = "word/styles.xml";

/// Type of style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleType {
    /// Paragraph style
    Paragraph,
    /// Character (run) style
    Character,
    /// Table style
    Table,
    /// Numbering style
    Numbering,
}

impl StyleType {
    fn parse(value: &str) -> Self {
        match value {
            "character" => Self::Character,
            "table" => Self::Table,
            "numbering" => Self::Numbering,
            _ => Self::Paragraph,
        }
    }
}

/// A Word style definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    /// Style ID (used in document references)
    pub id: String,
    /// Display name
    pub name: String,
    pub style_type: StyleType,
    /// Base style ID (for inheritance)
    pub based_on: Option<String>,
    /// Next style ID (for following paragraphs)
    pub next: Option<String>,
    /// Marked `w:default="1"`
    pub is_default: bool,
    /// Outline level (0-8, where 0 = Heading 1)
    pub outline_level: Option<u8>,
}

/// Collection of styles, keyed by type and ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    styles: HashMap<(StyleType, String), Style>,
}

impl StyleSheet {
    /// Parse a styles part
    pub fn parse(xml: &[u8]) -> XmlResult<Self> {
        let mut reader = XmlReader::new(xml);
        let mut sheet = StyleSheet::default();

        loop {
            match reader.next_event()?.1 {
                Event::Start(ref e) if e.local_name().as_ref() == b"style" => {
                    let mut style = Style {
                        id: attr(e, "w:styleId").unwrap_or_default(),
                        name: String::new(),
                        style_type: StyleType::parse(attr(e, "w:type").as_deref().unwrap_or("")),
                        based_on: None,
                        next: None,
                        is_default: matches!(attr(e, "w:default").as_deref(), Some("1" | "true")),
                        outline_level: None,
                    };
                    reader.read_children(|r, _, child, empty| {
                        match child.local_name().as_ref() {
                            b"name" => style.name = attr(child, "w:val").unwrap_or_default(),
                            b"basedOn" => style.based_on = attr(child, "w:val"),
                            b"next" => style.next = attr(child, "w:val"),
                            b"pPr" if !empty => {
                                // outlineLvl sits one level down
                                r.read_children(|r2, _, grand, gempty| {
                                    if grand.local_name().as_ref() == b"outlineLvl" {
                                        style.outline_level = attr_parse(grand, "w:val");
                                    }
                                    r2.skip(grand, gempty)
                                })?;
                                return Ok(());
                            }
                            _ => {}
                        }
                        r.skip(child, empty)
                    })?;
                    if style.name.is_empty() {
                        style.name = style.id.clone();
                    }
                    sheet.insert(style);
                }
                Event::Empty(ref e) if e.local_name().as_ref() == b"style" => {
                    let id = attr(e, "w:styleId").unwrap_or_default();
                    sheet.insert(Style {
                        name: id.clone(),
                        id,
                        style_type: StyleType::parse(attr(e, "w:type").as_deref().unwrap_or("")),
                        based_on: None,
                        next: None,
                        is_default: matches!(attr(e, "w:default").as_deref(), Some("1" | "true")),
                        outline_level: None,
                    });
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(sheet)
    }

    fn insert(&mut self, style: Style) {
        if style.id.is_empty() {
            return;
        }
        self.styles
            .insert((style.style_type, style.id.clone()), style);
    }

    /// Look up a style by ID and type
    pub fn get(&self, id: &str, style_type: StyleType) -> Option<&Style> {
        self.styles.get(&(style_type, id.to_string()))
    }

    /// All styles, sorted by ID
    pub fn all(&self) -> Vec<&Style> {
        let mut styles: Vec<&Style> = self.styles.values().collect();
        styles.sort_by(|a, b| a.id.cmp(&b.id));
        styles
    }

    /// Number of styles
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Check if the sheet has no styles
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Default style of a type
    pub fn default_style(&self, style_type: StyleType) -> Option<&Style> {
        self.styles
            .values()
            .find(|s| s.style_type == style_type && s.is_default)
    }

    /// Heading level (1-9) of a paragraph style, if it is a heading
    pub fn heading_level(&self, style_id: &str) -> Option<u8> {
        self.resolve_chain(style_id, StyleType::Paragraph)
            .iter()
            .find_map(|s| s.outline_level)
            .map(|l| l + 1)
    }

    /// Inheritance chain of a style, starting with the style itself
    pub fn resolve_chain(&self, style_id: &str, style_type: StyleType) -> Vec<&Style> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(style_id, style_type);

        while let Some(style) = current {
            if !seen.insert(style.id.as_str()) {
                break;
            }
            chain.push(style);
            current = style
                .based_on
                .as_deref()
                .and_then(|base| self.get(base, style_type));
        }

        chain
    }
}

/// The styles part: retained bytes plus the parsed sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesPart {
    path: String,
    raw: Vec<u8>,
    sheet: StyleSheet,
}

impl StylesPart {
    /// Parse the styles part stored at `path`, keeping its bytes
    pub fn parse(path: impl Into<String>, raw: Vec<u8>) -> Result<Self> {
        let path = path.into();
        let sheet = StyleSheet::parse(&raw).map_err(|source| OoxmlError::MalformedStyles {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, raw, sheet })
    }

    /// The built-in style set used for new documents
    pub fn builtin() -> Self {
        let raw = builtin_styles_xml().into_bytes();
        let sheet = StyleSheet::parse(&raw).unwrap_or_default();
        Self {
            path: DEFAULT_STYLES_PATH.to_string(),
            raw,
            sheet,
        }
    }

    /// Path of the part inside the package
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bytes of the part exactly as read
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The parsed sheet
    pub fn sheet(&self) -> &StyleSheet {
        &self.sheet
    }
}

/// Styles part with Normal, Title, Heading1-9, Hyperlink and TableGrid
pub fn builtin_styles_xml() -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="en-US"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults>"#,
    );
    xml.push_str(r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#);
    xml.push_str(r#"<w:style w:type="character" w:default="1" w:styleId="DefaultParagraphFont"><w:name w:val="Default Paragraph Font"/><w:uiPriority w:val="1"/><w:semiHidden/></w:style>"#);
    xml.push_str(r#"<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/><w:contextualSpacing/></w:pPr><w:rPr><w:rFonts w:ascii="Calibri Light" w:hAnsi="Calibri Light"/><w:spacing w:val="-10"/><w:kern w:val="28"/><w:sz w:val="56"/><w:szCs w:val="56"/></w:rPr></w:style>"#);

    for level in 1..=9u32 {
        let size = match level {
            1 => 32,
            2 => 26,
            3 => 24,
            _ => 22,
        };
        xml.push_str(&format!(
            r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:uiPriority w:val="9"/><w:qFormat/><w:pPr><w:keepNext/><w:keepLines/><w:spacing w:before="{before}" w:after="0"/><w:outlineLvl w:val="{outline}"/></w:pPr><w:rPr><w:rFonts w:ascii="Calibri Light" w:hAnsi="Calibri Light"/><w:color w:val="2F5496"/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:style>"#,
            before = if level == 1 { 240 } else { 40 },
            outline = level - 1,
        ));
    }

    xml.push_str(r#"<w:style w:type="character" w:styleId="Hyperlink"><w:name w:val="Hyperlink"/><w:basedOn w:val="DefaultParagraphFont"/><w:uiPriority w:val="99"/><w:unhideWhenUsed/><w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr></w:style>"#);
    xml.push_str(r#"<w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:uiPriority w:val="99"/><w:semiHidden/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style>"#);
    xml.push_str(r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:basedOn w:val="TableNormal"/><w:uiPriority w:val="39"/><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/></w:tblBorders></w:tblPr></w:style>"#);
    xml.push_str("</w:styles>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_styles() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
            <w:style w:type="paragraph" w:styleId="Normal" w:default="1">
                <w:name w:val="Normal"/>
            </w:style>
            <w:style w:type="paragraph" w:styleId="Heading1">
                <w:name w:val="heading 1"/>
                <w:basedOn w:val="Normal"/>
                <w:next w:val="Normal"/>
                <w:pPr>
                    <w:outlineLvl w:val="0"/>
                </w:pPr>
            </w:style>
            <w:style w:type="character" w:styleId="Strong"/>
        </w:styles>"#;

        let sheet = StyleSheet::parse(xml).unwrap();

        assert_eq!(sheet.len(), 3);
        let heading = sheet.get("Heading1", StyleType::Paragraph).unwrap();
        assert_eq!(heading.name, "heading 1");
        assert_eq!(heading.based_on.as_deref(), Some("Normal"));
        assert_eq!(heading.outline_level, Some(0));
        assert_eq!(sheet.heading_level("Heading1"), Some(1));
        assert_eq!(sheet.heading_level("Normal"), None);
        assert_eq!(
            sheet.default_style(StyleType::Paragraph).map(|s| s.id.as_str()),
            Some("Normal")
        );
        assert_eq!(sheet.get("Strong", StyleType::Character).unwrap().name, "Strong");
    }

    #[test]
    fn test_lookup_respects_type() {
        let sheet = StylesPart::builtin();
        assert!(sheet.sheet().get("Hyperlink", StyleType::Character).is_some());
        assert!(sheet.sheet().get("Hyperlink", StyleType::Paragraph).is_none());
    }

    #[test]
    fn test_builtin_styles() {
        let part = StylesPart::builtin();
        let sheet = part.sheet();

        assert_eq!(part.path(), DEFAULT_STYLES_PATH);
        for id in ["Normal", "Title"] {
            assert!(sheet.get(id, StyleType::Paragraph).is_some(), "{id}");
        }
        for level in 1..=9 {
            let id = format!("Heading{level}");
            assert_eq!(sheet.heading_level(&id), Some(level as u8));
        }
        assert!(sheet.get("TableGrid", StyleType::Table).is_some());
    }

    #[test]
    fn test_resolve_chain() {
        let part = StylesPart::builtin();
        let chain: Vec<&str> = part
            .sheet()
            .resolve_chain("Heading2", StyleType::Paragraph)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(chain, vec!["Heading2", "Normal"]);
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let xml = br#"<w:styles xmlns:w="w"><w:style w:type="paragraph" w:styleId="A"><w:basedOn w:val="B"/></w:style><w:style w:type="paragraph" w:styleId="B"><w:basedOn w:val="A"/></w:style></w:styles>"#;
        let sheet = StyleSheet::parse(xml).unwrap();
        assert_eq!(sheet.resolve_chain("A", StyleType::Paragraph).len(), 2);
    }

    #[test]
    fn test_styles_part_keeps_bytes() {
        let raw = b"<w:styles xmlns:w=\"w\">  <w:style w:type=\"paragraph\" w:styleId=\"X\"/></w:styles>".to_vec();
        let part = StylesPart::parse("word/styles.xml", raw.clone()).unwrap();
        assert_eq!(part.raw(), raw.as_slice());
    }

    #[test]
    fn test_malformed_styles() {
        let err = StylesPart::parse("word/styles.xml", b"<w:styles><w:style></w:styles>".to_vec())
            .unwrap_err();
        assert!(matches!(err, OoxmlError::MalformedStyles { .. }));
    }
}
