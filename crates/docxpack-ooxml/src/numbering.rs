//! List numbering definitions (`word/numbering.xml`)
//!
//! A paragraph joins a list through `w:numPr`, naming a numbering instance
//! (`w:num`) and a level. Each instance points at an abstract definition
//! (`w:abstractNum`) holding the per-level formats. [`NumberingPart`] keeps
//! every element of a loaded part verbatim and appends new instances, so two
//! lists built on the same abstract definition count independently.

use quick_xml::events::Event;

use crate::error::{OoxmlError, Result};
use crate::xml::{
    attr_parse, attrs, push_attrs, RawXml, XmlReader, XmlResult, XmlWrite, XML_DECLARATION,
};

/// Default path of the numbering part
pub const DEFAULT_NUMBERING_PATH: &str = "word/numbering.xml";

/// Abstract definition used for ordered lists
pub const ORDERED_ABSTRACT_ID: u32 = 201;

/// Abstract definition used for bullet lists
pub const BULLET_ABSTRACT_ID: u32 = 202;

/// Levels defined by the built-in abstract definitions
pub const LIST_LEVELS: u32 = 9;

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Built-in list styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// 1. a. i. A. repeating down the levels
    Ordered,
    /// Disc, circle, square, diamond repeating down the levels
    Bullet,
}

impl ListKind {
    /// Abstract definition backing this kind of list
    pub fn abstract_id(self) -> u32 {
        match self {
            Self::Ordered => ORDERED_ABSTRACT_ID,
            Self::Bullet => BULLET_ABSTRACT_ID,
        }
    }

    fn abstract_xml(self) -> String {
        let mut xml = format!(
            r#"<w:abstractNum w:abstractNumId="{}"><w:multiLevelType w:val="hybridMultilevel"/>"#,
            self.abstract_id()
        );
        for level in 0..LIST_LEVELS {
            let indent = 360 * (level + 1);
            let (num_fmt, text, font) = match self {
                Self::Ordered => (ordered_format(level), format!("%{}.", level + 1), None),
                Self::Bullet => {
                    let (glyph, font) = bullet_glyph(level);
                    ("bullet", glyph.to_string(), Some(font))
                }
            };
            xml.push_str(&format!(
                r#"<w:lvl w:ilvl="{level}"><w:start w:val="1"/><w:numFmt w:val="{num_fmt}"/><w:lvlText w:val="{text}"/><w:lvlJc w:val="left"/><w:pPr><w:tabs><w:tab w:val="num" w:pos="{indent}"/></w:tabs><w:ind w:left="{indent}" w:hanging="360"/></w:pPr>"#,
            ));
            if let Some(font) = font {
                xml.push_str(&format!(
                    r#"<w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:hint="default"/></w:rPr>"#
                ));
            }
            xml.push_str("</w:lvl>");
        }
        xml.push_str("</w:abstractNum>");
        xml
    }
}

fn ordered_format(level: u32) -> &'static str {
    match level % 4 {
        0 => "decimal",
        1 => "lowerLetter",
        2 => "lowerRoman",
        _ => "upperLetter",
    }
}

fn bullet_glyph(level: u32) -> (char, &'static str) {
    match level % 4 {
        0 => ('\u{f0b7}', "Symbol"),
        1 => ('○', "Symbol"),
        2 => ('■', "Wingdings"),
        _ => ('♦', "Symbol"),
    }
}

/// A child of `w:numbering`
#[derive(Debug, Clone, PartialEq)]
pub enum NumberingChild {
    /// `w:abstractNum`
    Abstract { id: u32, xml: RawXml },
    /// `w:num`
    Instance {
        id: u32,
        abstract_id: u32,
        xml: RawXml,
    },
    /// Anything else (`w:numPicBullet`, `w:numIdMacAtCleanup`)
    Raw(RawXml),
}

/// The numbering part
#[derive(Debug, Clone, PartialEq)]
pub struct NumberingPart {
    path: String,
    root_attributes: Vec<(String, String)>,
    children: Vec<NumberingChild>,
}

impl NumberingPart {
    /// Create an empty numbering part at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            root_attributes: vec![("xmlns:w".to_string(), WORDML_NS.to_string())],
            children: Vec::new(),
        }
    }

    /// Parse the numbering part stored at `path`
    pub fn parse(path: impl Into<String>, xml: &[u8]) -> Result<Self> {
        let path = path.into();
        let (root_attributes, children) =
            read_numbering(xml).map_err(|source| OoxmlError::MalformedNumbering {
                path: path.clone(),
                source,
            })?;
        log::debug!("{}: {} numbering definitions", path, children.len());
        Ok(Self {
            path,
            root_attributes,
            children,
        })
    }

    /// Path of the part inside the package
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn children(&self) -> &[NumberingChild] {
        &self.children
    }

    /// IDs of every abstract definition, in part order
    pub fn abstract_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.children.iter().filter_map(|c| match c {
            NumberingChild::Abstract { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// IDs of every numbering instance, in part order
    pub fn num_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.children.iter().filter_map(|c| match c {
            NumberingChild::Instance { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Abstract definition behind the instance `num_id`
    pub fn abstract_for(&self, num_id: u32) -> Option<u32> {
        self.children.iter().find_map(|c| match c {
            NumberingChild::Instance {
                id, abstract_id, ..
            } if *id == num_id => Some(*abstract_id),
            _ => None,
        })
    }

    /// Start a new list of the given kind and return its `numId`
    ///
    /// The built-in abstract definition is added on first use. Every call
    /// returns a fresh instance whose first level restarts at 1.
    pub fn new_list_instance(&mut self, kind: ListKind) -> u32 {
        if !self.has_abstract(kind.abstract_id()) {
            self.insert_abstract(kind.abstract_id(), RawXml(kind.abstract_xml()));
        }
        self.push_instance(kind.abstract_id())
    }

    /// Start a new list on an abstract definition already in the part
    pub fn new_list_instance_for(&mut self, abstract_id: u32) -> Result<u32> {
        if !self.has_abstract(abstract_id) {
            return Err(OoxmlError::UnknownAbstractNumbering(abstract_id));
        }
        Ok(self.push_instance(abstract_id))
    }

    fn has_abstract(&self, abstract_id: u32) -> bool {
        self.abstract_ids().any(|id| id == abstract_id)
    }

    fn push_instance(&mut self, abstract_id: u32) -> u32 {
        let id = self.num_ids().max().unwrap_or(0) + 1;
        let xml = RawXml(format!(
            r#"<w:num w:numId="{id}"><w:abstractNumId w:val="{abstract_id}"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/></w:lvlOverride></w:num>"#
        ));
        // w:numIdMacAtCleanup must stay last
        let pos = self
            .children
            .iter()
            .position(|c| matches!(c, NumberingChild::Raw(raw) if raw.local_name() == "numIdMacAtCleanup"))
            .unwrap_or(self.children.len());
        self.children.insert(
            pos,
            NumberingChild::Instance {
                id,
                abstract_id,
                xml,
            },
        );
        log::debug!("numbering instance {} on abstract {}", id, abstract_id);
        id
    }

    fn insert_abstract(&mut self, id: u32, xml: RawXml) {
        // abstract definitions precede every w:num
        let pos = self
            .children
            .iter()
            .position(|c| match c {
                NumberingChild::Instance { .. } => true,
                NumberingChild::Raw(raw) => raw.local_name() == "numIdMacAtCleanup",
                NumberingChild::Abstract { .. } => false,
            })
            .unwrap_or(self.children.len());
        self.children
            .insert(pos, NumberingChild::Abstract { id, xml });
    }

    /// Serialize the part
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str("<w:numbering");
        push_attrs(&mut xml, &self.root_attributes);
        xml.push('>');
        for child in &self.children {
            match child {
                NumberingChild::Abstract { xml: raw, .. }
                | NumberingChild::Instance { xml: raw, .. }
                | NumberingChild::Raw(raw) => raw.write_xml(&mut xml),
            }
        }
        xml.push_str("</w:numbering>");
        xml
    }
}

impl Default for NumberingPart {
    fn default() -> Self {
        Self::new(DEFAULT_NUMBERING_PATH)
    }
}

type NumberingParts = (Vec<(String, String)>, Vec<NumberingChild>);

fn read_numbering(xml: &[u8]) -> XmlResult<NumberingParts> {
    let mut reader = XmlReader::new(xml);
    loop {
        match reader.next_event()?.1 {
            Event::Start(ref root) => {
                let root_attributes = attrs(root);
                let mut children = Vec::new();
                reader.read_children(|r, offset, e, empty| {
                    let raw = r.capture(offset, e, empty)?;
                    let child = match e.local_name().as_ref() {
                        b"abstractNum" => match attr_parse(e, "w:abstractNumId") {
                            Some(id) => NumberingChild::Abstract { id, xml: raw },
                            None => NumberingChild::Raw(raw),
                        },
                        b"num" => match (attr_parse(e, "w:numId"), instance_abstract_id(&raw)?) {
                            (Some(id), Some(abstract_id)) => NumberingChild::Instance {
                                id,
                                abstract_id,
                                xml: raw,
                            },
                            _ => NumberingChild::Raw(raw),
                        },
                        _ => NumberingChild::Raw(raw),
                    };
                    children.push(child);
                    Ok(())
                })?;
                return Ok((root_attributes, children));
            }
            Event::Empty(ref root) => return Ok((attrs(root), Vec::new())),
            Event::Eof => {
                return Err(quick_xml::Error::from(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "numbering part has no root element",
                )))
            }
            _ => {}
        }
    }
}

/// `w:abstractNumId/@w:val` of a captured `w:num`
fn instance_abstract_id(raw: &RawXml) -> XmlResult<Option<u32>> {
    let mut inner = XmlReader::new(raw.0.as_bytes());
    let mut abstract_id = None;
    loop {
        match inner.next_event()?.1 {
            Event::Start(_) => break,
            Event::Empty(_) | Event::Eof => return Ok(None),
            _ => {}
        }
    }
    inner.read_children(|r, _, e, empty| {
        if e.local_name().as_ref() == b"abstractNumId" {
            abstract_id = attr_parse(e, "w:val");
        }
        r.skip(e, empty)
    })?;
    Ok(abstract_id)
}
