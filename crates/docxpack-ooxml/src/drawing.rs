//! Drawings (`w:drawing`)
//!
//! Pictures authored through the package API are modeled as
//! [`InlinePicture`] and rendered from a fixed DrawingML template:
//!
//! ```xml
//! <w:drawing>
//!   <wp:inline>
//!     <wp:extent cx="..." cy="..."/>               <!-- EMUs -->
//!     <wp:docPr id="..." name="..." descr="..."/>
//!     <a:graphic>
//!       <a:graphicData uri="...picture">
//!         <pic:pic>
//!           <pic:blipFill><a:blip r:embed="rIdN"/></pic:blipFill>
//!         </pic:pic>
//!       </a:graphicData>
//!     </a:graphic>
//!   </wp:inline>
//! </w:drawing>
//! ```
//!
//! Drawings read from an existing document are kept verbatim; only the
//! fields needed for lookups (relationship ID, extent, alt text) are pulled
//! out of the markup.

use quick_xml::events::Event;

use crate::units::{emu_to_inches, inches_to_emu};
use crate::xml::{attr, attr_parse, escape_xml, RawXml, XmlReader, XmlResult, XmlWrite};

/// Picture graphic data URI
pub const PICTURE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// A `w:drawing` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drawing {
    /// Picture created through the package API
    Inline(InlinePicture),
    /// Drawing read from a document, written back unchanged
    Preserved(PreservedDrawing),
}

impl Drawing {
    /// Read the interesting fields from a captured `w:drawing` element
    pub(crate) fn from_raw(xml: RawXml) -> XmlResult<Self> {
        let mut drawing = PreservedDrawing {
            xml,
            id: None,
            embed: None,
            width_emu: None,
            height_emu: None,
            description: None,
        };

        let source = drawing.xml.0.clone();
        let mut reader = XmlReader::new(source.as_bytes());
        loop {
            match reader.next_event()?.1 {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"extent" if drawing.width_emu.is_none() => {
                        drawing.width_emu = attr_parse(e, "cx");
                        drawing.height_emu = attr_parse(e, "cy");
                    }
                    b"docPr" => {
                        drawing.id = attr_parse(e, "id");
                        drawing.description = attr(e, "descr");
                    }
                    b"blip" if drawing.embed.is_none() => drawing.embed = attr(e, "r:embed"),
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self::Preserved(drawing))
    }

    /// Relationship ID of the embedded image
    pub fn embed(&self) -> Option<&str> {
        match self {
            Self::Inline(pic) => Some(&pic.rel_id),
            Self::Preserved(d) => d.embed.as_deref(),
        }
    }

    /// Width and height in EMUs, when known
    pub fn extent_emu(&self) -> Option<(i64, i64)> {
        match self {
            Self::Inline(pic) => Some((pic.width_emu, pic.height_emu)),
            Self::Preserved(d) => d.width_emu.zip(d.height_emu),
        }
    }

    /// Drawing object ID (`wp:docPr/@id`)
    pub fn object_id(&self) -> Option<u32> {
        match self {
            Self::Inline(pic) => Some(pic.id),
            Self::Preserved(d) => d.id,
        }
    }

    /// Alt text
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Inline(pic) => pic.description.as_deref(),
            Self::Preserved(d) => d.description.as_deref(),
        }
    }
}

impl XmlWrite for Drawing {
    fn write_xml(&self, out: &mut String) {
        match self {
            Self::Inline(pic) => pic.write_xml(out),
            Self::Preserved(d) => d.xml.write_xml(out),
        }
    }
}

/// A drawing kept as it was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedDrawing {
    pub xml: RawXml,
    /// `id` of `wp:docPr`
    pub id: Option<u32>,
    /// `r:embed` of the first `a:blip`
    pub embed: Option<String>,
    pub width_emu: Option<i64>,
    pub height_emu: Option<i64>,
    /// `descr` of `wp:docPr`
    pub description: Option<String>,
}

/// An inline picture referencing an image part by relationship ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePicture {
    /// Drawing object ID, unique within the document
    pub id: u32,
    /// Relationship ID of the image part
    pub rel_id: String,
    /// Display name
    pub name: String,
    /// Alt text
    pub description: Option<String>,
    pub width_emu: i64,
    pub height_emu: i64,
}

impl InlinePicture {
    /// Create a picture sized in inches
    pub fn new(id: u32, rel_id: impl Into<String>, width_in: f64, height_in: f64) -> Self {
        Self {
            id,
            rel_id: rel_id.into(),
            name: format!("Picture {}", id),
            description: None,
            width_emu: inches_to_emu(width_in),
            height_emu: inches_to_emu(height_in),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set alt text
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Width in inches
    pub fn width_inches(&self) -> f64 {
        emu_to_inches(self.width_emu)
    }

    /// Height in inches
    pub fn height_inches(&self) -> f64 {
        emu_to_inches(self.height_emu)
    }
}

impl XmlWrite for InlinePicture {
    fn write_xml(&self, out: &mut String) {
        let name = escape_xml(&self.name);
        let descr = self
            .description
            .as_deref()
            .map(|d| format!(r#" descr="{}""#, escape_xml(d)))
            .unwrap_or_default();
        let (cx, cy) = (self.width_emu, self.height_emu);

        out.push_str("<w:drawing>");
        out.push_str(&format!(
            r#"<wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:docPr id="{id}" name="{name}"{descr}/><wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:graphicData uri="{uri}"><pic:pic xmlns:pic="{uri}"><pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline>"#,
            id = self.id,
            rel = escape_xml(&self.rel_id),
            uri = PICTURE_URI,
        ));
        out.push_str("</w:drawing>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_picture_markup() {
        let pic = InlinePicture::new(3, "rId7", 2.0, 1.0).with_description("Logo");
        let xml = pic.to_xml_string();

        assert!(xml.starts_with("<w:drawing><wp:inline"));
        assert!(xml.contains(r#"<wp:extent cx="1828800" cy="914400"/>"#));
        assert!(xml.contains(r#"<wp:docPr id="3" name="Picture 3" descr="Logo"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId7"/>"#));
        assert!(xml.ends_with("</wp:inline></w:drawing>"));
    }

    #[test]
    fn test_preserved_drawing_fields() {
        let pic = InlinePicture::new(1, "rId9", 1.0, 0.5).with_description("Chart");
        let drawing = Drawing::from_raw(RawXml(pic.to_xml_string())).unwrap();

        assert!(matches!(drawing, Drawing::Preserved(_)));
        assert_eq!(drawing.embed(), Some("rId9"));
        assert_eq!(drawing.extent_emu(), Some((914400, 457200)));
        assert_eq!(drawing.description(), Some("Chart"));
        assert_eq!(drawing.to_xml_string(), pic.to_xml_string());
    }

    #[test]
    fn test_anchor_drawing_is_preserved() {
        let xml = r#"<w:drawing><wp:anchor behindDoc="1"><wp:extent cx="100" cy="200"/><wp:docPr id="5" name="Bg"/><a:graphic><a:graphicData uri="x"><pic:pic><pic:blipFill><a:blip r:embed="rId2"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:anchor></w:drawing>"#;
        let drawing = Drawing::from_raw(RawXml(xml.to_string())).unwrap();

        assert_eq!(drawing.embed(), Some("rId2"));
        assert_eq!(drawing.object_id(), Some(5));
        assert_eq!(drawing.extent_emu(), Some((100, 200)));
        assert_eq!(drawing.to_xml_string(), xml);
    }

    #[test]
    fn test_dimensions_in_inches() {
        let pic = InlinePicture::new(1, "rId1", 6.5, 4.0);
        assert!((pic.width_inches() - 6.5).abs() < 1e-9);
        assert!((pic.height_inches() - 4.0).abs() < 1e-9);
    }
}
