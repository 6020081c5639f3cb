//! Content type registry (`[Content_Types].xml`)
//!
//! Each part's content type comes either from an `Override` naming the part
//! or from a `Default` keyed on its extension. Overrides win.

use quick_xml::events::Event;

use crate::error::{OoxmlError, Result};
use crate::paths::{absolute_part_name, part_extension};
use crate::xml::{attr, escape_xml, XmlReader, XML_DECLARATION};

/// Namespace of `[Content_Types].xml`
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Content type of the main document part
pub const CT_MAIN_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
/// Content type of the styles part
pub const CT_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
/// Content type of the numbering part
pub const CT_NUMBERING: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
/// Content type of relationship parts
pub const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
/// Generic XML content type
pub const CT_XML: &str = "application/xml";

/// Extension-keyed default content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultType {
    /// Extension without the dot
    pub extension: String,
    /// MIME content type
    pub content_type: String,
}

/// Part-specific content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideType {
    /// Absolute part name (`/word/document.xml`)
    pub part_name: String,
    /// MIME content type
    pub content_type: String,
}

/// Parsed `[Content_Types].xml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: Vec<DefaultType>,
    overrides: Vec<OverrideType>,
}

impl ContentTypes {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `[Content_Types].xml`
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = XmlReader::new(xml);
        let mut types = Self::new();

        loop {
            match reader.next_event().map_err(OoxmlError::MalformedContentTypes)?.1 {
                Event::Empty(ref e) | Event::Start(ref e) => match e.local_name().as_ref() {
                    b"Default" => {
                        if let (Some(ext), Some(ct)) = (attr(e, "Extension"), attr(e, "ContentType"))
                        {
                            types.add_default(ext, ct);
                        }
                    }
                    b"Override" => {
                        if let (Some(part), Some(ct)) = (attr(e, "PartName"), attr(e, "ContentType"))
                        {
                            types.add_override(part, ct);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(types)
    }

    /// Content type of a part, override first, then default by extension
    pub fn resolve(&self, part: &str) -> Option<&str> {
        let part_name = absolute_part_name(part);
        if let Some(o) = self
            .overrides
            .iter()
            .find(|o| o.part_name.eq_ignore_ascii_case(&part_name))
        {
            return Some(&o.content_type);
        }

        let ext = part_extension(part)?;
        self.defaults
            .iter()
            .find(|d| d.extension.eq_ignore_ascii_case(&ext))
            .map(|d| d.content_type.as_str())
    }

    /// Register a default for an extension unless one already exists
    pub fn add_default(&mut self, extension: impl Into<String>, content_type: impl Into<String>) {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.').to_string();
        if self.has_default(&extension) {
            return;
        }
        self.defaults.push(DefaultType {
            extension,
            content_type: content_type.into(),
        });
    }

    /// Register an override, replacing any existing one for the same part
    pub fn add_override(&mut self, part: impl AsRef<str>, content_type: impl Into<String>) {
        let part_name = absolute_part_name(part.as_ref());
        let content_type = content_type.into();
        match self
            .overrides
            .iter_mut()
            .find(|o| o.part_name.eq_ignore_ascii_case(&part_name))
        {
            Some(existing) => existing.content_type = content_type,
            None => self.overrides.push(OverrideType {
                part_name,
                content_type,
            }),
        }
    }

    /// Check if an extension has a default
    pub fn has_default(&self, extension: &str) -> bool {
        self.defaults
            .iter()
            .any(|d| d.extension.eq_ignore_ascii_case(extension))
    }

    /// Registered defaults in document order
    pub fn defaults(&self) -> &[DefaultType] {
        &self.defaults
    }

    /// Registered overrides in document order
    pub fn overrides(&self) -> &[OverrideType] {
        &self.overrides
    }

    /// Serialize to `[Content_Types].xml`
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, CONTENT_TYPES_NS));

        for d in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(&d.extension),
                escape_xml(&d.content_type)
            ));
        }
        for o in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(&o.part_name),
                escape_xml(&o.content_type)
            ));
        }

        xml.push_str("</Types>");
        xml
    }
}

/// Content type for a file extension (without the dot)
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" | "jfif" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "wdp" => "image/vnd.ms-photo",
        "xml" => CT_XML,
        "rels" => CT_RELATIONSHIPS,
        "bin" => "application/vnd.openxmlformats-officedocument.oleObject",
        "odttf" => "application/vnd.openxmlformats-officedocument.obfuscatedFont",
        "ttf" => "application/x-font-ttf",
        _ => return None,
    };
    Some(mime)
}
