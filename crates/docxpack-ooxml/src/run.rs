//! Runs (`w:r`) and run properties (`w:rPr`)

use quick_xml::events::BytesStart;

use crate::drawing::Drawing;
use crate::xml::{
    attr, attr_parse, attrs, escape_xml, has_only_attrs, on_off, push_attrs, push_val, RawXml,
    Sequence, XmlRead, XmlReader, XmlResult, XmlWrite,
};

/// Schema order of `w:rPr` children
static RPR_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden",
    "color", "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect", "bdr",
    "shd", "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout", "specVanish",
    "oMath", "rPrChange",
];

/// Attributes of `w:rFonts` that map onto [`RunFonts`]
const FONT_ATTRS: [&str; 4] = ["w:ascii", "w:hAnsi", "w:eastAsia", "w:cs"];

/// Font slots of `w:rFonts`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFonts {
    pub ascii: Option<String>,
    pub h_ansi: Option<String>,
    pub east_asia: Option<String>,
    pub cs: Option<String>,
}

impl RunFonts {
    /// Use the same font for every slot
    pub fn all(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            ascii: Some(name.clone()),
            h_ansi: Some(name.clone()),
            east_asia: Some(name.clone()),
            cs: Some(name),
        }
    }
}

/// Vertical alignment of run text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Baseline,
    Superscript,
    Subscript,
}

impl VerticalAlign {
    fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Superscript => "superscript",
            Self::Subscript => "subscript",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "baseline" => Some(Self::Baseline),
            "superscript" => Some(Self::Superscript),
            "subscript" => Some(Self::Subscript),
            _ => None,
        }
    }
}

/// Run formatting
///
/// Toggles are `Option<bool>` so an explicit `w:val="0"` survives a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunProperties {
    /// Character style ID (`w:rStyle`)
    pub style: Option<String>,
    pub fonts: Option<RunFonts>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub strike: Option<bool>,
    /// Hex color such as `FF0000`, or `auto`
    pub color: Option<String>,
    /// Font size in half-points
    pub size: Option<u32>,
    /// Highlight color name (`yellow`, `green`, ...)
    pub highlight: Option<String>,
    /// Underline style (`single`, `double`, ...)
    pub underline: Option<String>,
    pub vertical_align: Option<VerticalAlign>,
    /// Children without a typed field, kept verbatim
    pub extras: Vec<RawXml>,
}

impl RunProperties {
    /// Check if no property is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl XmlRead for RunProperties {
    fn read_xml(
        reader: &mut XmlReader<'_>,
        _start: &BytesStart<'_>,
        empty: bool,
    ) -> XmlResult<Self> {
        let mut props = RunProperties::default();
        if empty {
            return Ok(props);
        }

        reader.read_children(|r, offset, e, empty| {
            let val_only = has_only_attrs(e, &["w:val"]);
            let typed = match e.local_name().as_ref() {
                b"rStyle" if val_only => attr(e, "w:val").map(|v| props.style = Some(v)),
                b"rFonts" if has_only_attrs(e, &FONT_ATTRS) => {
                    props.fonts = Some(RunFonts {
                        ascii: attr(e, "w:ascii"),
                        h_ansi: attr(e, "w:hAnsi"),
                        east_asia: attr(e, "w:eastAsia"),
                        cs: attr(e, "w:cs"),
                    });
                    Some(())
                }
                b"b" if val_only => {
                    props.bold = Some(on_off(e));
                    Some(())
                }
                b"i" if val_only => {
                    props.italic = Some(on_off(e));
                    Some(())
                }
                b"strike" if val_only => {
                    props.strike = Some(on_off(e));
                    Some(())
                }
                b"color" if val_only => attr(e, "w:val").map(|v| props.color = Some(v)),
                b"sz" if val_only => attr_parse(e, "w:val").map(|v| props.size = Some(v)),
                b"highlight" if val_only => attr(e, "w:val").map(|v| props.highlight = Some(v)),
                b"u" if val_only => attr(e, "w:val").map(|v| props.underline = Some(v)),
                b"vertAlign" if val_only => attr(e, "w:val")
                    .as_deref()
                    .and_then(VerticalAlign::parse)
                    .map(|align| props.vertical_align = Some(align)),
                _ => None,
            };

            match typed {
                Some(()) => r.skip(e, empty),
                // unknown attributes or unparsable values: keep the element verbatim
                None => {
                    props.extras.push(r.capture(offset, e, empty)?);
                    Ok(())
                }
            }
        })?;

        Ok(props)
    }
}

impl XmlWrite for RunProperties {
    fn write_xml(&self, out: &mut String) {
        let mut seq = Sequence::new(RPR_ORDER);

        if let Some(style) = &self.style {
            seq.push("rStyle", val("w:rStyle", style));
        }
        if let Some(fonts) = &self.fonts {
            let mut markup = String::from("<w:rFonts");
            for (key, value) in [
                ("w:ascii", &fonts.ascii),
                ("w:hAnsi", &fonts.h_ansi),
                ("w:eastAsia", &fonts.east_asia),
                ("w:cs", &fonts.cs),
            ] {
                if let Some(value) = value {
                    markup.push_str(&format!(r#" {}="{}""#, key, escape_xml(value)));
                }
            }
            markup.push_str("/>");
            seq.push("rFonts", markup);
        }
        for (name, value) in [
            ("b", self.bold),
            ("i", self.italic),
            ("strike", self.strike),
        ] {
            if let Some(value) = value {
                seq.push(name, toggle(name, value));
            }
        }
        if let Some(color) = &self.color {
            seq.push("color", val("w:color", color));
        }
        if let Some(size) = self.size {
            seq.push("sz", val("w:sz", &size.to_string()));
        }
        if let Some(highlight) = &self.highlight {
            seq.push("highlight", val("w:highlight", highlight));
        }
        if let Some(underline) = &self.underline {
            seq.push("u", val("w:u", underline));
        }
        if let Some(align) = self.vertical_align {
            seq.push("vertAlign", val("w:vertAlign", align.as_str()));
        }
        for extra in &self.extras {
            seq.push_raw(extra);
        }

        seq.write(out, "w:rPr");
    }
}

fn val(tag: &str, value: &str) -> String {
    let mut out = String::new();
    push_val(&mut out, tag, value);
    out
}

fn toggle(name: &str, on: bool) -> String {
    if on {
        format!("<w:{}/>", name)
    } else {
        format!(r#"<w:{} w:val="0"/>"#, name)
    }
}

/// Kind of `w:br`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakType {
    #[default]
    TextWrapping,
    Page,
    Column,
}

/// Content of a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunChild {
    /// Literal text (`w:t`)
    Text(String),
    /// Line, page or column break (`w:br`)
    Break(BreakType),
    /// Tab character (`w:tab`)
    Tab,
    /// Inline or preserved drawing (`w:drawing`)
    Drawing(Drawing),
    /// Anything else, kept verbatim
    Raw(RawXml),
}

/// A text run with formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    /// Attributes of `w:r` (revision IDs and the like)
    pub attributes: Vec<(String, String)>,
    pub properties: RunProperties,
    pub children: Vec<RunChild>,
}

impl Run {
    /// Create an empty run
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a run holding `text`
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            children: vec![RunChild::Text(text.into())],
            ..Self::default()
        }
    }

    /// Append text
    pub fn add_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.children.push(RunChild::Text(text.into()));
        self
    }

    /// Append a break
    pub fn add_break(&mut self, kind: BreakType) -> &mut Self {
        self.children.push(RunChild::Break(kind));
        self
    }

    /// Append a tab
    pub fn add_tab(&mut self) -> &mut Self {
        self.children.push(RunChild::Tab);
        self
    }

    /// Append a drawing
    pub fn add_drawing(&mut self, drawing: Drawing) -> &mut Self {
        self.children.push(RunChild::Drawing(drawing));
        self
    }

    pub fn style(&mut self, style_id: impl Into<String>) -> &mut Self {
        self.properties.style = Some(style_id.into());
        self
    }

    pub fn bold(&mut self) -> &mut Self {
        self.properties.bold = Some(true);
        self
    }

    pub fn italic(&mut self) -> &mut Self {
        self.properties.italic = Some(true);
        self
    }

    pub fn strike(&mut self) -> &mut Self {
        self.properties.strike = Some(true);
        self
    }

    /// Underline with the given style (`single`, `double`, `dotted`, ...)
    pub fn underline(&mut self, style: impl Into<String>) -> &mut Self {
        self.properties.underline = Some(style.into());
        self
    }

    /// Text color as hex RGB (`FF0000`)
    pub fn color(&mut self, hex: impl Into<String>) -> &mut Self {
        self.properties.color = Some(hex.into());
        self
    }

    /// Font size in points
    pub fn size(&mut self, points: f64) -> &mut Self {
        self.properties.size = Some(crate::units::points_to_half_points(points));
        self
    }

    /// Use one font for every script
    pub fn font(&mut self, name: impl Into<String>) -> &mut Self {
        self.properties.fonts = Some(RunFonts::all(name));
        self
    }

    pub fn highlight(&mut self, color: impl Into<String>) -> &mut Self {
        self.properties.highlight = Some(color.into());
        self
    }

    pub fn vertical_align(&mut self, align: VerticalAlign) -> &mut Self {
        self.properties.vertical_align = Some(align);
        self
    }

    /// Text content, with tabs and line breaks as `\t` and `\n`
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            match child {
                RunChild::Text(t) => text.push_str(t),
                RunChild::Tab => text.push('\t'),
                RunChild::Break(BreakType::TextWrapping) => text.push('\n'),
                _ => {}
            }
        }
        text
    }

    /// Drawings contained in this run
    pub fn drawings(&self) -> impl Iterator<Item = &Drawing> {
        self.children.iter().filter_map(|c| match c {
            RunChild::Drawing(d) => Some(d),
            _ => None,
        })
    }
}

impl XmlRead for Run {
    fn read_xml(reader: &mut XmlReader<'_>, start: &BytesStart<'_>, empty: bool) -> XmlResult<Self> {
        let mut run = Run {
            attributes: attrs(start),
            ..Run::default()
        };
        if empty {
            return Ok(run);
        }

        reader.read_children(|r, offset, e, empty| {
            match e.local_name().as_ref() {
                b"rPr" => run.properties = RunProperties::read_xml(r, e, empty)?,
                b"t" => run.children.push(RunChild::Text(r.read_text(e, empty)?)),
                b"tab" => {
                    run.children.push(RunChild::Tab);
                    r.skip(e, empty)?;
                }
                b"br" if attr(e, "w:clear").is_none() => {
                    let kind = match attr(e, "w:type").as_deref() {
                        Some("page") => BreakType::Page,
                        Some("column") => BreakType::Column,
                        _ => BreakType::TextWrapping,
                    };
                    run.children.push(RunChild::Break(kind));
                    r.skip(e, empty)?;
                }
                b"drawing" => {
                    let raw = r.capture(offset, e, empty)?;
                    run.children.push(RunChild::Drawing(Drawing::from_raw(raw)?));
                }
                _ => run.children.push(RunChild::Raw(r.capture(offset, e, empty)?)),
            }
            Ok(())
        })?;

        Ok(run)
    }
}

impl XmlWrite for Run {
    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:r");
        push_attrs(out, &self.attributes);
        out.push('>');
        self.properties.write_xml(out);
        for child in &self.children {
            match child {
                RunChild::Text(text) => {
                    if text.trim() != text {
                        out.push_str(r#"<w:t xml:space="preserve">"#);
                    } else {
                        out.push_str("<w:t>");
                    }
                    out.push_str(&escape_xml(text));
                    out.push_str("</w:t>");
                }
                RunChild::Break(BreakType::TextWrapping) => out.push_str("<w:br/>"),
                RunChild::Break(BreakType::Page) => out.push_str(r#"<w:br w:type="page"/>"#),
                RunChild::Break(BreakType::Column) => {
                    out.push_str(r#"<w:br w:type="column"/>"#)
                }
                RunChild::Tab => out.push_str("<w:tab/>"),
                RunChild::Drawing(drawing) => drawing.write_xml(out),
                RunChild::Raw(raw) => raw.write_xml(out),
            }
        }
        out.push_str("</w:r>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;

    fn parse_run(xml: &str) -> Run {
        let mut reader = XmlReader::new(xml.as_bytes());
        loop {
            match reader.next_event().unwrap().1 {
                Event::Start(e) => return Run::read_xml(&mut reader, &e, false).unwrap(),
                Event::Empty(e) => return Run::read_xml(&mut reader, &e, true).unwrap(),
                Event::Eof => panic!("no run"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_parse_run_with_formatting() {
        let run = parse_run(
            r#"<w:r><w:rPr><w:b/><w:i w:val="0"/><w:color w:val="FF0000"/><w:sz w:val="28"/><w:vertAlign w:val="superscript"/></w:rPr><w:t>Hot</w:t></w:r>"#,
        );

        assert_eq!(run.properties.bold, Some(true));
        assert_eq!(run.properties.italic, Some(false));
        assert_eq!(run.properties.color.as_deref(), Some("FF0000"));
        assert_eq!(run.properties.size, Some(28));
        assert_eq!(run.properties.vertical_align, Some(VerticalAlign::Superscript));
        assert_eq!(run.plain_text(), "Hot");
    }

    #[test]
    fn test_theme_attributes_survive_roundtrip() {
        let xml = r#"<w:r><w:rPr><w:rFonts w:asciiTheme="minorHAnsi" w:hAnsiTheme="minorHAnsi" w:hint="eastAsia"/><w:b/><w:color w:val="4472C4" w:themeColor="accent1"/><w:sz w:val="24"/></w:rPr><w:t>Themed</w:t></w:r>"#;
        let run = parse_run(xml);

        assert!(run.properties.fonts.is_none());
        assert!(run.properties.color.is_none());
        assert_eq!(run.properties.bold, Some(true));
        assert_eq!(run.properties.size, Some(24));
        assert_eq!(run.properties.extras.len(), 2);
        assert_eq!(run.to_xml_string(), xml);
    }

    #[test]
    fn test_unparsable_size_is_kept() {
        let xml = r#"<w:r><w:rPr><w:sz w:val="big"/><w:highlight w:val="yellow"/></w:rPr><w:t>x</w:t></w:r>"#;
        let run = parse_run(xml);

        assert_eq!(run.properties.size, None);
        assert_eq!(run.properties.highlight.as_deref(), Some("yellow"));
        assert_eq!(run.to_xml_string(), xml);
    }

    #[test]
    fn test_plain_fonts_stay_typed() {
        let run = parse_run(
            r#"<w:r><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial"/></w:rPr></w:r>"#,
        );
        let fonts = run.properties.fonts.unwrap();
        assert_eq!(fonts.ascii.as_deref(), Some("Arial"));
        assert_eq!(fonts.h_ansi.as_deref(), Some("Arial"));
        assert!(run.properties.extras.is_empty());
    }

    #[test]
    fn test_parse_breaks_and_tabs() {
        let run = parse_run(
            r#"<w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t><w:br w:type="page"/></w:r>"#,
        );
        assert_eq!(run.plain_text(), "a\tb\nc");
        assert_eq!(run.children.last(), Some(&RunChild::Break(BreakType::Page)));
    }

    #[test]
    fn test_unknown_children_preserved() {
        let xml = r#"<w:r w:rsidR="00AB12CD"><w:rPr><w:noProof/><w:b/></w:rPr><w:fldChar w:fldCharType="begin"/><w:instrText xml:space="preserve"> PAGE </w:instrText></w:r>"#;
        let run = parse_run(xml);

        assert_eq!(run.properties.extras.len(), 1);
        assert_eq!(run.children.len(), 2);
        assert_eq!(run.plain_text(), "");

        let written = run.to_xml_string();
        assert_eq!(
            written,
            r#"<w:r w:rsidR="00AB12CD"><w:rPr><w:b/><w:noProof/></w:rPr><w:fldChar w:fldCharType="begin"/><w:instrText xml:space="preserve"> PAGE </w:instrText></w:r>"#
        );
        assert_eq!(parse_run(&written), run);
    }

    #[test]
    fn test_builder_writes_schema_order() {
        let mut run = Run::text("Note");
        run.vertical_align(VerticalAlign::Subscript)
            .size(12.0)
            .color("00FF00")
            .bold()
            .font("Consolas")
            .style("Emphasis");

        assert_eq!(
            run.to_xml_string(),
            concat!(
                "<w:r><w:rPr>",
                r#"<w:rStyle w:val="Emphasis"/>"#,
                r#"<w:rFonts w:ascii="Consolas" w:hAnsi="Consolas" w:eastAsia="Consolas" w:cs="Consolas"/>"#,
                "<w:b/>",
                r#"<w:color w:val="00FF00"/>"#,
                r#"<w:sz w:val="24"/>"#,
                r#"<w:vertAlign w:val="subscript"/>"#,
                "</w:rPr><w:t>Note</w:t></w:r>"
            )
        );
    }

    #[test]
    fn test_whitespace_text_is_preserved() {
        let run = Run::text(" padded ");
        let xml = run.to_xml_string();
        assert!(xml.contains(r#"<w:t xml:space="preserve"> padded </w:t>"#));
        assert_eq!(parse_run(&xml).plain_text(), " padded ");
    }

    #[test]
    fn test_text_is_escaped() {
        let run = Run::text("a < b & c");
        assert!(run.to_xml_string().contains("<w:t>a &lt; b &amp; c</w:t>"));
    }
}
