//! Paragraphs (`w:p`), paragraph properties and hyperlinks

use quick_xml::events::BytesStart;

use crate::drawing::Drawing;
use crate::run::Run;
use crate::xml::{
    attr, attr_parse, attrs, has_only_attrs, on_off, push_attrs, push_val, RawXml, Sequence,
    XmlRead, XmlReader, XmlResult, XmlWrite,
};

/// Schema order of `w:pPr` children
static PPR_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "framePr", "widowControl", "numPr",
    "suppressLineNumbers", "pBdr", "shd", "tabs", "suppressAutoHyphens", "kinsoku", "wordWrap",
    "overflowPunct", "topLinePunct", "autoSpaceDE", "autoSpaceDN", "bidi", "adjustRightInd",
    "snapToGrid", "spacing", "ind", "contextualSpacing", "mirrorIndents", "suppressOverlap", "jc",
    "textDirection", "textAlignment", "textboxTightWrap", "outlineLvl", "divId", "cnfStyle",
    "rPr", "sectPr", "pPrChange",
];

/// Paragraph alignment (`w:jc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Left,
    Center,
    Right,
    Both,
    Distribute,
}

impl Justification {
    fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Both => "both",
            Self::Distribute => "distribute",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            "both" => Some(Self::Both),
            "distribute" => Some(Self::Distribute),
            _ => None,
        }
    }
}

/// Reference to a numbering definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingRef {
    /// Numbering ID
    pub num_id: u32,
    /// Indent level (0-based)
    pub ilvl: u32,
}

/// Spacing around and between lines, in twips
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Spacing {
    pub before: Option<u32>,
    pub after: Option<u32>,
    pub line: Option<u32>,
}

/// Indentation, in twips
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Indent {
    pub left: Option<i32>,
    pub right: Option<i32>,
    pub first_line: Option<u32>,
    pub hanging: Option<u32>,
}

/// Paragraph formatting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphProperties {
    /// Paragraph style ID (`w:pStyle`)
    pub style: Option<String>,
    pub keep_next: Option<bool>,
    pub page_break_before: Option<bool>,
    pub numbering: Option<NumberingRef>,
    pub spacing: Option<Spacing>,
    pub indent: Option<Indent>,
    pub justification: Option<Justification>,
    /// Children without a typed field, kept verbatim
    pub extras: Vec<RawXml>,
}

impl ParagraphProperties {
    /// Check if no property is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl XmlRead for ParagraphProperties {
    fn read_xml(
        reader: &mut XmlReader<'_>,
        _start: &BytesStart<'_>,
        empty: bool,
    ) -> XmlResult<Self> {
        let mut props = ParagraphProperties::default();
        if empty {
            return Ok(props);
        }

        reader.read_children(|r, offset, e, empty| {
            match e.local_name().as_ref() {
                b"pStyle" => props.style = attr(e, "w:val"),
                b"keepNext" => props.keep_next = Some(on_off(e)),
                b"pageBreakBefore" => props.page_break_before = Some(on_off(e)),
                b"spacing" if has_only_attrs(e, &["w:before", "w:after", "w:line"]) => {
                    props.spacing = Some(Spacing {
                        before: attr_parse(e, "w:before"),
                        after: attr_parse(e, "w:after"),
                        line: attr_parse(e, "w:line"),
                    })
                }
                b"ind"
                    if has_only_attrs(
                        e,
                        &["w:left", "w:right", "w:firstLine", "w:hanging"],
                    ) =>
                {
                    props.indent = Some(Indent {
                        left: attr_parse(e, "w:left"),
                        right: attr_parse(e, "w:right"),
                        first_line: attr_parse(e, "w:firstLine"),
                        hanging: attr_parse(e, "w:hanging"),
                    })
                }
                b"jc" => match attr(e, "w:val").as_deref().and_then(Justification::parse) {
                    Some(jc) => props.justification = Some(jc),
                    None => {
                        props.extras.push(r.capture(offset, e, empty)?);
                        return Ok(());
                    }
                },
                b"numPr" if !empty => {
                    let mut num_id = None;
                    let mut ilvl = 0;
                    let mut other = false;
                    let raw = r.capture(offset, e, empty)?;
                    let mut inner = XmlReader::new(raw.0.as_bytes());
                    inner.next_event()?;
                    inner.read_children(|ir, _, ie, iempty| {
                        match ie.local_name().as_ref() {
                            b"numId" => num_id = attr_parse(ie, "w:val"),
                            b"ilvl" => ilvl = attr_parse(ie, "w:val").unwrap_or(0),
                            _ => other = true,
                        }
                        ir.skip(ie, iempty)
                    })?;
                    match num_id {
                        Some(num_id) if !other => {
                            props.numbering = Some(NumberingRef { num_id, ilvl })
                        }
                        _ => props.extras.push(raw),
                    }
                    return Ok(());
                }
                _ => {
                    props.extras.push(r.capture(offset, e, empty)?);
                    return Ok(());
                }
            }
            r.skip(e, empty)
        })?;

        Ok(props)
    }
}

impl XmlWrite for ParagraphProperties {
    fn write_xml(&self, out: &mut String) {
        let mut seq = Sequence::new(PPR_ORDER);

        if let Some(style) = &self.style {
            seq.push("pStyle", val("w:pStyle", style));
        }
        for (name, value) in [
            ("keepNext", self.keep_next),
            ("pageBreakBefore", self.page_break_before),
        ] {
            match value {
                Some(true) => seq.push(name, format!("<w:{}/>", name)),
                Some(false) => seq.push(name, format!(r#"<w:{} w:val="0"/>"#, name)),
                None => {}
            }
        }
        if let Some(num) = self.numbering {
            seq.push(
                "numPr",
                format!(
                    r#"<w:numPr><w:ilvl w:val="{}"/><w:numId w:val="{}"/></w:numPr>"#,
                    num.ilvl, num.num_id
                ),
            );
        }
        if let Some(spacing) = self.spacing {
            let mut markup = String::from("<w:spacing");
            push_number(&mut markup, "w:before", spacing.before);
            push_number(&mut markup, "w:after", spacing.after);
            push_number(&mut markup, "w:line", spacing.line);
            markup.push_str("/>");
            seq.push("spacing", markup);
        }
        if let Some(indent) = self.indent {
            let mut markup = String::from("<w:ind");
            push_number(&mut markup, "w:left", indent.left);
            push_number(&mut markup, "w:right", indent.right);
            push_number(&mut markup, "w:firstLine", indent.first_line);
            push_number(&mut markup, "w:hanging", indent.hanging);
            markup.push_str("/>");
            seq.push("ind", markup);
        }
        if let Some(jc) = self.justification {
            seq.push("jc", val("w:jc", jc.as_str()));
        }
        for extra in &self.extras {
            seq.push_raw(extra);
        }

        seq.write(out, "w:pPr");
    }
}

fn val(tag: &str, value: &str) -> String {
    let mut out = String::new();
    push_val(&mut out, tag, value);
    out
}

fn push_number<T: std::fmt::Display>(out: &mut String, key: &str, value: Option<T>) {
    if let Some(value) = value {
        out.push_str(&format!(r#" {}="{}""#, key, value));
    }
}

/// Inline content of a paragraph or hyperlink
#[derive(Debug, Clone, PartialEq)]
pub enum ParagraphChild {
    /// A text run
    Run(Run),
    /// A hyperlink
    Hyperlink(Hyperlink),
    /// Bookmarks, fields, revisions and anything else, kept verbatim
    Raw(RawXml),
}

/// A hyperlink with its target and content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hyperlink {
    /// Relationship ID for external URLs (`r:id`)
    pub id: Option<String>,
    /// Internal bookmark name (`w:anchor`)
    pub anchor: Option<String>,
    /// Remaining attributes (`w:history`, `w:tooltip`, ...)
    pub attributes: Vec<(String, String)>,
    pub children: Vec<ParagraphChild>,
}

impl Hyperlink {
    /// Link to an external target through a relationship ID
    pub fn external(rel_id: impl Into<String>) -> Self {
        Self {
            id: Some(rel_id.into()),
            attributes: vec![("w:history".to_string(), "1".to_string())],
            ..Self::default()
        }
    }

    /// Link to a bookmark in the same document
    pub fn internal(anchor: impl Into<String>) -> Self {
        Self {
            anchor: Some(anchor.into()),
            ..Self::default()
        }
    }

    /// Append a run
    pub fn add_run(&mut self, run: Run) -> &mut Run {
        self.children.push(ParagraphChild::Run(run));
        match self.children.last_mut() {
            Some(ParagraphChild::Run(run)) => run,
            _ => unreachable!("run was just pushed"),
        }
    }

    /// Runs inside the hyperlink
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.children.iter().filter_map(|c| match c {
            ParagraphChild::Run(r) => Some(r),
            _ => None,
        })
    }

    /// Text content
    pub fn plain_text(&self) -> String {
        children_text(&self.children)
    }
}

impl XmlRead for Hyperlink {
    fn read_xml(reader: &mut XmlReader<'_>, start: &BytesStart<'_>, empty: bool) -> XmlResult<Self> {
        let mut link = Hyperlink::default();
        for (key, value) in attrs(start) {
            match key.as_str() {
                "r:id" => link.id = Some(value),
                "w:anchor" => link.anchor = Some(value),
                _ => link.attributes.push((key, value)),
            }
        }
        if !empty {
            read_inline_children(reader, &mut link.children)?;
        }
        Ok(link)
    }
}

impl XmlWrite for Hyperlink {
    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:hyperlink");
        if let Some(id) = &self.id {
            push_attrs(out, &[("r:id".to_string(), id.clone())]);
        }
        if let Some(anchor) = &self.anchor {
            push_attrs(out, &[("w:anchor".to_string(), anchor.clone())]);
        }
        push_attrs(out, &self.attributes);
        out.push('>');
        write_inline_children(out, &self.children);
        out.push_str("</w:hyperlink>");
    }
}

/// A paragraph with its properties and inline content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    /// Attributes of `w:p` (paragraph IDs, revision IDs)
    pub attributes: Vec<(String, String)>,
    pub properties: ParagraphProperties,
    pub children: Vec<ParagraphChild>,
}

impl Paragraph {
    /// Create an empty paragraph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paragraph with a single text run
    pub fn with_text(text: impl Into<String>) -> Self {
        let mut p = Self::new();
        p.add_text(text);
        p
    }

    /// Append a run holding `text`
    pub fn add_text(&mut self, text: impl Into<String>) -> &mut Run {
        self.add_run(Run::text(text))
    }

    /// Append a run
    pub fn add_run(&mut self, run: Run) -> &mut Run {
        self.children.push(ParagraphChild::Run(run));
        match self.children.last_mut() {
            Some(ParagraphChild::Run(run)) => run,
            _ => unreachable!("run was just pushed"),
        }
    }

    /// Append a hyperlink
    pub fn add_hyperlink(&mut self, link: Hyperlink) -> &mut Hyperlink {
        self.children.push(ParagraphChild::Hyperlink(link));
        match self.children.last_mut() {
            Some(ParagraphChild::Hyperlink(link)) => link,
            _ => unreachable!("hyperlink was just pushed"),
        }
    }

    /// Set the paragraph style
    pub fn style(&mut self, style_id: impl Into<String>) -> &mut Self {
        self.properties.style = Some(style_id.into());
        self
    }

    pub fn justification(&mut self, jc: Justification) -> &mut Self {
        self.properties.justification = Some(jc);
        self
    }

    /// Space before and after, in twips
    pub fn spacing(&mut self, before: u32, after: u32) -> &mut Self {
        let spacing = self.properties.spacing.get_or_insert_with(Spacing::default);
        spacing.before = Some(before);
        spacing.after = Some(after);
        self
    }

    /// Line spacing in 240ths of a line (240 = single)
    pub fn line_spacing(&mut self, line: u32) -> &mut Self {
        self.properties
            .spacing
            .get_or_insert_with(Spacing::default)
            .line = Some(line);
        self
    }

    /// Left and first-line indentation, in twips
    pub fn indent(&mut self, left: i32, first_line: u32) -> &mut Self {
        let indent = self.properties.indent.get_or_insert_with(Indent::default);
        indent.left = Some(left);
        indent.first_line = Some(first_line);
        self
    }

    pub fn numbering(&mut self, num_id: u32, ilvl: u32) -> &mut Self {
        self.properties.numbering = Some(NumberingRef { num_id, ilvl });
        self
    }

    pub fn keep_next(&mut self) -> &mut Self {
        self.properties.keep_next = Some(true);
        self
    }

    pub fn page_break_before(&mut self) -> &mut Self {
        self.properties.page_break_before = Some(true);
        self
    }

    /// Style ID, if any
    pub fn style_id(&self) -> Option<&str> {
        self.properties.style.as_deref()
    }

    /// Runs directly in the paragraph and inside its hyperlinks
    pub fn runs(&self) -> Vec<&Run> {
        let mut runs = Vec::new();
        collect_runs(&self.children, &mut runs);
        runs
    }

    /// Drawings in document order
    pub fn drawings(&self) -> Vec<&Drawing> {
        self.runs().into_iter().flat_map(|r| r.drawings()).collect()
    }

    /// Text content
    pub fn plain_text(&self) -> String {
        children_text(&self.children)
    }

    /// Check if the paragraph has no content
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl XmlRead for Paragraph {
    fn read_xml(reader: &mut XmlReader<'_>, start: &BytesStart<'_>, empty: bool) -> XmlResult<Self> {
        let mut p = Paragraph {
            attributes: attrs(start),
            ..Paragraph::default()
        };
        if empty {
            return Ok(p);
        }

        let mut props = None;
        let mut children = Vec::new();
        reader.read_children(|r, offset, e, empty| {
            if e.local_name().as_ref() == b"pPr" && props.is_none() {
                props = Some(ParagraphProperties::read_xml(r, e, empty)?);
                Ok(())
            } else {
                read_inline(r, offset, e, empty, &mut children)
            }
        })?;

        p.properties = props.unwrap_or_default();
        p.children = children;
        Ok(p)
    }
}

impl XmlWrite for Paragraph {
    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:p");
        push_attrs(out, &self.attributes);
        if self.properties.is_empty() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        self.properties.write_xml(out);
        write_inline_children(out, &self.children);
        out.push_str("</w:p>");
    }
}

fn read_inline(
    reader: &mut XmlReader<'_>,
    offset: usize,
    e: &BytesStart<'_>,
    empty: bool,
    children: &mut Vec<ParagraphChild>,
) -> XmlResult<()> {
    let child = match e.local_name().as_ref() {
        b"r" => ParagraphChild::Run(Run::read_xml(reader, e, empty)?),
        b"hyperlink" => ParagraphChild::Hyperlink(Hyperlink::read_xml(reader, e, empty)?),
        _ => ParagraphChild::Raw(reader.capture(offset, e, empty)?),
    };
    children.push(child);
    Ok(())
}

fn read_inline_children(
    reader: &mut XmlReader<'_>,
    children: &mut Vec<ParagraphChild>,
) -> XmlResult<()> {
    reader.read_children(|r, offset, e, empty| read_inline(r, offset, e, empty, children))
}

fn write_inline_children(out: &mut String, children: &[ParagraphChild]) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => run.write_xml(out),
            ParagraphChild::Hyperlink(link) => link.write_xml(out),
            ParagraphChild::Raw(raw) => raw.write_xml(out),
        }
    }
}

fn collect_runs<'a>(children: &'a [ParagraphChild], runs: &mut Vec<&'a Run>) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => runs.push(run),
            ParagraphChild::Hyperlink(link) => collect_runs(&link.children, runs),
            ParagraphChild::Raw(_) => {}
        }
    }
}

fn children_text(children: &[ParagraphChild]) -> String {
    let mut runs = Vec::new();
    collect_runs(children, &mut runs);
    runs.iter().map(|r| r.plain_text()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;

    fn parse_paragraph(xml: &str) -> Paragraph {
        let mut reader = XmlReader::new(xml.as_bytes());
        loop {
            match reader.next_event().unwrap().1 {
                Event::Start(e) => return Paragraph::read_xml(&mut reader, &e, false).unwrap(),
                Event::Empty(e) => return Paragraph::read_xml(&mut reader, &e, true).unwrap(),
                Event::Eof => panic!("no paragraph"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_parse_simple_paragraph() {
        let p = parse_paragraph(r#"<w:p><w:r><w:t>Hello, </w:t></w:r><w:r><w:t>World</w:t></w:r></w:p>"#);
        assert_eq!(p.plain_text(), "Hello, World");
        assert_eq!(p.runs().len(), 2);
        assert!(p.style_id().is_none());
    }

    #[test]
    fn test_parse_styled_paragraph() {
        let p = parse_paragraph(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/><w:keepNext/><w:spacing w:before="240" w:after="60"/><w:jc w:val="center"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>"#,
        );
        assert_eq!(p.style_id(), Some("Heading1"));
        assert_eq!(p.properties.keep_next, Some(true));
        assert_eq!(
            p.properties.spacing,
            Some(Spacing {
                before: Some(240),
                after: Some(60),
                line: None
            })
        );
        assert_eq!(p.properties.justification, Some(Justification::Center));
        assert!(p.properties.extras.is_empty());
    }

    #[test]
    fn test_parse_numbering_reference() {
        let p = parse_paragraph(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="1"/><w:numId w:val="4"/></w:numPr></w:pPr><w:r><w:t>Item</w:t></w:r></w:p>"#,
        );
        assert_eq!(p.properties.numbering, Some(NumberingRef { num_id: 4, ilvl: 1 }));
    }

    #[test]
    fn test_parse_hyperlink_with_external_id() {
        let p = parse_paragraph(
            r#"<w:p><w:hyperlink r:id="rId5" w:history="1"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t>site</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let ParagraphChild::Hyperlink(link) = &p.children[0] else {
            panic!("expected hyperlink");
        };
        assert_eq!(link.id.as_deref(), Some("rId5"));
        assert_eq!(link.anchor, None);
        assert_eq!(link.plain_text(), "site");
        assert_eq!(p.plain_text(), "site");
    }

    #[test]
    fn test_parse_hyperlink_with_anchor() {
        let p = parse_paragraph(
            r#"<w:p><w:hyperlink w:anchor="_Toc1"><w:r><w:t>Chapter</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let ParagraphChild::Hyperlink(link) = &p.children[0] else {
            panic!("expected hyperlink");
        };
        assert_eq!(link.anchor.as_deref(), Some("_Toc1"));
        assert_eq!(link.id, None);
    }

    #[test]
    fn test_unknown_content_roundtrip() {
        let xml = r#"<w:p w14:paraId="1A2B3C4D"><w:pPr><w:pStyle w:val="Body"/><w:rPr><w:lang w:val="de-DE"/></w:rPr></w:pPr><w:bookmarkStart w:id="0" w:name="start"/><w:r><w:t>Text</w:t></w:r><w:bookmarkEnd w:id="0"/></w:p>"#;
        let p = parse_paragraph(xml);

        assert_eq!(p.children.len(), 3);
        assert_eq!(p.properties.extras.len(), 1);
        assert_eq!(p.to_xml_string(), xml);
    }

    #[test]
    fn test_unmodeled_attribute_variant_preserved() {
        let xml = r#"<w:p><w:pPr><w:spacing w:before="100" w:beforeAutospacing="1"/><w:ind w:start="720"/></w:pPr></w:p>"#;
        let p = parse_paragraph(xml);

        assert!(p.properties.spacing.is_none());
        assert!(p.properties.indent.is_none());
        assert_eq!(p.properties.extras.len(), 2);
        assert_eq!(p.to_xml_string(), xml);
    }

    #[test]
    fn test_builder_output() {
        let mut p = Paragraph::new();
        p.justification(Justification::Both)
            .indent(720, 360)
            .spacing(0, 120)
            .numbering(1, 0)
            .style("ListParagraph");
        p.add_text("Entry").bold();

        assert_eq!(
            p.to_xml_string(),
            concat!(
                "<w:p><w:pPr>",
                r#"<w:pStyle w:val="ListParagraph"/>"#,
                r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr>"#,
                r#"<w:spacing w:before="0" w:after="120"/>"#,
                r#"<w:ind w:left="720" w:firstLine="360"/>"#,
                r#"<w:jc w:val="both"/>"#,
                "</w:pPr>",
                "<w:r><w:rPr><w:b/></w:rPr><w:t>Entry</w:t></w:r>",
                "</w:p>"
            )
        );
    }

    #[test]
    fn test_empty_paragraph() {
        let p = parse_paragraph("<w:p/>");
        assert!(p.is_empty());
        assert_eq!(p.to_xml_string(), "<w:p/>");
    }
}
