//! Tables (`w:tbl`)

use quick_xml::events::BytesStart;

use crate::document::{read_block, write_blocks, BlockChild};
use crate::paragraph::Paragraph;
use crate::xml::{
    attr, attr_parse, attrs, has_only_attrs, push_attrs, push_val, RawXml, Sequence, XmlRead,
    XmlReader, XmlResult, XmlWrite,
};

/// Schema order of `w:tblPr` children
static TBLPR_ORDER: &[&str] = &[
    "tblStyle", "tblpPr", "tblOverlap", "bidiVisual", "tblStyleRowBandSize",
    "tblStyleColBandSize", "tblW", "jc", "tblCellSpacing", "tblInd", "tblBorders", "shd",
    "tblLayout", "tblCellMar", "tblLook", "tblCaption", "tblDescription", "tblPrChange",
];

/// Schema order of `w:tcPr` children
static TCPR_ORDER: &[&str] = &[
    "cnfStyle", "tcW", "gridSpan", "hMerge", "vMerge", "tcBorders", "shd", "noWrap", "tcMar",
    "textDirection", "tcFitText", "vAlign", "hideMark", "headers", "cellIns", "cellDel",
    "cellMerge", "tcPrChange",
];

/// Table or cell width (`w:tblW`, `w:tcW`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableWidth {
    /// Let the layout engine decide
    Auto,
    /// Twips
    Dxa(u32),
    /// Fiftieths of a percent (5000 = 100%)
    Pct(u32),
}

impl TableWidth {
    fn parse(e: &BytesStart<'_>) -> Option<Self> {
        if !has_only_attrs(e, &["w:w", "w:type"]) {
            return None;
        }
        match attr(e, "w:type").as_deref() {
            Some("auto") => Some(Self::Auto),
            Some("dxa") => attr_parse(e, "w:w").map(Self::Dxa),
            Some("pct") => attr_parse(e, "w:w").map(Self::Pct),
            _ => None,
        }
    }

    fn markup(self, tag: &str) -> String {
        let (w, kind) = match self {
            Self::Auto => (0, "auto"),
            Self::Dxa(w) => (w, "dxa"),
            Self::Pct(w) => (w, "pct"),
        };
        format!(r#"<{} w:w="{}" w:type="{}"/>"#, tag, w, kind)
    }
}

/// Table-level properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableProperties {
    /// Table style ID (`w:tblStyle`)
    pub style: Option<String>,
    pub width: Option<TableWidth>,
    /// Children without a typed field, kept verbatim
    pub extras: Vec<RawXml>,
}

impl XmlRead for TableProperties {
    fn read_xml(
        reader: &mut XmlReader<'_>,
        _start: &BytesStart<'_>,
        empty: bool,
    ) -> XmlResult<Self> {
        let mut props = TableProperties::default();
        if empty {
            return Ok(props);
        }
        reader.read_children(|r, offset, e, empty| {
            match e.local_name().as_ref() {
                b"tblStyle" => props.style = attr(e, "w:val"),
                b"tblW" if TableWidth::parse(e).is_some() => props.width = TableWidth::parse(e),
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

impl XmlWrite for TableProperties {
    fn write_xml(&self, out: &mut String) {
        let mut seq = Sequence::new(TBLPR_ORDER);
        if let Some(style) = &self.style {
            let mut markup = String::new();
            push_val(&mut markup, "w:tblStyle", style);
            seq.push("tblStyle", markup);
        }
        if let Some(width) = self.width {
            seq.push("tblW", width.markup("w:tblW"));
        }
        for extra in &self.extras {
            seq.push_raw(extra);
        }
        seq.write(out, "w:tblPr");
    }
}

/// Cell-level properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCellProperties {
    pub width: Option<TableWidth>,
    /// Number of grid columns spanned
    pub grid_span: Option<u32>,
    /// Children without a typed field, kept verbatim
    pub extras: Vec<RawXml>,
}

impl XmlRead for TableCellProperties {
    fn read_xml(
        reader: &mut XmlReader<'_>,
        _start: &BytesStart<'_>,
        empty: bool,
    ) -> XmlResult<Self> {
        let mut props = TableCellProperties::default();
        if empty {
            return Ok(props);
        }
        reader.read_children(|r, offset, e, empty| {
            match e.local_name().as_ref() {
                b"tcW" if TableWidth::parse(e).is_some() => props.width = TableWidth::parse(e),
                b"gridSpan" => props.grid_span = attr_parse(e, "w:val"),
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

impl XmlWrite for TableCellProperties {
    fn write_xml(&self, out: &mut String) {
        let mut seq = Sequence::new(TCPR_ORDER);
        if let Some(width) = self.width {
            seq.push("tcW", width.markup("w:tcW"));
        }
        if let Some(span) = self.grid_span {
            seq.push("gridSpan", format!(r#"<w:gridSpan w:val="{}"/>"#, span));
        }
        for extra in &self.extras {
            seq.push_raw(extra);
        }
        seq.write(out, "w:tcPr");
    }
}

/// A table cell holding block content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    /// Attributes of `w:tc`
    pub attributes: Vec<(String, String)>,
    pub properties: TableCellProperties,
    pub children: Vec<BlockChild>,
}

impl TableCell {
    /// Create an empty cell
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a paragraph
    pub fn add_paragraph(&mut self, text: impl Into<String>) -> &mut Paragraph {
        self.children
            .push(BlockChild::Paragraph(Paragraph::with_text(text)));
        match self.children.last_mut() {
            Some(BlockChild::Paragraph(p)) => p,
            _ => unreachable!("paragraph was just pushed"),
        }
    }

    /// Set the cell width in twips
    pub fn width(&mut self, twips: u32) -> &mut Self {
        self.properties.width = Some(TableWidth::Dxa(twips));
        self
    }

    /// Paragraphs directly in the cell
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.children.iter().filter_map(|c| match c {
            BlockChild::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Text of the cell's paragraphs, one per line
    pub fn plain_text(&self) -> String {
        self.paragraphs()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl XmlRead for TableCell {
    fn read_xml(reader: &mut XmlReader<'_>, start: &BytesStart<'_>, empty: bool) -> XmlResult<Self> {
        let mut cell = TableCell {
            attributes: attrs(start),
            ..TableCell::default()
        };
        if empty {
            return Ok(cell);
        }
        let mut props = None;
        let mut children = Vec::new();
        reader.read_children(|r, offset, e, empty| {
            if e.local_name().as_ref() == b"tcPr" && props.is_none() {
                props = Some(TableCellProperties::read_xml(r, e, empty)?);
                Ok(())
            } else {
                children.push(read_block(r, offset, e, empty)?);
                Ok(())
            }
        })?;
        cell.properties = props.unwrap_or_default();
        cell.children = children;
        Ok(cell)
    }
}

impl XmlWrite for TableCell {
    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:tc");
        push_attrs(out, &self.attributes);
        out.push('>');
        self.properties.write_xml(out);
        write_blocks(out, &self.children);
        // A cell must end with a paragraph
        if !matches!(self.children.last(), Some(BlockChild::Paragraph(_))) {
            out.push_str("<w:p/>");
        }
        out.push_str("</w:tc>");
    }
}

/// Content of a table row
#[derive(Debug, Clone, PartialEq)]
pub enum RowChild {
    Cell(TableCell),
    Raw(RawXml),
}

/// A table row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    /// Attributes of `w:tr`
    pub attributes: Vec<(String, String)>,
    /// Row properties (`w:trPr`), kept verbatim
    pub properties: Option<RawXml>,
    pub children: Vec<RowChild>,
}

impl TableRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty cell
    pub fn add_cell(&mut self) -> &mut TableCell {
        self.children.push(RowChild::Cell(TableCell::new()));
        match self.children.last_mut() {
            Some(RowChild::Cell(cell)) => cell,
            _ => unreachable!("cell was just pushed"),
        }
    }

    /// Mark the row as a header row repeated on each page
    pub fn header(&mut self) -> &mut Self {
        self.properties = Some(RawXml("<w:trPr><w:tblHeader/></w:trPr>".to_string()));
        self
    }

    /// Check if the row repeats as a header
    pub fn is_header(&self) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|p| p.0.contains("tblHeader") && !p.0.contains("tblHeader w:val=\"0\""))
    }

    /// Cells of the row
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.children.iter().filter_map(|c| match c {
            RowChild::Cell(cell) => Some(cell),
            _ => None,
        })
    }
}

impl XmlRead for TableRow {
    fn read_xml(reader: &mut XmlReader<'_>, start: &BytesStart<'_>, empty: bool) -> XmlResult<Self> {
        let mut row = TableRow {
            attributes: attrs(start),
            ..TableRow::default()
        };
        if empty {
            return Ok(row);
        }
        reader.read_children(|r, offset, e, empty| {
            match e.local_name().as_ref() {
                b"trPr" if row.properties.is_none() => {
                    row.properties = Some(r.capture(offset, e, empty)?)
                }
                b"tc" => row
                    .children
                    .push(RowChild::Cell(TableCell::read_xml(r, e, empty)?)),
                _ => row.children.push(RowChild::Raw(r.capture(offset, e, empty)?)),
            }
            Ok(())
        })?;
        Ok(row)
    }
}

impl XmlWrite for TableRow {
    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:tr");
        push_attrs(out, &self.attributes);
        out.push('>');
        if let Some(props) = &self.properties {
            props.write_xml(out);
        }
        for child in &self.children {
            match child {
                RowChild::Cell(cell) => cell.write_xml(out),
                RowChild::Raw(raw) => raw.write_xml(out),
            }
        }
        out.push_str("</w:tr>");
    }
}

/// Content of a table after its properties and grid
#[derive(Debug, Clone, PartialEq)]
pub enum TableChild {
    Row(TableRow),
    Raw(RawXml),
}

/// A table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Attributes of `w:tbl`
    pub attributes: Vec<(String, String)>,
    pub properties: TableProperties,
    /// Column widths in twips (`w:tblGrid`)
    pub grid: Vec<u32>,
    pub children: Vec<TableChild>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty row
    pub fn add_row(&mut self) -> &mut TableRow {
        self.children.push(TableChild::Row(TableRow::new()));
        match self.children.last_mut() {
            Some(TableChild::Row(row)) => row,
            _ => unreachable!("row was just pushed"),
        }
    }

    /// Set the table style
    pub fn style(&mut self, style_id: impl Into<String>) -> &mut Self {
        self.properties.style = Some(style_id.into());
        self
    }

    pub fn width(&mut self, width: TableWidth) -> &mut Self {
        self.properties.width = Some(width);
        self
    }

    /// Set the column widths in twips
    pub fn grid(&mut self, columns: impl IntoIterator<Item = u32>) -> &mut Self {
        self.grid = columns.into_iter().collect();
        self
    }

    /// Style ID, if any
    pub fn style_id(&self) -> Option<&str> {
        self.properties.style.as_deref()
    }

    /// Rows of the table
    pub fn rows(&self) -> impl Iterator<Item = &TableRow> {
        self.children.iter().filter_map(|c| match c {
            TableChild::Row(row) => Some(row),
            _ => None,
        })
    }

    /// Number of columns: the grid if present, otherwise the widest row
    pub fn column_count(&self) -> usize {
        if !self.grid.is_empty() {
            return self.grid.len();
        }
        self.rows().map(|r| r.cells().count()).max().unwrap_or(0)
    }
}

impl XmlRead for Table {
    fn read_xml(reader: &mut XmlReader<'_>, start: &BytesStart<'_>, empty: bool) -> XmlResult<Self> {
        let mut table = Table {
            attributes: attrs(start),
            ..Table::default()
        };
        if empty {
            return Ok(table);
        }
        reader.read_children(|r, offset, e, empty| {
            match e.local_name().as_ref() {
                b"tblPr" => table.properties = TableProperties::read_xml(r, e, empty)?,
                b"tblGrid" => {
                    let raw = r.capture(offset, e, empty)?;
                    let mut inner = XmlReader::new(raw.0.as_bytes());
                    inner.next_event()?;
                    let mut grid = Vec::new();
                    inner.read_children(|ir, _, ie, iempty| {
                        if ie.local_name().as_ref() == b"gridCol" {
                            grid.push(attr_parse(ie, "w:w").unwrap_or(0));
                        }
                        ir.skip(ie, iempty)
                    })?;
                    table.grid = grid;
                }
                b"tr" => table
                    .children
                    .push(TableChild::Row(TableRow::read_xml(r, e, empty)?)),
                _ => table
                    .children
                    .push(TableChild::Raw(r.capture(offset, e, empty)?)),
            }
            Ok(())
        })?;
        Ok(table)
    }
}

impl XmlWrite for Table {
    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:tbl");
        push_attrs(out, &self.attributes);
        out.push('>');
        self.properties.write_xml(out);
        if self.grid.is_empty() {
            out.push_str("<w:tblGrid/>");
        } else {
            out.push_str("<w:tblGrid>");
            for col in &self.grid {
                out.push_str(&format!(r#"<w:gridCol w:w="{}"/>"#, col));
            }
            out.push_str("</w:tblGrid>");
        }
        for child in &self.children {
            match child {
                TableChild::Row(row) => row.write_xml(out),
                TableChild::Raw(raw) => raw.write_xml(out),
            }
        }
        out.push_str("</w:tbl>");
    }
}
