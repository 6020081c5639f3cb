//! DOCX package assembly and writing
//!
//! [`DocxPackage::unpack`] turns a zip archive into a linked package in five
//! fixed stages:
//!
//! 1. archive: read every zip entry into the file index
//! 2. content types: load `[Content_Types].xml`
//! 3. root relationships: load `_rels/.rels` and find the main document
//! 4. main document: load the document part and its relationships
//! 5. styles: load the styles part the document refers to
//!
//! A failure in any stage is reported as [`OoxmlError::Unpack`] naming the
//! stage. Parts that are not consumed stay in the file index untouched and
//! are written back byte-for-byte.
//!
//! # Example
//!
//! ```no_run
//! use docxpack_ooxml::DocxPackage;
//!
//! let mut package = DocxPackage::open("report.docx")?;
//! package.add_heading("Appendix", 1)?;
//! package.add_paragraph("Added after the fact.");
//! package.save_to("report-updated.docx")?;
//! # Ok::<(), docxpack_ooxml::OoxmlError>(())
//! ```

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use crate::archive::FileIndex;
use crate::content_types::{
    mime_for_extension, ContentTypes, CT_MAIN_DOCUMENT, CT_NUMBERING, CT_RELATIONSHIPS, CT_STYLES,
    CT_XML,
};
use crate::document::{Document, DEFAULT_DOCUMENT_PATH};
use crate::drawing::{Drawing, InlinePicture};
use crate::error::{OoxmlError, Result, UnpackStage};
use crate::numbering::{ListKind, NumberingPart, LIST_LEVELS};
use crate::options::PackageOptions;
use crate::paragraph::{Hyperlink, Paragraph};
use crate::paths::{
    part_dir, part_extension, part_file_name, rels_path_for, resolve_target, CONTENT_TYPES_PATH,
    MEDIA_DIR,
};
use crate::relationships::{
    Relationships, TargetMode, TYPE_NUMBERING, TYPE_OFFICE_DOCUMENT, TYPE_STYLES,
};
use crate::run::{BreakType, Run};
use crate::styles::{Style, StyleType, StylesPart};
use crate::table::Table;

/// Character style applied to hyperlink text
pub const HYPERLINK_STYLE: &str = "Hyperlink";

/// Target of a new numbering relationship, next to the main document
const NUMBERING_TARGET: &str = "numbering.xml";

/// An in-memory DOCX package
#[derive(Debug, Clone)]
pub struct DocxPackage {
    files: FileIndex,
    content_types: ContentTypes,
    root_relationships: Relationships,
    document: Document,
    styles: Option<StylesPart>,
    /// Loaded on the first list operation; until then the part stays in `files`
    numbering: Option<NumberingPart>,
    image_count: u32,
    path: Option<PathBuf>,
    options: PackageOptions,
}

impl DocxPackage {
    /// Create a new package with an empty document and the built-in styles
    pub fn new() -> Self {
        Self::with_options(PackageOptions::default())
    }

    /// Create a new package using `options` for writing
    pub fn with_options(options: PackageOptions) -> Self {
        let document = {
            let mut doc = Document::new(DEFAULT_DOCUMENT_PATH);
            doc.relationships_mut()
                .add(TYPE_STYLES, "styles.xml", TargetMode::Internal);
            doc
        };
        let styles = StylesPart::builtin();

        let mut content_types = ContentTypes::new();
        content_types.add_default("rels", CT_RELATIONSHIPS);
        content_types.add_default("xml", CT_XML);
        content_types.add_override(document.path(), CT_MAIN_DOCUMENT);
        content_types.add_override(styles.path(), CT_STYLES);

        let mut root_relationships = Relationships::new(rels_path_for(""));
        root_relationships.add(TYPE_OFFICE_DOCUMENT, document.path(), TargetMode::Internal);

        Self {
            files: FileIndex::new(),
            content_types,
            root_relationships,
            document,
            styles: Some(styles),
            numbering: None,
            image_count: 0,
            path: None,
            options,
        }
    }

    /// Unpack a package from zip bytes
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        Self::unpack_with_options(bytes, PackageOptions::default())
    }

    /// Unpack a package from zip bytes with explicit options
    pub fn unpack_with_options(bytes: &[u8], options: PackageOptions) -> Result<Self> {
        let files =
            FileIndex::read_from_zip(bytes).map_err(|e| e.in_stage(UnpackStage::Archive))?;
        Self::assemble(files, options)
    }

    /// Unpack a package from any zip source
    pub fn from_reader<R: Read + Seek>(reader: R, options: PackageOptions) -> Result<Self> {
        let files = FileIndex::from_reader(reader).map_err(|e| e.in_stage(UnpackStage::Archive))?;
        Self::assemble(files, options)
    }

    /// Open a package file; [`save`](Self::save) writes back to the same path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, PackageOptions::default())
    }

    /// Open a package file with explicit options
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: PackageOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut package = Self::from_reader(file, options)?;
        package.path = Some(path.to_path_buf());
        Ok(package)
    }

    fn assemble(mut files: FileIndex, options: PackageOptions) -> Result<Self> {
        log::debug!("unpacking {} archive entries", files.len());

        let content_types =
            load_content_types(&mut files).map_err(|e| e.in_stage(UnpackStage::ContentTypes))?;
        log::debug!(
            "content types: {} defaults, {} overrides",
            content_types.defaults().len(),
            content_types.overrides().len()
        );

        let (root_relationships, document_path) = load_root_relationships(&mut files)
            .map_err(|e| e.in_stage(UnpackStage::RootRelationships))?;
        log::debug!("main document at {}", document_path);

        let document = load_document(&mut files, &content_types, &document_path)
            .map_err(|e| e.in_stage(UnpackStage::MainDocument))?;
        log::debug!(
            "document has {} blocks and {} relationships",
            document.body.children.len(),
            document.relationships().len()
        );

        let styles = load_styles(
            &mut files,
            &content_types,
            &root_relationships,
            &document,
            &options,
        )
        .map_err(|e| e.in_stage(UnpackStage::Styles))?;

        let image_count = files.count_with_prefix(&media_prefix(document.path())) as u32;
        log::debug!(
            "{} parts kept verbatim, {} images",
            files.len(),
            image_count
        );

        Ok(Self {
            files,
            content_types,
            root_relationships,
            document,
            styles,
            numbering: None,
            image_count,
            path: None,
            options,
        })
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    /// Serialize the package to zip bytes
    ///
    /// The package itself is not modified.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut snapshot = self.files.clone();
        snapshot.insert(CONTENT_TYPES_PATH, self.content_types.to_xml().into_bytes());
        snapshot.insert(
            self.root_relationships.path(),
            self.root_relationships.to_xml().into_bytes(),
        );
        let doc_rels = self.document.relationships();
        snapshot.insert(doc_rels.path(), doc_rels.to_xml().into_bytes());
        snapshot.insert(self.document.path(), self.document.to_xml().into_bytes());
        if let Some(styles) = &self.styles {
            snapshot.insert(styles.path(), styles.raw().to_vec());
        }
        if let Some(numbering) = &self.numbering {
            snapshot.insert(numbering.path(), numbering.to_xml().into_bytes());
        }

        log::debug!("writing {} parts", snapshot.len());
        snapshot.write_to_zip(&self.options)
    }

    /// Write the package to `writer`
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Save to the path the package was opened from
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Err(OoxmlError::EmptyDestination),
        }
    }

    /// Save to `path`, replacing any existing file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(OoxmlError::EmptyDestination);
        }
        let bytes = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        log::debug!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Authoring
    // ------------------------------------------------------------------

    /// Append a paragraph holding `text`
    pub fn add_paragraph(&mut self, text: impl Into<String>) -> &mut Paragraph {
        self.document
            .body
            .add_paragraph(Paragraph::with_text(text))
    }

    /// Append a paragraph with no content
    pub fn add_empty_paragraph(&mut self) -> &mut Paragraph {
        self.document.body.add_paragraph(Paragraph::new())
    }

    /// Append a heading; level 0 is the document title, 1-9 are `HeadingN`
    pub fn add_heading(&mut self, text: impl Into<String>, level: u32) -> Result<&mut Paragraph> {
        let style = match level {
            0 => "Title".to_string(),
            1..=9 => format!("Heading{}", level),
            _ => return Err(OoxmlError::InvalidHeadingLevel(level)),
        };
        let paragraph = self.add_paragraph(text);
        paragraph.style(style);
        Ok(paragraph)
    }

    /// Append a paragraph holding a page break
    pub fn add_page_break(&mut self) -> &mut Paragraph {
        let mut run = Run::new();
        run.add_break(BreakType::Page);
        let paragraph = self.add_empty_paragraph();
        paragraph.add_run(run);
        paragraph
    }

    /// Append an empty table
    pub fn add_table(&mut self) -> &mut Table {
        self.document.body.add_table(Table::new())
    }

    /// Append a paragraph with an external hyperlink
    pub fn add_link(&mut self, text: impl Into<String>, url: impl Into<String>) -> &mut Paragraph {
        let rel_id = self.document.relationships_mut().add_hyperlink(url);
        let mut link = Hyperlink::external(rel_id);
        link.add_run(Run::text(text)).style(HYPERLINK_STYLE);

        let paragraph = self.add_empty_paragraph();
        paragraph.add_hyperlink(link);
        paragraph
    }

    /// Append a paragraph with an inline picture read from `path`
    ///
    /// Width and height are in inches.
    pub fn add_picture<P: AsRef<Path>>(
        &mut self,
        path: P,
        width_in: f64,
        height_in: f64,
    ) -> Result<&mut Paragraph> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.add_picture_bytes(&file_name, bytes, width_in, height_in)
    }

    /// Append a paragraph with an inline picture from memory
    ///
    /// `file_name` only supplies the extension; the part is stored as
    /// `media/image<N>.<ext>` next to the main document.
    pub fn add_picture_bytes(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        width_in: f64,
        height_in: f64,
    ) -> Result<&mut Paragraph> {
        let ext = part_extension(file_name)
            .ok_or_else(|| OoxmlError::UnsupportedMedia(file_name.to_string()))?;
        let mime = mime_for_extension(&ext)
            .filter(|m| m.starts_with("image/"))
            .ok_or_else(|| OoxmlError::UnsupportedMedia(ext.clone()))?;

        let part = self.next_media_part(&ext);
        let media_name = part_file_name(&part).to_string();
        log::debug!("adding picture {} ({} bytes)", part, bytes.len());

        self.content_types.add_default(&ext, mime);
        self.content_types.add_override(&part, mime);
        self.files.insert(&part, bytes);

        let rel_id = self
            .document
            .relationships_mut()
            .add_image(format!("{}/{}", MEDIA_DIR, media_name));
        let picture = InlinePicture::new(self.document.next_drawing_id(), rel_id, width_in, height_in)
            .with_name(media_name);

        let paragraph = self.add_empty_paragraph();
        paragraph
            .add_run(Run::new())
            .add_drawing(Drawing::Inline(picture));
        Ok(paragraph)
    }

    /// Start a new list and return the `numId` its items refer to
    ///
    /// Creates the numbering part, its relationship and its content type on
    /// first use. IDs already defined by a template are never reused.
    pub fn new_list_instance(&mut self, kind: ListKind) -> Result<u32> {
        Ok(self.numbering_part()?.new_list_instance(kind))
    }

    /// Start a new list on an abstract definition from the numbering part
    pub fn new_list_instance_for(&mut self, abstract_id: u32) -> Result<u32> {
        self.numbering_part()?.new_list_instance_for(abstract_id)
    }

    /// Append a paragraph to the list `num_id` at `level` (0-8)
    pub fn add_list_item(
        &mut self,
        text: impl Into<String>,
        num_id: u32,
        level: u32,
    ) -> Result<&mut Paragraph> {
        if level >= LIST_LEVELS {
            return Err(OoxmlError::InvalidListLevel(level));
        }
        if !self.numbering_part()?.num_ids().any(|id| id == num_id) {
            return Err(OoxmlError::UnknownNumbering(num_id));
        }
        let paragraph = self.add_paragraph(text);
        paragraph.numbering(num_id, level);
        Ok(paragraph)
    }

    fn numbering_part(&mut self) -> Result<&mut NumberingPart> {
        match self.numbering {
            Some(ref mut part) => Ok(part),
            None => {
                let part = self.load_numbering()?;
                Ok(self.numbering.insert(part))
            }
        }
    }

    /// Take the numbering part out of the file index, or start a new one
    fn load_numbering(&mut self) -> Result<NumberingPart> {
        let related = self
            .document
            .relationships()
            .find_by_type(TYPE_NUMBERING)
            .filter(|rel| rel.target_mode == TargetMode::Internal)
            .map(|rel| resolve_target(self.document.path(), &rel.target));
        let path = related
            .clone()
            .unwrap_or_else(|| resolve_target(self.document.path(), NUMBERING_TARGET));

        let part = match self.files.get(&path) {
            Some(bytes) => NumberingPart::parse(path.clone(), bytes)?,
            None => {
                log::debug!("starting numbering part {}", path);
                NumberingPart::new(path.clone())
            }
        };
        self.files.remove(&path);

        if related.is_none() {
            self.document.relationships_mut().add(
                TYPE_NUMBERING,
                NUMBERING_TARGET,
                TargetMode::Internal,
            );
        }
        self.content_types.add_override(&path, CT_NUMBERING);
        Ok(part)
    }

    /// The numbering part, once a list operation has loaded or created it
    pub fn numbering(&self) -> Option<&NumberingPart> {
        self.numbering.as_ref()
    }

    /// Reserve the next free media part name
    fn next_media_part(&mut self, ext: &str) -> String {
        let prefix = media_prefix(self.document.path());
        loop {
            self.image_count += 1;
            let part = format!("{}image{}.{}", prefix, self.image_count, ext);
            if !self.files.contains(&part) {
                return part;
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Text of every paragraph, one per line
    pub fn plain_text(&self) -> String {
        self.document.plain_text()
    }

    /// All paragraphs, including those inside tables
    pub fn paragraphs(&self) -> Vec<&Paragraph> {
        self.document.paragraphs()
    }

    /// Look up a style by ID and type
    pub fn style_by_id(&self, id: &str, style_type: StyleType) -> Option<&Style> {
        self.styles.as_ref()?.sheet().get(id, style_type)
    }

    /// The styles part, if the package has one
    pub fn styles(&self) -> Option<&StylesPart> {
        self.styles.as_ref()
    }

    /// Number of media parts next to the main document
    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    /// Parts not consumed by the assembler
    pub fn files(&self) -> &FileIndex {
        &self.files
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    pub fn root_relationships(&self) -> &Relationships {
        &self.root_relationships
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn options(&self) -> &PackageOptions {
        &self.options
    }

    /// Replace the write options
    pub fn set_options(&mut self, options: PackageOptions) {
        self.options = options;
    }

    /// Path the package was opened from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Default for DocxPackage {
    fn default() -> Self {
        Self::new()
    }
}

/// `<document dir>/media/`, or `media/` for a document at the root
fn media_prefix(document_path: &str) -> String {
    let dir = part_dir(document_path);
    if dir.is_empty() {
        format!("{}/", MEDIA_DIR)
    } else {
        format!("{}/{}/", dir, MEDIA_DIR)
    }
}

fn load_content_types(files: &mut FileIndex) -> Result<ContentTypes> {
    let bytes = files
        .remove(CONTENT_TYPES_PATH)
        .ok_or_else(|| OoxmlError::MissingPart(CONTENT_TYPES_PATH.to_string()))?;
    ContentTypes::parse(&bytes)
}

fn load_root_relationships(files: &mut FileIndex) -> Result<(Relationships, String)> {
    let path = rels_path_for("");
    let bytes = files
        .remove(&path)
        .ok_or_else(|| OoxmlError::MissingPart(path.clone()))?;
    let rels = Relationships::parse(path, &bytes)?;

    let main = rels
        .iter()
        .find(|r| r.rel_type == TYPE_OFFICE_DOCUMENT && r.target_mode == TargetMode::Internal)
        .ok_or(OoxmlError::MainDocumentNotFound)?;
    let document_path = resolve_target("", &main.target);
    if document_path.is_empty() {
        return Err(OoxmlError::MainDocumentNotFound);
    }

    Ok((rels, document_path))
}

fn load_document(
    files: &mut FileIndex,
    content_types: &ContentTypes,
    path: &str,
) -> Result<Document> {
    if !files.contains(path) {
        return Err(OoxmlError::MissingPart(path.to_string()));
    }
    if content_types.resolve(path).is_none() {
        return Err(OoxmlError::UndeclaredPart(path.to_string()));
    }

    let rels_path = rels_path_for(path);
    let relationships = match files.remove(&rels_path) {
        Some(bytes) => Relationships::parse(rels_path, &bytes)?,
        None => {
            log::warn!("{} has no relationships part, starting an empty one", path);
            Relationships::new(rels_path)
        }
    };

    let bytes = files
        .remove(path)
        .ok_or_else(|| OoxmlError::MissingPart(path.to_string()))?;
    Document::parse(path, &bytes, relationships)
}

fn load_styles(
    files: &mut FileIndex,
    content_types: &ContentTypes,
    root_relationships: &Relationships,
    document: &Document,
    options: &PackageOptions,
) -> Result<Option<StylesPart>> {
    let target = document
        .relationships()
        .find_by_type(TYPE_STYLES)
        .map(|rel| resolve_target(document.path(), &rel.target))
        .or_else(|| {
            root_relationships
                .find_by_type(TYPE_STYLES)
                .map(|rel| resolve_target("", &rel.target))
        });

    let Some(path) = target else {
        if options.require_styles {
            let expected = resolve_target(document.path(), "styles.xml");
            return Err(OoxmlError::MissingPart(expected));
        }
        log::warn!("{} has no styles relationship", document.path());
        return Ok(None);
    };

    let bytes = files
        .remove(&path)
        .ok_or_else(|| OoxmlError::MissingPart(path.clone()))?;
    if content_types.resolve(&path).is_none() {
        return Err(OoxmlError::UndeclaredPart(path));
    }
    let styles = StylesPart::parse(path, bytes)?;
    log::debug!("loaded {} styles", styles.sheet().len());
    Ok(Some(styles))
}
